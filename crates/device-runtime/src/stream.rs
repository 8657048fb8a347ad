// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The asynchronous execution stream.
//!
//! One worker thread drains a FIFO of commands. Jobs run in submission
//! order; fences let the host wait for everything submitted before them.
//! The first failing job poisons the stream: its error is stored, later
//! jobs are dropped unexecuted, and every synchronization reports the
//! stored error. Nothing is retried.

use crate::{DeviceError, DeviceStats, LaunchConfig};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// A job body. Runs on the stream worker.
pub(crate) type JobBody = Box<dyn FnOnce(LaunchConfig) -> Result<(), DeviceError> + Send + 'static>;

pub(crate) struct Job {
    pub(crate) seq: u64,
    pub(crate) label: String,
    pub(crate) config: LaunchConfig,
    pub(crate) body: JobBody,
}

enum Command {
    Run(Job),
    Fence(Sender<()>),
}

/// State shared between the host side and the worker.
#[derive(Default)]
pub(crate) struct StreamState {
    fault: Mutex<Option<DeviceError>>,
}

impl StreamState {
    pub(crate) fn fault(&self) -> Option<DeviceError> {
        self.fault.lock().ok().and_then(|f| f.clone())
    }

    fn set_fault(&self, err: DeviceError) {
        if let Ok(mut fault) = self.fault.lock() {
            // Keep the first fault.
            if fault.is_none() {
                *fault = Some(err);
            }
        }
    }
}

pub(crate) struct Stream {
    sender: Mutex<Option<Sender<Command>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    pub(crate) state: Arc<StreamState>,
}

impl Stream {
    pub(crate) fn spawn(device_id: usize, stats: Arc<Mutex<DeviceStats>>) -> Self {
        let (tx, rx) = mpsc::channel();
        let state = Arc::new(StreamState::default());
        let worker_state = Arc::clone(&state);

        let worker = std::thread::Builder::new()
            .name(format!("device-{device_id}-stream"))
            .spawn(move || worker_loop(rx, worker_state, stats))
            .ok();

        if worker.is_none() {
            tracing::warn!("device {device_id}: failed to spawn stream worker");
        }

        Self {
            sender: Mutex::new(worker.as_ref().map(|_| tx)),
            worker: Mutex::new(worker),
            state,
        }
    }

    pub(crate) fn submit(&self, job: Job) -> Result<(), DeviceError> {
        let sender = self.sender.lock().map_err(|_| DeviceError::StreamClosed)?;
        sender
            .as_ref()
            .ok_or(DeviceError::StreamClosed)?
            .send(Command::Run(job))
            .map_err(|_| DeviceError::StreamClosed)
    }

    /// Blocks until every previously submitted job has finished.
    pub(crate) fn fence(&self) -> Result<(), DeviceError> {
        let (tx, rx) = mpsc::channel();
        {
            let sender = self.sender.lock().map_err(|_| DeviceError::StreamClosed)?;
            sender
                .as_ref()
                .ok_or(DeviceError::StreamClosed)?
                .send(Command::Fence(tx))
                .map_err(|_| DeviceError::StreamClosed)?;
        }
        rx.recv().map_err(|_| DeviceError::StreamClosed)
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        if let Ok(mut worker) = self.worker.lock() {
            if let Some(handle) = worker.take() {
                let _ = handle.join();
            }
        }
    }
}

fn worker_loop(rx: Receiver<Command>, state: Arc<StreamState>, stats: Arc<Mutex<DeviceStats>>) {
    while let Ok(command) = rx.recv() {
        match command {
            Command::Fence(done) => {
                let _ = done.send(());
            }
            Command::Run(job) => {
                if state.fault().is_some() {
                    tracing::debug!(
                        "stream poisoned, dropping '{}' (launch #{})",
                        job.label,
                        job.seq
                    );
                    continue;
                }

                let Job {
                    seq,
                    label,
                    config,
                    body,
                } = job;

                let outcome = catch_unwind(AssertUnwindSafe(|| body(config)));
                let detail = match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(DeviceError::KernelFault(detail))) => Some(detail),
                    Ok(Err(other)) => Some(other.to_string()),
                    Err(panic) => Some(panic_message(panic.as_ref())),
                };

                if let Some(detail) = detail {
                    tracing::warn!("kernel '{label}' (launch #{seq}) faulted: {detail}");
                    if let Ok(mut stats) = stats.lock() {
                        stats.record_failed_launch();
                    }
                    state.set_fault(DeviceError::ExecutionFailed {
                        launch: seq,
                        label,
                        detail,
                    });
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_string()
    }
}
