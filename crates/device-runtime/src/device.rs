// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`Device`] handle: allocation, transfers, launches, synchronization.

use crate::memory::MemoryAccount;
use crate::stream::{Job, Stream};
use crate::{DeviceError, DeviceMemory, DeviceStats, LaunchConfig, PinnedHostMemory};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

static NEXT_DEVICE_ID: AtomicUsize = AtomicUsize::new(0);

/// Static limits of a device.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeviceProperties {
    /// Device name.
    pub name: String,
    /// Maximum threads in one block.
    pub max_threads_per_block: usize,
    /// Maximum blocks in one grid.
    pub max_grid_blocks: usize,
    /// Maximum dynamic shared memory per block, in bytes.
    pub max_shared_memory_bytes: usize,
    /// Global memory capacity, in bytes.
    pub total_memory_bytes: usize,
}

impl Default for DeviceProperties {
    fn default() -> Self {
        Self {
            name: "simulated accelerator".to_string(),
            max_threads_per_block: 1024,
            max_grid_blocks: (1 << 31) - 1,
            max_shared_memory_bytes: 48 * 1024,
            total_memory_bytes: 2 * 1024 * 1024 * 1024,
        }
    }
}

struct DeviceInner {
    id: usize,
    props: DeviceProperties,
    account: Arc<MemoryAccount>,
    stats: Arc<Mutex<DeviceStats>>,
    /// Configuration error from the latest rejected launch; cleared by
    /// [`Device::get_last_error`].
    launch_error: Mutex<Option<DeviceError>>,
    next_launch: AtomicU64,
    stream: Stream,
}

/// A handle to an accelerator.
///
/// Cloning the handle shares the device. Launches are fire-and-forget:
/// [`launch`](Self::launch) validates the geometry and queues the job on
/// the device stream, then returns. Execution errors are reported at the
/// next synchronization point ([`synchronize`](Self::synchronize) or a
/// blocking copy). They are attributed to the job that faulted, which is
/// not necessarily the most recent one submitted.
///
/// # Example
/// ```
/// use device_runtime::{Device, LaunchConfig};
///
/// let device = Device::new();
/// let out = device.alloc::<f64>(64).unwrap();
/// let ptr = out.as_ptr();
/// device.launch("fill", LaunchConfig::new(2, 32), move |cfg| {
///     let mut data = ptr.write()?;
///     cfg.for_each_block(&mut data[..], 1, |_, slots| {
///         slots.fill(1.0);
///         Ok(())
///     })
/// });
/// device.synchronize().unwrap();
///
/// let mut host = vec![0.0; 64];
/// device.copy_to_host(&mut host, &out).unwrap();
/// assert!(host.iter().all(|&x| x == 1.0));
/// ```
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl Device {
    /// Creates a device with default properties.
    pub fn new() -> Self {
        Self::with_properties(DeviceProperties::default())
    }

    /// Creates a device with the given properties.
    pub fn with_properties(props: DeviceProperties) -> Self {
        let id = NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed);
        let stats = Arc::new(Mutex::new(DeviceStats::default()));
        let account = Arc::new(MemoryAccount::new(props.total_memory_bytes, Arc::clone(&stats)));
        let stream = Stream::spawn(id, Arc::clone(&stats));
        tracing::info!(
            "device {id} ready: {} ({} MB, {} threads/block)",
            props.name,
            props.total_memory_bytes / (1024 * 1024),
            props.max_threads_per_block,
        );
        Self {
            inner: Arc::new(DeviceInner {
                id,
                props,
                account,
                stats,
                launch_error: Mutex::new(None),
                next_launch: AtomicU64::new(0),
                stream,
            }),
        }
    }

    pub fn id(&self) -> usize {
        self.inner.id
    }

    pub fn properties(&self) -> &DeviceProperties {
        &self.inner.props
    }

    /// Device bytes currently allocated.
    pub fn allocated_bytes(&self) -> usize {
        self.inner.account.allocated_bytes()
    }

    /// Device bytes still available.
    pub fn available_bytes(&self) -> usize {
        self.inner
            .account
            .total_bytes()
            .saturating_sub(self.allocated_bytes())
    }

    /// Returns a snapshot of the usage statistics.
    pub fn stats(&self) -> DeviceStats {
        self.inner
            .stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Allocates `len` zero-initialised elements of device memory.
    pub fn alloc<T>(&self, len: usize) -> Result<DeviceMemory<T>, DeviceError>
    where
        T: Clone + Default + Send + Sync + 'static,
    {
        DeviceMemory::new(len, self.inner.id, Arc::clone(&self.inner.account))
    }

    /// Allocates `len` elements of pinned host memory.
    pub fn alloc_pinned<T: Clone + Default>(&self, len: usize) -> PinnedHostMemory<T> {
        if let Ok(mut stats) = self.inner.stats.lock() {
            stats.record_pinned();
        }
        PinnedHostMemory::new(len, self.inner.id)
    }

    /// Submits a job over the grid `config`.
    ///
    /// Does not wait. A geometry that exceeds the device limits is rejected
    /// here and reported by [`peek_at_last_error`](Self::peek_at_last_error);
    /// faults raised by `body` surface at the next synchronization point.
    pub fn launch<F>(&self, label: &str, config: LaunchConfig, body: F)
    where
        F: FnOnce(LaunchConfig) -> Result<(), DeviceError> + Send + 'static,
    {
        if let Err(detail) = config.check(&self.inner.props) {
            tracing::warn!("device {}: rejected launch '{label}' {config}: {detail}", self.inner.id);
            if let Ok(mut stats) = self.inner.stats.lock() {
                stats.record_rejected_launch();
            }
            self.set_launch_error(DeviceError::InvalidLaunch {
                label: label.to_string(),
                detail,
            });
            return;
        }

        let seq = self.inner.next_launch.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("device {}: launch #{seq} '{label}' {config}", self.inner.id);

        let job = Job {
            seq,
            label: label.to_string(),
            config,
            body: Box::new(body),
        };
        match self.inner.stream.submit(job) {
            Ok(()) => {
                if let Ok(mut stats) = self.inner.stats.lock() {
                    stats.record_launch();
                }
            }
            Err(e) => self.set_launch_error(e),
        }
    }

    /// Returns the latest error without clearing it.
    ///
    /// Reports a rejected launch first, then any sticky execution fault
    /// already recorded by the stream. Does not wait for queued work.
    pub fn peek_at_last_error(&self) -> Result<(), DeviceError> {
        if let Some(err) = self.launch_error() {
            return Err(err);
        }
        match self.inner.stream.state.fault() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Returns the latest error, clearing a rejected-launch error.
    ///
    /// Execution faults are sticky and are never cleared.
    pub fn get_last_error(&self) -> Result<(), DeviceError> {
        let taken = self
            .inner
            .launch_error
            .lock()
            .ok()
            .and_then(|mut e| e.take());
        if let Some(err) = taken {
            return Err(err);
        }
        match self.inner.stream.state.fault() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Blocks until all submitted work has finished.
    ///
    /// Returns the sticky execution fault, if any job has failed.
    pub fn synchronize(&self) -> Result<(), DeviceError> {
        self.inner.stream.fence()?;
        match self.inner.stream.state.fault() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Returns `true` once a job has faulted. The device stays unusable.
    pub fn is_faulted(&self) -> bool {
        self.inner.stream.state.fault().is_some()
    }

    /// Copies `src` into device memory after all queued work completes.
    pub fn copy_to_device<T: Copy>(&self, dst: &DeviceMemory<T>, src: &[T]) -> Result<(), DeviceError> {
        self.check_owner(dst.device_id())?;
        if dst.len() != src.len() {
            return Err(DeviceError::CopySizeMismatch {
                dst_len: dst.len(),
                src_len: src.len(),
            });
        }
        self.synchronize()?;
        dst.write_raw()?.copy_from_slice(src);
        if let Ok(mut stats) = self.inner.stats.lock() {
            stats.record_to_device(std::mem::size_of_val(src));
        }
        Ok(())
    }

    /// Copies device memory into `dst` after all queued work completes.
    pub fn copy_to_host<T: Copy>(&self, dst: &mut [T], src: &DeviceMemory<T>) -> Result<(), DeviceError> {
        self.check_owner(src.device_id())?;
        if dst.len() != src.len() {
            return Err(DeviceError::CopySizeMismatch {
                dst_len: dst.len(),
                src_len: src.len(),
            });
        }
        self.synchronize()?;
        dst.copy_from_slice(&src.read_raw()?);
        if let Ok(mut stats) = self.inner.stats.lock() {
            stats.record_to_host(std::mem::size_of_val(dst));
        }
        Ok(())
    }

    fn check_owner(&self, memory_device: usize) -> Result<(), DeviceError> {
        if memory_device != self.inner.id {
            return Err(DeviceError::WrongDevice {
                device: self.inner.id,
                memory_device,
            });
        }
        Ok(())
    }

    fn launch_error(&self) -> Option<DeviceError> {
        self.inner.launch_error.lock().ok().and_then(|e| e.clone())
    }

    fn set_launch_error(&self, err: DeviceError) {
        if let Ok(mut slot) = self.inner.launch_error.lock() {
            *slot = Some(err);
        }
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.inner.id)
            .field("name", &self.inner.props.name)
            .field("allocated_bytes", &self.allocated_bytes())
            .field("faulted", &self.is_faulted())
            .finish()
    }
}
