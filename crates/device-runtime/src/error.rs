// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the accelerator runtime.

/// Errors reported by the accelerator runtime.
///
/// `Clone` because execution faults are sticky: every later synchronization
/// point reports the same error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The requested allocation would exceed device memory.
    #[error("out of device memory: requested {requested_bytes} bytes, but only {available_bytes} available (total: {total_bytes})")]
    OutOfMemory {
        requested_bytes: usize,
        available_bytes: usize,
        total_bytes: usize,
    },

    /// Attempted to allocate a zero-sized device buffer.
    #[error("cannot allocate zero-sized device buffer")]
    ZeroSizedAllocation,

    /// The launch configuration exceeds the device limits.
    #[error("invalid launch configuration for '{label}': {detail}")]
    InvalidLaunch { label: String, detail: String },

    /// A launched job failed. Reported at the next synchronization point,
    /// which is not necessarily the call that submitted the job.
    #[error("kernel '{label}' (launch #{launch}) failed: {detail}")]
    ExecutionFailed {
        launch: u64,
        label: String,
        detail: String,
    },

    /// Raised from inside a job body; the stream wraps it in `ExecutionFailed`.
    #[error("kernel fault: {0}")]
    KernelFault(String),

    /// A host/device transfer had mismatched lengths.
    #[error("copy size mismatch: destination holds {dst_len} elements, source holds {src_len}")]
    CopySizeMismatch { dst_len: usize, src_len: usize },

    /// A device buffer belongs to another device.
    #[error("memory belongs to device {memory_device}, not device {device}")]
    WrongDevice { device: usize, memory_device: usize },

    /// The stream worker is gone.
    #[error("device stream closed")]
    StreamClosed,
}
