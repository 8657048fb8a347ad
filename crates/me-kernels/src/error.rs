// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for kernel construction and execution.

use device_runtime::DeviceError;
use event_buffers::{BufferError, Residency};
use process_core::ProcessError;

/// Errors raised by matrix-element and sampling kernels.
///
/// Everything except [`Device`](Self::Device) is a configuration error,
/// raised at construction. None of them is retried: the caller rebuilds
/// the kernel with corrected parameters.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// A buffer lives in the wrong memory space for this kernel.
    #[error("{buffer} buffer is {actual}-resident, this kernel needs it {expected}-resident")]
    WrongResidency {
        buffer: &'static str,
        expected: Residency,
        actual: Residency,
    },

    /// A buffer was sized for a different number of events.
    #[error("{buffer} buffer holds {actual} events, kernel was built for {expected}")]
    EventCountMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The event count (host) or threads per block (device) splits a tile.
    #[error("{what} = {value} must be a multiple of tiling width {width}")]
    NotTileMultiple {
        what: &'static str,
        value: usize,
        width: usize,
    },

    /// A grid dimension of zero.
    #[error("{dim} must be nonzero")]
    ZeroGridDimension { dim: &'static str },

    /// blocks × threads does not fit in `usize`.
    #[error("grid {blocks} x {threads} overflows")]
    GridOverflow { blocks: usize, threads: usize },

    /// A regrid that would change the total number of events.
    #[error("grid {blocks} x {threads} does not cover nevt = {nevt}")]
    GridMismatch {
        blocks: usize,
        threads: usize,
        nevt: usize,
    },

    /// The build's SIMD tier is not implemented by this CPU.
    #[error("the application is built for {tag} but the host does not support it")]
    UnsupportedSimd { tag: &'static str },

    /// A buffer's per-event record does not match the process.
    #[error("{buffer} buffer has {actual} values per event, expected {expected}")]
    Layout {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The helicity context was built for another process.
    #[error("helicity context has {actual} combinations, process has {expected}")]
    HelicityContextMismatch { expected: usize, actual: usize },

    /// Buffers, or a buffer and the helicity cache, live on different devices.
    #[error("{what} is on device {actual}, kernel runs on device {expected}")]
    DeviceMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Process or sampler setup failed.
    #[error("process error: {0}")]
    Process(#[from] ProcessError),

    /// A buffer operation failed.
    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),

    /// A launch or execution error from the accelerator. Fatal.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),
}
