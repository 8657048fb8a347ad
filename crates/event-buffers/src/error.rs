// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for event buffers and layout accessors.

use crate::Residency;

/// Errors raised by buffers and the tiled layout accessor.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// The operation needs the buffer in the other memory space.
    #[error("{kind} buffer is {actual}-resident, expected {expected}-resident")]
    WrongResidency {
        kind: &'static str,
        expected: Residency,
        actual: Residency,
    },

    /// The event count does not fill whole tiles.
    #[error("nevt = {nevt} must be a multiple of tiling width {width}")]
    NotTiled { nevt: usize, width: usize },

    /// The data length does not match the layout.
    #[error("{kind} layout mismatch: expected {expected} elements, got {actual}")]
    SizeMismatch {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Two buffers disagree on the event count.
    #[error("{kind} event count mismatch: {expected} vs {actual}")]
    EventCountMismatch {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Device-to-device copies are not part of the buffer interface.
    #[error("cannot copy {kind} buffer from device to device")]
    DeviceToDevice { kind: &'static str },

    /// An error from the accelerator runtime.
    #[error("device error: {0}")]
    Device(#[from] device_runtime::DeviceError),
}
