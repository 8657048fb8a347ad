// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the check engine.

/// Errors that can occur while setting up or running the check loop.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The engine is missing state its type says it has.
    #[error("engine in invalid state: {0}")]
    InvalidState(&'static str),

    /// Kernel construction or execution failed.
    #[error("kernel error: {0}")]
    Kernel(#[from] me_kernels::KernelError),

    /// Buffer allocation or transfer failed.
    #[error("buffer error: {0}")]
    Buffer(#[from] event_buffers::BufferError),

    /// The accelerator reported an error.
    #[error("device error: {0}")]
    Device(#[from] device_runtime::DeviceError),
}
