// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for host probing.

/// Errors that can occur when reading CPU information.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Failed to read a procfs or sysfs file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },
}
