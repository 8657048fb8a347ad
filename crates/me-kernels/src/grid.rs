// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Accelerator execution grid.

use crate::KernelError;
use device_runtime::LaunchConfig;

/// A (blocks, threads) grid with one thread per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GridConfiguration {
    blocks: usize,
    threads: usize,
}

impl GridConfiguration {
    /// Rejects zero dimensions and products that overflow.
    pub fn new(blocks: usize, threads: usize) -> Result<Self, KernelError> {
        if blocks == 0 {
            return Err(KernelError::ZeroGridDimension { dim: "gpublocks" });
        }
        if threads == 0 {
            return Err(KernelError::ZeroGridDimension { dim: "gputhreads" });
        }
        if blocks.checked_mul(threads).is_none() {
            return Err(KernelError::GridOverflow { blocks, threads });
        }
        Ok(Self { blocks, threads })
    }

    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Total events covered, blocks × threads.
    pub fn nevt(&self) -> usize {
        self.blocks * self.threads
    }

    /// Launch geometry without shared memory.
    pub fn launch_config(&self) -> LaunchConfig {
        LaunchConfig::new(self.blocks, self.threads)
    }
}

impl std::fmt::Display for GridConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x {}", self.blocks, self.threads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_grid() {
        let grid = GridConfiguration::new(32, 256).unwrap();
        assert_eq!(grid.nevt(), 8192);
        assert_eq!(grid.to_string(), "32 x 256");
        assert_eq!(grid.launch_config().total_threads(), 8192);
    }

    #[test]
    fn test_zero_dimensions() {
        assert!(matches!(
            GridConfiguration::new(0, 32),
            Err(KernelError::ZeroGridDimension { dim: "gpublocks" })
        ));
        assert!(matches!(
            GridConfiguration::new(32, 0),
            Err(KernelError::ZeroGridDimension { dim: "gputhreads" })
        ));
    }

    #[test]
    fn test_overflow() {
        assert!(matches!(
            GridConfiguration::new(usize::MAX, 2),
            Err(KernelError::GridOverflow { .. })
        ));
    }
}
