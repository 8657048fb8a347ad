// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Launch geometry and the block-parallel execution helper.

use crate::{DeviceError, DeviceProperties};
use rayon::prelude::*;

/// Geometry of a grid launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LaunchConfig {
    /// Number of blocks in the grid.
    pub blocks: usize,
    /// Threads per block.
    pub threads: usize,
    /// Dynamic shared memory per block, in bytes.
    pub shared_mem_bytes: usize,
}

impl LaunchConfig {
    pub fn new(blocks: usize, threads: usize) -> Self {
        Self {
            blocks,
            threads,
            shared_mem_bytes: 0,
        }
    }

    pub fn with_shared_memory(mut self, bytes: usize) -> Self {
        self.shared_mem_bytes = bytes;
        self
    }

    /// Total number of threads in the grid.
    pub fn total_threads(&self) -> usize {
        self.blocks * self.threads
    }

    /// Checks the geometry against device limits.
    pub(crate) fn check(&self, props: &DeviceProperties) -> Result<(), String> {
        if self.blocks == 0 || self.threads == 0 {
            return Err(format!(
                "empty grid ({} blocks × {} threads)",
                self.blocks, self.threads
            ));
        }
        if self.threads > props.max_threads_per_block {
            return Err(format!(
                "{} threads per block exceeds the limit of {}",
                self.threads, props.max_threads_per_block
            ));
        }
        if self.blocks > props.max_grid_blocks {
            return Err(format!(
                "{} blocks exceeds the limit of {}",
                self.blocks, props.max_grid_blocks
            ));
        }
        if self.shared_mem_bytes > props.max_shared_memory_bytes {
            return Err(format!(
                "{} bytes of shared memory exceeds the limit of {}",
                self.shared_mem_bytes, props.max_shared_memory_bytes
            ));
        }
        Ok(())
    }

    /// Runs `f` once per block, blocks in parallel.
    ///
    /// `data` must hold `per_thread` elements for every thread of the grid;
    /// block `b` receives the contiguous chunk owned by its threads. The
    /// first block error aborts the remaining blocks and is returned.
    pub fn for_each_block<T, F>(&self, data: &mut [T], per_thread: usize, f: F) -> Result<(), DeviceError>
    where
        T: Send,
        F: Fn(usize, &mut [T]) -> Result<(), DeviceError> + Sync + Send,
    {
        let chunk = self.threads * per_thread;
        let expected = self.blocks * chunk;
        if chunk == 0 || data.len() != expected {
            return Err(DeviceError::KernelFault(format!(
                "grid covers {expected} elements, buffer holds {}",
                data.len()
            )));
        }

        data.par_chunks_mut(chunk)
            .enumerate()
            .try_for_each(|(block, slots)| f(block, slots))
    }
}

impl std::fmt::Display for LaunchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<<<{}, {}, {}>>>", self.blocks, self.threads, self.shared_mem_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_limits() {
        let props = DeviceProperties::default();
        assert!(LaunchConfig::new(32, 256).check(&props).is_ok());
        assert!(LaunchConfig::new(4, 2048).check(&props).is_err());
        assert!(LaunchConfig::new(0, 32).check(&props).is_err());
        assert!(LaunchConfig::new(1, 32)
            .with_shared_memory(props.max_shared_memory_bytes + 1)
            .check(&props)
            .is_err());
    }

    #[test]
    fn test_for_each_block_covers_grid() {
        let cfg = LaunchConfig::new(4, 8);
        let mut out = vec![0usize; 32];
        cfg.for_each_block(&mut out, 1, |block, slots| {
            for (t, slot) in slots.iter_mut().enumerate() {
                *slot = block * 8 + t;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(out, (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn test_for_each_block_wrong_length() {
        let cfg = LaunchConfig::new(4, 8);
        let mut out = vec![0u8; 31];
        let result = cfg.for_each_block(&mut out, 1, |_, _| Ok(()));
        assert!(matches!(result, Err(DeviceError::KernelFault(_))));
    }

    #[test]
    fn test_for_each_block_propagates_fault() {
        let cfg = LaunchConfig::new(4, 8);
        let mut out = vec![0u8; 32];
        let result = cfg.for_each_block(&mut out, 1, |block, _| {
            if block == 2 {
                return Err(DeviceError::KernelFault("block 2".into()));
            }
            Ok(())
        });
        assert!(matches!(result, Err(DeviceError::KernelFault(msg)) if msg == "block 2"));
    }

    #[test]
    fn test_display() {
        let cfg = LaunchConfig::new(2, 64).with_shared_memory(128);
        assert_eq!(cfg.to_string(), "<<<2, 64, 128>>>");
        assert_eq!(cfg.total_threads(), 128);
    }
}
