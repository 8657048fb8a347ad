// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The helicity cache.
//!
//! The good-helicity pass evaluates every helicity combination once and
//! records which ones contribute. Later matrix-element passes sum only
//! over those. The cache is an explicit value owned by the caller and
//! handed to both passes, so two process instances never share one.
//!
//! A fresh context lists every combination as good: skipping the warm-up
//! costs time, not correctness.

use crate::KernelError;
use device_runtime::{Device, DeviceMemory};
use process_core::{good_helicity_list, Process};

/// Good helicity combinations for one process.
pub struct HelicityContext {
    ncomb: usize,
    good: Vec<usize>,
    published: bool,
    /// Device-resident copy of `good`, set by the device good-helicity pass.
    device_good: Option<DeviceMemory<usize>>,
}

impl HelicityContext {
    /// A context for `process` with every combination marked good.
    pub fn new<P: Process + ?Sized>(process: &P) -> Self {
        let ncomb = process.ncomb();
        Self {
            ncomb,
            good: (0..ncomb).collect(),
            published: false,
            device_good: None,
        }
    }

    /// Number of helicity combinations of the process.
    pub fn ncomb(&self) -> usize {
        self.ncomb
    }

    /// Indices of the combinations matrix-element passes evaluate.
    pub fn good_helicities(&self) -> &[usize] {
        &self.good
    }

    /// `true` once a good-helicity pass has published its mask.
    pub fn is_published(&self) -> bool {
        self.published
    }

    /// Replaces the good list with the `true` entries of `mask`.
    ///
    /// Drops any device copy; it no longer matches.
    pub fn publish(&mut self, mask: &[bool]) -> Result<(), KernelError> {
        if mask.len() != self.ncomb {
            return Err(KernelError::HelicityContextMismatch {
                expected: self.ncomb,
                actual: mask.len(),
            });
        }
        self.good = good_helicity_list(mask);
        self.published = true;
        self.device_good = None;
        tracing::info!("published {} of {} helicity combinations", self.good.len(), self.ncomb);
        Ok(())
    }

    /// Publishes `mask` and mirrors the good list into `device` memory.
    pub(crate) fn publish_device(&mut self, mask: &[bool], device: &Device) -> Result<(), KernelError> {
        self.publish(mask)?;
        if !self.good.is_empty() {
            let list = device.alloc::<usize>(self.good.len())?;
            device.copy_to_device(&list, &self.good)?;
            self.device_good = Some(list);
        }
        Ok(())
    }

    /// The device-resident good list, if the last publish came from a device pass.
    pub(crate) fn device_good_helicities(&self) -> Option<&DeviceMemory<usize>> {
        self.device_good.as_ref()
    }

    /// Forgets any published mask. Call when the kinematic regime changes.
    pub fn reset(&mut self) {
        self.good = (0..self.ncomb).collect();
        self.published = false;
        self.device_good = None;
    }

    /// Checks that this context belongs to a process with `ncomb` combinations.
    pub(crate) fn check_ncomb(&self, ncomb: usize) -> Result<(), KernelError> {
        if self.ncomb != ncomb {
            return Err(KernelError::HelicityContextMismatch {
                expected: ncomb,
                actual: self.ncomb,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for HelicityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelicityContext")
            .field("ncomb", &self.ncomb)
            .field("good", &self.good)
            .field("published", &self.published)
            .field("on_device", &self.device_good.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use process_core::EeToMuMu;

    #[test]
    fn test_fresh_context_is_all_good() {
        let ctx = HelicityContext::new(&EeToMuMu::new());
        assert_eq!(ctx.ncomb(), 16);
        assert_eq!(ctx.good_helicities().len(), 16);
        assert!(!ctx.is_published());
    }

    #[test]
    fn test_publish_and_reset() {
        let mut ctx = HelicityContext::new(&EeToMuMu::new());
        let mut mask = vec![false; 16];
        mask[5] = true;
        mask[10] = true;
        ctx.publish(&mask).unwrap();
        assert_eq!(ctx.good_helicities(), &[5, 10]);
        assert!(ctx.is_published());

        ctx.reset();
        assert_eq!(ctx.good_helicities().len(), 16);
        assert!(!ctx.is_published());
    }

    #[test]
    fn test_publish_wrong_length() {
        let mut ctx = HelicityContext::new(&EeToMuMu::new());
        let result = ctx.publish(&[true; 4]);
        assert!(matches!(
            result,
            Err(KernelError::HelicityContextMismatch { expected: 16, actual: 4 })
        ));
    }

    #[test]
    fn test_publish_device_mirrors_list() {
        let device = Device::new();
        let mut ctx = HelicityContext::new(&EeToMuMu::new());
        let mut mask = vec![false; 16];
        mask[6] = true;
        ctx.publish_device(&mask, &device).unwrap();

        let list = ctx.device_good_helicities().unwrap();
        let mut host = vec![0usize; 1];
        device.copy_to_host(&mut host, list).unwrap();
        assert_eq!(host, vec![6]);

        // A host publish invalidates the device copy.
        ctx.publish(&mask).unwrap();
        assert!(ctx.device_good_helicities().is_none());
    }
}
