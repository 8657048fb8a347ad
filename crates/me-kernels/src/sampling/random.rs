// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host random-number kernel.

use crate::kernel::{check_residency, check_tiling};
use crate::KernelError;
use event_buffers::{RandomNumbersBuffer, Residency, NP4, TILING_WIDTH};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fills a host random-number buffer with uniforms in (0, 1].
///
/// Equal seeds give equal buffers. The check loop reseeds once per
/// iteration with `seed + iteration`.
pub struct RandomNumberKernel<'a, const W: usize = TILING_WIDTH> {
    rnd: &'a mut RandomNumbersBuffer,
    rng: StdRng,
}

impl<'a, const W: usize> RandomNumberKernel<'a, W> {
    pub fn new(rnd: &'a mut RandomNumbersBuffer, seed: u64) -> Result<Self, KernelError> {
        check_residency("random numbers", rnd.residency(), Residency::Host)?;
        check_tiling::<W>("nevt", rnd.nevt())?;
        if rnd.per_event() % NP4 != 0 {
            return Err(KernelError::Layout {
                buffer: "random numbers",
                expected: (rnd.per_event() / NP4 + 1) * NP4,
                actual: rnd.per_event(),
            });
        }
        Ok(Self {
            rnd,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Restarts the generator from `seed`.
    pub fn seed_generator(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Overwrites the whole buffer with fresh uniforms.
    pub fn generate_rnarray(&mut self) -> Result<(), KernelError> {
        let data = self.rnd.host_slice_mut()?;
        for x in data.iter_mut() {
            // gen() is in [0, 1); RAMBO takes logs, so flip to (0, 1].
            *x = 1.0 - self.rng.gen::<f64>();
        }
        tracing::trace!("generated {} random numbers", data.len());
        Ok(())
    }

    pub fn nevt(&self) -> usize {
        self.rnd.nevt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_numbers() {
        let mut a = RandomNumbersBuffer::new_host(32, 8);
        let mut b = RandomNumbersBuffer::new_host(32, 8);
        RandomNumberKernel::<16>::new(&mut a, 7).unwrap().generate_rnarray().unwrap();
        RandomNumberKernel::<16>::new(&mut b, 7).unwrap().generate_rnarray().unwrap();
        assert_eq!(a.host_slice().unwrap(), b.host_slice().unwrap());
    }

    #[test]
    fn test_reseed_changes_numbers() {
        let mut buf = RandomNumbersBuffer::new_host(16, 8);
        let mut kernel = RandomNumberKernel::<16>::new(&mut buf, 1).unwrap();
        kernel.generate_rnarray().unwrap();
        kernel.seed_generator(2);
        kernel.generate_rnarray().unwrap();
        let second = buf.host_slice().unwrap().to_vec();

        let mut other = RandomNumbersBuffer::new_host(16, 8);
        RandomNumberKernel::<16>::new(&mut other, 1).unwrap().generate_rnarray().unwrap();
        assert_ne!(second, other.host_slice().unwrap());
    }

    #[test]
    fn test_range() {
        let mut buf = RandomNumbersBuffer::new_host(64, 8);
        RandomNumberKernel::<16>::new(&mut buf, 99).unwrap().generate_rnarray().unwrap();
        assert!(buf.host_slice().unwrap().iter().all(|&x| x > 0.0 && x <= 1.0));
    }

    #[test]
    fn test_device_buffer_refused() {
        let device = device_runtime::Device::new();
        let mut buf = RandomNumbersBuffer::new_device(&device, 16, 8).unwrap();
        let result = RandomNumberKernel::<16>::new(&mut buf, 0);
        assert!(matches!(result, Err(KernelError::WrongResidency { .. })));
    }
}
