// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAMBO sampling kernels.
//!
//! Both backends run the same per-event code from [`process_core::Rambo`],
//! so for equal random numbers they produce bitwise-equal momenta.

use super::SamplingKernel;
use crate::kernel::{check_layout, check_nevt, check_residency, check_same_device, check_tiling};
use crate::{GridConfiguration, KernelError};
use device_runtime::{Device, DeviceError};
use event_buffers::{
    MomentaAccessMut, MomentaBuffer, RandomAccess, RandomNumbersBuffer, Residency, WeightsBuffer, NP4, TILING_WIDTH,
};
use process_core::Rambo;
use rayon::prelude::*;

const NPARI: usize = 2;

/// Final-state particle count implied by a random-number buffer.
fn nparf_of(rnd: &RandomNumbersBuffer) -> Result<usize, KernelError> {
    if rnd.per_event() == 0 || rnd.per_event() % NP4 != 0 {
        return Err(KernelError::Layout {
            buffer: "random numbers",
            expected: NP4 * rnd.per_event().div_ceil(NP4).max(1),
            actual: rnd.per_event(),
        });
    }
    Ok(rnd.per_event() / NP4)
}

fn check_buffers(
    expected: Residency,
    rnd: &RandomNumbersBuffer,
    momenta: &MomentaBuffer,
    weights: &WeightsBuffer,
    nevt: usize,
) -> Result<usize, KernelError> {
    check_residency("random numbers", rnd.residency(), expected)?;
    check_residency("momenta", momenta.residency(), expected)?;
    check_residency("weights", weights.residency(), expected)?;
    check_nevt("random numbers", rnd.nevt(), nevt)?;
    check_nevt("momenta", momenta.nevt(), nevt)?;
    check_nevt("weights", weights.nevt(), nevt)?;
    let nparf = nparf_of(rnd)?;
    check_layout("momenta", momenta.per_event(), (NPARI + nparf) * NP4)?;
    check_layout("weights", weights.per_event(), 1)?;
    Ok(nparf)
}

// ── Host ───────────────────────────────────────────────────────

/// RAMBO on the host.
pub struct RamboSamplingKernelHost<'a, const W: usize = TILING_WIDTH> {
    rambo: Rambo,
    rnd: &'a RandomNumbersBuffer,
    momenta: &'a mut MomentaBuffer,
    weights: &'a mut WeightsBuffer,
    nevt: usize,
}

impl<'a, const W: usize> RamboSamplingKernelHost<'a, W> {
    /// Builds a sampler at centre-of-mass `energy` over host buffers of `nevt` events.
    pub fn new(
        energy: f64,
        rnd: &'a RandomNumbersBuffer,
        momenta: &'a mut MomentaBuffer,
        weights: &'a mut WeightsBuffer,
        nevt: usize,
    ) -> Result<Self, KernelError> {
        let nparf = check_buffers(Residency::Host, rnd, momenta, weights, nevt)?;
        check_tiling::<W>("nevt", nevt)?;
        Ok(Self {
            rambo: Rambo::new(energy, nparf)?,
            rnd,
            momenta,
            weights,
            nevt,
        })
    }

    fn npar(&self) -> usize {
        NPARI + self.rambo.nparf()
    }
}

impl<const W: usize> SamplingKernel for RamboSamplingKernelHost<'_, W> {
    fn name(&self) -> &str {
        "host"
    }

    fn nevt(&self) -> usize {
        self.nevt
    }

    fn get_momenta_initial(&mut self) -> Result<(), KernelError> {
        let npar = self.npar();
        let mut momenta = MomentaAccessMut::<W>::new(self.momenta.host_slice_mut()?, self.nevt, npar)?;
        self.rambo.fill_initial(&mut momenta);
        Ok(())
    }

    fn get_momenta_final(&mut self) -> Result<(), KernelError> {
        let npar = self.npar();
        let rnd = RandomAccess::<W>::new(self.rnd.host_slice()?, self.nevt, self.rambo.nparf())?;
        let mut momenta = MomentaAccessMut::<W>::new(self.momenta.host_slice_mut()?, self.nevt, npar)?;
        self.rambo.fill_final(&rnd, &mut momenta, self.weights.host_slice_mut()?);
        Ok(())
    }
}

// ── Device ─────────────────────────────────────────────────────

/// RAMBO on an accelerator, one thread per event.
pub struct RamboSamplingKernelDevice<'a, const W: usize = TILING_WIDTH> {
    rambo: Rambo,
    rnd: &'a RandomNumbersBuffer,
    momenta: &'a mut MomentaBuffer,
    weights: &'a mut WeightsBuffer,
    device: Device,
    grid: GridConfiguration,
}

impl<'a, const W: usize> RamboSamplingKernelDevice<'a, W> {
    /// Builds a sampler over device buffers and a `blocks` × `threads` grid.
    pub fn new(
        energy: f64,
        rnd: &'a RandomNumbersBuffer,
        momenta: &'a mut MomentaBuffer,
        weights: &'a mut WeightsBuffer,
        blocks: usize,
        threads: usize,
    ) -> Result<Self, KernelError> {
        let grid = GridConfiguration::new(blocks, threads)?;
        let nparf = check_buffers(Residency::Device, rnd, momenta, weights, grid.nevt())?;
        check_tiling::<W>("gputhreads", threads)?;

        let device = rnd.device().cloned().ok_or(KernelError::WrongResidency {
            buffer: "random numbers",
            expected: Residency::Device,
            actual: Residency::Host,
        })?;
        check_same_device("momenta", momenta.device(), device.id())?;
        check_same_device("weights", weights.device(), device.id())?;

        Ok(Self {
            rambo: Rambo::new(energy, nparf)?,
            rnd,
            momenta,
            weights,
            device,
            grid,
        })
    }

    pub fn grid(&self) -> GridConfiguration {
        self.grid
    }
}

fn fault(err: impl std::fmt::Display) -> DeviceError {
    DeviceError::KernelFault(err.to_string())
}

impl<const W: usize> SamplingKernel for RamboSamplingKernelDevice<'_, W> {
    fn name(&self) -> &str {
        "device"
    }

    fn nevt(&self) -> usize {
        self.grid.nevt()
    }

    fn get_momenta_initial(&mut self) -> Result<(), KernelError> {
        let momenta = self.momenta.device_ptr()?;
        let rambo = self.rambo;
        let npar = NPARI + rambo.nparf();

        self.device.launch("get_momenta_initial", self.grid.launch_config(), move |cfg| {
            let mut momenta = momenta.write()?;
            cfg.for_each_block(&mut momenta[..], npar * NP4, |_, block| {
                let mut view = MomentaAccessMut::<W>::new(block, cfg.threads, npar).map_err(fault)?;
                rambo.fill_initial(&mut view);
                Ok(())
            })
        });
        self.device.peek_at_last_error()?;
        self.device.synchronize()?;
        Ok(())
    }

    fn get_momenta_final(&mut self) -> Result<(), KernelError> {
        let rnd = self.rnd.device_ptr()?;
        let momenta = self.momenta.device_ptr()?;
        let weights = self.weights.device_ptr()?;
        let rambo = self.rambo;
        let (nparf, npar) = (rambo.nparf(), NPARI + rambo.nparf());

        self.device.launch("get_momenta_final", self.grid.launch_config(), move |cfg| {
            let rnd = rnd.read()?;
            let mut momenta = momenta.write()?;
            let mut weights = weights.write()?;
            let threads = cfg.threads;
            if weights.len() != cfg.total_threads() {
                return Err(fault(format!(
                    "grid covers {} events, weights hold {}",
                    cfg.total_threads(),
                    weights.len()
                )));
            }

            momenta
                .par_chunks_mut(threads * npar * NP4)
                .zip(weights.par_chunks_mut(threads))
                .zip(rnd.par_chunks(threads * nparf * NP4))
                .try_for_each(|((block, wgts), r)| {
                    let r = RandomAccess::<W>::new(r, threads, nparf).map_err(fault)?;
                    let mut view = MomentaAccessMut::<W>::new(block, threads, npar).map_err(fault)?;
                    rambo.fill_final(&r, &mut view, wgts);
                    Ok(())
                })
        });
        self.device.peek_at_last_error()?;
        self.device.synchronize()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_layout_mismatch() {
        let rnd = RandomNumbersBuffer::new_host(16, 8);
        let mut momenta = MomentaBuffer::new_host(16, 12);
        let mut weights = WeightsBuffer::new_host(16, 1);
        let result = RamboSamplingKernelHost::<16>::new(100.0, &rnd, &mut momenta, &mut weights, 16);
        assert!(matches!(result, Err(KernelError::Layout { buffer: "momenta", expected: 16, actual: 12 })));
    }

    #[test]
    fn test_host_bad_energy() {
        let rnd = RandomNumbersBuffer::new_host(16, 8);
        let mut momenta = MomentaBuffer::new_host(16, 16);
        let mut weights = WeightsBuffer::new_host(16, 1);
        let result = RamboSamplingKernelHost::<16>::new(-1.0, &rnd, &mut momenta, &mut weights, 16);
        assert!(matches!(result, Err(KernelError::Process(_))));
    }

    #[test]
    fn test_host_fills_beams_and_weights() {
        let rnd = RandomNumbersBuffer::from_host_vec((0..16 * 8).map(|i| (i % 7 + 1) as f64 / 8.0).collect(), 16, 8).unwrap();
        let mut momenta = MomentaBuffer::new_host(16, 16);
        let mut weights = WeightsBuffer::new_host(16, 1);
        {
            let mut kernel = RamboSamplingKernelHost::<16>::new(200.0, &rnd, &mut momenta, &mut weights, 16).unwrap();
            kernel.get_momenta_initial().unwrap();
            kernel.get_momenta_final().unwrap();
        }
        let view = event_buffers::MomentaAccess::<16>::new(momenta.host_slice().unwrap(), 16, 4).unwrap();
        assert_eq!(view.four_vector(3, 0), [100.0, 0.0, 0.0, 100.0]);
        assert_eq!(view.four_vector(3, 1), [100.0, 0.0, 0.0, -100.0]);
        let total_e = view.get(3, 2, 0) + view.get(3, 3, 0);
        assert!((total_e - 200.0).abs() < 1e-9);
        assert!(weights.host_slice().unwrap().iter().all(|&w| (w - std::f64::consts::FRAC_PI_2).abs() < 1e-12));
    }

    #[test]
    fn test_device_mixed_residency() {
        let device = Device::new();
        let rnd = RandomNumbersBuffer::new_device(&device, 32, 8).unwrap();
        let mut momenta = MomentaBuffer::new_host(32, 16);
        let mut weights = WeightsBuffer::new_device(&device, 32, 1).unwrap();
        let result = RamboSamplingKernelDevice::<16>::new(100.0, &rnd, &mut momenta, &mut weights, 2, 16);
        assert!(matches!(result, Err(KernelError::WrongResidency { buffer: "momenta", .. })));
    }
}
