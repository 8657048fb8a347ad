// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Accelerator matrix-element kernel.
//!
//! One device thread per event over a (blocks, threads) grid. Work is
//! queued on the device stream; both passes end with a blocking point, so
//! results are visible when they return.
//!
//! Execution faults are reported asynchronously. A failure surfaced by
//! either pass may come from an earlier launch on the same device.

use super::{check_same_device, validate, KernelBase, MatrixElementKernel, Shape};
use crate::{GridConfiguration, HelicityContext, KernelError};
use device_runtime::{Device, DeviceError, DevicePtr, LaunchConfig};
use event_buffers::{HelicityMaskBuffer, MatrixElementsBuffer, MomentaAccess, MomentaBuffer, TILING_WIDTH};
use process_core::{check_process, sigma_kin_event, sigma_kin_get_good_hel_event, Process};
use std::sync::Mutex;

/// Good helicities as seen by a launched job.
enum GoodList {
    /// The device-side cache written by the good-helicity pass.
    Device(DevicePtr<usize>),
    /// No device cache yet; passed with the launch.
    Args(Vec<usize>),
}

/// Matrix elements on an accelerator.
pub struct DeviceKernel<'a, P: Process + Clone, const W: usize = TILING_WIDTH> {
    base: KernelBase<'a>,
    process: P,
    device: Device,
    grid: GridConfiguration,
    debug_shared_memory: bool,
}

impl<'a, P: Process + Clone, const W: usize> DeviceKernel<'a, P, W> {
    /// Builds a kernel over device-resident buffers and a `blocks` × `threads` grid.
    ///
    /// Fails if either buffer is host-resident or on another device, if a
    /// grid dimension is zero, if blocks × threads disagrees with either
    /// buffer, or if `threads` is not a multiple of `W`.
    pub fn new(
        process: &P,
        momenta: &'a MomentaBuffer,
        matrix_elements: &'a mut MatrixElementsBuffer,
        blocks: usize,
        threads: usize,
    ) -> Result<Self, KernelError> {
        check_process(process)?;
        let base = validate::<W>(Shape::Device { blocks, threads }, momenta, matrix_elements, process.npar())?;
        let device = base
            .momenta
            .device()
            .cloned()
            .ok_or(KernelError::WrongResidency {
                buffer: "momenta",
                expected: event_buffers::Residency::Device,
                actual: event_buffers::Residency::Host,
            })?;
        check_same_device("matrix elements", base.matrix_elements.device(), device.id())?;

        let grid = GridConfiguration::new(blocks, threads)?;
        tracing::debug!("device kernel for '{}' on device {}: grid {grid}", process.name(), device.id());
        Ok(Self {
            base,
            process: process.clone(),
            device,
            grid,
            debug_shared_memory: false,
        })
    }

    /// Requests `max_threads_per_block * 4` bytes of shared memory on
    /// every matrix-element launch.
    pub fn with_debug_shared_memory(mut self, enabled: bool) -> Self {
        self.debug_shared_memory = enabled;
        self
    }

    /// Re-partitions the batch into a new grid of the same size.
    ///
    /// Fails if either dimension is zero or blocks × threads differs from
    /// the event count. The kernel keeps its old grid on failure.
    pub fn set_grid(&mut self, blocks: usize, threads: usize) -> Result<(), KernelError> {
        let grid = GridConfiguration::new(blocks, threads)?;
        if grid.nevt() != self.base.nevt {
            return Err(KernelError::GridMismatch {
                blocks,
                threads,
                nevt: self.base.nevt,
            });
        }
        tracing::debug!("regrid {} -> {grid}", self.grid);
        self.grid = grid;
        Ok(())
    }

    pub fn grid(&self) -> GridConfiguration {
        self.grid
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn base(&self) -> &KernelBase<'a> {
        &self.base
    }

    fn me_launch_config(&self) -> LaunchConfig {
        let config = self.grid.launch_config();
        if self.debug_shared_memory {
            let bytes = self.device.properties().max_threads_per_block * std::mem::size_of::<f32>();
            config.with_shared_memory(bytes)
        } else {
            config
        }
    }

    fn good_list(&self, ctx: &HelicityContext) -> Result<GoodList, KernelError> {
        match ctx.device_good_helicities() {
            Some(list) if list.device_id() == self.device.id() => Ok(GoodList::Device(list.as_ptr())),
            Some(list) => Err(KernelError::DeviceMismatch {
                what: "helicity cache",
                expected: self.device.id(),
                actual: list.device_id(),
            }),
            None => Ok(GoodList::Args(ctx.good_helicities().to_vec())),
        }
    }
}

fn fault(err: impl std::fmt::Display) -> DeviceError {
    DeviceError::KernelFault(err.to_string())
}

impl<P: Process + Clone, const W: usize> MatrixElementKernel for DeviceKernel<'_, P, W> {
    fn name(&self) -> &str {
        "device"
    }

    fn nevt(&self) -> usize {
        self.base.nevt
    }

    fn compute_good_helicities(&mut self, ctx: &mut HelicityContext) -> Result<(), KernelError> {
        let ncomb = self.process.ncomb();
        ctx.check_ncomb(ncomb)?;
        let mut host_mask = HelicityMaskBuffer::new_pinned(&self.device, ncomb);
        let dev_mask = HelicityMaskBuffer::new_device(&self.device, ncomb)?;

        let momenta = self.base.momenta.device_ptr()?;
        let mes = self.base.matrix_elements.device_ptr()?;
        let mask = dev_mask.device_ptr()?;
        let process = self.process.clone();
        let (nevt, npar) = (self.base.nevt, process.npar());

        self.device.launch("sigma_kin_get_good_hel", self.grid.launch_config(), move |cfg| {
            let momenta = momenta.read()?;
            let view = MomentaAccess::<W>::new(&momenta, nevt, npar).map_err(fault)?;
            let mut mes = mes.write()?;
            let merged = Mutex::new(vec![false; ncomb]);

            cfg.for_each_block(&mut mes[..], 1, |block, slots| {
                let mut local = vec![false; ncomb];
                for (thread, me) in slots.iter_mut().enumerate() {
                    *me = sigma_kin_get_good_hel_event(&process, &view, block * cfg.threads + thread, &mut local);
                }
                let mut merged = merged.lock().map_err(fault)?;
                for (m, l) in merged.iter_mut().zip(local) {
                    *m |= l;
                }
                Ok(())
            })?;

            let merged = merged.into_inner().map_err(fault)?;
            mask.write()?.copy_from_slice(&merged);
            Ok(())
        });
        self.device.peek_at_last_error()?;

        // Blocking copy; waits for the launch above.
        host_mask.copy_from_device(&dev_mask)?;
        ctx.publish_device(host_mask.host_slice()?, &self.device)
    }

    fn compute_matrix_elements(&mut self, ctx: &HelicityContext) -> Result<(), KernelError> {
        ctx.check_ncomb(self.process.ncomb())?;
        let good = self.good_list(ctx)?;

        let momenta = self.base.momenta.device_ptr()?;
        let mes = self.base.matrix_elements.device_ptr()?;
        let process = self.process.clone();
        let (nevt, npar) = (self.base.nevt, process.npar());

        self.device.launch("sigma_kin", self.me_launch_config(), move |cfg| {
            let momenta = momenta.read()?;
            let view = MomentaAccess::<W>::new(&momenta, nevt, npar).map_err(fault)?;
            let device_good;
            let good: &[usize] = match &good {
                GoodList::Device(ptr) => {
                    device_good = ptr.read()?;
                    &device_good
                }
                GoodList::Args(list) => list,
            };
            let mut mes = mes.write()?;

            cfg.for_each_block(&mut mes[..], 1, |block, slots| {
                for (thread, me) in slots.iter_mut().enumerate() {
                    *me = sigma_kin_event(&process, &view, block * cfg.threads + thread, good);
                }
                Ok(())
            })
        });
        self.device.peek_at_last_error()?;
        self.device.synchronize()?;
        Ok(())
    }
}

impl<P: Process + Clone, const W: usize> std::fmt::Debug for DeviceKernel<'_, P, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceKernel")
            .field("process", &self.process.name())
            .field("device", &self.device.id())
            .field("grid", &self.grid)
            .field("width", &W)
            .field("debug_shared_memory", &self.debug_shared_memory)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use process_core::EeToMuMu;

    fn buffers(device: &Device, nevt: usize) -> (MomentaBuffer, MatrixElementsBuffer) {
        (
            MomentaBuffer::new_device(device, nevt, 16).unwrap(),
            MatrixElementsBuffer::new_device(device, nevt, 1).unwrap(),
        )
    }

    #[test]
    fn test_construct_8192() {
        let device = Device::new();
        let (momenta, mut mes) = buffers(&device, 8192);
        let kernel = DeviceKernel::<_, 32>::new(&EeToMuMu::new(), &momenta, &mut mes, 32, 256).unwrap();
        assert_eq!(kernel.nevt(), 8192);
        assert_eq!(kernel.grid().threads(), 256);
    }

    #[test]
    fn test_threads_not_tile_multiple() {
        let device = Device::new();
        let (momenta, mut mes) = buffers(&device, 8 * 24);
        let result = DeviceKernel::<_, 16>::new(&EeToMuMu::new(), &momenta, &mut mes, 8, 24);
        assert!(matches!(
            result,
            Err(KernelError::NotTileMultiple { what: "gputhreads", value: 24, width: 16 })
        ));
    }

    #[test]
    fn test_zero_grid() {
        let device = Device::new();
        let (momenta, mut mes) = buffers(&device, 32);
        let result = DeviceKernel::<_, 16>::new(&EeToMuMu::new(), &momenta, &mut mes, 0, 32);
        assert!(matches!(result, Err(KernelError::ZeroGridDimension { dim: "gpublocks" })));
    }

    #[test]
    fn test_buffers_on_different_devices() {
        let a = Device::new();
        let b = Device::new();
        let momenta = MomentaBuffer::new_device(&a, 32, 16).unwrap();
        let mut mes = MatrixElementsBuffer::new_device(&b, 32, 1).unwrap();
        let result = DeviceKernel::<_, 16>::new(&EeToMuMu::new(), &momenta, &mut mes, 2, 16);
        assert!(matches!(result, Err(KernelError::DeviceMismatch { .. })));
    }

    #[test]
    fn test_set_grid() {
        let device = Device::new();
        let (momenta, mut mes) = buffers(&device, 256);
        let mut kernel = DeviceKernel::<_, 16>::new(&EeToMuMu::new(), &momenta, &mut mes, 4, 64).unwrap();

        kernel.set_grid(8, 32).unwrap();
        assert_eq!(kernel.grid(), GridConfiguration::new(8, 32).unwrap());

        assert!(matches!(kernel.set_grid(8, 64), Err(KernelError::GridMismatch { .. })));
        assert!(matches!(kernel.set_grid(0, 256), Err(KernelError::ZeroGridDimension { .. })));
        assert_eq!(kernel.grid().blocks(), 8);

        // Accepted even though 10 is not a tile multiple; only the total is fixed.
        let (momenta, mut mes) = buffers(&device, 160);
        let mut kernel = DeviceKernel::<_, 16>::new(&EeToMuMu::new(), &momenta, &mut mes, 10, 16).unwrap();
        kernel.set_grid(16, 10).unwrap();
    }

    #[test]
    fn test_debug_shared_memory_size() {
        let device = Device::new();
        let (momenta, mut mes) = buffers(&device, 32);
        let kernel = DeviceKernel::<_, 16>::new(&EeToMuMu::new(), &momenta, &mut mes, 2, 16)
            .unwrap()
            .with_debug_shared_memory(true);
        assert_eq!(kernel.me_launch_config().shared_mem_bytes, 1024 * 4);
    }
}
