// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CPU matrix-element kernel.
//!
//! Runs on the calling thread. The batch is walked one tile of `W` events
//! at a time; inside a tile the numeric core works on `W` contiguous lanes,
//! which the compiler turns into vector code for the SIMD tier the crate
//! was built for.

use super::{validate, KernelBase, MatrixElementKernel, Shape};
use crate::{HelicityContext, KernelError};
use event_buffers::{HelicityMaskBuffer, MatrixElementsBuffer, MomentaAccess, MomentaBuffer, TILING_WIDTH};
use host_probe::SimdSupport;
use process_core::{check_process, sigma_kin, sigma_kin_get_good_hel, Process};

/// Matrix elements on the host.
pub struct HostKernel<'a, P: Process, const W: usize = TILING_WIDTH> {
    base: KernelBase<'a>,
    process: &'a P,
    simd: SimdSupport,
}

impl<'a, P: Process, const W: usize> HostKernel<'a, P, W> {
    /// Builds a kernel over host-resident buffers of `nevt` events.
    ///
    /// Fails if either buffer is device-resident, if `nevt` disagrees with
    /// either buffer or is not a multiple of `W`, or if this CPU cannot run
    /// the build's SIMD tier.
    pub fn new(
        process: &'a P,
        momenta: &'a MomentaBuffer,
        matrix_elements: &'a mut MatrixElementsBuffer,
        nevt: usize,
    ) -> Result<Self, KernelError> {
        Self::new_with_support(process, momenta, matrix_elements, nevt, SimdSupport::probe())
    }

    /// Like [`new`](Self::new), with the capability probe result supplied.
    pub(crate) fn new_with_support(
        process: &'a P,
        momenta: &'a MomentaBuffer,
        matrix_elements: &'a mut MatrixElementsBuffer,
        nevt: usize,
        simd: SimdSupport,
    ) -> Result<Self, KernelError> {
        check_process(process)?;
        let base = validate::<W>(Shape::Host { nevt }, momenta, matrix_elements, process.npar())?;
        if !simd.supported {
            simd.report();
            return Err(KernelError::UnsupportedSimd { tag: simd.tier.tag() });
        }
        tracing::debug!("host kernel for '{}': nevt = {nevt}, tile width {W}, simd {}", process.name(), simd.tier);
        Ok(Self { base, process, simd })
    }

    /// The SIMD probe result the kernel was built with.
    pub fn simd(&self) -> SimdSupport {
        self.simd
    }

    pub fn base(&self) -> &KernelBase<'a> {
        &self.base
    }
}

impl<P: Process, const W: usize> MatrixElementKernel for HostKernel<'_, P, W> {
    fn name(&self) -> &str {
        "host"
    }

    fn nevt(&self) -> usize {
        self.base.nevt
    }

    fn compute_good_helicities(&mut self, ctx: &mut HelicityContext) -> Result<(), KernelError> {
        ctx.check_ncomb(self.process.ncomb())?;
        let mut mask = HelicityMaskBuffer::new_host(self.process.ncomb());

        let momenta = MomentaAccess::<W>::new(self.base.momenta.host_slice()?, self.base.nevt, self.process.npar())?;
        let mes = self.base.matrix_elements.host_slice_mut()?;
        sigma_kin_get_good_hel(self.process, &momenta, mes, mask.host_slice_mut()?);

        ctx.publish(mask.host_slice()?)
    }

    fn compute_matrix_elements(&mut self, ctx: &HelicityContext) -> Result<(), KernelError> {
        ctx.check_ncomb(self.process.ncomb())?;
        let momenta = MomentaAccess::<W>::new(self.base.momenta.host_slice()?, self.base.nevt, self.process.npar())?;
        let mes = self.base.matrix_elements.host_slice_mut()?;
        sigma_kin(self.process, &momenta, mes, ctx.good_helicities());
        Ok(())
    }
}

impl<P: Process, const W: usize> std::fmt::Debug for HostKernel<'_, P, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostKernel")
            .field("process", &self.process.name())
            .field("nevt", &self.base.nevt)
            .field("width", &W)
            .field("simd", &self.simd)
            .finish()
    }
}
