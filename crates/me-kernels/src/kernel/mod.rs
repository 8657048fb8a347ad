// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`MatrixElementKernel`] trait and its host and device implementations.
//!
//! ```text
//!             ┌────────────────────────────┐
//!             │    MatrixElementKernel     │
//!             │  compute_good_helicities   │
//!             │  compute_matrix_elements   │
//!             └─────────────┬──────────────┘
//!                ┌──────────┴──────────┐
//!          HostKernel             DeviceKernel
//!       (tiles, one thread)   (grid, async stream)
//! ```
//!
//! Both kernels hold a [`KernelBase`] and validate it through the same
//! routine, `validate`. Once constructed, the numeric core can assume
//! the batch size and memory layout are right; it checks nothing itself.

pub mod device;
pub mod host;

use crate::{HelicityContext, KernelError};
use event_buffers::{MatrixElementsBuffer, MomentaBuffer, Residency, NP4};

/// Evaluates matrix elements over a fixed batch of events.
///
/// Calls follow one order: an optional good-helicity pass, then any
/// number of matrix-element passes. Without the good-helicity pass every
/// combination is evaluated, which gives the same numbers more slowly.
pub trait MatrixElementKernel {
    /// Short name of the backend.
    fn name(&self) -> &str;

    /// Events per batch.
    fn nevt(&self) -> usize;

    /// Finds the helicity combinations that contribute and publishes them
    /// into `ctx`. Also writes full matrix elements as a by-product.
    fn compute_good_helicities(&mut self, ctx: &mut HelicityContext) -> Result<(), KernelError>;

    /// Writes one matrix element per event, summing over the good
    /// helicities in `ctx`.
    fn compute_matrix_elements(&mut self, ctx: &HelicityContext) -> Result<(), KernelError>;
}

/// Buffers and batch size shared by both kernels.
///
/// Only built through `validate`.
#[derive(Debug)]
pub struct KernelBase<'a> {
    momenta: &'a MomentaBuffer,
    matrix_elements: &'a mut MatrixElementsBuffer,
    nevt: usize,
}

impl<'a> KernelBase<'a> {
    pub fn nevt(&self) -> usize {
        self.nevt
    }

    pub fn momenta(&self) -> &MomentaBuffer {
        self.momenta
    }

    pub fn matrix_elements(&self) -> &MatrixElementsBuffer {
        &*self.matrix_elements
    }
}

/// Batch shape requested at construction.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Shape {
    Host { nevt: usize },
    Device { blocks: usize, threads: usize },
}

/// Checks buffers against the requested shape and tiling width `W`.
///
/// Order: residency of momenta, then matrix elements; grid dimensions;
/// event counts; per-event layout; tile alignment.
pub(crate) fn validate<'a, const W: usize>(
    shape: Shape,
    momenta: &'a MomentaBuffer,
    matrix_elements: &'a mut MatrixElementsBuffer,
    npar: usize,
) -> Result<KernelBase<'a>, KernelError> {
    let expected = match shape {
        Shape::Host { .. } => Residency::Host,
        Shape::Device { .. } => Residency::Device,
    };
    check_residency("momenta", momenta.residency(), expected)?;
    check_residency("matrix elements", matrix_elements.residency(), expected)?;

    let nevt = match shape {
        Shape::Host { nevt } => nevt,
        Shape::Device { blocks, threads } => crate::GridConfiguration::new(blocks, threads)?.nevt(),
    };
    check_nevt("momenta", momenta.nevt(), nevt)?;
    check_nevt("matrix elements", matrix_elements.nevt(), nevt)?;
    check_layout("momenta", momenta.per_event(), npar * NP4)?;
    check_layout("matrix elements", matrix_elements.per_event(), 1)?;

    match shape {
        Shape::Host { nevt } => check_tiling::<W>("nevt", nevt)?,
        Shape::Device { threads, .. } => check_tiling::<W>("gputhreads", threads)?,
    }

    Ok(KernelBase {
        momenta,
        matrix_elements,
        nevt,
    })
}

pub(crate) fn check_residency(buffer: &'static str, actual: Residency, expected: Residency) -> Result<(), KernelError> {
    if actual != expected {
        return Err(KernelError::WrongResidency {
            buffer,
            expected,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn check_nevt(buffer: &'static str, actual: usize, expected: usize) -> Result<(), KernelError> {
    if actual != expected {
        return Err(KernelError::EventCountMismatch {
            buffer,
            expected,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn check_layout(buffer: &'static str, actual: usize, expected: usize) -> Result<(), KernelError> {
    if actual != expected {
        return Err(KernelError::Layout {
            buffer,
            expected,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn check_tiling<const W: usize>(what: &'static str, value: usize) -> Result<(), KernelError> {
    if value % W != 0 {
        return Err(KernelError::NotTileMultiple {
            what,
            value,
            width: W,
        });
    }
    Ok(())
}

/// Checks that every device buffer lives on `device_id`.
pub(crate) fn check_same_device(
    what: &'static str,
    device: Option<&device_runtime::Device>,
    device_id: usize,
) -> Result<(), KernelError> {
    match device {
        Some(d) if d.id() == device_id => Ok(()),
        Some(d) => Err(KernelError::DeviceMismatch {
            what,
            expected: device_id,
            actual: d.id(),
        }),
        None => Err(KernelError::WrongResidency {
            buffer: what,
            expected: Residency::Device,
            actual: Residency::Host,
        }),
    }
}
