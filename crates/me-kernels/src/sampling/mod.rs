// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Phase-space sampling kernels: the upstream stage that fills momenta and
//! weights for the matrix-element kernels.
//!
//! ```text
//! RandomNumberKernel ──► RandomNumbersBuffer
//!                               │
//!        RamboSamplingKernel{Host,Device}
//!            ├─ get_momenta_initial ──► MomentaBuffer (beams)
//!            └─ get_momenta_final   ──► MomentaBuffer (final state) + WeightsBuffer
//! ```

pub mod rambo;
pub mod random;

pub use rambo::{RamboSamplingKernelDevice, RamboSamplingKernelHost};
pub use random::RandomNumberKernel;

use crate::KernelError;

/// Fills a momenta buffer and its event weights.
pub trait SamplingKernel {
    /// Short name of the backend.
    fn name(&self) -> &str;

    /// Events per batch.
    fn nevt(&self) -> usize;

    /// Writes the initial-state momenta of every event.
    fn get_momenta_initial(&mut self) -> Result<(), KernelError>;

    /// Writes the final-state momenta and the weight of every event.
    fn get_momenta_final(&mut self) -> Result<(), KernelError>;
}
