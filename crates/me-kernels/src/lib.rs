// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # me-kernels
//!
//! Batched matrix-element evaluation on the host (SIMD, one thread) or on
//! an accelerator (grid of threads), behind one interface.
//!
//! # Key Components
//!
//! - [`MatrixElementKernel`]: the two-pass protocol, a good-helicity
//!   warm-up and then repeated matrix-element passes.
//! - [`HostKernel`] and [`DeviceKernel`]: the two backends. Construction
//!   validates residency, batch size and tiling once.
//! - [`HelicityContext`]: the good-helicity cache, owned by the caller.
//! - [`RandomNumberKernel`], [`RamboSamplingKernelHost`],
//!   [`RamboSamplingKernelDevice`]: the sampling stage upstream.
//! - [`EventStatistics`]: matrix-element and cross-section accumulators.
//!
//! # Example
//! ```
//! use event_buffers::{MatrixElementsBuffer, MomentaBuffer, RandomNumbersBuffer, WeightsBuffer, NP4};
//! use me_kernels::{
//!     HelicityContext, HostKernel, MatrixElementKernel, RamboSamplingKernelHost, RandomNumberKernel,
//!     SamplingKernel,
//! };
//! use process_core::{EeToMuMu, Process};
//!
//! let process = EeToMuMu::new();
//! let nevt = 64;
//! let mut rnd = RandomNumbersBuffer::new_host(nevt, process.nparf() * NP4);
//! let mut momenta = MomentaBuffer::new_host(nevt, process.npar() * NP4);
//! let mut weights = WeightsBuffer::new_host(nevt, 1);
//! let mut mes = MatrixElementsBuffer::new_host(nevt, 1);
//!
//! RandomNumberKernel::<16>::new(&mut rnd, 20)?.generate_rnarray()?;
//! let mut rambo = RamboSamplingKernelHost::<16>::new(91.2, &rnd, &mut momenta, &mut weights, nevt)?;
//! rambo.get_momenta_initial()?;
//! rambo.get_momenta_final()?;
//!
//! let mut ctx = HelicityContext::new(&process);
//! let mut kernel = HostKernel::<_, 16>::new(&process, &momenta, &mut mes, nevt)?;
//! kernel.compute_good_helicities(&mut ctx)?;
//! kernel.compute_matrix_elements(&ctx)?;
//! assert_eq!(ctx.good_helicities(), &[5, 6, 9, 10]);
//! # Ok::<(), me_kernels::KernelError>(())
//! ```

pub mod error;
pub mod grid;
pub mod helicity;
pub mod kernel;
pub mod sampling;
pub mod statistics;

pub use error::KernelError;
pub use grid::GridConfiguration;
pub use helicity::HelicityContext;
pub use kernel::device::DeviceKernel;
pub use kernel::host::HostKernel;
pub use kernel::{KernelBase, MatrixElementKernel};
pub use sampling::{RamboSamplingKernelDevice, RamboSamplingKernelHost, RandomNumberKernel, SamplingKernel};
pub use statistics::EventStatistics;
