// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # process-core
//!
//! Numeric cores for physics processes and the phase-space sampler that
//! feeds them.
//!
//! # Key Components
//!
//! - [`Process`]: one event and one helicity combination in, a squared
//!   amplitude out. [`EeToMuMu`] is the bundled implementation.
//! - [`sigma`]: batch and per-event entry points the matrix-element kernels
//!   call, over momenta in the tiled layout.
//! - [`Rambo`]: massless 2 → N phase space.
//!
//! # Example
//! ```
//! use process_core::{EeToMuMu, Process, Rambo};
//!
//! let process = EeToMuMu::new();
//! let rambo = Rambo::new(91.2, process.nparf()).unwrap();
//! let [ep, em] = rambo.initial_momenta();
//! let mut fin = [Default::default(); 2];
//! rambo.final_momenta(&[[0.3, 0.6, 0.5, 0.5], [0.8, 0.1, 0.4, 0.9]], &mut fin);
//! let me = process.matrix_element(&[ep, em, fin[0], fin[1]], &[5, 6, 9, 10]);
//! assert!(me > 0.0);
//! ```

pub mod ee_mumu;
pub mod error;
pub mod momentum;
pub mod process;
pub mod rambo;
pub mod sigma;

pub use ee_mumu::EeToMuMu;
pub use error::ProcessError;
pub use momentum::FourMomentum;
pub use process::{check_process, good_helicity_list, Process, MAX_NPAR};
pub use rambo::Rambo;
pub use sigma::{sigma_kin, sigma_kin_event, sigma_kin_get_good_hel, sigma_kin_get_good_hel_event};
