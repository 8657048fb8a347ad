// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # host-probe
//!
//! Which vector instruction set was this build compiled for, and can the
//! running CPU execute it?
//!
//! The host matrix-element kernel calls [`host_supports_simd`] before doing
//! any work. The CPU description in [`CpuInfo`] is informational and feeds
//! the `me-check simd` report.
//!
//! ```
//! use host_probe::{host_supports_simd, SimdTier};
//!
//! let tier = SimdTier::built();
//! println!("built for {tier}: {} doubles per vector", tier.f64_lanes());
//! assert!(host_supports_simd(false));
//! ```

pub mod cpu;
pub mod error;
pub mod tier;

pub use cpu::{parse_cpuinfo, CpuInfo};
pub use error::ProbeError;
pub use tier::{host_supports_simd, SimdSupport, SimdTier};
