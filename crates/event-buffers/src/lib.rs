// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # event-buffers
//!
//! Caller-owned event buffers and the tiled layout they are stored in.
//!
//! # Key Components
//!
//! - [`EventBuffer`]: `nevt` events of a given [`BufferKind`], resident on
//!   the host (plain or pinned) or on a device. Aliases:
//!   [`MomentaBuffer`], [`MatrixElementsBuffer`], [`WeightsBuffer`],
//!   [`RandomNumbersBuffer`].
//! - [`HelicityMaskBuffer`]: one flag per helicity combination.
//! - [`TiledLayout`], [`TiledView`], [`TiledViewMut`], [`Tile`]: typed
//!   access to the `AOSOA[npag][npar][4][W]` layout. The width `W` is a
//!   compile-time power of two.
//!
//! # Example
//! ```
//! use event_buffers::{MomentaBuffer, MomentaAccess, NP4};
//!
//! let npar = 4;
//! let buf = MomentaBuffer::new_host(32, npar * NP4);
//! let view = MomentaAccess::<16>::new(buf.host_slice().unwrap(), 32, npar).unwrap();
//! assert_eq!(view.npag(), 2);
//! ```

mod buffer;
mod error;
mod layout;

pub use buffer::{
    BufferKind, EventBuffer, HelicityMaskBuffer, MatrixElements, MatrixElementsBuffer, Momenta,
    MomentaBuffer, RandomNumbers, RandomNumbersBuffer, Residency, Weights, WeightsBuffer,
};
pub use error::BufferError;
pub use layout::{
    MomentaAccess, MomentaAccessMut, RandomAccess, Tile, TiledLayout, TiledView, TiledViewMut, NP4,
    TILING_WIDTH,
};
