// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The tiled event layout.
//!
//! Per-event records of `npar` four-vectors are stored as an array of
//! structures of arrays, `AOSOA[npag][npar][4][W]`:
//!
//! ```text
//!  page 0                                  page 1
//! ┌──────────────────────────────────────┐┌────────────
//! │ p0.E  [e0 e1 … eW-1]                 ││ p0.E  [eW …
//! │ p0.px [e0 e1 … eW-1]                 ││ …
//! │ …                                    ││
//! │ pN.pz [e0 e1 … eW-1]                 ││
//! └──────────────────────────────────────┘└────────────
//! ```
//!
//! A component of one particle over a whole tile is `W` contiguous values,
//! which is what a vector unit loads in one go. `W` is a const generic, so
//! every index computation folds to shifts and masks; a width that is not a
//! power of two fails to compile.

use crate::BufferError;

/// Components per four-vector.
pub const NP4: usize = 4;

/// Default events per tile.
pub const TILING_WIDTH: usize = 16;

struct PowerOfTwo<const W: usize>;

impl<const W: usize> PowerOfTwo<W> {
    const OK: () = assert!(W.is_power_of_two(), "tiling width must be a power of two");
}

/// Index arithmetic for the tiled layout with width `W`.
#[derive(Debug, Clone, Copy)]
pub struct TiledLayout<const W: usize>;

impl<const W: usize> TiledLayout<W> {
    /// Events per tile.
    pub const WIDTH: usize = {
        let () = PowerOfTwo::<W>::OK;
        W
    };

    /// Flat index of component `ip4` of record `ipar` of event `ievt`.
    #[inline(always)]
    pub const fn index(npar: usize, ievt: usize, ipar: usize, ip4: usize) -> usize {
        let ipag = ievt / Self::WIDTH;
        let iepp = ievt % Self::WIDTH;
        ipag * npar * NP4 * W + ipar * NP4 * W + ip4 * W + iepp
    }

    /// Elements in one tile.
    pub const fn page_len(npar: usize) -> usize {
        npar * NP4 * Self::WIDTH
    }

    /// Number of tiles covering `nevt` events.
    pub const fn npag(nevt: usize) -> usize {
        nevt / Self::WIDTH
    }

    /// Checks that `data` is exactly `nevt` tiled records of `npar` four-vectors.
    pub fn check(data_len: usize, nevt: usize, npar: usize) -> Result<(), BufferError> {
        if nevt % Self::WIDTH != 0 {
            return Err(BufferError::NotTiled {
                nevt,
                width: Self::WIDTH,
            });
        }
        let expected = nevt * npar * NP4;
        if data_len != expected {
            return Err(BufferError::SizeMismatch {
                kind: "tiled",
                expected,
                actual: data_len,
            });
        }
        Ok(())
    }
}

/// Read-only typed access to a tiled buffer.
///
/// Validated once at construction; accessors do not re-check.
#[derive(Debug, Clone, Copy)]
pub struct TiledView<'a, const W: usize> {
    data: &'a [f64],
    nevt: usize,
    npar: usize,
}

/// Momenta of all particles.
pub type MomentaAccess<'a, const W: usize> = TiledView<'a, W>;
/// Random numbers feeding the sampler, four per final-state particle.
pub type RandomAccess<'a, const W: usize> = TiledView<'a, W>;

impl<'a, const W: usize> TiledView<'a, W> {
    pub fn new(data: &'a [f64], nevt: usize, npar: usize) -> Result<Self, BufferError> {
        TiledLayout::<W>::check(data.len(), nevt, npar)?;
        Ok(Self { data, nevt, npar })
    }

    pub fn nevt(&self) -> usize {
        self.nevt
    }

    /// Four-vectors per event.
    pub fn npar(&self) -> usize {
        self.npar
    }

    pub fn npag(&self) -> usize {
        TiledLayout::<W>::npag(self.nevt)
    }

    #[inline]
    pub fn get(&self, ievt: usize, ipar: usize, ip4: usize) -> f64 {
        self.data[TiledLayout::<W>::index(self.npar, ievt, ipar, ip4)]
    }

    /// The four-vector `ipar` of event `ievt` as (E, px, py, pz).
    #[inline]
    pub fn four_vector(&self, ievt: usize, ipar: usize) -> [f64; NP4] {
        let base = TiledLayout::<W>::index(self.npar, ievt, ipar, 0);
        [
            self.data[base],
            self.data[base + W],
            self.data[base + 2 * W],
            self.data[base + 3 * W],
        ]
    }

    /// Tile `ipag`.
    #[inline]
    pub fn tile(&self, ipag: usize) -> Tile<'a, W> {
        let len = TiledLayout::<W>::page_len(self.npar);
        Tile {
            data: &self.data[ipag * len..(ipag + 1) * len],
            npar: self.npar,
        }
    }

    /// Iterates over all tiles in order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile<'a, W>> + '_ {
        (0..self.npag()).map(move |ipag| self.tile(ipag))
    }

    pub fn as_slice(&self) -> &'a [f64] {
        self.data
    }
}

/// Mutable typed access to a tiled buffer.
#[derive(Debug)]
pub struct TiledViewMut<'a, const W: usize> {
    data: &'a mut [f64],
    nevt: usize,
    npar: usize,
}

/// Writable momenta, for samplers.
pub type MomentaAccessMut<'a, const W: usize> = TiledViewMut<'a, W>;

impl<'a, const W: usize> TiledViewMut<'a, W> {
    pub fn new(data: &'a mut [f64], nevt: usize, npar: usize) -> Result<Self, BufferError> {
        TiledLayout::<W>::check(data.len(), nevt, npar)?;
        Ok(Self { data, nevt, npar })
    }

    pub fn nevt(&self) -> usize {
        self.nevt
    }

    pub fn npar(&self) -> usize {
        self.npar
    }

    #[inline]
    pub fn set(&mut self, ievt: usize, ipar: usize, ip4: usize, value: f64) {
        self.data[TiledLayout::<W>::index(self.npar, ievt, ipar, ip4)] = value;
    }

    #[inline]
    pub fn set_four_vector(&mut self, ievt: usize, ipar: usize, p: [f64; NP4]) {
        let base = TiledLayout::<W>::index(self.npar, ievt, ipar, 0);
        for (ip4, value) in p.into_iter().enumerate() {
            self.data[base + ip4 * W] = value;
        }
    }

    pub fn as_view(&self) -> TiledView<'_, W> {
        TiledView {
            data: &*self.data,
            nevt: self.nevt,
            npar: self.npar,
        }
    }
}

/// One tile of `W` events.
#[derive(Debug, Clone, Copy)]
pub struct Tile<'a, const W: usize> {
    data: &'a [f64],
    npar: usize,
}

impl<'a, const W: usize> Tile<'a, W> {
    /// Wraps one tile's worth of data.
    pub fn new(data: &'a [f64], npar: usize) -> Result<Self, BufferError> {
        TiledLayout::<W>::check(data.len(), W, npar)?;
        Ok(Self { data, npar })
    }

    /// Component `ip4` of record `ipar` for all `W` lanes.
    #[inline(always)]
    pub fn lanes(&self, ipar: usize, ip4: usize) -> &'a [f64] {
        let start = ipar * NP4 * W + ip4 * W;
        &self.data[start..start + W]
    }

    /// The four-vector `ipar` of lane `lane`.
    #[inline]
    pub fn four_vector(&self, lane: usize, ipar: usize) -> [f64; NP4] {
        let base = ipar * NP4 * W + lane;
        [
            self.data[base],
            self.data[base + W],
            self.data[base + 2 * W],
            self.data[base + 3 * W],
        ]
    }

    pub fn npar(&self) -> usize {
        self.npar
    }
}
