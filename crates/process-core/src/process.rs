// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The physics-process interface.
//!
//! A [`Process`] is the numeric core: a pure function from the momenta of
//! one event and one helicity combination to a squared amplitude. Kernels
//! never look inside; they only guarantee that the momenta they hand over
//! have the right length and layout.

use crate::{FourMomentum, ProcessError};
use event_buffers::Tile;

/// Most particles a process may have. Sizes the per-event scratch arrays.
pub const MAX_NPAR: usize = 8;

/// A 2 → N scattering process.
///
/// Implementations must be deterministic: equal momenta give bitwise-equal
/// matrix elements.
pub trait Process: Send + Sync + 'static {
    /// Human-readable process string, e.g. `"e+ e- > mu+ mu-"`.
    fn name(&self) -> &'static str;

    /// Initial-state particles.
    fn npari(&self) -> usize;

    /// Final-state particles.
    fn nparf(&self) -> usize;

    fn npar(&self) -> usize {
        self.npari() + self.nparf()
    }

    /// Number of helicity combinations.
    fn ncomb(&self) -> usize;

    /// Helicity of every particle in combination `ihel`.
    fn helicities(&self, ihel: usize) -> &[i8];

    /// Spin and colour averaging factor applied to the helicity sum.
    fn denominator(&self) -> f64;

    /// Squared amplitude for one helicity combination, before averaging.
    fn helicity_matrix_element(&self, momenta: &[FourMomentum], ihel: usize) -> f64;

    /// Matrix element summed over `good` helicities and averaged.
    fn matrix_element(&self, momenta: &[FourMomentum], good: &[usize]) -> f64 {
        let mut me = 0.0;
        for &ihel in good {
            me += self.helicity_matrix_element(momenta, ihel);
        }
        me / self.denominator()
    }

    /// Evaluates every helicity combination, flagging the nonzero ones in
    /// `mask`. Returns the averaged matrix element over all combinations.
    fn flag_good_helicities(&self, momenta: &[FourMomentum], mask: &mut [bool]) -> f64 {
        let mut me = 0.0;
        for (ihel, good) in mask.iter_mut().enumerate().take(self.ncomb()) {
            let me_hel = self.helicity_matrix_element(momenta, ihel);
            if me_hel != 0.0 {
                *good = true;
            }
            me += me_hel;
        }
        me / self.denominator()
    }

    /// Matrix elements of all `W` events of a tile.
    ///
    /// The default gathers each lane and calls [`matrix_element`](Self::matrix_element).
    /// Processes override it with lane loops the compiler can vectorize.
    fn tile_matrix_elements<const W: usize>(&self, tile: &Tile<'_, W>, good: &[usize], out: &mut [f64])
    where
        Self: Sized,
    {
        let npar = tile.npar();
        let mut p = [FourMomentum::ZERO; MAX_NPAR];
        for (lane, slot) in out.iter_mut().enumerate().take(W) {
            for (ipar, pi) in p.iter_mut().enumerate().take(npar) {
                *pi = tile.four_vector(lane, ipar).into();
            }
            *slot = self.matrix_element(&p[..npar], good);
        }
    }
}

/// Checks that a process fits the fixed-size per-event scratch space.
pub fn check_process<P: Process + ?Sized>(process: &P) -> Result<(), ProcessError> {
    if process.npar() > MAX_NPAR {
        return Err(ProcessError::TooManyParticles {
            npar: process.npar(),
            max: MAX_NPAR,
        });
    }
    Ok(())
}

/// Indices of the `true` entries of a good-helicity mask.
pub fn good_helicity_list(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(ihel, &good)| good.then_some(ihel))
        .collect()
}
