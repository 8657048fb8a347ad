// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Batch entry points into a numeric core.
//!
//! The batch functions assume the caller has already checked that `mes`
//! holds one slot per event of `momenta`; they do not re-check. The
//! per-event functions are what one accelerator thread runs.

use crate::{FourMomentum, Process, MAX_NPAR};
use event_buffers::MomentaAccess;

#[inline]
fn gather<const W: usize>(momenta: &MomentaAccess<'_, W>, ievt: usize) -> [FourMomentum; MAX_NPAR] {
    let mut p = [FourMomentum::ZERO; MAX_NPAR];
    for (ipar, pi) in p.iter_mut().enumerate().take(momenta.npar()) {
        *pi = momenta.four_vector(ievt, ipar).into();
    }
    p
}

/// Evaluates all helicities of every event, flagging the nonzero ones in
/// `mask` and writing the full matrix element to `mes`.
pub fn sigma_kin_get_good_hel<P: Process, const W: usize>(
    process: &P,
    momenta: &MomentaAccess<'_, W>,
    mes: &mut [f64],
    mask: &mut [bool],
) {
    debug_assert_eq!(mes.len(), momenta.nevt());
    for (ievt, me) in mes.iter_mut().enumerate() {
        *me = sigma_kin_get_good_hel_event(process, momenta, ievt, mask);
    }
}

/// Matrix elements of every event, summed over `good` helicities only.
///
/// Walks the batch tile by tile. Allocates nothing.
pub fn sigma_kin<P: Process, const W: usize>(
    process: &P,
    momenta: &MomentaAccess<'_, W>,
    mes: &mut [f64],
    good: &[usize],
) {
    debug_assert_eq!(mes.len(), momenta.nevt());
    for (tile, out) in momenta.tiles().zip(mes.chunks_exact_mut(W)) {
        process.tile_matrix_elements(&tile, good, out);
    }
}

/// Good-helicity pass for event `ievt`.
#[inline]
pub fn sigma_kin_get_good_hel_event<P: Process, const W: usize>(
    process: &P,
    momenta: &MomentaAccess<'_, W>,
    ievt: usize,
    mask: &mut [bool],
) -> f64 {
    let p = gather(momenta, ievt);
    process.flag_good_helicities(&p[..momenta.npar()], mask)
}

/// Matrix element of event `ievt` over `good` helicities.
#[inline]
pub fn sigma_kin_event<P: Process, const W: usize>(
    process: &P,
    momenta: &MomentaAccess<'_, W>,
    ievt: usize,
    good: &[usize],
) -> f64 {
    let p = gather(momenta, ievt);
    process.matrix_element(&p[..momenta.npar()], good)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{good_helicity_list, EeToMuMu, Rambo};
    use event_buffers::{MomentaAccessMut, RandomAccess, NP4};

    const W: usize = 4;
    const NEVT: usize = 16;

    fn momenta() -> Vec<f64> {
        let process = EeToMuMu::new();
        let rambo = Rambo::new(200.0, process.nparf()).unwrap();
        let rnd: Vec<f64> = (0..NEVT * process.nparf() * NP4)
            .map(|i| ((i * 37 + 11) % 97) as f64 / 97.0 + 0.005)
            .collect();
        let rnd = RandomAccess::<W>::new(&rnd, NEVT, process.nparf()).unwrap();
        let mut data = vec![0.0; NEVT * process.npar() * NP4];
        let mut weights = vec![0.0; NEVT];
        let mut view = MomentaAccessMut::<W>::new(&mut data, NEVT, process.npar()).unwrap();
        rambo.fill_initial(&mut view);
        rambo.fill_final(&rnd, &mut view, &mut weights);
        data
    }

    #[test]
    fn test_tiled_and_per_event_agree() {
        let process = EeToMuMu::new();
        let data = momenta();
        let view = MomentaAccess::<W>::new(&data, NEVT, 4).unwrap();
        let good = [5, 6, 9, 10];

        let mut tiled = vec![0.0; NEVT];
        sigma_kin(&process, &view, &mut tiled, &good);
        for (ievt, &me) in tiled.iter().enumerate() {
            assert_eq!(me, sigma_kin_event(&process, &view, ievt, &good));
            assert!(me > 0.0);
        }
    }

    #[test]
    fn test_good_hel_pass_matches_reduced_pass() {
        let process = EeToMuMu::new();
        let data = momenta();
        let view = MomentaAccess::<W>::new(&data, NEVT, 4).unwrap();

        let mut mask = vec![false; process.ncomb()];
        let mut full = vec![0.0; NEVT];
        sigma_kin_get_good_hel(&process, &view, &mut full, &mut mask);
        let good = good_helicity_list(&mask);
        assert_eq!(good, vec![5, 6, 9, 10]);

        let mut reduced = vec![0.0; NEVT];
        sigma_kin(&process, &view, &mut reduced, &good);
        assert_eq!(full, reduced);
    }
}
