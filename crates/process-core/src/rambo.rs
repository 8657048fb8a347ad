// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAMBO phase-space generation for 2 → N massless final states.
//!
//! Follows Kleiss, Stirling and Ellis (Comput. Phys. Commun. 40 (1986) 359):
//! N isotropic massless momenta with energies drawn from `q0 e^{-q0}` are
//! boosted and rescaled conformally onto the centre-of-mass frame of the
//! beams. For massless particles the weight is the same for every event.
//!
//! Each final-state particle consumes four uniforms in (0, 1].

use crate::{FourMomentum, ProcessError, MAX_NPAR};
use event_buffers::{MomentaAccessMut, RandomAccess, NP4};
use std::f64::consts::PI;

const NPARI: usize = 2;

/// Massless RAMBO sampler at a fixed centre-of-mass energy.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Rambo {
    energy: f64,
    nparf: usize,
    weight: f64,
}

impl Rambo {
    /// Creates a sampler for `nparf` final-state particles at `energy` GeV.
    pub fn new(energy: f64, nparf: usize) -> Result<Self, ProcessError> {
        if !(energy.is_finite() && energy > 0.0) {
            return Err(ProcessError::InvalidEnergy { energy });
        }
        if nparf < 2 {
            return Err(ProcessError::UnsupportedFinalState { nparf });
        }
        if NPARI + nparf > MAX_NPAR {
            return Err(ProcessError::TooManyParticles {
                npar: NPARI + nparf,
                max: MAX_NPAR,
            });
        }
        let weight = log_weight(energy, nparf).exp();
        tracing::debug!("rambo: {nparf} massless particles at {energy} GeV, weight {weight:.6e}");
        Ok(Self { energy, nparf, weight })
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn nparf(&self) -> usize {
        self.nparf
    }

    /// Phase-space weight of every event.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// The two beams, along +z and -z, each carrying half the energy.
    pub fn initial_momenta(&self) -> [FourMomentum; NPARI] {
        let half = self.energy / 2.0;
        [
            FourMomentum::new(half, 0.0, 0.0, half),
            FourMomentum::new(half, 0.0, 0.0, -half),
        ]
    }

    /// Final-state momenta of one event from `4 * nparf` uniforms.
    ///
    /// `rnd[i]` holds the four numbers for particle `i`. Writes
    /// `out[..nparf]` and returns the event weight.
    pub fn final_momenta(&self, rnd: &[[f64; NP4]], out: &mut [FourMomentum]) -> f64 {
        let n = self.nparf;

        // Isotropic massless momenta in infinite phase space.
        let mut q = [FourMomentum::ZERO; MAX_NPAR];
        for (qi, r) in q.iter_mut().zip(rnd).take(n) {
            let c = 2.0 * r[0] - 1.0;
            let s = (1.0 - c * c).sqrt();
            let f = 2.0 * PI * r[1];
            let e = -(r[2] * r[3]).ln();
            *qi = FourMomentum::new(e, e * s * f.sin(), e * s * f.cos(), e * c);
        }

        // Parameters of the conformal transformation.
        let mut r = FourMomentum::ZERO;
        for qi in &q[..n] {
            r += *qi;
        }
        let rmas = r.mass2().sqrt();
        let b = [-r.px / rmas, -r.py / rmas, -r.pz / rmas];
        let g = r.e / rmas;
        let a = 1.0 / (1.0 + g);
        let x0 = self.energy / rmas;

        for (pi, qi) in out.iter_mut().zip(&q[..n]) {
            let bq = b[0] * qi.px + b[1] * qi.py + b[2] * qi.pz;
            *pi = FourMomentum::new(
                x0 * (g * qi.e + bq),
                x0 * (qi.px + b[0] * (qi.e + a * bq)),
                x0 * (qi.py + b[1] * (qi.e + a * bq)),
                x0 * (qi.pz + b[2] * (qi.e + a * bq)),
            );
        }
        self.weight
    }

    /// Writes the beams into every event of `momenta`.
    pub fn fill_initial<const W: usize>(&self, momenta: &mut MomentaAccessMut<'_, W>) {
        let beams = self.initial_momenta();
        for ievt in 0..momenta.nevt() {
            for (ipar, beam) in beams.iter().enumerate() {
                momenta.set_four_vector(ievt, ipar, beam.to_array());
            }
        }
    }

    /// Generates the final state of every event of `momenta`.
    ///
    /// `rnd` holds `nparf` four-vectors of uniforms per event. `weights`
    /// receives one weight per event.
    pub fn fill_final<const W: usize>(
        &self,
        rnd: &RandomAccess<'_, W>,
        momenta: &mut MomentaAccessMut<'_, W>,
        weights: &mut [f64],
    ) {
        debug_assert_eq!(rnd.nevt(), momenta.nevt());
        debug_assert_eq!(weights.len(), momenta.nevt());
        let n = self.nparf;
        let mut r = [[0.0; NP4]; MAX_NPAR];
        let mut p = [FourMomentum::ZERO; MAX_NPAR];
        for (ievt, wgt) in weights.iter_mut().enumerate() {
            for (iparf, ri) in r.iter_mut().enumerate().take(n) {
                *ri = rnd.four_vector(ievt, iparf);
            }
            *wgt = self.final_momenta(&r[..n], &mut p[..n]);
            for (iparf, pi) in p[..n].iter().enumerate() {
                momenta.set_four_vector(ievt, NPARI + iparf, pi.to_array());
            }
        }
    }
}

/// Log of the massless N-body phase-space volume at energy `energy`.
fn log_weight(energy: f64, nparf: usize) -> f64 {
    let po2log = (PI / 2.0).ln();
    let mut z = [0.0; MAX_NPAR];
    z[1] = po2log;
    for k in 2..nparf {
        z[k] = z[k - 1] + po2log - 2.0 * ((k - 1) as f64).ln();
    }
    for (k, zk) in z.iter_mut().enumerate().take(nparf).skip(2) {
        *zk -= (k as f64).ln();
    }
    (2.0 * nparf as f64 - 4.0) * energy.ln() + z[nparf - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uniforms(n: usize, seed: u64) -> Vec<[f64; NP4]> {
        // Small LCG; keeps values in (0, 1].
        let mut state = seed;
        (0..n)
            .map(|_| {
                let mut r = [0.0; NP4];
                for x in &mut r {
                    state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    *x = ((state >> 11) as f64 + 1.0) / (1u64 << 53) as f64;
                }
                r
            })
            .collect()
    }

    #[test]
    fn test_rejects_bad_setup() {
        assert!(matches!(Rambo::new(0.0, 2), Err(ProcessError::InvalidEnergy { .. })));
        assert!(matches!(Rambo::new(f64::NAN, 2), Err(ProcessError::InvalidEnergy { .. })));
        assert!(matches!(
            Rambo::new(100.0, 1),
            Err(ProcessError::UnsupportedFinalState { nparf: 1 })
        ));
        assert!(matches!(
            Rambo::new(100.0, MAX_NPAR),
            Err(ProcessError::TooManyParticles { .. })
        ));
    }

    #[test]
    fn test_two_body_weight() {
        // 2-body massless phase space volume is π/2, independent of energy.
        let rambo = Rambo::new(1500.0, 2).unwrap();
        assert_relative_eq!(rambo.weight(), PI / 2.0, max_relative = 1e-14);
    }

    #[test]
    fn test_three_body_weight() {
        // (π/2)² E² / 2
        let rambo = Rambo::new(10.0, 3).unwrap();
        assert_relative_eq!(rambo.weight(), (PI / 2.0).powi(2) * 100.0 / 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_conserves_momentum_and_mass() {
        for nparf in 2..=5 {
            let energy = 750.0;
            let rambo = Rambo::new(energy, nparf).unwrap();
            let rnd = uniforms(nparf, 42 + nparf as u64);
            let mut p = vec![FourMomentum::ZERO; nparf];
            rambo.final_momenta(&rnd, &mut p);

            let mut total = FourMomentum::ZERO;
            for pi in &p {
                assert!(pi.mass2().abs() <= 1e-9 * pi.e * pi.e);
                assert!(pi.e > 0.0);
                total += *pi;
            }
            assert_relative_eq!(total.e, energy, max_relative = 1e-9);
            assert!(total.px.abs() < 1e-9 * energy);
            assert!(total.py.abs() < 1e-9 * energy);
            assert!(total.pz.abs() < 1e-9 * energy);
        }
    }

    #[test]
    fn test_initial_beams() {
        let [a, b] = Rambo::new(91.2, 2).unwrap().initial_momenta();
        assert_relative_eq!((a + b).mass2(), 91.2 * 91.2, max_relative = 1e-14);
        assert_eq!(a.pz, -b.pz);
    }
}
