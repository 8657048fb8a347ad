// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! e+ e- → μ+ μ- through s-channel photon exchange, massless.
//!
//! Particle order is (e+, e-, μ+, μ-). With s = (p0+p1)², t = (p1-p3)²
//! and u = (p1-p2)², the only nonzero helicity amplitudes have opposite
//! helicities within each fermion pair:
//!
//! ```text
//! |M|² = 4 e⁴ u² / s²   if h(e-) == h(μ-)
//! |M|² = 4 e⁴ t² / s²   otherwise
//! ```
//!
//! Averaged over the four initial spin states this is e⁴ (1 + cos²θ).

use crate::{FourMomentum, Process};
use event_buffers::Tile;
use std::f64::consts::PI;

/// Inverse fine-structure constant at the Z pole.
pub const ALPHA_INV: f64 = 132.50698;

const NPAR: usize = 4;
const NCOMB: usize = 16;

const fn helicity_table() -> [[i8; NPAR]; NCOMB] {
    let mut table = [[0i8; NPAR]; NCOMB];
    let mut ihel = 0;
    while ihel < NCOMB {
        let mut ipar = 0;
        while ipar < NPAR {
            table[ihel][ipar] = if (ihel >> (NPAR - 1 - ipar)) & 1 == 1 { 1 } else { -1 };
            ipar += 1;
        }
        ihel += 1;
    }
    table
}

/// Particle 0 varies slowest, particle 3 fastest.
const HELICITIES: [[i8; NPAR]; NCOMB] = helicity_table();

/// The QED process e+ e- → μ+ μ-.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EeToMuMu {
    e4: f64,
}

impl EeToMuMu {
    pub fn new() -> Self {
        Self::with_alpha(1.0 / ALPHA_INV)
    }

    /// Uses a different electromagnetic coupling.
    pub fn with_alpha(alpha: f64) -> Self {
        let e2 = 4.0 * PI * alpha;
        Self { e4: e2 * e2 }
    }

    /// e⁴, the coupling to the fourth power.
    pub fn e4(&self) -> f64 {
        self.e4
    }

    #[inline(always)]
    fn amplitude2(&self, s: f64, t: f64, u: f64, hel: &[i8; NPAR]) -> f64 {
        if hel[0] == hel[1] || hel[2] == hel[3] {
            return 0.0;
        }
        let x = if hel[1] == hel[3] { u } else { t };
        4.0 * self.e4 * x * x / (s * s)
    }
}

impl Default for EeToMuMu {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for EeToMuMu {
    fn name(&self) -> &'static str {
        "e+ e- > mu+ mu-"
    }

    fn npari(&self) -> usize {
        2
    }

    fn nparf(&self) -> usize {
        2
    }

    fn ncomb(&self) -> usize {
        NCOMB
    }

    fn helicities(&self, ihel: usize) -> &[i8] {
        &HELICITIES[ihel]
    }

    fn denominator(&self) -> f64 {
        4.0
    }

    fn helicity_matrix_element(&self, p: &[FourMomentum], ihel: usize) -> f64 {
        let s = 2.0 * p[0].dot(&p[1]);
        let t = -2.0 * p[1].dot(&p[3]);
        let u = -2.0 * p[1].dot(&p[2]);
        self.amplitude2(s, t, u, &HELICITIES[ihel])
    }

    fn tile_matrix_elements<const W: usize>(&self, tile: &Tile<'_, W>, good: &[usize], out: &mut [f64]) {
        let mut s = [0.0; W];
        let mut t = [0.0; W];
        let mut u = [0.0; W];
        {
            let dot = |a: usize, b: usize, lane: usize| {
                tile.lanes(a, 0)[lane] * tile.lanes(b, 0)[lane]
                    - tile.lanes(a, 1)[lane] * tile.lanes(b, 1)[lane]
                    - tile.lanes(a, 2)[lane] * tile.lanes(b, 2)[lane]
                    - tile.lanes(a, 3)[lane] * tile.lanes(b, 3)[lane]
            };
            for lane in 0..W {
                s[lane] = 2.0 * dot(0, 1, lane);
                t[lane] = -2.0 * dot(1, 3, lane);
                u[lane] = -2.0 * dot(1, 2, lane);
            }
        }

        let mut me = [0.0; W];
        for &ihel in good {
            let hel = &HELICITIES[ihel];
            for lane in 0..W {
                me[lane] += self.amplitude2(s[lane], t[lane], u[lane], hel);
            }
        }
        let denominator = self.denominator();
        for (slot, value) in out.iter_mut().zip(me) {
            *slot = value / denominator;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::good_helicity_list;
    use approx::assert_relative_eq;

    fn event(energy: f64, cos_theta: f64, phi: f64) -> [FourMomentum; 4] {
        let half = energy / 2.0;
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
        // μ- at angle θ to the e- beam, which runs along -z.
        let mu_minus = FourMomentum::new(
            half,
            half * sin_theta * phi.cos(),
            half * sin_theta * phi.sin(),
            -half * cos_theta,
        );
        let mu_plus = FourMomentum::new(half, -mu_minus.px, -mu_minus.py, -mu_minus.pz);
        [
            FourMomentum::new(half, 0.0, 0.0, half),
            FourMomentum::new(half, 0.0, 0.0, -half),
            mu_plus,
            mu_minus,
        ]
    }

    #[test]
    fn test_helicity_table_order() {
        assert_eq!(HELICITIES[0], [-1, -1, -1, -1]);
        assert_eq!(HELICITIES[1], [-1, -1, -1, 1]);
        assert_eq!(HELICITIES[8], [1, -1, -1, -1]);
        assert_eq!(HELICITIES[15], [1, 1, 1, 1]);
    }

    #[test]
    fn test_four_good_helicities() {
        let process = EeToMuMu::new();
        let p = event(100.0, 0.3, 1.1);
        let mut mask = vec![false; process.ncomb()];
        process.flag_good_helicities(&p, &mut mask);
        assert_eq!(good_helicity_list(&mask), vec![5, 6, 9, 10]);
    }

    #[test]
    fn test_spin_average_is_one_plus_cos2() {
        let process = EeToMuMu::new();
        for &c in &[-0.9, -0.2, 0.0, 0.5, 0.99] {
            let p = event(91.2, c, 0.4);
            assert_relative_eq!(p[1].cos_angle(&p[3]), c, epsilon = 1e-12);
            let all: Vec<usize> = (0..process.ncomb()).collect();
            let me = process.matrix_element(&p, &all);
            assert_relative_eq!(me, process.e4() * (1.0 + c * c), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_good_subset_gives_same_me() {
        let process = EeToMuMu::new();
        let p = event(500.0, 0.7, 2.0);
        let all: Vec<usize> = (0..16).collect();
        assert_eq!(
            process.matrix_element(&p, &all),
            process.matrix_element(&p, &[5, 6, 9, 10])
        );
    }

    #[test]
    fn test_energy_independent() {
        let process = EeToMuMu::new();
        let good = [5, 6, 9, 10];
        let low = process.matrix_element(&event(10.0, 0.4, 0.0), &good);
        let high = process.matrix_element(&event(1000.0, 0.4, 0.0), &good);
        assert_relative_eq!(low, high, max_relative = 1e-12);
    }
}
