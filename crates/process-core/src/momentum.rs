// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Minkowski four-vectors, metric (+, -, -, -).

use std::ops::{Add, AddAssign, Sub};

/// A four-momentum (E, px, py, pz) in GeV.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FourMomentum {
    pub e: f64,
    pub px: f64,
    pub py: f64,
    pub pz: f64,
}

impl FourMomentum {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(e: f64, px: f64, py: f64, pz: f64) -> Self {
        Self { e, px, py, pz }
    }

    /// Minkowski product.
    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.e * other.e - self.px * other.px - self.py * other.py - self.pz * other.pz
    }

    /// Invariant mass squared.
    #[inline]
    pub fn mass2(&self) -> f64 {
        self.dot(self)
    }

    /// Magnitude of the three-momentum.
    pub fn p3(&self) -> f64 {
        (self.px * self.px + self.py * self.py + self.pz * self.pz).sqrt()
    }

    /// Cosine of the angle between the three-momenta of `self` and `other`.
    pub fn cos_angle(&self, other: &Self) -> f64 {
        let dot3 = self.px * other.px + self.py * other.py + self.pz * other.pz;
        dot3 / (self.p3() * other.p3())
    }

    pub const fn to_array(self) -> [f64; 4] {
        [self.e, self.px, self.py, self.pz]
    }
}

impl From<[f64; 4]> for FourMomentum {
    fn from([e, px, py, pz]: [f64; 4]) -> Self {
        Self { e, px, py, pz }
    }
}

impl Add for FourMomentum {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.e + rhs.e, self.px + rhs.px, self.py + rhs.py, self.pz + rhs.pz)
    }
}

impl AddAssign for FourMomentum {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for FourMomentum {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.e - rhs.e, self.px - rhs.px, self.py - rhs.py, self.pz - rhs.pz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dot_and_mass() {
        let p = FourMomentum::new(5.0, 1.0, 2.0, 2.0);
        assert_relative_eq!(p.mass2(), 16.0);
        let q = FourMomentum::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(q.mass2(), 0.0);
        assert_relative_eq!(p.dot(&q), 3.0);
    }

    #[test]
    fn test_sum_of_back_to_back() {
        let a = FourMomentum::new(45.0, 0.0, 0.0, 45.0);
        let b = FourMomentum::new(45.0, 0.0, 0.0, -45.0);
        let s = (a + b).mass2();
        assert_relative_eq!(s, 90.0 * 90.0);
        assert_relative_eq!(s, 2.0 * a.dot(&b));
        assert_relative_eq!(a.cos_angle(&b), -1.0);
    }

    #[test]
    fn test_array_conversion() {
        let p = FourMomentum::from([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(p.to_array(), [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(p - p, FourMomentum::ZERO);
    }
}
