// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Running statistics over matrix elements and event weights.
//!
//! Abnormal matrix elements (NaN, zero or negative) are counted and kept
//! out of every sum, so one bad event does not poison the averages.

use serde::{Deserialize, Serialize};

/// Accumulated matrix-element statistics. Merge across iterations with
/// [`merge`](Self::merge).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventStatistics {
    /// Events seen, abnormal ones included.
    pub nevt: u64,
    /// Events whose ME was NaN or not positive.
    pub abnormal: u64,
    pub sum_me: f64,
    pub sum_me2: f64,
    /// Smallest normal ME; meaningless while no normal event was seen.
    pub min_me: f64,
    /// Largest normal ME; meaningless while no normal event was seen.
    pub max_me: f64,
    /// Σ weight × ME over normal events.
    pub sum_wgt_me: f64,
}

impl EventStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events with a usable ME.
    pub fn normal(&self) -> u64 {
        self.nevt - self.abnormal
    }

    /// Adds one batch. `weights` is paired with `mes` event by event.
    pub fn update(&mut self, mes: &[f64], weights: &[f64]) {
        debug_assert_eq!(mes.len(), weights.len());
        for (&me, &wgt) in mes.iter().zip(weights) {
            self.nevt += 1;
            if me.is_nan() || me <= 0.0 {
                self.abnormal += 1;
                continue;
            }
            if self.normal() == 1 {
                self.min_me = me;
                self.max_me = me;
            } else {
                self.min_me = self.min_me.min(me);
                self.max_me = self.max_me.max(me);
            }
            self.sum_me += me;
            self.sum_me2 += me * me;
            self.sum_wgt_me += wgt * me;
        }
    }

    /// Folds `other` into `self`.
    pub fn merge(&mut self, other: &EventStatistics) {
        if other.normal() > 0 {
            if self.normal() == 0 {
                self.min_me = other.min_me;
                self.max_me = other.max_me;
            } else {
                self.min_me = self.min_me.min(other.min_me);
                self.max_me = self.max_me.max(other.max_me);
            }
        }
        self.nevt += other.nevt;
        self.abnormal += other.abnormal;
        self.sum_me += other.sum_me;
        self.sum_me2 += other.sum_me2;
        self.sum_wgt_me += other.sum_wgt_me;
    }

    /// Mean ME over normal events, 0 if there are none.
    pub fn mean(&self) -> f64 {
        match self.normal() {
            0 => 0.0,
            n => self.sum_me / n as f64,
        }
    }

    /// Population standard deviation of the ME over normal events.
    pub fn stddev(&self) -> f64 {
        match self.normal() {
            0 => 0.0,
            n => {
                let mean = self.mean();
                (self.sum_me2 / n as f64 - mean * mean).max(0.0).sqrt()
            }
        }
    }

    /// Mean of weight × ME: the cross-section estimate, without flux or
    /// unit conversion.
    pub fn cross_section(&self) -> f64 {
        match self.normal() {
            0 => 0.0,
            n => self.sum_wgt_me / n as f64,
        }
    }

    /// A one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "{} events ({} abnormal), ME mean {:.6e} ± {:.6e} [min {:.6e}, max {:.6e}], σ·w {:.6e}",
            self.nevt,
            self.abnormal,
            self.mean(),
            self.stddev(),
            self.min_me,
            self.max_me,
            self.cross_section(),
        )
    }
}
