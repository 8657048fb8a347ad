// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Check-loop profiling metrics.
//!
//! [`CheckMetrics`] collects per-iteration and aggregate timings. The
//! headline number is matrix-element throughput, which is what grid shapes
//! and backends are compared on.

use std::time::Duration;

/// Timings for one batch.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IterationMetrics {
    pub iteration: usize,
    /// Random-number generation (and upload, on the device).
    pub rng_duration: Duration,
    /// RAMBO initial and final momenta.
    pub sampling_duration: Duration,
    /// The matrix-element pass.
    pub me_duration: Duration,
    /// Device-to-host copies; zero on the host backend.
    pub copy_duration: Duration,
}

/// Aggregate metrics for a complete check run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckMetrics {
    pub backend: String,
    /// Launch grid, `"b x t"`.
    pub grid: String,
    /// Events per batch.
    pub nevt: usize,
    /// Batches completed.
    pub iterations_run: usize,
    pub total_duration: Duration,
    pub total_rng_duration: Duration,
    pub total_sampling_duration: Duration,
    pub total_me_duration: Duration,
    pub total_copy_duration: Duration,
    /// Per-iteration timings; empty when profiling is off.
    pub iteration_metrics: Vec<IterationMetrics>,
    #[serde(skip)]
    profiling: bool,
}

impl CheckMetrics {
    /// Creates an empty metrics container.
    pub fn new(backend: String, grid: String, nevt: usize, profiling: bool) -> Self {
        Self {
            backend,
            grid,
            nevt,
            iterations_run: 0,
            total_duration: Duration::ZERO,
            total_rng_duration: Duration::ZERO,
            total_sampling_duration: Duration::ZERO,
            total_me_duration: Duration::ZERO,
            total_copy_duration: Duration::ZERO,
            iteration_metrics: Vec::new(),
            profiling,
        }
    }

    /// Records one batch.
    pub fn record_iteration(&mut self, iteration: IterationMetrics) {
        self.iterations_run += 1;
        self.total_rng_duration += iteration.rng_duration;
        self.total_sampling_duration += iteration.sampling_duration;
        self.total_me_duration += iteration.me_duration;
        self.total_copy_duration += iteration.copy_duration;
        if self.profiling {
            self.iteration_metrics.push(iteration);
        }
    }

    /// Finalises metrics with the total wall-clock time.
    pub fn finalise(&mut self, total: Duration) {
        self.total_duration = total;
    }

    /// Matrix elements computed.
    pub fn total_events(&self) -> usize {
        self.nevt * self.iterations_run
    }

    /// Matrix elements per second of ME-pass time.
    pub fn me_throughput(&self) -> f64 {
        let secs = self.total_me_duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.total_events() as f64 / secs
    }

    /// Events per second of wall-clock time, sampling and copies included.
    pub fn event_throughput(&self) -> f64 {
        let secs = self.total_duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.total_events() as f64 / secs
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        format!(
            "Check: {} backend, grid {}, {} iterations x {} events, {:.2}ms total \
             (rng {:.2}ms, sampling {:.2}ms, ME {:.2}ms, copy {:.2}ms), \
             {:.3e} MEs/s",
            self.backend,
            self.grid,
            self.iterations_run,
            self.nevt,
            ms(self.total_duration),
            ms(self.total_rng_duration),
            ms(self.total_sampling_duration),
            ms(self.total_me_duration),
            ms(self.total_copy_duration),
            self.me_throughput(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iteration(i: usize, me_ms: u64) -> IterationMetrics {
        IterationMetrics {
            iteration: i,
            rng_duration: Duration::from_millis(1),
            sampling_duration: Duration::from_millis(2),
            me_duration: Duration::from_millis(me_ms),
            copy_duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_empty_metrics() {
        let m = CheckMetrics::new("host".into(), "4 x 16".into(), 64, true);
        assert_eq!(m.me_throughput(), 0.0);
        assert_eq!(m.event_throughput(), 0.0);
        assert_eq!(m.total_events(), 0);
    }

    #[test]
    fn test_record_and_finalise() {
        let mut m = CheckMetrics::new("host".into(), "4 x 16".into(), 64, true);
        m.record_iteration(iteration(0, 10));
        m.record_iteration(iteration(1, 30));
        m.finalise(Duration::from_millis(50));

        assert_eq!(m.iterations_run, 2);
        assert_eq!(m.iteration_metrics.len(), 2);
        assert_eq!(m.total_me_duration, Duration::from_millis(40));
        assert_eq!(m.total_sampling_duration, Duration::from_millis(4));
        assert_eq!(m.total_events(), 128);
        assert!((m.me_throughput() - 3200.0).abs() < 1e-6);
    }

    #[test]
    fn test_profiling_off_keeps_totals_only() {
        let mut m = CheckMetrics::new("device".into(), "2 x 32".into(), 64, false);
        m.record_iteration(iteration(0, 5));
        assert!(m.iteration_metrics.is_empty());
        assert_eq!(m.iterations_run, 1);
        assert_eq!(m.total_me_duration, Duration::from_millis(5));
    }

    #[test]
    fn test_summary_format() {
        let mut m = CheckMetrics::new("device".into(), "2 x 32".into(), 64, true);
        m.record_iteration(iteration(0, 5));
        m.finalise(Duration::from_millis(10));

        let s = m.summary();
        assert!(s.contains("Check:"));
        assert!(s.contains("device backend"));
        assert!(s.contains("grid 2 x 32"));
        assert!(s.contains("MEs/s"));
    }

    #[test]
    fn test_json() {
        let m = CheckMetrics::new("host".into(), "1 x 16".into(), 16, true);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["nevt"], 16);
        assert!(json.get("profiling").is_none());
    }
}
