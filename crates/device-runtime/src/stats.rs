// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device usage statistics.
//!
//! [`DeviceStats`] accumulates allocation, transfer and launch counters for
//! one [`Device`](crate::Device). The check driver prints them after a run.

/// Cumulative statistics about device usage.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DeviceStats {
    /// Successful device allocations.
    pub allocations: u64,
    /// Device buffers released.
    pub deallocations: u64,
    /// Allocation requests refused for lack of memory.
    pub oom_count: u64,
    /// Peak device memory in use, in bytes.
    pub peak_allocated_bytes: usize,
    /// Pinned host allocations.
    pub pinned_allocations: u64,
    /// Jobs accepted onto the stream.
    pub launches: u64,
    /// Launches rejected at submission (bad grid or shared memory).
    pub rejected_launches: u64,
    /// Jobs that faulted while executing.
    pub failed_launches: u64,
    /// Bytes copied host → device.
    pub bytes_to_device: u64,
    /// Bytes copied device → host.
    pub bytes_to_host: u64,
}

impl DeviceStats {
    pub(crate) fn record_allocation(&mut self, current_bytes: usize) {
        self.allocations += 1;
        if current_bytes > self.peak_allocated_bytes {
            self.peak_allocated_bytes = current_bytes;
        }
    }

    pub(crate) fn record_deallocation(&mut self) {
        self.deallocations += 1;
    }

    pub(crate) fn record_oom(&mut self) {
        self.oom_count += 1;
    }

    pub(crate) fn record_pinned(&mut self) {
        self.pinned_allocations += 1;
    }

    pub(crate) fn record_launch(&mut self) {
        self.launches += 1;
    }

    pub(crate) fn record_rejected_launch(&mut self) {
        self.rejected_launches += 1;
    }

    pub(crate) fn record_failed_launch(&mut self) {
        self.failed_launches += 1;
    }

    pub(crate) fn record_to_device(&mut self, bytes: usize) {
        self.bytes_to_device += bytes as u64;
    }

    pub(crate) fn record_to_host(&mut self, bytes: usize) {
        self.bytes_to_host += bytes as u64;
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let peak_mb = self.peak_allocated_bytes as f64 / (1024.0 * 1024.0);
        let h2d_mb = self.bytes_to_device as f64 / (1024.0 * 1024.0);
        let d2h_mb = self.bytes_to_host as f64 / (1024.0 * 1024.0);
        format!(
            "Device: {} allocations ({} freed, {} OOMs, peak {:.2} MB), \
             {} launches ({} rejected, {} failed), \
             {:.2} MB H2D, {:.2} MB D2H",
            self.allocations,
            self.deallocations,
            self.oom_count,
            peak_mb,
            self.launches,
            self.rejected_launches,
            self.failed_launches,
            h2d_mb,
            d2h_mb,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let s = DeviceStats::default();
        assert_eq!(s.allocations, 0);
        assert_eq!(s.launches, 0);
    }

    #[test]
    fn test_peak_tracking() {
        let mut s = DeviceStats::default();
        s.record_allocation(100);
        s.record_allocation(50);
        assert_eq!(s.peak_allocated_bytes, 100);
        s.record_allocation(300);
        assert_eq!(s.peak_allocated_bytes, 300);
        assert_eq!(s.allocations, 3);
    }

    #[test]
    fn test_summary() {
        let mut s = DeviceStats::default();
        s.record_allocation(1024 * 1024);
        s.record_launch();
        s.record_launch();
        s.record_failed_launch();
        let summary = s.summary();
        assert!(summary.contains("1 allocations"));
        assert!(summary.contains("2 launches"));
        assert!(summary.contains("1 failed"));
    }
}
