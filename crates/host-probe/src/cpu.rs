// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host CPU description.
//!
//! Reads CPU identity from:
//! - `/proc/cpuinfo` for the model name and instruction-set flags.
//! - `/sys/devices/system/cpu/online` for the online core count.
//!
//! Used for reporting only; the SIMD decision itself goes through the
//! runtime feature-detection macros in [`crate::tier`].

use crate::{ProbeError, SimdTier};
use std::path::Path;

const CPUINFO: &str = "/proc/cpuinfo";
const CPU_BASE: &str = "/sys/devices/system/cpu";

/// Identity of the host CPU.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CpuInfo {
    /// Model name of the first processor entry, if reported.
    pub model_name: Option<String>,
    /// Instruction-set flags of the first processor entry.
    pub flags: Vec<String>,
    /// Number of online logical cores.
    pub online_cores: u32,
}

impl CpuInfo {
    /// Reads CPU information from procfs and sysfs.
    pub fn read() -> Result<Self, ProbeError> {
        let path = Path::new(CPUINFO);
        let mut info = match std::fs::read_to_string(path) {
            Ok(content) => parse_cpuinfo(&content),
            // Non-Linux hosts: identity unknown, cores still countable.
            Err(_) if !path.exists() => CpuInfo::default(),
            Err(e) => {
                return Err(ProbeError::ReadError {
                    path: CPUINFO.to_string(),
                    source: e,
                })
            }
        };
        info.online_cores = read_online_cores()?;
        Ok(info)
    }

    /// Widest SIMD tier the CPU advertises.
    pub fn best_simd_tier(&self) -> SimdTier {
        SimdTier::best_from_flags(self.flags.iter().map(String::as_str))
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

/// Parses the first processor block of `/proc/cpuinfo`.
///
/// x86 reports `model name` and `flags`; aarch64 reports `Features` and
/// often no model name at all.
pub fn parse_cpuinfo(content: &str) -> CpuInfo {
    let mut info = CpuInfo::default();
    for line in content.lines() {
        if line.trim().is_empty() && (info.model_name.is_some() || !info.flags.is_empty()) {
            break;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "model name" if info.model_name.is_none() => {
                info.model_name = Some(value.trim().to_string());
            }
            "flags" | "Features" if info.flags.is_empty() => {
                info.flags = value.split_whitespace().map(str::to_string).collect();
            }
            _ => {}
        }
    }
    info
}

/// Determines the number of online CPU cores.
///
/// Tries `/sys/devices/system/cpu/online` first (e.g., `"0-3"` → 4 cores),
/// then falls back to `std::thread::available_parallelism()`.
fn read_online_cores() -> Result<u32, ProbeError> {
    let online_path = format!("{CPU_BASE}/online");
    if let Ok(content) = std::fs::read_to_string(&online_path) {
        if let Some(count) = parse_cpu_range(content.trim()) {
            return Ok(count);
        }
    }

    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .map_err(|e| ProbeError::ReadError {
            path: CPU_BASE.to_string(),
            source: e,
        })
}

/// Parses a CPU range string like `"0-3"` → 4, `"0"` → 1, `"0,2-3"` → 3.
fn parse_cpu_range(s: &str) -> Option<u32> {
    let mut total = 0u32;
    for part in s.split(',') {
        let part = part.trim();
        if let Some((start_s, end_s)) = part.split_once('-') {
            let start: u32 = start_s.trim().parse().ok()?;
            let end: u32 = end_s.trim().parse().ok()?;
            if end < start {
                return None;
            }
            total += end - start + 1;
        } else {
            let _: u32 = part.parse().ok()?;
            total += 1;
        }
    }
    (total > 0).then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const X86: &str = "processor\t: 0\n\
vendor_id\t: GenuineIntel\n\
model name\t: Intel(R) Xeon(R) Gold 6148 CPU @ 2.40GHz\n\
flags\t\t: fpu sse2 sse4_1 sse4_2 avx avx2 avx512f avx512vl\n\
\n\
processor\t: 1\n\
model name\t: other\n";

    const ARM: &str = "processor\t: 0\n\
BogoMIPS\t: 108.00\n\
Features\t: fp asimd evtstrm crc32 cpuid\n\
CPU implementer\t: 0x41\n";

    #[test]
    fn test_parse_x86() {
        let info = parse_cpuinfo(X86);
        assert_eq!(
            info.model_name.as_deref(),
            Some("Intel(R) Xeon(R) Gold 6148 CPU @ 2.40GHz")
        );
        assert!(info.has_flag("avx512vl"));
        assert_eq!(info.best_simd_tier(), SimdTier::Avx512vl);
    }

    #[test]
    fn test_parse_arm() {
        let info = parse_cpuinfo(ARM);
        assert!(info.model_name.is_none());
        assert_eq!(info.best_simd_tier(), SimdTier::Neon);
    }

    #[test]
    fn test_parse_empty() {
        let info = parse_cpuinfo("");
        assert!(info.flags.is_empty());
        assert_eq!(info.best_simd_tier(), SimdTier::None);
    }

    #[test]
    fn test_parse_cpu_range() {
        assert_eq!(parse_cpu_range("0-3"), Some(4));
        assert_eq!(parse_cpu_range("0"), Some(1));
        assert_eq!(parse_cpu_range("0,2-3"), Some(3));
        assert_eq!(parse_cpu_range("0-1,3-5"), Some(5));
        assert_eq!(parse_cpu_range(""), None);
        assert_eq!(parse_cpu_range("3-1"), None);
    }

    #[test]
    fn test_read_host() {
        let info = CpuInfo::read().unwrap();
        assert!(info.online_cores >= 1);
    }
}
