// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! SIMD tiers and the capability probe.
//!
//! The tier is fixed when the crate is compiled, from the enabled target
//! features (`-C target-cpu=…` or `-C target-feature=…`). Running a build
//! on a CPU that lacks its tier executes illegal instructions, so the host
//! kernel refuses to construct unless [`host_supports_simd`] passes.

/// Vector instruction set a build targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum SimdTier {
    /// Scalar code only.
    None,
    /// 128-bit SSE4.2 (x86-64).
    Sse42,
    /// 256-bit AVX2 (x86-64).
    Avx2,
    /// 512-bit AVX-512 with vector-length extensions, run at 256 bits (x86-64).
    Avx512vl,
    /// 128-bit NEON (aarch64).
    Neon,
    /// 128-bit VSX (powerpc64).
    Vsx,
}

impl SimdTier {
    /// The tier selected at build time.
    pub const fn built() -> Self {
        if cfg!(all(target_arch = "x86_64", target_feature = "avx512vl")) {
            SimdTier::Avx512vl
        } else if cfg!(all(target_arch = "x86_64", target_feature = "avx2")) {
            SimdTier::Avx2
        } else if cfg!(all(target_arch = "x86_64", target_feature = "sse4.2")) {
            SimdTier::Sse42
        } else if cfg!(all(target_arch = "aarch64", target_feature = "neon")) {
            SimdTier::Neon
        } else if cfg!(all(target_arch = "powerpc64", target_feature = "vsx")) {
            SimdTier::Vsx
        } else {
            SimdTier::None
        }
    }

    /// Name of the tier as printed by the capability probe.
    pub const fn tag(&self) -> &'static str {
        match self {
            SimdTier::None => "none",
            SimdTier::Sse42 => "nehalem (SSE4.2)",
            SimdTier::Avx2 => "haswell (AVX2)",
            SimdTier::Avx512vl => "skylake-avx512 (AVX512VL)",
            SimdTier::Neon => "arm64 (NEON)",
            SimdTier::Vsx => "power8 (VSX)",
        }
    }

    /// Vector register width used for doubles, in bits.
    pub const fn register_width_bits(&self) -> usize {
        match self {
            SimdTier::None => 64,
            SimdTier::Sse42 | SimdTier::Neon | SimdTier::Vsx => 128,
            // AVX512VL builds keep 256-bit vectors to avoid frequency drops.
            SimdTier::Avx2 | SimdTier::Avx512vl => 256,
        }
    }

    /// Doubles per vector register.
    pub const fn f64_lanes(&self) -> usize {
        self.register_width_bits() / 64
    }

    /// Does the running CPU implement this tier?
    pub fn is_supported_by_host(&self) -> bool {
        match self {
            SimdTier::None => true,
            SimdTier::Sse42 => x86_feature("sse4.2"),
            SimdTier::Avx2 => x86_feature("avx2"),
            SimdTier::Avx512vl => x86_feature("avx512vl"),
            SimdTier::Neon => aarch64_neon(),
            // VSX builds only run on POWER8+, which is the only place they load.
            SimdTier::Vsx => cfg!(target_arch = "powerpc64"),
        }
    }

    /// The widest tier listed in a `/proc/cpuinfo` flag set.
    pub fn best_from_flags<'a>(flags: impl IntoIterator<Item = &'a str>) -> Self {
        let mut best = SimdTier::None;
        for flag in flags {
            let tier = match flag {
                "avx512vl" => SimdTier::Avx512vl,
                "avx2" => SimdTier::Avx2,
                "sse4_2" => SimdTier::Sse42,
                "asimd" | "neon" => SimdTier::Neon,
                "vsx" => SimdTier::Vsx,
                _ => continue,
            };
            if tier.rank() > best.rank() {
                best = tier;
            }
        }
        best
    }

    const fn rank(&self) -> u8 {
        match self {
            SimdTier::None => 0,
            SimdTier::Sse42 | SimdTier::Neon | SimdTier::Vsx => 1,
            SimdTier::Avx2 => 2,
            SimdTier::Avx512vl => 3,
        }
    }
}

impl std::fmt::Display for SimdTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn x86_feature(feature: &str) -> bool {
    match feature {
        "sse4.2" => is_x86_feature_detected!("sse4.2"),
        "avx2" => is_x86_feature_detected!("avx2"),
        "avx512vl" => is_x86_feature_detected!("avx512vl"),
        _ => false,
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn x86_feature(_feature: &str) -> bool {
    false
}

#[cfg(target_arch = "aarch64")]
fn aarch64_neon() -> bool {
    std::arch::is_aarch64_feature_detected!("neon")
}

#[cfg(not(target_arch = "aarch64"))]
fn aarch64_neon() -> bool {
    false
}

/// Outcome of the capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SimdSupport {
    /// Tier the code was built for.
    pub tier: SimdTier,
    /// Whether the running CPU implements it.
    pub supported: bool,
}

impl SimdSupport {
    /// Probes the running CPU for the build tier.
    pub fn probe() -> Self {
        let tier = SimdTier::built();
        Self {
            tier,
            supported: tier.is_supported_by_host(),
        }
    }

    /// A fixed outcome, for callers that probe elsewhere.
    pub const fn new(tier: SimdTier, supported: bool) -> Self {
        Self { tier, supported }
    }

    /// The probe line, without a level prefix.
    pub fn message(&self) -> String {
        match (self.tier, self.supported) {
            (SimdTier::None, _) => "The application does not require the host to support any AVX feature".to_string(),
            (tier, true) => format!("The application is built for {} and the host supports it", tier.tag()),
            (tier, false) => format!("The application is built for {} but the host does not support it", tier.tag()),
        }
    }

    /// Emits the single probe line at INFO or ERROR level.
    pub fn report(&self) {
        if self.supported || self.tier == SimdTier::None {
            tracing::info!("{}", self.message());
        } else {
            tracing::error!("{}", self.message());
        }
    }
}

/// Reports whether the host supports the SIMD tier chosen at build time.
///
/// Pure; never fails. When `verbose`, emits one line describing the outcome.
pub fn host_supports_simd(verbose: bool) -> bool {
    let support = SimdSupport::probe();
    if verbose {
        support.report();
    }
    support.supported
}
