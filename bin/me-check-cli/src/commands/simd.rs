// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `me-check simd` command: the SIMD preflight probe.
//!
//! Exits with an error when the host cannot run the build's tier.

use host_probe::{CpuInfo, SimdSupport};

pub async fn execute(json: bool) -> anyhow::Result<()> {
    let support = SimdSupport::probe();
    let cpu = CpuInfo::read()?;

    if json {
        let value = serde_json::json!({
            "support": support,
            "cpu": cpu,
            "best_host_tier": cpu.best_simd_tier(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("╔══════════════════════════════════════════════════════╗");
        println!("║              me-check · SIMD Preflight              ║");
        println!("╚══════════════════════════════════════════════════════╝");
        println!();
        println!("  CPU:          {}", cpu.model_name.as_deref().unwrap_or("unknown"));
        println!("  Online cores: {}", cpu.online_cores);
        println!("  Built for:    {}", support.tier);
        println!(
            "  Vector width: {} bits ({} f64 lanes)",
            support.tier.register_width_bits(),
            support.tier.f64_lanes()
        );
        println!("  Best on host: {}", cpu.best_simd_tier());
        println!("  Supported:    {}", if support.supported { "yes" } else { "NO" });
        println!();
    }

    support.report();
    if !support.supported {
        anyhow::bail!("host does not support {}", support.tier);
    }
    Ok(())
}
