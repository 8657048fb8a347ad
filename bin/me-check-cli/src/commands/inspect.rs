// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `me-check inspect` command: process metadata and helicity table.
//!
//! Runs the good-helicity pass on one small host batch and marks which
//! combinations contribute.

use process_core::Process;
use runtime::{Backend, CheckConfig, CheckEngine};

pub async fn execute(energy: f64) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             me-check · Process Inspector            ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let config = CheckConfig {
        backend: Backend::Host,
        blocks: 1,
        threads: 64,
        iterations: 1,
        energy,
        ..Default::default()
    };
    let engine = CheckEngine::new(config).allocate()?.warm_up()?;
    let process = engine.process();
    let good = engine.good_helicities();

    // ── Summary ────────────────────────────────────────────────
    println!("  Process:      {}", process.name());
    println!("  Particles:    {} → {}", process.npari(), process.nparf());
    println!("  Helicities:   {} combinations, {} good", process.ncomb(), good.len());
    println!("  Denominator:  {}", process.denominator());
    println!("  Coupling e⁴:  {:.6e}", process.e4());
    println!();

    // ── Helicity Table ─────────────────────────────────────────
    println!("  {:>5}  {:<20} {:>6}", "ihel", "helicities", "good");
    println!("  {}", "-".repeat(34));
    for ihel in 0..process.ncomb() {
        let hels = process
            .helicities(ihel)
            .iter()
            .map(|h| if *h > 0 { "+1" } else { "-1" })
            .collect::<Vec<_>>()
            .join(" ");
        let mark = if good.contains(&ihel) { "yes" } else { "" };
        println!("  {ihel:>5}  {hels:<20} {mark:>6}");
    }
    println!();

    Ok(())
}
