// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `me-check check` command: run the batch loop and print statistics.
//!
//! The host backend is refused up front if the CPU cannot run the SIMD
//! tier the binary was built for.

use runtime::{Backend, CheckConfig, CheckEngine};

pub async fn execute(config: CheckConfig, json: bool) -> anyhow::Result<()> {
    if config.backend == Backend::Host && !host_probe::host_supports_simd(true) {
        anyhow::bail!(
            "host does not support {}; rebuild for an older target or use --backend device",
            host_probe::SimdTier::built()
        );
    }

    let mut engine = CheckEngine::new(config.clone()).allocate()?.warm_up()?;
    let output = engine.run().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║               me-check · Check Loop                 ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Configuration ──────────────────────────────────────────
    println!("  Process:      {}", process_core::Process::name(engine.process()));
    println!("  Backend:      {}", config.backend);
    println!("  Grid:         {} ({} events per batch)", output.metrics.grid, output.metrics.nevt);
    println!("  Iterations:   {}", output.metrics.iterations_run);
    println!("  Energy:       {} GeV", config.energy);
    println!("  Seed:         {}", config.seed);
    println!(
        "  Helicities:   {} good {:?} (warm-up {:.2}ms)",
        output.good_helicities.len(),
        output.good_helicities,
        engine.warm_up_duration().as_secs_f64() * 1000.0,
    );
    println!();

    // ── Iterations ─────────────────────────────────────────────
    if !output.metrics.iteration_metrics.is_empty() {
        println!(
            "  {:>5} {:>10} {:>12} {:>10} {:>10}",
            "Iter", "RNG ms", "Sampling ms", "ME ms", "Copy ms"
        );
        println!("  {}", "-".repeat(52));
        let ms = |d: std::time::Duration| d.as_secs_f64() * 1000.0;
        for it in &output.metrics.iteration_metrics {
            println!(
                "  {:>5} {:>10.3} {:>12.3} {:>10.3} {:>10.3}",
                it.iteration,
                ms(it.rng_duration),
                ms(it.sampling_duration),
                ms(it.me_duration),
                ms(it.copy_duration),
            );
        }
        println!();
    }

    // ── Results ────────────────────────────────────────────────
    let stats = &output.statistics;
    println!("  Results");
    println!("   Events:       {} ({} abnormal)", stats.nevt, stats.abnormal);
    println!("   Mean ME:      {:.6e} ± {:.6e}", stats.mean(), stats.stddev());
    println!("   Min / max:    {:.6e} / {:.6e}", stats.min_me, stats.max_me);
    println!("   Mean w·ME:    {:.6e}", stats.cross_section());
    println!("   Throughput:   {:.3e} MEs/s", output.metrics.me_throughput());
    println!("   Wall clock:   {:.2}ms", output.metrics.total_duration.as_secs_f64() * 1000.0);

    if let Some(device) = engine.device_stats() {
        println!();
        println!("  Device");
        println!("   {}", device.summary());
    }
    println!();

    Ok(())
}
