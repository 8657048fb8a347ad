// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `me-check benchmark` command: sweep grid shapes at a fixed batch size.
//!
//! One engine is allocated and warmed up once; each shape is applied with
//! a regrid, so every row computes the same events.

use event_buffers::TILING_WIDTH;
use runtime::{Backend, CheckConfig, CheckEngine};

pub async fn execute(backend: String, nevt: usize, sweep_threads: String, iterations: usize) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              me-check · Grid Sweep                  ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let backend: Backend = backend.parse()?;

    // Parse comma-separated thread counts.
    let threads: Vec<usize> = sweep_threads
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<usize>()
                .map_err(|e| anyhow::anyhow!("invalid thread count '{}': {e}", s.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (shapes, skipped): (Vec<usize>, Vec<usize>) = threads
        .into_iter()
        .partition(|&t| t > 0 && nevt % t == 0 && t % TILING_WIDTH == 0);
    for t in &skipped {
        println!("  Skipping {t} threads: must divide {nevt} and be a multiple of {TILING_WIDTH}.");
    }
    let Some(&first) = shapes.first() else {
        anyhow::bail!("no usable grid shape for nevt = {nevt}");
    };

    println!("  Backend:    {backend}");
    println!("  Events:     {nevt} per batch, {iterations} batches per shape");
    println!();

    let config = CheckConfig {
        backend,
        blocks: nevt / first,
        threads: first,
        iterations,
        enable_profiling: false,
        ..Default::default()
    };
    let mut engine = CheckEngine::new(config).allocate()?.warm_up()?;

    // ── Results Table ──────────────────────────────────────────
    println!(
        "  {:<14} {:>10} {:>10} {:>14} {:>14}",
        "Grid", "Total ms", "ME ms", "MEs/s", "Events/s",
    );
    println!("  {}", "-".repeat(66));

    let mut best: Option<(String, f64)> = None;
    for &t in &shapes {
        engine.regrid(nevt / t, t)?;
        let output = engine.run().await?;
        let m = &output.metrics;
        println!(
            "  {:<14} {:>10.2} {:>10.2} {:>14.3e} {:>14.3e}",
            m.grid,
            m.total_duration.as_secs_f64() * 1000.0,
            m.total_me_duration.as_secs_f64() * 1000.0,
            m.me_throughput(),
            m.event_throughput(),
        );
        if best.as_ref().map_or(true, |(_, tp)| m.me_throughput() > *tp) {
            best = Some((m.grid.clone(), m.me_throughput()));
        }
    }
    println!();

    // ── Summary ────────────────────────────────────────────────
    if let Some((grid, throughput)) = best {
        println!("  Fastest grid: {grid} ({throughput:.3e} MEs/s)");
    }
    println!();

    Ok(())
}
