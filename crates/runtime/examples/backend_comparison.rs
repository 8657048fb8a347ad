// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: Compare host and device backends on the same batches.
//!
//! Runs the check loop on both backends with the same seed and grid, then
//! prints throughput and confirms the matrix elements agree bit for bit.
//!
//! ```bash
//! cargo run -p runtime --example backend_comparison
//! ```

use runtime::{Backend, CheckConfig, CheckEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing.
    tracing_subscriber::fmt().with_env_filter("info").init();

    let base = CheckConfig {
        blocks: 64,
        threads: 256,
        iterations: 8,
        ..Default::default()
    };

    println!(
        "{:<8} {:>10} {:>8} {:>14} {:>14} {:>12}",
        "Backend", "Grid", "Iters", "ME ms", "MEs/s", "Mean ME",
    );
    println!("{}", "-".repeat(72));

    let mut outputs = Vec::new();
    for backend in [Backend::Host, Backend::Device] {
        let config = CheckConfig { backend, ..base.clone() };
        let mut engine = CheckEngine::new(config).allocate()?.warm_up()?;
        let output = engine.run().await?;
        println!(
            "{:<8} {:>10} {:>8} {:>14.2} {:>14.3e} {:>12.6e}",
            backend.to_string(),
            output.metrics.grid,
            output.metrics.iterations_run,
            output.metrics.total_me_duration.as_secs_f64() * 1000.0,
            output.metrics.me_throughput(),
            output.statistics.mean(),
        );
        outputs.push(output);
    }

    let identical = outputs[0].matrix_elements == outputs[1].matrix_elements;
    println!("\nLast batch identical on both backends: {identical}");
    Ok(())
}
