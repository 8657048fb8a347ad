// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # me-check
//!
//! Command-line interface for the matrix-element check loop.
//!
//! ## Usage
//! ```bash
//! # Run 12 batches of 64 x 256 events on the accelerator
//! me-check check --backend device --blocks 64 --threads 256 --iterations 12
//!
//! # Sweep grid shapes at a fixed batch size
//! me-check benchmark --nevt 16384 --sweep-threads 32,64,128,256,512,1024
//!
//! # Can this host run this build?
//! me-check simd
//!
//! # Process metadata and good helicities
//! me-check inspect
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "me-check",
    about = "Batched matrix elements on host SIMD or an accelerator",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (overrides CLI arguments).
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the check loop: sampling, helicity reduction, matrix elements.
    Check {
        /// Backend: host or device.
        #[arg(long, default_value = "host")]
        backend: String,

        /// Grid blocks.
        #[arg(short, long, default_value_t = 64)]
        blocks: usize,

        /// Threads per block (multiple of the tiling width).
        #[arg(short, long, default_value_t = 256)]
        threads: usize,

        /// Number of batches.
        #[arg(short, long, default_value_t = 12)]
        iterations: usize,

        /// Centre-of-mass energy in GeV.
        #[arg(short, long, default_value_t = 1500.0)]
        energy: f64,

        /// Seed of the first batch.
        #[arg(long, default_value_t = 20)]
        seed: u64,

        /// Request debug shared memory on device ME launches.
        #[arg(long)]
        debug_shared_memory: bool,

        /// Print the output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Sweep grid shapes at a fixed number of events.
    Benchmark {
        /// Backend: host or device.
        #[arg(long, default_value = "device")]
        backend: String,

        /// Events per batch.
        #[arg(short, long, default_value_t = 16384)]
        nevt: usize,

        /// Comma-separated threads-per-block values to sweep.
        #[arg(long, default_value = "32,64,128,256,512,1024")]
        sweep_threads: String,

        /// Batches per grid shape.
        #[arg(short, long, default_value_t = 4)]
        iterations: usize,
    },

    /// Check that this host supports the SIMD tier the binary was built for.
    Simd {
        /// Print the probe result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print process metadata and the good helicity combinations.
    Inspect {
        /// Centre-of-mass energy in GeV.
        #[arg(short, long, default_value_t = 1500.0)]
        energy: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Check {
            backend,
            blocks,
            threads,
            iterations,
            energy,
            seed,
            debug_shared_memory,
            json,
        } => {
            let config = match cli.config {
                Some(path) => {
                    tracing::info!("loading config from '{}'", path.display());
                    runtime::CheckConfig::from_file(&path)?
                }
                None => runtime::CheckConfig {
                    backend: backend.parse()?,
                    blocks,
                    threads,
                    iterations,
                    energy,
                    seed,
                    debug_shared_memory,
                    enable_profiling: true,
                },
            };
            commands::check::execute(config, json).await
        }
        Commands::Benchmark {
            backend,
            nevt,
            sweep_threads,
            iterations,
        } => commands::benchmark::execute(backend, nevt, sweep_threads, iterations).await,
        Commands::Simd { json } => commands::simd::execute(json).await,
        Commands::Inspect { energy } => commands::inspect::execute(energy).await,
    }
}
