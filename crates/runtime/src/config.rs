// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Check-loop configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! backend = "device"
//! blocks = 64
//! threads = 256
//! iterations = 12
//! energy = 1500.0
//! seed = 20
//! debug_shared_memory = false
//! enable_profiling = true
//! ```
//!
//! Every key is optional; missing keys take the [`Default`] value.

use event_buffers::TILING_WIDTH;
use std::path::Path;

/// Where the kernels run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Host,
    Device,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Host => write!(f, "host"),
            Backend::Device => write!(f, "device"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = super::RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "host" | "cpu" => Ok(Backend::Host),
            "device" | "gpu" => Ok(Backend::Device),
            other => Err(super::RuntimeError::ConfigError(format!(
                "unknown backend '{other}'; expected 'host' or 'device'"
            ))),
        }
    }
}

/// Configuration for the check loop.
///
/// The batch is `blocks × threads` events on both backends; the host
/// backend only uses the product.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub backend: Backend,
    /// Grid blocks.
    pub blocks: usize,
    /// Threads per block. Must be a multiple of the tiling width.
    pub threads: usize,
    /// Batches to run.
    pub iterations: usize,
    /// Centre-of-mass energy in GeV.
    pub energy: f64,
    /// Seed of the first batch; batch `i` uses `seed + i`.
    pub seed: u64,
    /// Request debug shared memory on every device ME launch.
    pub debug_shared_memory: bool,
    /// Whether to keep per-iteration timings.
    pub enable_profiling: bool,
}

impl CheckConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, super::RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            super::RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, super::RuntimeError> {
        toml::from_str(toml_str)
            .map_err(|e| super::RuntimeError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, super::RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| super::RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Events per batch.
    pub fn nevt(&self) -> usize {
        self.blocks * self.threads
    }

    /// Checks the values the kernels would otherwise reject later.
    pub fn validate(&self) -> Result<(), super::RuntimeError> {
        let fail = |msg: String| Err(super::RuntimeError::ConfigError(msg));
        if self.blocks == 0 || self.threads == 0 {
            return fail(format!("grid {} x {} has a zero dimension", self.blocks, self.threads));
        }
        if self.threads % TILING_WIDTH != 0 {
            return fail(format!(
                "threads = {} must be a multiple of tiling width {TILING_WIDTH}",
                self.threads
            ));
        }
        if self.iterations == 0 {
            return fail("iterations must be > 0".to_string());
        }
        if !self.energy.is_finite() || self.energy <= 0.0 {
            return fail(format!("energy must be positive, got {}", self.energy));
        }
        Ok(())
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Host,
            blocks: 64,
            threads: 256,
            iterations: 12,
            energy: 1500.0,
            seed: 20,
            debug_shared_memory: false,
            enable_profiling: true,
        }
    }
}
