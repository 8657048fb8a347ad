// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for numeric cores and phase-space sampling.

/// Errors that can occur when setting up a process or sampler.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// More particles than the per-event scratch space holds.
    #[error("process has {npar} particles, at most {max} are supported")]
    TooManyParticles { npar: usize, max: usize },

    /// RAMBO generates 2 → N with N ≥ 2.
    #[error("RAMBO needs at least 2 final-state particles, got {nparf}")]
    UnsupportedFinalState { nparf: usize },

    /// The collision energy must be positive and finite.
    #[error("invalid centre-of-mass energy {energy}")]
    InvalidEnergy { energy: f64 },

    /// A good-helicity mask of the wrong length.
    #[error("helicity mask has {actual} entries, process has {expected} combinations")]
    MaskLength { expected: usize, actual: usize },

    /// A buffer does not match the process layout.
    #[error("buffer error: {0}")]
    Buffer(#[from] event_buffers::BufferError),
}
