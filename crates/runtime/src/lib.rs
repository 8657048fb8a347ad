// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! The check engine: the batch loop that drives the sampling and
//! matrix-element kernels end to end.
//!
//! The engine takes a [`CheckConfig`] (backend, grid, iterations, energy,
//! seed) and runs, per batch:
//! - the random-number kernel;
//! - RAMBO initial and final momenta, with event weights;
//! - the matrix-element pass, reusing the good helicities found once at
//!   warm-up;
//! - device-to-host copies on the device backend;
//! - the event statistics update.
//!
//! # Type-State Pipeline
//! The runtime enforces a type-safe pipeline:
//! ```text
//! CheckEngine<Idle> → CheckEngine<Allocated> → CheckEngine<Ready>
//! ```
//! Transitions are compile-time checked.
//!
//! # Async Execution
//! [`CheckEngine::run`] is `async` and yields to the executor between
//! batches. The work inside a batch is synchronous: host kernels run on
//! the calling thread, device kernels end at a synchronization point.

mod config;
mod engine;
mod error;
mod metrics;

pub use config::{Backend, CheckConfig};
pub use engine::{Allocated, CheckEngine, CheckOutput, EngineState, Idle, Ready};
pub use error::RuntimeError;
pub use metrics::{CheckMetrics, IterationMetrics};
