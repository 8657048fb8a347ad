// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # device-runtime
//!
//! A software accelerator with the execution model of a GPU runtime, so
//! device-side kernels run and can be tested on any machine.
//!
//! # Key Components
//!
//! - [`Device`]: allocation, host/device copies, grid launches and
//!   synchronization on a single asynchronous stream.
//! - [`DeviceMemory`]: a device-resident buffer. The host only reaches it
//!   through copies; jobs reach it through a [`DevicePtr`].
//! - [`PinnedHostMemory`]: host-resident staging memory.
//! - [`LaunchConfig`]: grid geometry, with a block-parallel helper backed
//!   by `rayon`.
//! - [`DeviceStats`]: allocation, launch and transfer counters.
//!
//! # Error Model
//!
//! ```text
//! launch()        ──► geometry rejected ──► peek_at_last_error()
//!     │
//!     ▼ (queued)
//! stream worker   ──► job faults ──► sticky fault
//!                                        │
//!                   synchronize() / copy_to_host() report it, forever
//! ```
//!
//! A faulted device drops every later job without running it. Nothing is
//! retried.

mod device;
mod error;
mod launch;
mod memory;
mod stats;
mod stream;

pub use device::{Device, DeviceProperties};
pub use error::DeviceError;
pub use launch::LaunchConfig;
pub use memory::{DeviceMemory, DevicePtr, PinnedHostMemory};
pub use stats::DeviceStats;
