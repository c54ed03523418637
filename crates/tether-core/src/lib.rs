// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tether-core
//!
//! Core abstractions and shared types for the Tether device-integration
//! subsystem.
//!
//! This crate provides the protocol-free foundation the transport crates
//! build on:
//!
//! - **Types**: Controller/point metadata model, register addressing
//!   vocabulary, the decoded [`Value`] union, and collected [`Sample`]s
//! - **Error**: The subsystem-wide error taxonomy with outward status codes
//! - **Storage**: The [`DeviceStore`] repository trait and the bundled
//!   in-memory implementation
//! - **Schedule**: Interval-driven background task runner
//! - **Sink**: Outbound time-series interface for collected samples
//!
//! ## Example
//!
//! ```rust,ignore
//! use tether_core::{Controller, NewController, MemoryStore, DeviceStore};
//!
//! let store = MemoryStore::new();
//! let controller = Controller::create(NewController {
//!     name: "boiler-plc".into(),
//!     host: "10.0.0.20".into(),
//!     port: 502,
//!     timeout: 10,
//! });
//! store.insert_controller(controller).await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod error;
pub mod types;

// =============================================================================
// Infrastructure Modules
// =============================================================================

pub mod schedule;
pub mod sink;
pub mod storage;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::*;
pub use types::*;

pub use schedule::{ScheduledTask, Scheduler};
pub use sink::{SampleSink, SinkError};
pub use storage::{DeviceStore, MemoryStore, StoreResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
