// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Tether Integration Tests
//!
//! This crate provides the integration test suites for the Tether
//! Modbus device-integration subsystem, plus the shared utilities they
//! run on: a real in-process Modbus TCP simulator, fluent builders, and
//! stock fixtures.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: stock controllers, points, and interchange documents
//!   - `builders`: fluent construction of controller and point records
//!   - `mocks`: PLC simulator, recording sink, fail-injecting store
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p tether-tests
//!
//! # Run specific test suite
//! cargo test -p tether-tests --test integration_core
//! cargo test -p tether-tests --test integration_engine
//! cargo test -p tether-tests --test integration_config
//!
//! # Run with verbose output
//! cargo test -p tether-tests -- --nocapture
//!
//! # Run specific test
//! cargo test -p tether-tests test_read_scaled_holding_register
//! ```
//!
//! ## Test Categories
//!
//! ### Core Tests (`integration_core.rs`)
//! - Domain types, value union, and data-kind parsing
//! - In-memory store contracts (identity keys, ordering, atomic
//!   replacement, cascade deletes)
//! - Error taxonomy and retry classification
//! - Scheduler lifecycle
//!
//! ### Engine Tests (`integration_engine.rs`)
//! - Reads and writes against a live Modbus TCP simulator
//! - Multi-register decoding, formulas, and range validation
//! - Service-level controller/point lifecycle with real probes
//! - Connection pooling and collection sweeps end to end
//!
//! ### Config Tests (`integration_config.rs`)
//! - Native and ThingsBoard import across all four modes
//! - Payload validation and format-mismatch detection
//! - Export artifacts and file round-trips
//!
//! ## Writing New Tests
//!
//! ### Using Fixtures
//!
//! ```rust,ignore
//! use tether_tests::common::fixtures::{ControllerFixtures, PointFixtures};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let controller = ControllerFixtures::local(1502);
//!     let points = PointFixtures::full_bank();
//!     // ... test logic
//! }
//! ```
//!
//! ### Using Builders
//!
//! ```rust,ignore
//! use tether_tests::common::builders::PointBuilder;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let point = PointBuilder::new()
//!         .name("supply_temp")
//!         .holding_register()
//!         .data_type("float32")
//!         .address(100)
//!         .len(2)
//!         .build_new();
//!     // ... test logic
//! }
//! ```
//!
//! ### Using the Simulator
//!
//! ```rust,ignore
//! use tether_tests::common::mocks::PlcSimulator;
//!
//! #[tokio::test]
//! async fn test_against_live_device() {
//!     let sim = PlcSimulator::new();
//!     sim.set_holding(100, 215);
//!     let server = sim.spawn().await.unwrap();
//!     // ... connect a controller to 127.0.0.1:server.port()
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::builders::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{init_test_logging, temp_test_dir, unique_test_id};
}
