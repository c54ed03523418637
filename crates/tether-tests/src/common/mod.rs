// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! Shared fixtures, builders, and mock collaborators for the
//! integration suites.
//!
//! ## Architecture
//!
//! The test infrastructure is designed with the following principles:
//!
//! - **Isolation**: each test gets its own store, pool, and simulator port
//! - **Realism**: transport tests run against a live Modbus TCP server,
//!   not a stubbed client
//! - **Recording**: mocks record interactions so tests assert on what
//!   actually happened
//! - **Cleanup**: simulator tasks and temp directories clean up via RAII
//!
//! ## Module Structure
//!
//! - `fixtures`: stock controllers, points, and interchange documents
//! - `builders`: fluent construction of controller and point records
//! - `mocks`: the PLC simulator, recording sink, and fail-injecting store

pub mod fixtures;
pub mod builders;
pub mod mocks;

// Re-exports for convenience
pub use fixtures::*;
pub use builders::*;
pub use mocks::*;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize test logging. Call this at the start of each test.
pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn,tether_core=debug,tether_modbus=debug")),
            )
            .with_test_writer()
            .init();
    });
}

/// Generate a unique test ID for resource isolation.
pub fn unique_test_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("test_{}", timestamp)
}

/// Create a temporary directory for file-exchange tests.
pub fn temp_test_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temp directory")
}
