// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tether-modbus
//!
//! Modbus TCP integration layer for the Tether device-integration
//! subsystem.
//!
//! This crate owns everything between the stored controller/point model
//! and the wire:
//!
//! - **Client**: persistent TCP connections with socket-level health
//!   probing and one-shot reconnect, pooled per `host:port` endpoint
//! - **Codec**: raw register words to typed [`Value`](tether_core::Value)s
//!   and back, with byte-order handling for multi-register types
//! - **Formula**: restricted arithmetic post-processing of decoded values,
//!   reversed on write
//! - **Engine**: the per-point read/write pipeline (transport, codec,
//!   formula, range check)
//! - **Service**: CRUD orchestration over the store, pool, and engine,
//!   with per-item batch outcomes
//! - **Config**: import/export in the native and ThingsBoard gateway
//!   formats under four duplicate-handling modes
//! - **Sweeps**: scheduled health, retry, and collection passes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        DeviceService                        │
//! │             (CRUD orchestration, batch results)             │
//! └─────────────────────────────────────────────────────────────┘
//!           │                    │                    │
//!           ▼                    ▼                    ▼
//! ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────┐
//! │   PointIoEngine  │ │  ConfigManager   │ │      Sweeps      │
//! │ (read/write path)│ │ (import/export)  │ │  (health, retry, │
//! │                  │ │                  │ │    collection)   │
//! └──────────────────┘ └──────────────────┘ └──────────────────┘
//!           │
//!           ▼
//! ┌──────────────────┐
//! │  ConnectionPool  │
//! │  (ClientHandle   │
//! │   per endpoint)  │
//! └──────────────────┘
//!           │
//!           ▼
//! ┌──────────────────┐
//! │   tokio-modbus   │
//! │    TCP client    │
//! └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ### Reading a point
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use tether_core::MemoryStore;
//! use tether_modbus::{ConnectionPool, DeviceService};
//!
//! let store = Arc::new(MemoryStore::new());
//! let pool = Arc::new(ConnectionPool::new());
//! let service = DeviceService::new(store, pool);
//!
//! let controller = service
//!     .create_controller(NewController {
//!         name: "boiler-plc".into(),
//!         host: "192.168.1.100".into(),
//!         port: 502,
//!         timeout: 10,
//!     })
//!     .await?;
//!
//! let result = service.read_point(&point_id).await?;
//! println!("{} = {:?}", result.timestamp, result.value);
//! ```
//!
//! ### Importing a ThingsBoard document
//!
//! ```rust,ignore
//! use tether_modbus::config::{ConfigFormat, ConfigManager, ImportMode};
//!
//! let manager = ConfigManager::new(store);
//! let report = manager
//!     .import(&payload, ConfigFormat::Thingsboard, ImportMode::SkipController)
//!     .await?;
//! println!("{}: {}/{} points", report.status, report.success_count, report.total_points);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod client;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod service;
pub mod sweeps;
pub mod types;

// =============================================================================
// Re-exports - Error Module
// =============================================================================

pub use error::{
    // Main error type
    ModbusError,
    ModbusResult,
    // Error categories
    ConnectionError,
    ProtocolError,
};

// =============================================================================
// Re-exports - Types Module
// =============================================================================

pub use types::{
    // Client configuration
    ClientConfig,
    PoolKey,
    // Wire payloads
    RawValues,
    // Read results
    ControllerReadSummary,
    PointReadOutcome,
    PointReading,
    RangeStatus,
    ReadResult,
    // Write results
    WriteReceipt,
    // Diagnostics
    HandleStatus,
    PoolStatus,
    TestOutcome,
};

// =============================================================================
// Re-exports - Client Module
// =============================================================================

pub use client::{ClientHandle, ConnectionPool};

// =============================================================================
// Re-exports - Engine and Service
// =============================================================================

pub use engine::PointIoEngine;
pub use service::{
    BatchCreateSummary, BatchDeleteSummary, CreateStatus, DeleteOutcome, DeleteStatus,
    DeviceService, PointCreateOutcome,
};

// =============================================================================
// Re-exports - Config Module
// =============================================================================

pub use config::{
    ConfigFormat, ConfigManager, ExportArtifact, ImportMode, ImportReport, ImportStatus,
    PointImportOutcome, PointImportStatus,
};

// =============================================================================
// Re-exports - Sweeps Module
// =============================================================================

pub use sweeps::{register_sweeps, CollectionSweep, HealthSweep, RetrySweep, SweepSettings};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
