// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport-facing types for the Modbus integration.
//!
//! This module defines the per-connection [`ClientConfig`], the pool
//! addressing key, raw wire payloads, and the result shapes the engine
//! hands back to callers (readings, write receipts, connection test
//! outcomes, pool status snapshots).

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tether_core::{Controller, ControllerId, PointId, Value};

use crate::error::{ModbusError, ModbusResult};

// =============================================================================
// ClientConfig
// =============================================================================

/// Configuration for one Modbus TCP connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Target host address.
    pub host: String,

    /// Target port (default: 502).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connect timeout.
    #[serde(default = "default_connect_timeout")]
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Per-request deadline for reads and writes.
    #[serde(default = "default_request_timeout")]
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Enable TCP_NODELAY.
    #[serde(default = "default_true")]
    pub tcp_nodelay: bool,
}

fn default_port() -> u16 {
    502
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            tcp_nodelay: true,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for a host and port with default timeouts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Derives the connection configuration from a controller record.
    ///
    /// The controller's timeout governs both the connect attempt and
    /// every request on the resulting connection.
    pub fn for_controller(controller: &Controller) -> Self {
        let timeout = controller.timeout_duration();
        Self {
            host: controller.host.clone(),
            port: controller.port,
            connect_timeout: timeout,
            request_timeout: timeout,
            tcp_nodelay: true,
        }
    }

    /// Returns the `host:port` endpoint string.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the pool key this configuration maps to.
    pub fn pool_key(&self) -> PoolKey {
        PoolKey::new(&self.host, self.port)
    }

    /// Validates this configuration.
    pub fn validate(&self) -> ModbusResult<()> {
        if self.host.is_empty() {
            return Err(ModbusError::dns_failed("", None));
        }
        if self.connect_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(ModbusError::request_timeout(
                "configuration rejected: zero timeout",
                Duration::ZERO,
            ));
        }
        Ok(())
    }
}

// =============================================================================
// PoolKey
// =============================================================================

/// Pool addressing key. One TCP connection is shared per `(host, port)`;
/// unit ids multiplex on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    /// Target host.
    pub host: String,
    /// Target port.
    pub port: u16,
}

impl PoolKey {
    /// Creates a pool key.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<&Controller> for PoolKey {
    fn from(controller: &Controller) -> Self {
        Self::new(&controller.host, controller.port)
    }
}

// =============================================================================
// Raw Wire Values
// =============================================================================

/// Raw values as read off the wire, before decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValues {
    /// Coil / discrete input states.
    Bits(Vec<bool>),
    /// Holding / input register words.
    Registers(Vec<u16>),
}

impl RawValues {
    /// Returns the number of values.
    pub fn len(&self) -> usize {
        match self {
            Self::Bits(bits) => bits.len(),
            Self::Registers(words) => words.len(),
        }
    }

    /// Returns `true` if no value was read.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-unit view as typed values: bools for bit reads, unsigned
    /// register words otherwise.
    pub fn to_values(&self) -> Vec<Value> {
        match self {
            Self::Bits(bits) => bits.iter().map(|b| Value::Bool(*b)).collect(),
            Self::Registers(words) => {
                words.iter().map(|w| Value::UInt(u64::from(*w))).collect()
            }
        }
    }
}

// =============================================================================
// Read Results
// =============================================================================

/// Range verdict echoed back with a reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeStatus {
    /// Whether the final value sits inside the configured bounds (or no
    /// check applied).
    pub valid: bool,
    /// Which bound was violated, when not `valid`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Configured lower bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    /// Configured upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

/// Full detail of one point read: the raw wire values plus every stage
/// of the decode pipeline applied to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResult {
    /// Source point.
    pub point_id: PointId,
    /// Point display name.
    pub name: String,
    /// Register or coil offset.
    pub address: u16,
    /// Values as read off the wire, one entry per unit.
    pub raw: Vec<Value>,
    /// Codec output, before the formula.
    pub decoded: Value,
    /// Final value, after the formula.
    pub value: Value,
    /// The configured data type the codec applied.
    pub data_type: String,
    /// Display unit, if configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Range verdict for the final value, bounds included.
    pub range: RangeStatus,
    /// Read time (UTC).
    pub timestamp: DateTime<Utc>,
}

/// A successful single-point reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointReading {
    /// Source point.
    pub point_id: PointId,
    /// Point display name.
    pub name: String,
    /// Register or coil offset.
    pub address: u16,
    /// Final value (decoded, formula applied).
    pub value: Value,
    /// Display unit, if configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Read time (UTC).
    pub timestamp: DateTime<Utc>,
}

impl From<ReadResult> for PointReading {
    /// Downgrades a full read result to the summary shape used in
    /// controller-wide reads and collection samples.
    fn from(result: ReadResult) -> Self {
        Self {
            point_id: result.point_id,
            name: result.name,
            address: result.address,
            value: result.value,
            unit: result.unit,
            timestamp: result.timestamp,
        }
    }
}

/// Per-point outcome inside a controller-wide read.
///
/// Failures are carried as data so one dead register never hides the
/// rest of the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointReadOutcome {
    /// Source point.
    pub point_id: PointId,
    /// Point display name.
    pub name: String,
    /// Register or coil offset.
    pub address: u16,
    /// Whether this point produced a value.
    pub success: bool,
    /// The value, when `success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Display unit, if configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Failure description, when not `success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PointReadOutcome {
    /// Creates a success outcome from a reading.
    pub fn success(reading: PointReading) -> Self {
        Self {
            point_id: reading.point_id,
            name: reading.name,
            address: reading.address,
            success: true,
            value: Some(reading.value),
            unit: reading.unit,
            error: None,
        }
    }

    /// Creates a failure outcome.
    pub fn failure(
        point_id: PointId,
        name: impl Into<String>,
        address: u16,
        error: impl Into<String>,
    ) -> Self {
        Self {
            point_id,
            name: name.into(),
            address,
            success: false,
            value: None,
            unit: None,
            error: Some(error.into()),
        }
    }
}

/// Result of reading every configured point of a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerReadSummary {
    /// The controller that was read.
    pub controller_id: ControllerId,
    /// Controller display name.
    pub controller_name: String,
    /// Total points attempted.
    pub total: usize,
    /// Points that produced a value.
    pub succeeded: usize,
    /// Points that failed.
    pub failed: usize,
    /// Per-point outcomes, in register address order.
    pub points: Vec<PointReadOutcome>,
    /// Read time (UTC).
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Write Results
// =============================================================================

/// Confirmation of a completed point write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteReceipt {
    /// Target point.
    pub point_id: PointId,
    /// Point display name.
    pub name: String,
    /// Register or coil offset.
    pub address: u16,
    /// The value as the caller requested it.
    pub requested: Value,
    /// The value actually written on the wire, after reverse-formula
    /// translation and register truncation.
    pub written: Value,
    /// Always `true` on a receipt; failures surface as errors. Carried
    /// because the outward payload serializes this struct directly.
    pub success: bool,
    /// Write time (UTC).
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Connection Test
// =============================================================================

/// Outcome of an on-demand connectivity test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Whether a connection could be established.
    pub reachable: bool,
    /// Round-trip time of the attempt, in milliseconds.
    pub response_time_ms: u64,
    /// Failure description when unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Test time (UTC).
    pub tested_at: DateTime<Utc>,
}

impl TestOutcome {
    /// Creates a reachable outcome.
    pub fn reachable(response_time_ms: u64) -> Self {
        Self {
            reachable: true,
            response_time_ms,
            error: None,
            tested_at: Utc::now(),
        }
    }

    /// Creates an unreachable outcome.
    pub fn unreachable(response_time_ms: u64, error: impl Into<String>) -> Self {
        Self {
            reachable: false,
            response_time_ms,
            error: Some(error.into()),
            tested_at: Utc::now(),
        }
    }
}

// =============================================================================
// Pool Status
// =============================================================================

/// Status snapshot of one pooled connection handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandleStatus {
    /// The `host:port` endpoint.
    pub endpoint: String,
    /// Controller currently associated with the handle, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<ControllerId>,
    /// Whether the handle currently holds a live connection.
    pub connected: bool,
    /// Last successful operation (UTC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success: Option<DateTime<Utc>>,
    /// Description of the most recent failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Status snapshot of the whole connection pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Number of pooled handles.
    pub total: usize,
    /// Number of handles with a live connection.
    pub connected: usize,
    /// Per-handle detail.
    pub handles: Vec<HandleStatus>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::NewController;

    #[test]
    fn test_client_config_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"host": "10.0.0.1"}"#).unwrap();
        assert_eq!(config.port, 502);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.tcp_nodelay);
        assert_eq!(config.endpoint(), "10.0.0.1:502");
    }

    #[test]
    fn test_client_config_humantime() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"host": "10.0.0.1", "connect_timeout": "2s", "request_timeout": "1s 500ms"}"#,
        )
        .unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_client_config_from_controller() {
        let controller = Controller::create(NewController {
            name: "plc".to_string(),
            host: "10.0.0.7".to_string(),
            port: 1502,
            timeout: 3,
        });
        let config = ClientConfig::for_controller(&controller);
        assert_eq!(config.host, "10.0.0.7");
        assert_eq!(config.port, 1502);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.pool_key(), PoolKey::new("10.0.0.7", 1502));
    }

    #[test]
    fn test_client_config_validation() {
        assert!(ClientConfig::new("10.0.0.1", 502).validate().is_ok());
        assert!(ClientConfig::new("", 502).validate().is_err());

        let mut zero = ClientConfig::new("10.0.0.1", 502);
        zero.request_timeout = Duration::ZERO;
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_pool_key_display() {
        let key = PoolKey::new("plc.local", 502);
        assert_eq!(key.to_string(), "plc.local:502");
    }

    #[test]
    fn test_raw_values_len() {
        assert_eq!(RawValues::Bits(vec![true, false]).len(), 2);
        assert_eq!(RawValues::Registers(vec![1, 2, 3]).len(), 3);
        assert!(RawValues::Registers(vec![]).is_empty());
    }

    #[test]
    fn test_raw_values_to_values() {
        assert_eq!(
            RawValues::Bits(vec![true, false]).to_values(),
            vec![Value::Bool(true), Value::Bool(false)]
        );
        assert_eq!(
            RawValues::Registers(vec![7, 65535]).to_values(),
            vec![Value::UInt(7), Value::UInt(65535)]
        );
    }

    #[test]
    fn test_read_result_downgrades_to_reading() {
        let result = ReadResult {
            point_id: PointId::new("p1"),
            name: "temp".to_string(),
            address: 100,
            raw: vec![Value::UInt(215)],
            decoded: Value::UInt(215),
            value: Value::Float(21.5),
            data_type: "uint16".to_string(),
            unit: Some("C".to_string()),
            range: RangeStatus {
                valid: true,
                message: None,
                min_value: Some(0.0),
                max_value: Some(100.0),
            },
            timestamp: Utc::now(),
        };
        let reading = PointReading::from(result);
        assert_eq!(reading.name, "temp");
        assert_eq!(reading.value, Value::Float(21.5));
        assert_eq!(reading.unit.as_deref(), Some("C"));
    }

    #[test]
    fn test_outcome_constructors() {
        let reading = PointReading {
            point_id: PointId::new("p1"),
            name: "temp".to_string(),
            address: 100,
            value: Value::Float(21.5),
            unit: Some("C".to_string()),
            timestamp: Utc::now(),
        };
        let ok = PointReadOutcome::success(reading);
        assert!(ok.success);
        assert_eq!(ok.value, Some(Value::Float(21.5)));
        assert!(ok.error.is_none());

        let failed = PointReadOutcome::failure(PointId::new("p2"), "rpm", 7, "timed out");
        assert!(!failed.success);
        assert!(failed.value.is_none());
        assert_eq!(failed.error.as_deref(), Some("timed out"));
    }

    #[test]
    fn test_test_outcome_serialization() {
        let outcome = TestOutcome::reachable(12);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["reachable"], true);
        assert_eq!(json["response_time_ms"], 12);
        assert!(json.get("error").is_none());

        let outcome = TestOutcome::unreachable(5000, "connection refused");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["reachable"], false);
        assert_eq!(json["error"], "connection refused");
    }
}
