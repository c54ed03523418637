// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Point I/O engine.
//!
//! Orchestrates a single point's read or write against its controller's
//! pooled connection: reconnect-on-demand, codec application, formula
//! translation, and range validation. Transport failures are converted
//! into the subsystem taxonomy here; a raw [`ModbusError`] never crosses
//! this boundary.
//!
//! The engine holds no storage reference. Callers resolve controllers
//! and points first; not-found conditions are theirs to raise.
//!
//! [`ModbusError`]: crate::error::ModbusError

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use tether_core::{Controller, IntegrationError, IntegrationResult, Point, RegisterType, Value};

use crate::client::{ClientHandle, ConnectionPool};
use crate::codec::{apply_formula, decode, reverse_formula, validate_range};
use crate::types::{
    ControllerReadSummary, PointReadOutcome, PointReading, RangeStatus, RawValues, ReadResult,
    WriteReceipt,
};

// =============================================================================
// PointIoEngine
// =============================================================================

/// Read/write orchestrator over the connection pool.
#[derive(Debug, Clone)]
pub struct PointIoEngine {
    pool: Arc<ConnectionPool>,
}

impl PointIoEngine {
    /// Creates an engine over a shared connection pool.
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Reads one point through the full pipeline: transport read,
    /// codec, formula, range check.
    ///
    /// An unhealthy connection gets exactly one reconnect attempt; a
    /// second failure is the retry sweep's problem, not this call's.
    /// A range violation does not fail the read; the verdict rides
    /// along in the result.
    pub async fn read_point(
        &self,
        controller: &Controller,
        point: &Point,
    ) -> IntegrationResult<ReadResult> {
        let handle = self
            .live_handle(controller)
            .await
            .map_err(IntegrationError::read_failed)?;

        let raw = handle
            .read(point.point_type, point.address, point.len, point.unit_id)
            .await
            .map_err(|err| IntegrationError::read_failed(err.to_string()))?;

        Ok(assemble_result(point, &raw))
    }

    /// Writes one point, validating before the first transport touch.
    ///
    /// Checks run in a fixed order: point type must be writable, the
    /// value's runtime type must match the point type, then the bounds.
    /// Only after all three pass is the connection obtained, the formula
    /// reversed (holding registers only) and the write issued.
    pub async fn write_point(
        &self,
        controller: &Controller,
        point: &Point,
        value: &Value,
        unit_id_override: Option<u8>,
    ) -> IntegrationResult<WriteReceipt> {
        match point.point_type {
            RegisterType::Coil | RegisterType::HoldingRegister => {}
            read_only => {
                return Err(IntegrationError::validation(format!(
                    "point type {read_only} is not writable"
                )));
            }
        }

        // The value shape gate also captures the coil state so the
        // write phase below needs no re-derivation.
        let coil_state = match point.point_type {
            RegisterType::Coil => match value.as_bool() {
                Some(state) => Some(state),
                None => {
                    return Err(IntegrationError::validation(format!(
                        "coil write requires a boolean value, got {}",
                        value.type_name()
                    )));
                }
            },
            _ => {
                if !value.is_numeric() {
                    return Err(IntegrationError::validation(format!(
                        "holding register write requires a numeric value, got {}",
                        value.type_name()
                    )));
                }
                None
            }
        };

        let check = validate_range(value, point.min_value, point.max_value);
        if let Some(message) = check.message {
            return Err(IntegrationError::range_validation(message));
        }

        let handle = self
            .live_handle(controller)
            .await
            .map_err(IntegrationError::write_failed)?;
        let unit_id = unit_id_override.unwrap_or(point.unit_id);

        let written = match coil_state {
            Some(state) => {
                handle
                    .write_coil(point.address, state, unit_id)
                    .await
                    .map_err(|err| IntegrationError::write_failed(err.to_string()))?;
                Value::Bool(state)
            }
            None => {
                // Translate the display value back to the wire scale,
                // then truncate to one register.
                let wire = reverse_formula(value, point.formula.as_deref());
                let register = register_payload(&wire);
                handle
                    .write_register(point.address, register, unit_id)
                    .await
                    .map_err(|err| IntegrationError::write_failed(err.to_string()))?;
                Value::UInt(u64::from(register))
            }
        };

        debug!(point = %point.name, value = %written, unit_id, "point written");

        Ok(WriteReceipt {
            point_id: point.id.clone(),
            name: point.name.clone(),
            address: point.address,
            requested: value.clone(),
            written,
            success: true,
            timestamp: Utc::now(),
        })
    }

    /// Reads every given point of a controller independently.
    ///
    /// One bad point never aborts the batch: its failure is recorded in
    /// the outcome list and the siblings proceed. With `convert` off
    /// the codec/formula pipeline is bypassed and the raw register
    /// content is returned (single value unwrapped when the point reads
    /// one unit).
    pub async fn read_controller_points(
        &self,
        controller: &Controller,
        points: &[Point],
        convert: bool,
    ) -> ControllerReadSummary {
        let mut outcomes = Vec::with_capacity(points.len());
        let mut succeeded = 0usize;

        for point in points {
            match self.read_one(controller, point, convert).await {
                Ok(reading) => {
                    succeeded += 1;
                    outcomes.push(PointReadOutcome::success(reading));
                }
                Err(err) => {
                    debug!(
                        controller = %controller.name,
                        point = %point.name,
                        error = %err,
                        "point read failed within controller read"
                    );
                    outcomes.push(PointReadOutcome::failure(
                        point.id.clone(),
                        point.name.clone(),
                        point.address,
                        err.to_string(),
                    ));
                }
            }
        }

        let failed = outcomes.len() - succeeded;
        ControllerReadSummary {
            controller_id: controller.id.clone(),
            controller_name: controller.name.clone(),
            total: outcomes.len(),
            succeeded,
            failed,
            points: outcomes,
            timestamp: Utc::now(),
        }
    }

    /// Single-point read for the batch path, honoring the convert flag.
    async fn read_one(
        &self,
        controller: &Controller,
        point: &Point,
        convert: bool,
    ) -> IntegrationResult<PointReading> {
        if convert {
            return Ok(self.read_point(controller, point).await?.into());
        }

        // Raw mode: same reconnect policy, no codec or formula.
        let handle = self
            .live_handle(controller)
            .await
            .map_err(IntegrationError::read_failed)?;
        let raw = handle
            .read(point.point_type, point.address, point.len, point.unit_id)
            .await
            .map_err(|err| IntegrationError::read_failed(err.to_string()))?;

        let mut values = raw.to_values();
        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Value::Array(values)
        };

        Ok(PointReading {
            point_id: point.id.clone(),
            name: point.name.clone(),
            address: point.address,
            value,
            unit: point.unit.clone(),
            timestamp: Utc::now(),
        })
    }

    /// Ensure plus heal: returns a live handle or the connect failure
    /// reason.
    async fn live_handle(&self, controller: &Controller) -> Result<Arc<ClientHandle>, String> {
        let handle = self.pool.ensure(controller);
        if handle.is_healthy().await {
            return Ok(handle);
        }
        if handle.connect().await {
            return Ok(handle);
        }
        let status = handle.status(None).await;
        Err(status
            .last_error
            .unwrap_or_else(|| format!("could not connect to {}", handle.endpoint())))
    }
}

/// Runs the decode pipeline over a raw transport read.
fn assemble_result(point: &Point, raw: &RawValues) -> ReadResult {
    let decoded = decode(raw, &point.data_type, point.len);
    let value = apply_formula(&decoded, point.formula.as_deref());
    let check = validate_range(&value, point.min_value, point.max_value);
    if !check.valid {
        warn!(point = %point.name, value = %value, "reading outside configured range");
    }

    ReadResult {
        point_id: point.id.clone(),
        name: point.name.clone(),
        address: point.address,
        raw: raw.to_values(),
        decoded,
        value,
        data_type: point.data_type.clone(),
        unit: point.unit.clone(),
        range: RangeStatus {
            valid: check.valid,
            message: check.message,
            min_value: point.min_value,
            max_value: point.max_value,
        },
        timestamp: Utc::now(),
    }
}

/// Truncates a numeric wire value toward zero and masks it to one
/// register.
fn register_payload(value: &Value) -> u16 {
    let numeric = value.as_f64().unwrap_or(0.0);
    (numeric.trunc() as i64 & 0xFFFF) as u16
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{ControllerId, NewController, NewPoint};

    fn unreachable_controller() -> Controller {
        Controller::create(NewController {
            name: "plc".to_string(),
            host: "127.0.0.1".to_string(),
            // Nothing listens on port 1; connects fail fast.
            port: 1,
            timeout: 1,
        })
    }

    fn point(point_type: RegisterType, data_type: &str) -> Point {
        Point::create(
            ControllerId::new("c1"),
            NewPoint {
                name: "p".to_string(),
                description: None,
                point_type,
                data_type: data_type.to_string(),
                address: 10,
                len: 1,
                unit_id: 1,
                formula: None,
                unit: None,
                min_value: None,
                max_value: None,
            },
        )
    }

    fn engine() -> PointIoEngine {
        PointIoEngine::new(Arc::new(ConnectionPool::new()))
    }

    #[tokio::test]
    async fn test_write_rejects_read_only_types() {
        let engine = engine();
        let controller = unreachable_controller();

        for read_only in [RegisterType::Input, RegisterType::InputRegister] {
            let p = point(read_only, "uint16");
            let err = engine
                .write_point(&controller, &p, &Value::UInt(1), None)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "validation_failed");
        }
    }

    #[tokio::test]
    async fn test_write_rejects_mismatched_value_shape() {
        let engine = engine();
        let controller = unreachable_controller();

        let coil = point(RegisterType::Coil, "bool");
        let err = engine
            .write_point(&controller, &coil, &Value::UInt(1), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_failed");
        assert!(err.to_string().contains("boolean"));

        let register = point(RegisterType::HoldingRegister, "uint16");
        let err = engine
            .write_point(&controller, &register, &Value::Bool(true), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_failed");
        assert!(err.to_string().contains("numeric"));
    }

    #[tokio::test]
    async fn test_write_range_check_precedes_transport() {
        let engine = engine();
        // The controller is unreachable, so reaching the transport would
        // produce write_failed; range_validation_failed proves the gate
        // fired first.
        let controller = unreachable_controller();
        let mut p = point(RegisterType::HoldingRegister, "uint16");
        p.min_value = Some(0.0);
        p.max_value = Some(10.0);

        let err = engine
            .write_point(&controller, &p, &Value::UInt(50), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "range_validation_failed");
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn test_write_unreachable_is_write_failed() {
        let engine = engine();
        let controller = unreachable_controller();
        let p = point(RegisterType::HoldingRegister, "uint16");

        let err = engine
            .write_point(&controller, &p, &Value::UInt(5), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "write_failed");
    }

    #[tokio::test]
    async fn test_read_unreachable_is_read_failed() {
        let engine = engine();
        let controller = unreachable_controller();
        let p = point(RegisterType::HoldingRegister, "uint16");

        let err = engine.read_point(&controller, &p).await.unwrap_err();
        assert_eq!(err.kind(), "read_failed");
    }

    #[tokio::test]
    async fn test_controller_read_isolates_failures() {
        let engine = engine();
        let controller = unreachable_controller();
        let points = vec![
            point(RegisterType::HoldingRegister, "uint16"),
            point(RegisterType::Coil, "bool"),
        ];

        let summary = engine
            .read_controller_points(&controller, &points, true)
            .await;
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 2);
        assert!(summary.points.iter().all(|o| !o.success));
        assert!(summary.points.iter().all(|o| o.error.is_some()));
    }

    #[test]
    fn test_assemble_result_runs_full_pipeline() {
        let mut p = point(RegisterType::HoldingRegister, "uint16");
        p.formula = Some("x * 0.1".to_string());
        p.min_value = Some(0.0);
        p.max_value = Some(20.0);

        let result = assemble_result(&p, &RawValues::Registers(vec![215]));
        assert_eq!(result.raw, vec![Value::UInt(215)]);
        assert_eq!(result.decoded, Value::UInt(215));
        assert_eq!(result.value, Value::Float(21.5));
        assert!(!result.range.valid);
        assert!(result.range.message.as_deref().is_some_and(|m| m.contains("maximum")));
        assert_eq!(result.range.max_value, Some(20.0));
    }

    #[test]
    fn test_assemble_result_skips_range_without_bounds() {
        let p = point(RegisterType::HoldingRegister, "int16");
        let result = assemble_result(&p, &RawValues::Registers(vec![0xFFFE]));
        assert_eq!(result.value, Value::Int(-2));
        assert!(result.range.valid);
        assert!(result.range.message.is_none());
    }

    #[test]
    fn test_register_payload_truncates_and_masks() {
        assert_eq!(register_payload(&Value::Float(21.9)), 21);
        assert_eq!(register_payload(&Value::Float(-1.0)), 0xFFFF);
        assert_eq!(register_payload(&Value::UInt(70000)), 4464);
        assert_eq!(register_payload(&Value::Int(-2)), 0xFFFE);
    }

    #[test]
    fn test_read_result_reading_conversion() {
        let p = point(RegisterType::Coil, "bool");
        let result = assemble_result(&p, &RawValues::Bits(vec![true]));
        let reading: PointReading = result.into();
        assert_eq!(reading.value, Value::Bool(true));
        assert_eq!(reading.name, "p");
        assert_eq!(reading.address, 10);
    }
}
