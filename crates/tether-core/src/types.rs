// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core domain types for the device-integration subsystem.
//!
//! This module defines the controller/point metadata model, the register
//! addressing vocabulary, and the value union produced by register decoding.
//! Everything here is protocol-facing but transport-free: the Modbus crate
//! depends on these types, never the other way around.
//!
//! # Identity
//!
//! Controllers are unique by `(host, port)`. Points are unique by
//! `(controller_id, address, type, unit_id)`; that tuple is the point's
//! real-world identity and the dedup key for batch creation and config
//! import.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

/// A unique identifier for a controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControllerId(String);

impl ControllerId {
    /// Creates a controller ID from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ControllerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ControllerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A unique identifier for a point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(String);

impl PointId {
    /// Creates a point ID from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PointId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PointId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// Register Types
// =============================================================================

/// The four addressable Modbus point types.
///
/// The string forms (`coil`, `input`, `holding_register`, `input_register`)
/// are the canonical storage and interchange representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterType {
    /// Single-bit, read/write (function codes 1, 5, 15).
    Coil,
    /// Single-bit, read-only discrete input (function code 2).
    Input,
    /// 16-bit, read/write (function codes 3, 6, 16).
    HoldingRegister,
    /// 16-bit, read-only (function code 4).
    InputRegister,
}

impl RegisterType {
    /// All point types, in function-code order.
    pub const ALL: [RegisterType; 4] = [
        RegisterType::Coil,
        RegisterType::Input,
        RegisterType::HoldingRegister,
        RegisterType::InputRegister,
    ];

    /// Returns the canonical string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RegisterType::Coil => "coil",
            RegisterType::Input => "input",
            RegisterType::HoldingRegister => "holding_register",
            RegisterType::InputRegister => "input_register",
        }
    }

    /// Returns `true` for single-bit point types.
    pub const fn is_bit(&self) -> bool {
        matches!(self, RegisterType::Coil | RegisterType::Input)
    }

    /// Returns `true` if the protocol permits writes to this point type.
    pub const fn is_writable(&self) -> bool {
        matches!(self, RegisterType::Coil | RegisterType::HoldingRegister)
    }

    /// Returns the Modbus function code used to read this point type.
    pub const fn read_function_code(&self) -> u8 {
        match self {
            RegisterType::Coil => 0x01,
            RegisterType::Input => 0x02,
            RegisterType::HoldingRegister => 0x03,
            RegisterType::InputRegister => 0x04,
        }
    }

    /// Returns the single-write function code, if this type is writable.
    pub const fn write_function_code(&self) -> Option<u8> {
        match self {
            RegisterType::Coil => Some(0x05),
            RegisterType::HoldingRegister => Some(0x06),
            _ => None,
        }
    }

    /// Maps a Modbus function code to the point type it addresses.
    ///
    /// Covers both read and write codes: 1/5/15 → coil, 2 → input,
    /// 3/6/16 → holding register, 4 → input register.
    pub const fn from_function_code(code: u8) -> Option<RegisterType> {
        match code {
            1 | 5 | 15 => Some(RegisterType::Coil),
            2 => Some(RegisterType::Input),
            3 | 6 | 16 => Some(RegisterType::HoldingRegister),
            4 => Some(RegisterType::InputRegister),
            _ => None,
        }
    }
}

impl fmt::Display for RegisterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RegisterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coil" => Ok(RegisterType::Coil),
            "input" => Ok(RegisterType::Input),
            "holding_register" => Ok(RegisterType::HoldingRegister),
            "input_register" => Ok(RegisterType::InputRegister),
            other => Err(format!("unknown point type: {other}")),
        }
    }
}

// =============================================================================
// Data Kinds
// =============================================================================

/// The logical numeric encoding of a point's registers.
///
/// Points store their data type as a free string; [`DataKind::parse`] maps
/// the known names (and their historical aliases) onto this enum. Unknown
/// names are not an error: the codec passes raw values through for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// Boolean (coils and discrete inputs).
    Bool,
    /// Signed 8-bit in the low byte of a register.
    Int8,
    /// Signed 16-bit.
    Int16,
    /// Signed 32-bit.
    Int32,
    /// Unsigned 8-bit.
    UInt8,
    /// Unsigned 16-bit.
    UInt16,
    /// Unsigned 32-bit.
    UInt32,
    /// IEEE-754 single precision.
    Float32,
    /// IEEE-754 double precision.
    Float64,
}

impl DataKind {
    /// Parses a data-type name, accepting the historical aliases
    /// (`short`, `int`, `long`, `byte`, `word`, `float`, `real`, `double`
    /// and the rest of the PLC-vendor vocabulary).
    ///
    /// Returns `None` for unknown names; callers treat that as
    /// "pass the raw value through".
    pub fn parse(name: &str) -> Option<DataKind> {
        match name.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Some(DataKind::Bool),
            "int8" => Some(DataKind::Int8),
            "int16" | "short" => Some(DataKind::Int16),
            "int32" | "int" | "long" => Some(DataKind::Int32),
            "uint8" | "byte" => Some(DataKind::UInt8),
            "uint16" | "ushort" | "word" => Some(DataKind::UInt16),
            "uint32" | "uint" | "ulong" | "dword" => Some(DataKind::UInt32),
            "float32" | "float" | "real" => Some(DataKind::Float32),
            "float64" | "double" => Some(DataKind::Float64),
            _ => None,
        }
    }

    /// Returns the canonical name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataKind::Bool => "bool",
            DataKind::Int8 => "int8",
            DataKind::Int16 => "int16",
            DataKind::Int32 => "int32",
            DataKind::UInt8 => "uint8",
            DataKind::UInt16 => "uint16",
            DataKind::UInt32 => "uint32",
            DataKind::Float32 => "float32",
            DataKind::Float64 => "float64",
        }
    }

    /// Returns `true` for the floating-point kinds.
    pub const fn is_float(&self) -> bool {
        matches!(self, DataKind::Float32 | DataKind::Float64)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Values
// =============================================================================

/// A decoded point value.
///
/// Serializes untagged, so JSON output looks like the plain scalar or list
/// the consuming layer expects (`true`, `42`, `3.14`, `[1, 2]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean (coil/discrete state).
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating point.
    Float(f64),
    /// Per-register decoded sequence (multi-register batch reads and
    /// raw passthrough).
    Array(Vec<Value>),
}

impl Value {
    /// Returns `true` for scalar numeric values (not bool, not array).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::UInt(_) | Value::Float(_))
    }

    /// Numeric view of the value, if it is a scalar number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean view, if the value is a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short name of the variant, for logs and error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Array(_) => "array",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

// =============================================================================
// Controllers
// =============================================================================

/// A physical or virtual Modbus TCP device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Controller {
    /// Stable identifier.
    pub id: ControllerId,
    /// Human-readable name.
    pub name: String,
    /// Hostname or IP address.
    pub host: String,
    /// TCP port (1-65535).
    pub port: u16,
    /// Connect/request timeout in seconds.
    pub timeout: u64,
    /// Last-known reachability. Mutated only by pool activity and
    /// explicit test/update operations.
    pub status: bool,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// Last update time (UTC).
    pub updated_at: DateTime<Utc>,
}

impl Controller {
    /// Materializes a new controller record from creation fields.
    ///
    /// Assigns a fresh id and timestamps. Reachability starts `false`
    /// until a connection attempt proves otherwise.
    pub fn create(new: NewController) -> Self {
        let now = Utc::now();
        Self {
            id: ControllerId::generate(),
            name: new.name,
            host: new.host,
            port: new.port,
            timeout: new.timeout,
            status: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the `host:port` endpoint string.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the timeout as a [`Duration`].
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Applies a partial update in place, bumping `updated_at`.
    pub fn apply(&mut self, update: ControllerUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(host) = update.host {
            self.host = host;
        }
        if let Some(port) = update.port {
            self.port = port;
        }
        if let Some(timeout) = update.timeout {
            self.timeout = timeout;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

/// Fields for creating a controller. The store assigns the id and
/// timestamps; new controllers start with `status = false` until a
/// connection attempt proves otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewController {
    /// Human-readable name.
    pub name: String,
    /// Hostname or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Connect/request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// Partial controller update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerUpdate {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New host.
    #[serde(default)]
    pub host: Option<String>,
    /// New port.
    #[serde(default)]
    pub port: Option<u16>,
    /// New timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
    /// New reachability status.
    #[serde(default)]
    pub status: Option<bool>,
}

impl ControllerUpdate {
    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.host.is_none()
            && self.port.is_none()
            && self.timeout.is_none()
            && self.status.is_none()
    }
}

/// Listing filter for controllers.
#[derive(Debug, Clone, Default)]
pub struct ControllerFilter {
    /// Match on reachability status.
    pub status: Option<bool>,
    /// Case-insensitive substring match on the name.
    pub name: Option<String>,
}

impl ControllerFilter {
    /// Filter matching only controllers with the given reachability status.
    pub fn with_status(status: bool) -> Self {
        Self {
            status: Some(status),
            name: None,
        }
    }

    /// Returns `true` if the controller passes the filter.
    pub fn matches(&self, controller: &Controller) -> bool {
        if let Some(status) = self.status {
            if controller.status != status {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if !controller
                .name
                .to_lowercase()
                .contains(&name.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// Points
// =============================================================================

/// A single addressable value on a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Stable identifier.
    pub id: PointId,
    /// Owning controller.
    pub controller_id: ControllerId,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Point type.
    #[serde(rename = "type")]
    pub point_type: RegisterType,
    /// Logical numeric encoding (free string; see [`DataKind::parse`]).
    pub data_type: String,
    /// Register or coil offset.
    pub address: u16,
    /// Register count (1, 2, or 4 drive multi-register decoding).
    pub len: u16,
    /// Device sub-address on the shared TCP connection.
    pub unit_id: u8,
    /// Optional arithmetic formula over the decoded value (variable `x`).
    #[serde(default)]
    pub formula: Option<String>,
    /// Display unit.
    #[serde(default)]
    pub unit: Option<String>,
    /// Lower validation bound.
    #[serde(default)]
    pub min_value: Option<f64>,
    /// Upper validation bound.
    #[serde(default)]
    pub max_value: Option<f64>,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// Last update time (UTC).
    pub updated_at: DateTime<Utc>,
}

impl Point {
    /// Materializes a new point record from creation fields.
    pub fn create(controller_id: ControllerId, new: NewPoint) -> Self {
        let now = Utc::now();
        Self {
            id: PointId::generate(),
            controller_id,
            name: new.name,
            description: new.description,
            point_type: new.point_type,
            data_type: new.data_type,
            address: new.address,
            len: new.len,
            unit_id: new.unit_id,
            formula: new.formula,
            unit: new.unit,
            min_value: new.min_value,
            max_value: new.max_value,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the identity tuple that makes this point unique within
    /// its controller.
    pub fn identity(&self) -> PointKey {
        PointKey {
            address: self.address,
            point_type: self.point_type,
            unit_id: self.unit_id,
        }
    }

    /// Returns the parsed data kind, if the name is known.
    pub fn data_kind(&self) -> Option<DataKind> {
        DataKind::parse(&self.data_type)
    }

    /// Applies a partial update in place, bumping `updated_at`.
    pub fn apply(&mut self, update: PointUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(point_type) = update.point_type {
            self.point_type = point_type;
        }
        if let Some(data_type) = update.data_type {
            self.data_type = data_type;
        }
        if let Some(address) = update.address {
            self.address = address;
        }
        if let Some(len) = update.len {
            self.len = len;
        }
        if let Some(unit_id) = update.unit_id {
            self.unit_id = unit_id;
        }
        if let Some(formula) = update.formula {
            self.formula = Some(formula);
        }
        if let Some(unit) = update.unit {
            self.unit = Some(unit);
        }
        if let Some(min_value) = update.min_value {
            self.min_value = Some(min_value);
        }
        if let Some(max_value) = update.max_value {
            self.max_value = Some(max_value);
        }
        self.updated_at = Utc::now();
    }
}

/// The per-controller identity tuple of a point: `(address, type, unit_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointKey {
    /// Register or coil offset.
    pub address: u16,
    /// Point type.
    pub point_type: RegisterType,
    /// Device sub-address.
    pub unit_id: u8,
}

impl fmt::Display for PointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(address={}, type={}, unit={})",
            self.address, self.point_type, self.unit_id
        )
    }
}

/// Fields for creating a point. The owning controller comes from the
/// call context; the store assigns the id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPoint {
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Point type.
    #[serde(rename = "type")]
    pub point_type: RegisterType,
    /// Logical numeric encoding.
    pub data_type: String,
    /// Register or coil offset.
    pub address: u16,
    /// Register count.
    #[serde(default = "default_len")]
    pub len: u16,
    /// Device sub-address.
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    /// Optional formula.
    #[serde(default)]
    pub formula: Option<String>,
    /// Display unit.
    #[serde(default)]
    pub unit: Option<String>,
    /// Lower validation bound.
    #[serde(default)]
    pub min_value: Option<f64>,
    /// Upper validation bound.
    #[serde(default)]
    pub max_value: Option<f64>,
}

impl NewPoint {
    /// Returns the identity tuple this point would occupy.
    pub fn identity(&self) -> PointKey {
        PointKey {
            address: self.address,
            point_type: self.point_type,
            unit_id: self.unit_id,
        }
    }
}

/// Partial point update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointUpdate {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New point type (changes the identity tuple).
    #[serde(default, rename = "type")]
    pub point_type: Option<RegisterType>,
    /// New data type.
    #[serde(default)]
    pub data_type: Option<String>,
    /// New address (changes the identity tuple).
    #[serde(default)]
    pub address: Option<u16>,
    /// New register count.
    #[serde(default)]
    pub len: Option<u16>,
    /// New unit id (changes the identity tuple).
    #[serde(default)]
    pub unit_id: Option<u8>,
    /// New formula.
    #[serde(default)]
    pub formula: Option<String>,
    /// New display unit.
    #[serde(default)]
    pub unit: Option<String>,
    /// New lower bound.
    #[serde(default)]
    pub min_value: Option<f64>,
    /// New upper bound.
    #[serde(default)]
    pub max_value: Option<f64>,
}

// =============================================================================
// Samples
// =============================================================================

/// A timestamped point value handed to the time-series sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Owning controller.
    pub controller_id: ControllerId,
    /// Controller display name.
    pub controller_name: String,
    /// Source point.
    pub point_id: PointId,
    /// Point display name.
    pub point_name: String,
    /// Final (formula-applied) value.
    pub value: Value,
    /// Display unit, if configured.
    pub unit: Option<String>,
    /// Read time (UTC).
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    /// Creates a sample stamped with the current time.
    pub fn new(
        controller: &Controller,
        point: &Point,
        value: Value,
    ) -> Self {
        Self {
            controller_id: controller.id.clone(),
            controller_name: controller.name.clone(),
            point_id: point.id.clone(),
            point_name: point.name.clone(),
            value,
            unit: point.unit.clone(),
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// Defaults
// =============================================================================

fn default_timeout() -> u64 {
    10
}

fn default_len() -> u16 {
    1
}

fn default_unit_id() -> u8 {
    1
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_type_function_codes() {
        assert_eq!(RegisterType::Coil.read_function_code(), 1);
        assert_eq!(RegisterType::Input.read_function_code(), 2);
        assert_eq!(RegisterType::HoldingRegister.read_function_code(), 3);
        assert_eq!(RegisterType::InputRegister.read_function_code(), 4);

        assert_eq!(RegisterType::Coil.write_function_code(), Some(5));
        assert_eq!(RegisterType::HoldingRegister.write_function_code(), Some(6));
        assert_eq!(RegisterType::Input.write_function_code(), None);
        assert_eq!(RegisterType::InputRegister.write_function_code(), None);
    }

    #[test]
    fn test_register_type_from_function_code() {
        assert_eq!(RegisterType::from_function_code(1), Some(RegisterType::Coil));
        assert_eq!(RegisterType::from_function_code(5), Some(RegisterType::Coil));
        assert_eq!(RegisterType::from_function_code(15), Some(RegisterType::Coil));
        assert_eq!(RegisterType::from_function_code(2), Some(RegisterType::Input));
        assert_eq!(
            RegisterType::from_function_code(3),
            Some(RegisterType::HoldingRegister)
        );
        assert_eq!(
            RegisterType::from_function_code(6),
            Some(RegisterType::HoldingRegister)
        );
        assert_eq!(
            RegisterType::from_function_code(16),
            Some(RegisterType::HoldingRegister)
        );
        assert_eq!(
            RegisterType::from_function_code(4),
            Some(RegisterType::InputRegister)
        );
        assert_eq!(RegisterType::from_function_code(99), None);
    }

    #[test]
    fn test_register_type_writability() {
        assert!(RegisterType::Coil.is_writable());
        assert!(RegisterType::HoldingRegister.is_writable());
        assert!(!RegisterType::Input.is_writable());
        assert!(!RegisterType::InputRegister.is_writable());
    }

    #[test]
    fn test_register_type_round_trip() {
        for rt in RegisterType::ALL {
            assert_eq!(rt.as_str().parse::<RegisterType>().unwrap(), rt);
        }
        assert!("register".parse::<RegisterType>().is_err());
    }

    #[test]
    fn test_register_type_serde() {
        let json = serde_json::to_string(&RegisterType::HoldingRegister).unwrap();
        assert_eq!(json, "\"holding_register\"");
        let back: RegisterType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RegisterType::HoldingRegister);
    }

    #[test]
    fn test_data_kind_aliases() {
        assert_eq!(DataKind::parse("bool"), Some(DataKind::Bool));
        assert_eq!(DataKind::parse("boolean"), Some(DataKind::Bool));
        assert_eq!(DataKind::parse("short"), Some(DataKind::Int16));
        assert_eq!(DataKind::parse("int"), Some(DataKind::Int32));
        assert_eq!(DataKind::parse("long"), Some(DataKind::Int32));
        assert_eq!(DataKind::parse("real"), Some(DataKind::Float32));
        assert_eq!(DataKind::parse("float"), Some(DataKind::Float32));
        assert_eq!(DataKind::parse("double"), Some(DataKind::Float64));
        assert_eq!(DataKind::parse("word"), Some(DataKind::UInt16));
        assert_eq!(DataKind::parse("dword"), Some(DataKind::UInt32));
        assert_eq!(DataKind::parse("byte"), Some(DataKind::UInt8));
        assert_eq!(DataKind::parse("FLOAT32"), Some(DataKind::Float32));
        assert_eq!(DataKind::parse("string"), None);
        assert_eq!(DataKind::parse(""), None);
    }

    #[test]
    fn test_value_numeric_views() {
        assert_eq!(Value::Int(-5).as_f64(), Some(-5.0));
        assert_eq!(Value::UInt(10).as_f64(), Some(10.0));
        assert_eq!(Value::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Bool(true).as_f64(), None);
        assert!(!Value::Bool(true).is_numeric());
        assert!(!Value::Array(vec![Value::Int(1)]).is_numeric());
        assert!(Value::Float(0.0).is_numeric());
    }

    #[test]
    fn test_value_untagged_serde() {
        assert_eq!(serde_json::to_string(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&Value::Int(-3)).unwrap(), "-3");
        assert_eq!(serde_json::to_string(&Value::Float(1.5)).unwrap(), "1.5");
        assert_eq!(
            serde_json::to_string(&Value::Array(vec![Value::UInt(1), Value::UInt(2)])).unwrap(),
            "[1,2]"
        );
    }

    #[test]
    fn test_controller_endpoint() {
        let now = Utc::now();
        let controller = Controller {
            id: ControllerId::new("c1"),
            name: "Boiler PLC".to_string(),
            host: "10.0.0.20".to_string(),
            port: 502,
            timeout: 10,
            status: false,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(controller.endpoint(), "10.0.0.20:502");
        assert_eq!(controller.timeout_duration(), Duration::from_secs(10));
    }

    #[test]
    fn test_controller_filter() {
        let now = Utc::now();
        let controller = Controller {
            id: ControllerId::new("c1"),
            name: "Boiler PLC".to_string(),
            host: "10.0.0.20".to_string(),
            port: 502,
            timeout: 10,
            status: true,
            created_at: now,
            updated_at: now,
        };

        assert!(ControllerFilter::default().matches(&controller));
        assert!(ControllerFilter {
            status: Some(true),
            name: Some("boiler".to_string()),
        }
        .matches(&controller));
        assert!(!ControllerFilter {
            status: Some(false),
            name: None,
        }
        .matches(&controller));
        assert!(!ControllerFilter {
            status: None,
            name: Some("chiller".to_string()),
        }
        .matches(&controller));
    }

    #[test]
    fn test_new_point_defaults() {
        let json = r#"{
            "name": "temp",
            "type": "holding_register",
            "data_type": "uint16",
            "address": 100
        }"#;
        let point: NewPoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.len, 1);
        assert_eq!(point.unit_id, 1);
        assert!(point.formula.is_none());
    }

    #[test]
    fn test_point_identity() {
        let a = NewPoint {
            name: "a".to_string(),
            description: None,
            point_type: RegisterType::Coil,
            data_type: "bool".to_string(),
            address: 7,
            len: 1,
            unit_id: 2,
            formula: None,
            unit: None,
            min_value: None,
            max_value: None,
        };
        let key = a.identity();
        assert_eq!(key.address, 7);
        assert_eq!(key.point_type, RegisterType::Coil);
        assert_eq!(key.unit_id, 2);
        assert_eq!(key.to_string(), "(address=7, type=coil, unit=2)");

        let point = Point::create(ControllerId::new("c1"), a);
        assert_eq!(point.identity(), key);
        assert_eq!(point.controller_id.as_str(), "c1");
    }

    #[test]
    fn test_apply_partial_update() {
        let mut controller = Controller::create(NewController {
            name: "plc".to_string(),
            host: "10.0.0.1".to_string(),
            port: 502,
            timeout: 10,
        });
        assert!(!controller.status);

        controller.apply(ControllerUpdate {
            name: Some("plc-renamed".to_string()),
            port: Some(1502),
            ..Default::default()
        });
        assert_eq!(controller.name, "plc-renamed");
        assert_eq!(controller.port, 1502);
        assert_eq!(controller.host, "10.0.0.1");
        assert_eq!(controller.timeout, 10);
    }

    #[test]
    fn test_id_generation_unique() {
        let a = ControllerId::generate();
        let b = ControllerId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }
}
