// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Data Builders
//!
//! Fluent builders for controllers and points. Every setter consumes and
//! returns the builder, so test setup reads as one chain:
//!
//! ```rust
//! use tether_tests::prelude::*;
//!
//! let point = PointBuilder::new()
//!     .name("supply_temp")
//!     .holding_register()
//!     .data_type("float32")
//!     .address(100)
//!     .len(2)
//!     .formula("x * 0.1")
//!     .build_new();
//! assert_eq!(point.len, 2);
//! ```

use tether_core::{
    Controller, ControllerId, NewController, NewPoint, Point, RegisterType,
};

// =============================================================================
// Controller Builder
// =============================================================================

/// Builder for [`Controller`] and [`NewController`] records.
///
/// Defaults to `test-plc` on `127.0.0.1:502` with a one-second timeout,
/// marked unreachable.
#[derive(Debug, Clone)]
pub struct ControllerBuilder {
    name: String,
    host: String,
    port: u16,
    timeout: u64,
    status: bool,
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self {
            name: "test-plc".to_string(),
            host: "127.0.0.1".to_string(),
            port: 502,
            timeout: 1,
            status: false,
        }
    }
}

impl ControllerBuilder {
    /// Creates a builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the TCP port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the timeout in seconds.
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Marks the controller reachable.
    pub fn reachable(mut self) -> Self {
        self.status = true;
        self
    }

    /// Builds the creation fields.
    pub fn build_new(self) -> NewController {
        NewController {
            name: self.name,
            host: self.host,
            port: self.port,
            timeout: self.timeout,
        }
    }

    /// Builds a full controller record with a fresh id.
    pub fn build(self) -> Controller {
        let status = self.status;
        let mut controller = Controller::create(self.build_new());
        controller.status = status;
        controller
    }
}

// =============================================================================
// Point Builder
// =============================================================================

/// Builder for [`Point`] and [`NewPoint`] records.
///
/// Defaults to a single `uint16` holding register at address 0 on unit 1.
#[derive(Debug, Clone)]
pub struct PointBuilder {
    name: String,
    description: Option<String>,
    point_type: RegisterType,
    data_type: String,
    address: u16,
    len: u16,
    unit_id: u8,
    formula: Option<String>,
    unit: Option<String>,
    min_value: Option<f64>,
    max_value: Option<f64>,
}

impl Default for PointBuilder {
    fn default() -> Self {
        Self {
            name: "point".to_string(),
            description: None,
            point_type: RegisterType::HoldingRegister,
            data_type: "uint16".to_string(),
            address: 0,
            len: 1,
            unit_id: 1,
            formula: None,
            unit: None,
            min_value: None,
            max_value: None,
        }
    }
}

impl PointBuilder {
    /// Creates a builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the point type.
    pub fn point_type(mut self, point_type: RegisterType) -> Self {
        self.point_type = point_type;
        self
    }

    /// Shorthand for a coil with `bool` data type.
    pub fn coil(mut self) -> Self {
        self.point_type = RegisterType::Coil;
        self.data_type = "bool".to_string();
        self
    }

    /// Shorthand for a discrete input with `bool` data type.
    pub fn discrete_input(mut self) -> Self {
        self.point_type = RegisterType::Input;
        self.data_type = "bool".to_string();
        self
    }

    /// Shorthand for a holding register.
    pub fn holding_register(mut self) -> Self {
        self.point_type = RegisterType::HoldingRegister;
        self
    }

    /// Shorthand for an input register.
    pub fn input_register(mut self) -> Self {
        self.point_type = RegisterType::InputRegister;
        self
    }

    /// Sets the data type name.
    pub fn data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }

    /// Sets the register address.
    pub fn address(mut self, address: u16) -> Self {
        self.address = address;
        self
    }

    /// Sets the register count.
    pub fn len(mut self, len: u16) -> Self {
        self.len = len;
        self
    }

    /// Sets the unit id.
    pub fn unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Sets the conversion formula.
    pub fn formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    /// Sets the display unit.
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets both validation bounds.
    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    /// Builds the creation fields.
    pub fn build_new(self) -> NewPoint {
        NewPoint {
            name: self.name,
            description: self.description,
            point_type: self.point_type,
            data_type: self.data_type,
            address: self.address,
            len: self.len,
            unit_id: self.unit_id,
            formula: self.formula,
            unit: self.unit,
            min_value: self.min_value,
            max_value: self.max_value,
        }
    }

    /// Builds a full point record owned by `controller_id`.
    pub fn build(self, controller_id: &ControllerId) -> Point {
        Point::create(controller_id.clone(), self.build_new())
    }
}
