// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Canonical controllers, points, and interchange documents. Fixtures
//! are plain associated functions so a test can take one as-is or feed
//! it through a builder for variations.

use serde_json::json;

use tether_core::{NewController, NewPoint, RegisterType};

// =============================================================================
// Controller Fixtures
// =============================================================================

/// Stock controller definitions.
pub struct ControllerFixtures;

impl ControllerFixtures {
    /// A boiler-room PLC on a private subnet. Nothing listens there,
    /// which is exactly the point for unreachable-path tests.
    pub fn boiler() -> NewController {
        NewController {
            name: "Boiler PLC".to_string(),
            host: "192.168.10.5".to_string(),
            port: 502,
            timeout: 10,
        }
    }

    /// A second stock device for multi-controller scenarios.
    pub fn chiller() -> NewController {
        NewController {
            name: "Chiller PLC".to_string(),
            host: "192.168.10.6".to_string(),
            port: 502,
            timeout: 10,
        }
    }

    /// A loopback controller pointed at a simulator port, with a short
    /// timeout so failure paths resolve quickly.
    pub fn local(port: u16) -> NewController {
        NewController {
            name: "bench-plc".to_string(),
            host: "127.0.0.1".to_string(),
            port,
            timeout: 1,
        }
    }
}

// =============================================================================
// Point Fixtures
// =============================================================================

/// Stock point definitions covering every register type and the common
/// data-type shapes.
pub struct PointFixtures;

impl PointFixtures {
    /// Two-register float32 temperature with a display unit.
    pub fn temperature() -> NewPoint {
        NewPoint {
            name: "supply_temp".to_string(),
            description: Some("supply air temperature".to_string()),
            point_type: RegisterType::HoldingRegister,
            data_type: "float32".to_string(),
            address: 100,
            len: 2,
            unit_id: 1,
            formula: None,
            unit: Some("C".to_string()),
            min_value: None,
            max_value: None,
        }
    }

    /// Scaled uint16 pressure on an input register.
    pub fn pressure() -> NewPoint {
        NewPoint {
            name: "loop_pressure".to_string(),
            description: None,
            point_type: RegisterType::InputRegister,
            data_type: "uint16".to_string(),
            address: 200,
            len: 1,
            unit_id: 1,
            formula: Some("x * 0.01".to_string()),
            unit: Some("bar".to_string()),
            min_value: None,
            max_value: None,
        }
    }

    /// Discrete-input alarm bit.
    pub fn alarm() -> NewPoint {
        NewPoint {
            name: "filter_alarm".to_string(),
            description: None,
            point_type: RegisterType::Input,
            data_type: "bool".to_string(),
            address: 10,
            len: 1,
            unit_id: 1,
            formula: None,
            unit: None,
            min_value: None,
            max_value: None,
        }
    }

    /// Writable run coil.
    pub fn run_command() -> NewPoint {
        NewPoint {
            name: "run_command".to_string(),
            description: None,
            point_type: RegisterType::Coil,
            data_type: "bool".to_string(),
            address: 0,
            len: 1,
            unit_id: 1,
            formula: None,
            unit: None,
            min_value: None,
            max_value: None,
        }
    }

    /// Two-register uint32 pulse counter.
    pub fn counter() -> NewPoint {
        NewPoint {
            name: "pulse_counter".to_string(),
            description: None,
            point_type: RegisterType::HoldingRegister,
            data_type: "uint32".to_string(),
            address: 300,
            len: 2,
            unit_id: 1,
            formula: None,
            unit: None,
            min_value: None,
            max_value: None,
        }
    }

    /// Bounded writable setpoint.
    pub fn setpoint() -> NewPoint {
        NewPoint {
            name: "temp_setpoint".to_string(),
            description: None,
            point_type: RegisterType::HoldingRegister,
            data_type: "uint16".to_string(),
            address: 50,
            len: 1,
            unit_id: 1,
            formula: None,
            unit: Some("C".to_string()),
            min_value: Some(0.0),
            max_value: Some(100.0),
        }
    }

    /// All stock points, addresses disjoint.
    pub fn full_bank() -> Vec<NewPoint> {
        vec![
            Self::run_command(),
            Self::alarm(),
            Self::setpoint(),
            Self::temperature(),
            Self::pressure(),
            Self::counter(),
        ]
    }
}

// =============================================================================
// Configuration Documents
// =============================================================================

/// Canonical interchange payloads for import/export tests.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// A native document with one controller and three points, using
    /// the optional fields (formula, unit, bounds, description).
    pub fn native_document() -> String {
        json!({
            "controller": {
                "name": "Boiler PLC",
                "host": "192.168.10.5",
                "port": 502,
                "timeout": 10
            },
            "points": [
                {
                    "name": "supply_temp",
                    "description": "supply air temperature",
                    "type": "holding_register",
                    "data_type": "int16",
                    "address": 100,
                    "formula": "x * 0.1",
                    "unit": "C"
                },
                {
                    "name": "temp_setpoint",
                    "type": "holding_register",
                    "data_type": "uint16",
                    "address": 50,
                    "min_value": 0.0,
                    "max_value": 100.0
                },
                {
                    "name": "run_command",
                    "type": "coil",
                    "data_type": "bool",
                    "address": 0
                }
            ]
        })
        .to_string()
    }

    /// The smallest valid native document: required fields only.
    pub fn native_minimal() -> String {
        json!({
            "controller": {"name": "bare-plc", "host": "10.1.1.1", "port": 502},
            "points": [
                {"name": "reg", "type": "holding_register", "data_type": "uint16", "address": 1}
            ]
        })
        .to_string()
    }

    /// A single-slave gateway document whose sections fold into four
    /// points, with `supply_temp` merged from its timeseries and rpc
    /// entries.
    pub fn thingsboard_document() -> String {
        json!({
            "master": {
                "slaves": [{
                    "method": "socket",
                    "type": "tcp",
                    "host": "192.168.20.7",
                    "port": 502,
                    "timeout": 5,
                    "unitId": 2,
                    "deviceName": "Air Handler",
                    "deviceType": "HVAC Unit",
                    "attributes": [
                        {"tag": "filter_alarm", "type": "bits", "functionCode": 2,
                         "objectsCount": 1, "address": 10}
                    ],
                    "timeseries": [
                        {"tag": "supply_temp", "type": "int16", "functionCode": 3, "address": 100},
                        {"tag": "fan_speed", "type": "uint16", "functionCode": 4, "address": 200}
                    ],
                    "rpc": [
                        {"tag": "set_supply_temp", "type": "int16", "functionCode": 6, "address": 100},
                        {"tag": "enable", "type": "bits", "functionCode": 5, "address": 0}
                    ]
                }]
            }
        })
        .to_string()
    }

    /// A gateway document with two slaves; import rejects these.
    pub fn thingsboard_multi_slave() -> String {
        json!({
            "master": {
                "slaves": [
                    {"host": "10.2.0.1", "port": 502, "deviceName": "unit-a"},
                    {"host": "10.2.0.2", "port": 502, "deviceName": "unit-b"}
                ]
            }
        })
        .to_string()
    }
}
