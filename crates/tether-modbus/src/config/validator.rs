// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Structural validation of interchange payloads before import.
//!
//! Validation answers one question: is this document shaped like the
//! format the caller declared? The most common user mistake, uploading
//! a file under the wrong format tag, is caught by looking for the
//! other format's markers first. Field-level type errors are left to
//! deserialization. Every violation raises a `ConfigFormat` error with
//! a message naming the offending location; there is no silent-false
//! path.

use serde_json::Value as Json;

use tether_core::{IntegrationError, IntegrationResult, RegisterType};

use super::ConfigFormat;

/// Validates a payload against the declared format.
pub fn validate(config: &Json, format: ConfigFormat) -> IntegrationResult<()> {
    match format {
        ConfigFormat::Native => validate_native(config),
        ConfigFormat::Thingsboard => validate_thingsboard(config),
    }
}

fn validate_native(config: &Json) -> IntegrationResult<()> {
    if config.get("master").and_then(|m| m.get("slaves")).is_some() {
        return Err(IntegrationError::config_format(
            "configuration appears to be in ThingsBoard format, but native was requested; \
             use the 'thingsboard' format for this file",
        ));
    }

    let (Some(controller), Some(points)) = (config.get("controller"), config.get("points")) else {
        return Err(IntegrationError::config_format(
            "missing 'controller' and 'points' sections in native format",
        ));
    };

    for field in ["name", "host", "port"] {
        if controller.get(field).is_none() {
            return Err(IntegrationError::config_format(format!(
                "missing required field '{field}' in controller"
            )));
        }
    }

    let Some(points) = points.as_array() else {
        return Err(IntegrationError::config_format("'points' must be a list"));
    };

    for (index, point) in points.iter().enumerate() {
        for field in ["name", "type", "data_type", "address"] {
            if point.get(field).is_none() {
                return Err(IntegrationError::config_format(format!(
                    "point {index}: missing required field '{field}'"
                )));
            }
        }

        let kind = point.get("type").and_then(Json::as_str).unwrap_or_default();
        if kind.parse::<RegisterType>().is_err() {
            return Err(IntegrationError::config_format(format!(
                "point {index}: invalid type '{kind}'"
            )));
        }
    }

    Ok(())
}

fn validate_thingsboard(config: &Json) -> IntegrationResult<()> {
    if config.get("controller").is_some() && config.get("points").is_some() {
        return Err(IntegrationError::config_format(
            "configuration appears to be in native format, but thingsboard was requested; \
             use the 'native' format for this file",
        ));
    }

    let Some(master) = config.get("master") else {
        return Err(IntegrationError::config_format(
            "missing 'master' section in ThingsBoard format",
        ));
    };
    let Some(slaves) = master.get("slaves") else {
        return Err(IntegrationError::config_format(
            "missing 'slaves' section in master",
        ));
    };
    let Some(slaves) = slaves.as_array() else {
        return Err(IntegrationError::config_format("'slaves' must be a list"));
    };

    if slaves.is_empty() {
        return Err(IntegrationError::config_format(
            "no slaves found in ThingsBoard configuration",
        ));
    }
    if slaves.len() > 1 {
        return Err(IntegrationError::config_format(format!(
            "only single controller import is supported, found {} slaves",
            slaves.len()
        )));
    }

    for (index, slave) in slaves.iter().enumerate() {
        for field in ["host", "port", "deviceName"] {
            if slave.get(field).is_none() {
                return Err(IntegrationError::config_format(format!(
                    "slave {index}: missing required field '{field}'"
                )));
            }
        }

        for section in ["attributes", "timeseries", "rpc"] {
            let Some(items) = slave.get(section).and_then(Json::as_array) else {
                continue;
            };
            for (item_index, item) in items.iter().enumerate() {
                for field in ["tag", "functionCode", "address"] {
                    if item.get(field).is_none() {
                        return Err(IntegrationError::config_format(format!(
                            "slave {index} {section} {item_index}: missing '{field}' field"
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
