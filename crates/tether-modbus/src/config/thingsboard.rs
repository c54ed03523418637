// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! ThingsBoard gateway interchange format.
//!
//! One slave per controller. A logical point is scattered across up to
//! three sections: `attributes` (bit points), `timeseries` (register
//! points) and `rpc` (write targets). Import folds entries sharing an
//! address and derived point type back into one point; export fans each
//! point out again.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use tether_core::{Controller, NewPoint, Point, RegisterType};

// =============================================================================
// Document Shapes
// =============================================================================

/// Top-level gateway document: `{"master": {"slaves": [...]}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TbDocument {
    /// The master section.
    pub master: TbMaster,
    /// Export timestamp; absent on files written by hand or by the
    /// gateway itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_time: Option<DateTime<Utc>>,
    /// Format tag, always `"thingsboard"` on export.
    #[serde(default = "thingsboard_tag")]
    pub format: String,
}

/// The `master` wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TbMaster {
    /// One slave per physical device.
    pub slaves: Vec<TbSlave>,
}

/// One gateway slave: endpoint metadata plus the three point sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TbSlave {
    /// Transport method, `"socket"` for TCP devices.
    #[serde(default = "default_method")]
    pub method: String,
    /// Socket type, `"tcp"`.
    #[serde(rename = "type", default = "default_transport")]
    pub transport: String,
    /// Device hostname or IP.
    pub host: String,
    /// Device TCP port.
    pub port: u16,
    /// Timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Gateway retry count; carried for round-trip fidelity.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Gateway poll period in milliseconds; carried for round-trip
    /// fidelity.
    #[serde(rename = "pollPeriod", default = "default_poll_period")]
    pub poll_period: u64,
    /// Modbus unit id shared by every entry of this slave.
    #[serde(rename = "unitId", default = "default_unit_id")]
    pub unit_id: u8,
    /// Device display name; becomes the controller name on import.
    #[serde(rename = "deviceName")]
    pub device_name: String,
    /// Device type label.
    #[serde(rename = "deviceType", default)]
    pub device_type: String,
    /// Bit points (coils, discrete inputs).
    #[serde(default)]
    pub attributes: Vec<TbItem>,
    /// Register points.
    #[serde(default)]
    pub timeseries: Vec<TbItem>,
    /// Write targets.
    #[serde(default)]
    pub rpc: Vec<TbItem>,
}

/// One entry in a slave section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TbItem {
    /// Entry name.
    pub tag: String,
    /// Coarse wire type (`bits`, `bytes`, `int16`, `float32`, ...).
    #[serde(rename = "type", default = "default_wire_type")]
    pub wire_type: String,
    /// Modbus function code; selects the point type.
    #[serde(rename = "functionCode")]
    pub function_code: u8,
    /// Register/bit count. Omitted on coil rpc entries.
    #[serde(
        rename = "objectsCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub objects_count: Option<u16>,
    /// Start address.
    pub address: u16,
}

fn thingsboard_tag() -> String {
    "thingsboard".to_string()
}

fn default_method() -> String {
    "socket".to_string()
}

fn default_transport() -> String {
    "tcp".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

fn default_poll_period() -> u64 {
    1000
}

fn default_unit_id() -> u8 {
    1
}

fn default_wire_type() -> String {
    "uint16".to_string()
}

// =============================================================================
// Import: Fold Sections Into Points
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Attributes,
    Timeseries,
    Rpc,
}

/// Maps a gateway wire type onto a point data type.
///
/// `bits` carries booleans and `bytes` carries bare registers; the rest
/// name widths directly. Unknown strings fall back to `uint16`.
fn wire_data_type(wire: &str) -> &'static str {
    match wire {
        "bits" => "bool",
        "bytes" => "uint16",
        "int16" => "int16",
        "uint16" => "uint16",
        "int32" => "int32",
        "uint32" => "uint32",
        "float32" => "float32",
        "float64" => "float64",
        "string" => "string",
        _ => "uint16",
    }
}

/// Folds a slave's sections into logical points.
///
/// Entries sharing `(address, derived point type)` merge into one
/// point. Entries with an unknown function code are skipped with a
/// warning. Section insertion order (attributes, timeseries, rpc) is
/// preserved so merge results are deterministic.
pub fn slave_points(slave: &TbSlave) -> Vec<NewPoint> {
    let entries = slave
        .attributes
        .iter()
        .map(|item| (Section::Attributes, item))
        .chain(slave.timeseries.iter().map(|item| (Section::Timeseries, item)))
        .chain(slave.rpc.iter().map(|item| (Section::Rpc, item)));

    let mut order: Vec<(u16, RegisterType)> = Vec::new();
    let mut merged: HashMap<(u16, RegisterType), Vec<(Section, &TbItem)>> = HashMap::new();

    for (section, item) in entries {
        let Some(point_type) = RegisterType::from_function_code(item.function_code) else {
            warn!(
                tag = %item.tag,
                function_code = item.function_code,
                "skipping entry with unsupported function code"
            );
            continue;
        };
        let key = (item.address, point_type);
        merged
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push((section, item));
    }

    order
        .iter()
        .map(|&(address, point_type)| {
            merged_point(address, point_type, slave.unit_id, &merged[&(address, point_type)])
        })
        .collect()
}

/// Builds one point from the entries that merged onto its key.
///
/// Name preference: a `timeseries` tag, then an `rpc` tag, then any
/// tag. Data type starts from the first entry's wire type; a 32-bit or
/// wider numeric wins outright, and `int16` narrows a plain `uint16`.
/// Length is the largest `objectsCount` seen.
fn merged_point(
    address: u16,
    point_type: RegisterType,
    unit_id: u8,
    items: &[(Section, &TbItem)],
) -> NewPoint {
    let name = items
        .iter()
        .find(|(section, item)| *section == Section::Timeseries && !item.tag.is_empty())
        .or_else(|| {
            items
                .iter()
                .find(|(section, item)| *section == Section::Rpc && !item.tag.is_empty())
        })
        .or_else(|| items.iter().find(|(_, item)| !item.tag.is_empty()))
        .map(|(_, item)| item.tag.clone())
        .unwrap_or_else(|| "Imported Point".to_string());

    let mut data_type = wire_data_type(&items[0].1.wire_type);
    for (_, item) in items {
        let mapped = wire_data_type(&item.wire_type);
        match mapped {
            "float32" | "float64" | "int32" | "uint32" => {
                data_type = mapped;
                break;
            }
            "int16" if data_type == "uint16" => data_type = "int16",
            _ => {}
        }
    }

    let len = items
        .iter()
        .map(|(_, item)| item.objects_count.unwrap_or(1))
        .max()
        .unwrap_or(1)
        .max(1);

    NewPoint {
        name,
        description: None,
        point_type,
        data_type: data_type.to_string(),
        address,
        len,
        unit_id,
        formula: None,
        unit: None,
        min_value: None,
        max_value: None,
    }
}

// =============================================================================
// Export: Fan Points Out Into Sections
// =============================================================================

/// Builds a gateway document from a stored controller and its points,
/// one slave per unit id.
pub fn export(controller: &Controller, points: &[Point]) -> TbDocument {
    let mut by_unit: BTreeMap<u8, Vec<&Point>> = BTreeMap::new();
    for point in points {
        by_unit.entry(point.unit_id).or_default().push(point);
    }

    let slaves = by_unit
        .into_iter()
        .map(|(unit_id, unit_points)| export_slave(controller, unit_id, &unit_points))
        .collect();

    TbDocument {
        master: TbMaster { slaves },
        export_time: Some(Utc::now()),
        format: thingsboard_tag(),
    }
}

fn export_slave(controller: &Controller, unit_id: u8, points: &[&Point]) -> TbSlave {
    let mut slave = TbSlave {
        method: default_method(),
        transport: default_transport(),
        host: controller.host.clone(),
        port: controller.port,
        timeout: controller.timeout,
        retries: default_retries(),
        poll_period: default_poll_period(),
        unit_id,
        device_name: controller.name.clone(),
        device_type: controller.name.to_lowercase().replace(' ', "_"),
        attributes: Vec::new(),
        timeseries: Vec::new(),
        rpc: Vec::new(),
    };

    for point in points {
        let read_item = TbItem {
            tag: point.name.clone(),
            wire_type: "bytes".to_string(),
            function_code: point.point_type.read_function_code(),
            objects_count: Some(point.len),
            address: point.address,
        };
        if point.point_type.is_bit() {
            slave.attributes.push(read_item);
        } else {
            slave.timeseries.push(read_item);
        }

        if let Some(write_code) = point.point_type.write_function_code() {
            slave.rpc.push(TbItem {
                tag: format!("set_{}", point.name),
                wire_type: "bytes".to_string(),
                function_code: write_code,
                // The gateway expects a count on register writes only.
                objects_count: (point.point_type == RegisterType::HoldingRegister)
                    .then_some(point.len),
                address: point.address,
            });
        }
    }

    slave
}

// =============================================================================
// Tests
// =============================================================================
