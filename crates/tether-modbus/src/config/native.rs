// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Native interchange format.
//!
//! A direct projection of one controller and its point list, with the
//! same field names and defaults the create APIs use (`timeout` 10,
//! `len` 1, `unit_id` 1). The import side is lenient about the
//! envelope: only the `controller` and `points` sections are required,
//! so hand-written files stay short.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tether_core::{Controller, NewController, NewPoint, Point};

/// Native-format configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeConfig {
    /// Format tag, always `"native"` on export.
    #[serde(default = "native_tag")]
    pub format: String,
    /// Export timestamp; absent on hand-written files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_time: Option<DateTime<Utc>>,
    /// The controller section.
    pub controller: NewController,
    /// The point list.
    pub points: Vec<NewPoint>,
}

fn native_tag() -> String {
    "native".to_string()
}

impl NativeConfig {
    /// Builds an export document from a stored controller and its points.
    pub fn export(controller: &Controller, points: &[Point]) -> Self {
        Self {
            format: native_tag(),
            export_time: Some(Utc::now()),
            controller: NewController {
                name: controller.name.clone(),
                host: controller.host.clone(),
                port: controller.port,
                timeout: controller.timeout,
            },
            points: points.iter().map(point_entry).collect(),
        }
    }
}

fn point_entry(point: &Point) -> NewPoint {
    NewPoint {
        name: point.name.clone(),
        description: point.description.clone(),
        point_type: point.point_type,
        data_type: point.data_type.clone(),
        address: point.address,
        len: point.len,
        unit_id: point.unit_id,
        formula: point.formula.clone(),
        unit: point.unit.clone(),
        min_value: point.min_value,
        max_value: point.max_value,
    }
}

// =============================================================================
// Tests
// =============================================================================
