// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Import/export orchestration over storage.
//!
//! Import matches the incoming controller against stored ones by
//! `(host, port)` and applies the caller's [`ImportMode`]; every point
//! gets an individual outcome row and the controller-level status is
//! folded from those rows into a closed vocabulary the consuming layer
//! maps onto 200/207/400 responses.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::info;

use tether_core::{
    Controller, ControllerId, DeviceStore, IntegrationError, IntegrationResult, NewController,
    NewPoint, Point, PointId,
};

use super::{native::NativeConfig, thingsboard, validator, ConfigFormat, ImportMode};

// =============================================================================
// Report Shapes
// =============================================================================

/// Controller-level outcome of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// Controller and every point landed.
    Success,
    /// The controller already existed and skip mode left it alone.
    SkippedController,
    /// The controller-level operation failed.
    ControllerFailed,
    /// Every point already existed; nothing was written.
    SkippedPoints,
    /// The controller operation succeeded but no point landed.
    PointsFailed,
    /// Some points landed, some were skipped or failed.
    PartialSuccess,
}

/// Per-point outcome of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointImportStatus {
    /// Created or updated.
    Success,
    /// Identity duplicate left untouched.
    Skipped,
    /// Storage rejected the row.
    Failed,
}

/// One point's row in an import report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointImportOutcome {
    /// Stored id, when the row landed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_id: Option<PointId>,
    /// The imported point name.
    pub point_name: String,
    /// Row status.
    pub status: PointImportStatus,
    /// Human-readable outcome description.
    pub message: String,
}

/// Aggregate import report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    /// The affected controller, absent when it was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<ControllerId>,
    /// Controller name (stored name, or the document's when skipped).
    pub controller_name: String,
    /// Folded controller-level status.
    pub status: ImportStatus,
    /// Human-readable summary.
    pub message: String,
    /// Number of point rows processed.
    pub total_points: usize,
    /// Rows that landed.
    pub success_count: usize,
    /// Rows skipped as duplicates.
    pub skipped_count: usize,
    /// Rows that failed.
    pub failed_count: usize,
    /// Per-point rows, in document order.
    pub points: Vec<PointImportOutcome>,
}

/// An export payload plus its download metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ExportArtifact {
    /// Suggested filename: `modbus_<name>_<format>_<timestamp>.json`.
    pub filename: String,
    /// The exported controller's name.
    pub controller_name: String,
    /// The format the document is in.
    pub format: ConfigFormat,
    /// The document itself.
    pub config: Json,
}

// =============================================================================
// ConfigManager
// =============================================================================

/// Imports and exports device configurations.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    store: Arc<dyn DeviceStore>,
}

impl ConfigManager {
    /// Creates a manager over shared storage.
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    /// Exports a controller's configuration in the requested format.
    pub async fn export(
        &self,
        controller_id: &ControllerId,
        format: ConfigFormat,
    ) -> IntegrationResult<ExportArtifact> {
        let controller = self
            .store
            .controller(controller_id)
            .await?
            .ok_or_else(|| IntegrationError::controller_not_found(controller_id.as_str()))?;
        let points = self.store.points_for(controller_id, None).await?;

        let config = match format {
            ConfigFormat::Native => serde_json::to_value(NativeConfig::export(&controller, &points)),
            ConfigFormat::Thingsboard => {
                serde_json::to_value(thingsboard::export(&controller, &points))
            }
        }
        .map_err(|err| IntegrationError::config(format!("failed to serialize export: {err}")))?;

        let timestamp = Utc::now().format("%Y%m%d%H%M%S");
        let filename = format!("modbus_{}_{}_{}.json", controller.name, format, timestamp);

        info!(
            controller = %controller.name,
            %format,
            points = points.len(),
            "configuration exported"
        );
        Ok(ExportArtifact {
            filename,
            controller_name: controller.name,
            format,
            config,
        })
    }

    /// Imports a configuration payload (one controller per document).
    ///
    /// The payload is validated against the declared format before
    /// anything touches storage; a wrong format tag is rejected with a
    /// message naming the format the file actually looks like.
    pub async fn import(
        &self,
        payload: &str,
        format: ConfigFormat,
        mode: ImportMode,
    ) -> IntegrationResult<ImportReport> {
        let document: Json = serde_json::from_str(payload).map_err(|err| {
            IntegrationError::config_format(format!("payload is not valid JSON: {err}"))
        })?;
        validator::validate(&document, format)?;

        let (controller, points) = match format {
            ConfigFormat::Native => {
                let config: NativeConfig = serde_json::from_value(document).map_err(|err| {
                    IntegrationError::config_format(format!("invalid native configuration: {err}"))
                })?;
                (config.controller, config.points)
            }
            ConfigFormat::Thingsboard => {
                let config: thingsboard::TbDocument =
                    serde_json::from_value(document).map_err(|err| {
                        IntegrationError::config_format(format!(
                            "invalid ThingsBoard configuration: {err}"
                        ))
                    })?;
                // The validator guarantees exactly one slave.
                let slave = &config.master.slaves[0];
                let controller = NewController {
                    name: slave.device_name.clone(),
                    host: slave.host.clone(),
                    port: slave.port,
                    timeout: slave.timeout,
                };
                (controller, thingsboard::slave_points(slave))
            }
        };

        let report = self.process(controller, points, mode).await?;
        info!(
            controller = %report.controller_name,
            status = ?report.status,
            total = report.total_points,
            succeeded = report.success_count,
            skipped = report.skipped_count,
            failed = report.failed_count,
            "configuration imported"
        );
        Ok(report)
    }

    // =========================================================================
    // Import Processing
    // =========================================================================

    async fn process(
        &self,
        data: NewController,
        points: Vec<NewPoint>,
        mode: ImportMode,
    ) -> IntegrationResult<ImportReport> {
        let existing = self
            .store
            .controller_by_endpoint(&data.host, data.port)
            .await?;

        let outcome = match existing {
            None => self.import_fresh(data, points).await?,
            Some(controller) => match mode {
                ImportMode::SkipController => Outcome {
                    controller_id: None,
                    controller_name: data.name,
                    standing: Standing::Skipped,
                    rows: Vec::new(),
                },
                ImportMode::OverwriteController => {
                    self.overwrite_controller(controller, data, points).await?
                }
                ImportMode::SkipDuplicatesPoint => {
                    let rows = self.merge_points(&controller, points, false).await;
                    Outcome::from_rows(controller, rows)
                }
                ImportMode::OverwriteDuplicatesPoint => {
                    let rows = self.merge_points(&controller, points, true).await;
                    Outcome::from_rows(controller, rows)
                }
            },
        };

        Ok(finalize(outcome, mode))
    }

    /// No endpoint match: create the controller (unreachable until a
    /// sweep proves otherwise) and insert every point.
    async fn import_fresh(
        &self,
        data: NewController,
        points: Vec<NewPoint>,
    ) -> IntegrationResult<Outcome> {
        let controller = Controller::create(data);
        self.store.insert_controller(controller.clone()).await?;

        let mut rows = Vec::with_capacity(points.len());
        for new in points {
            let point = Point::create(controller.id.clone(), new);
            let row = match self.store.insert_point(point.clone()).await {
                Ok(()) => PointImportOutcome {
                    point_id: Some(point.id),
                    point_name: point.name,
                    status: PointImportStatus::Success,
                    message: "point created".to_string(),
                },
                Err(err) => PointImportOutcome {
                    point_id: None,
                    point_name: point.name,
                    status: PointImportStatus::Failed,
                    message: err.to_string(),
                },
            };
            rows.push(row);
        }

        Ok(Outcome {
            controller_id: Some(controller.id),
            controller_name: controller.name,
            standing: Standing::Ok,
            rows,
        })
    }

    /// Overwrite mode: update the controller's mutable fields, then
    /// atomically swap its whole point set for the imported one.
    async fn overwrite_controller(
        &self,
        existing: Controller,
        data: NewController,
        points: Vec<NewPoint>,
    ) -> IntegrationResult<Outcome> {
        let mut updated = existing.clone();
        updated.name = data.name;
        updated.timeout = data.timeout;
        updated.updated_at = Utc::now();
        let controller_name = updated.name.clone();

        if !self.store.update_controller(updated).await? {
            return Err(IntegrationError::controller_not_found(existing.id.as_str()));
        }

        let imported: Vec<Point> = points
            .into_iter()
            .map(|new| Point::create(existing.id.clone(), new))
            .collect();
        let rows: Vec<PointImportOutcome> = imported
            .iter()
            .map(|point| PointImportOutcome {
                point_id: Some(point.id.clone()),
                point_name: point.name.clone(),
                status: PointImportStatus::Success,
                message: "point created".to_string(),
            })
            .collect();

        // Identity collisions inside the document reject the whole
        // batch here and leave the previous set in place.
        self.store.replace_points(&existing.id, imported).await?;

        Ok(Outcome {
            controller_id: Some(existing.id),
            controller_name,
            standing: Standing::Ok,
            rows,
        })
    }

    /// Point-merge modes: walk the document's points against the stored
    /// set, skipping or updating identity matches.
    async fn merge_points(
        &self,
        controller: &Controller,
        points: Vec<NewPoint>,
        overwrite: bool,
    ) -> Vec<PointImportOutcome> {
        let mut rows = Vec::with_capacity(points.len());

        for new in points {
            let row = match self.store.find_point(&controller.id, &new.identity()).await {
                Ok(Some(_)) if !overwrite => PointImportOutcome {
                    point_id: None,
                    point_name: new.name,
                    status: PointImportStatus::Skipped,
                    message: "point already exists".to_string(),
                },
                Ok(Some(found)) => self.overwrite_point(found, new).await,
                Ok(None) => {
                    let point = Point::create(controller.id.clone(), new);
                    match self.store.insert_point(point.clone()).await {
                        Ok(()) => PointImportOutcome {
                            point_id: Some(point.id),
                            point_name: point.name,
                            status: PointImportStatus::Success,
                            message: "point created".to_string(),
                        },
                        Err(err) => PointImportOutcome {
                            point_id: None,
                            point_name: point.name,
                            status: PointImportStatus::Failed,
                            message: err.to_string(),
                        },
                    }
                }
                Err(err) => PointImportOutcome {
                    point_id: None,
                    point_name: new.name,
                    status: PointImportStatus::Failed,
                    message: err.to_string(),
                },
            };
            rows.push(row);
        }

        rows
    }

    /// Updates an identity match in place. The identity tuple itself
    /// (address, type, unit) never changes; only the descriptive and
    /// codec fields follow the document.
    async fn overwrite_point(&self, found: Point, new: NewPoint) -> PointImportOutcome {
        let mut updated = found.clone();
        updated.name = new.name.clone();
        updated.description = new.description;
        updated.data_type = new.data_type;
        updated.len = new.len;
        updated.formula = new.formula;
        updated.unit = new.unit;
        updated.min_value = new.min_value;
        updated.max_value = new.max_value;
        updated.updated_at = Utc::now();

        match self.store.update_point(updated).await {
            Ok(true) => PointImportOutcome {
                point_id: Some(found.id),
                point_name: new.name,
                status: PointImportStatus::Success,
                message: "point updated".to_string(),
            },
            Ok(false) => PointImportOutcome {
                point_id: None,
                point_name: new.name,
                status: PointImportStatus::Failed,
                message: "point vanished during import".to_string(),
            },
            Err(err) => PointImportOutcome {
                point_id: None,
                point_name: new.name,
                status: PointImportStatus::Failed,
                message: err.to_string(),
            },
        }
    }
}

// =============================================================================
// Status Folding
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Standing {
    Ok,
    Skipped,
    Failed,
}

struct Outcome {
    controller_id: Option<ControllerId>,
    controller_name: String,
    standing: Standing,
    rows: Vec<PointImportOutcome>,
}

impl Outcome {
    /// Derives the controller standing from merge rows: any landed row
    /// keeps the controller sound; uniformly skipped or uniformly
    /// failed rows mark it failed, which the final fold turns into
    /// `skipped_points` or `controller_failed`.
    fn from_rows(controller: Controller, rows: Vec<PointImportOutcome>) -> Self {
        let any_success = rows
            .iter()
            .any(|r| r.status == PointImportStatus::Success);
        let uniform = |status: PointImportStatus| {
            !rows.is_empty() && rows.iter().all(|r| r.status == status)
        };
        let standing = if any_success {
            Standing::Ok
        } else if uniform(PointImportStatus::Failed) || uniform(PointImportStatus::Skipped) {
            Standing::Failed
        } else {
            Standing::Ok
        };

        Self {
            controller_id: Some(controller.id),
            controller_name: controller.name,
            standing,
            rows,
        }
    }
}

/// Folds row counts and controller standing into the closed status
/// vocabulary.
fn finalize(outcome: Outcome, mode: ImportMode) -> ImportReport {
    let total_points = outcome.rows.len();
    let count = |status: PointImportStatus| {
        outcome.rows.iter().filter(|r| r.status == status).count()
    };
    let success_count = count(PointImportStatus::Success);
    let skipped_count = count(PointImportStatus::Skipped);
    let failed_count = count(PointImportStatus::Failed);

    let (status, message) = if outcome.standing == Standing::Skipped {
        if mode == ImportMode::SkipController {
            (ImportStatus::SkippedController, "controller already exists")
        } else {
            (ImportStatus::ControllerFailed, "controller import failed")
        }
    } else if success_count == 0 {
        if skipped_count == total_points && failed_count == 0 {
            (ImportStatus::SkippedPoints, "all points already exist")
        } else if outcome.standing == Standing::Ok {
            (ImportStatus::PointsFailed, "all points failed to import")
        } else {
            (ImportStatus::ControllerFailed, "controller failed to import")
        }
    } else if skipped_count > 0 || failed_count > 0 {
        (
            ImportStatus::PartialSuccess,
            "controller imported with partial success",
        )
    } else {
        (ImportStatus::Success, "controller imported successfully")
    };

    ImportReport {
        controller_id: outcome.controller_id,
        controller_name: outcome.controller_name,
        status,
        message: message.to_string(),
        total_points,
        success_count,
        skipped_count,
        failed_count,
        points: outcome.rows,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_core::MemoryStore;

    fn manager() -> (ConfigManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ConfigManager::new(store.clone()), store)
    }

    fn native_payload() -> String {
        json!({
            "controller": {"name": "plc", "host": "10.0.0.5", "port": 502, "timeout": 5},
            "points": [
                {"name": "temp", "type": "holding_register", "data_type": "int16",
                 "address": 1, "formula": "x * 0.1", "unit": "C"},
                {"name": "valve", "type": "coil", "data_type": "bool", "address": 2}
            ]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_fresh_import_creates_controller_and_points() {
        let (manager, store) = manager();

        let report = manager
            .import(&native_payload(), ConfigFormat::Native, ImportMode::SkipController)
            .await
            .unwrap();
        assert_eq!(report.status, ImportStatus::Success);
        assert_eq!(report.total_points, 2);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.controller_name, "plc");

        let id = report.controller_id.unwrap();
        let stored = store.controller(&id).await.unwrap().unwrap();
        // Imported controllers start unreachable until a sweep probes them.
        assert!(!stored.status);
        assert_eq!(stored.timeout, 5);
        assert_eq!(store.points_for(&id, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_skip_controller_leaves_everything_untouched() {
        let (manager, store) = manager();
        manager
            .import(&native_payload(), ConfigFormat::Native, ImportMode::SkipController)
            .await
            .unwrap();

        let report = manager
            .import(&native_payload(), ConfigFormat::Native, ImportMode::SkipController)
            .await
            .unwrap();
        assert_eq!(report.status, ImportStatus::SkippedController);
        assert!(report.controller_id.is_none());
        assert_eq!(report.total_points, 0);
        assert_eq!(store.point_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_overwrite_controller_replaces_point_set() {
        let (manager, store) = manager();
        manager
            .import(&native_payload(), ConfigFormat::Native, ImportMode::SkipController)
            .await
            .unwrap();

        let replacement = json!({
            "controller": {"name": "plc-renamed", "host": "10.0.0.5", "port": 502, "timeout": 9},
            "points": [
                {"name": "pressure", "type": "input_register", "data_type": "float32", "address": 30}
            ]
        })
        .to_string();

        let report = manager
            .import(&replacement, ConfigFormat::Native, ImportMode::OverwriteController)
            .await
            .unwrap();
        assert_eq!(report.status, ImportStatus::Success);

        let id = report.controller_id.unwrap();
        let stored = store.controller(&id).await.unwrap().unwrap();
        assert_eq!(stored.name, "plc-renamed");
        assert_eq!(stored.timeout, 9);
        // Endpoint identity is the match key and never changes.
        assert_eq!(stored.host, "10.0.0.5");

        let points = store.points_for(&id, None).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].name, "pressure");
    }

    #[tokio::test]
    async fn test_skip_duplicates_merges_new_points() {
        let (manager, store) = manager();
        manager
            .import(&native_payload(), ConfigFormat::Native, ImportMode::SkipController)
            .await
            .unwrap();

        let merge = json!({
            "controller": {"name": "plc", "host": "10.0.0.5", "port": 502},
            "points": [
                {"name": "temp", "type": "holding_register", "data_type": "int16", "address": 1},
                {"name": "extra", "type": "input", "data_type": "bool", "address": 50}
            ]
        })
        .to_string();

        let report = manager
            .import(&merge, ConfigFormat::Native, ImportMode::SkipDuplicatesPoint)
            .await
            .unwrap();
        assert_eq!(report.status, ImportStatus::PartialSuccess);
        assert_eq!(report.success_count, 1);
        assert_eq!(report.skipped_count, 1);
        assert_eq!(store.point_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_all_duplicates_reports_skipped_points() {
        let (manager, _) = manager();
        manager
            .import(&native_payload(), ConfigFormat::Native, ImportMode::SkipController)
            .await
            .unwrap();

        let report = manager
            .import(&native_payload(), ConfigFormat::Native, ImportMode::SkipDuplicatesPoint)
            .await
            .unwrap();
        assert_eq!(report.status, ImportStatus::SkippedPoints);
        assert_eq!(report.skipped_count, 2);
        assert_eq!(report.success_count, 0);
    }

    #[tokio::test]
    async fn test_overwrite_duplicates_updates_in_place() {
        let (manager, store) = manager();
        let first = manager
            .import(&native_payload(), ConfigFormat::Native, ImportMode::SkipController)
            .await
            .unwrap();
        let id = first.controller_id.unwrap();
        let before = store.points_for(&id, None).await.unwrap();
        let original = before.iter().find(|p| p.address == 1).unwrap().clone();

        let tweak = json!({
            "controller": {"name": "plc", "host": "10.0.0.5", "port": 502},
            "points": [
                {"name": "temp-renamed", "type": "holding_register", "data_type": "uint16",
                 "address": 1, "len": 2}
            ]
        })
        .to_string();

        let report = manager
            .import(&tweak, ConfigFormat::Native, ImportMode::OverwriteDuplicatesPoint)
            .await
            .unwrap();
        assert_eq!(report.status, ImportStatus::Success);

        let after = store.point(&original.id).await.unwrap().unwrap();
        // Same record, updated descriptive fields, untouched identity.
        assert_eq!(after.id, original.id);
        assert_eq!(after.name, "temp-renamed");
        assert_eq!(after.data_type, "uint16");
        assert_eq!(after.len, 2);
        assert_eq!(after.address, 1);
        assert_eq!(after.unit_id, original.unit_id);
    }

    #[tokio::test]
    async fn test_duplicate_rows_inside_document() {
        let (manager, _) = manager();
        let payload = json!({
            "controller": {"name": "plc", "host": "10.0.0.5", "port": 502},
            "points": [
                {"name": "a", "type": "coil", "data_type": "bool", "address": 1},
                {"name": "a-again", "type": "coil", "data_type": "bool", "address": 1}
            ]
        })
        .to_string();

        let report = manager
            .import(&payload, ConfigFormat::Native, ImportMode::SkipController)
            .await
            .unwrap();
        assert_eq!(report.status, ImportStatus::PartialSuccess);
        assert_eq!(report.success_count, 1);
        assert_eq!(report.failed_count, 1);
    }

    #[tokio::test]
    async fn test_wrong_format_tag_rejected_before_storage() {
        let (manager, store) = manager();
        let thingsboard = json!({
            "master": {"slaves": [
                {"host": "h", "port": 502, "deviceName": "plc"}
            ]}
        })
        .to_string();

        let err = manager
            .import(&thingsboard, ConfigFormat::Native, ImportMode::SkipController)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "config_format_error");
        assert!(err.to_string().contains("appears to be in ThingsBoard format"));
        assert_eq!(store.controller_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_json_rejected() {
        let (manager, _) = manager();
        let err = manager
            .import("{not json", ConfigFormat::Native, ImportMode::SkipController)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "config_format_error");
    }

    #[tokio::test]
    async fn test_thingsboard_import_end_to_end() {
        let (manager, store) = manager();
        let payload = json!({
            "master": {"slaves": [{
                "host": "10.0.0.7", "port": 1502, "deviceName": "Chiller", "unitId": 3,
                "timeout": 4,
                "timeseries": [
                    {"tag": "supply_temp", "type": "float32", "functionCode": 3,
                     "objectsCount": 2, "address": 100}
                ],
                "rpc": [
                    {"tag": "set_supply_temp", "type": "bytes", "functionCode": 6, "address": 100}
                ]
            }]}
        })
        .to_string();

        let report = manager
            .import(&payload, ConfigFormat::Thingsboard, ImportMode::SkipController)
            .await
            .unwrap();
        assert_eq!(report.status, ImportStatus::Success);
        assert_eq!(report.controller_name, "Chiller");
        assert_eq!(report.total_points, 1);

        let id = report.controller_id.unwrap();
        let stored = store.controller(&id).await.unwrap().unwrap();
        assert_eq!(stored.host, "10.0.0.7");
        assert_eq!(stored.port, 1502);
        assert_eq!(stored.timeout, 4);

        let points = store.points_for(&id, None).await.unwrap();
        assert_eq!(points[0].name, "supply_temp");
        assert_eq!(points[0].data_type, "float32");
        assert_eq!(points[0].len, 2);
        assert_eq!(points[0].unit_id, 3);
    }

    #[tokio::test]
    async fn test_export_artifact_and_missing_controller() {
        let (manager, _) = manager();
        let report = manager
            .import(&native_payload(), ConfigFormat::Native, ImportMode::SkipController)
            .await
            .unwrap();
        let id = report.controller_id.unwrap();

        let artifact = manager.export(&id, ConfigFormat::Native).await.unwrap();
        assert!(artifact.filename.starts_with("modbus_plc_native_"));
        assert!(artifact.filename.ends_with(".json"));
        assert_eq!(artifact.controller_name, "plc");
        assert_eq!(artifact.config["controller"]["name"], "plc");
        assert_eq!(artifact.config["points"].as_array().unwrap().len(), 2);

        let tb = manager.export(&id, ConfigFormat::Thingsboard).await.unwrap();
        assert!(tb.filename.starts_with("modbus_plc_thingsboard_"));
        assert_eq!(tb.config["master"]["slaves"].as_array().unwrap().len(), 1);

        let err = manager
            .export(&ControllerId::new("missing"), ConfigFormat::Native)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_native_export_import_round_trip() {
        let (source, _) = manager();
        let report = source
            .import(&native_payload(), ConfigFormat::Native, ImportMode::SkipController)
            .await
            .unwrap();
        let artifact = source
            .export(&report.controller_id.unwrap(), ConfigFormat::Native)
            .await
            .unwrap();

        let (target, target_store) = manager();
        let reimport = target
            .import(
                &artifact.config.to_string(),
                ConfigFormat::Native,
                ImportMode::SkipController,
            )
            .await
            .unwrap();
        assert_eq!(reimport.status, ImportStatus::Success);

        let id = reimport.controller_id.unwrap();
        let points = target_store.points_for(&id, None).await.unwrap();
        assert_eq!(points.len(), 2);
        let temp = points.iter().find(|p| p.name == "temp").unwrap();
        assert_eq!(temp.formula.as_deref(), Some("x * 0.1"));
        assert_eq!(temp.unit.as_deref(), Some("C"));
        assert_eq!(temp.address, 1);
    }
}
