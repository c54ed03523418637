// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Device service: CRUD orchestration over storage, pool and engine.
//!
//! This is the facade a thin API layer talks to. It owns entity
//! resolution (not-found conditions are raised here, never in the
//! engine), duplicate checks ahead of storage writes, and the
//! connection-probe policies around controller creation and update.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tether_core::{
    Controller, ControllerFilter, ControllerId, ControllerUpdate, DeviceStore, IntegrationError,
    IntegrationResult, NewController, NewPoint, Point, PointId, PointUpdate, RegisterType, Value,
};

use crate::client::{ClientHandle, ConnectionPool};
use crate::engine::PointIoEngine;
use crate::types::{
    ClientConfig, ControllerReadSummary, PoolKey, PoolStatus, ReadResult, TestOutcome,
    WriteReceipt,
};

// =============================================================================
// Batch Result Shapes
// =============================================================================

/// Per-item status of a batch point create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateStatus {
    /// The point was created.
    Success,
    /// A point with the same identity tuple already exists.
    Skipped,
    /// The item was invalid or storage rejected it.
    Failed,
}

/// One item's outcome in a batch point create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCreateOutcome {
    /// Assigned id, when created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_id: Option<PointId>,
    /// The requested point name.
    pub name: String,
    /// Item status.
    pub status: CreateStatus,
    /// Human-readable outcome description.
    pub message: String,
}

/// Aggregate result of a batch point create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCreateSummary {
    /// Number of items in the request.
    pub total_requested: usize,
    /// Items created.
    pub created: usize,
    /// Items skipped as identity duplicates.
    pub skipped: usize,
    /// Items rejected.
    pub failed: usize,
    /// Per-item outcomes, in request order.
    pub results: Vec<PointCreateOutcome>,
}

/// Per-item status of a batch delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStatus {
    /// The record was removed.
    Deleted,
    /// No record with that id existed.
    NotFound,
    /// Storage rejected the delete.
    Failed,
}

/// One item's outcome in a batch delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// The requested id.
    pub id: String,
    /// Item status.
    pub status: DeleteStatus,
    /// Human-readable outcome description.
    pub message: String,
}

/// Aggregate result of a batch delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDeleteSummary {
    /// Number of ids in the request.
    pub total_requested: usize,
    /// Records removed.
    pub deleted: usize,
    /// Ids that matched nothing.
    pub not_found: usize,
    /// Deletes that failed.
    pub failed: usize,
    /// Per-item outcomes, in request order.
    pub results: Vec<DeleteOutcome>,
}

// =============================================================================
// DeviceService
// =============================================================================

/// Orchestrates controllers and points across storage, the connection
/// pool and the point I/O engine.
#[derive(Debug, Clone)]
pub struct DeviceService {
    store: Arc<dyn DeviceStore>,
    pool: Arc<ConnectionPool>,
    engine: PointIoEngine,
}

impl DeviceService {
    /// Creates a service over shared storage and pool.
    pub fn new(store: Arc<dyn DeviceStore>, pool: Arc<ConnectionPool>) -> Self {
        let engine = PointIoEngine::new(pool.clone());
        Self {
            store,
            pool,
            engine,
        }
    }

    // =========================================================================
    // Controllers
    // =========================================================================

    /// Creates a controller, then probes it once.
    ///
    /// The probe is best-effort: an unreachable device still gets its
    /// record (marked unreachable), so commissioning can happen before
    /// wiring. The probe uses a throwaway handle; the pool stays
    /// untouched until the first real read.
    pub async fn create_controller(&self, new: NewController) -> IntegrationResult<Controller> {
        validate_new_controller(&new)?;

        if let Some(existing) = self.store.controller_by_endpoint(&new.host, new.port).await? {
            return Err(IntegrationError::controller_duplicate(
                existing.host,
                existing.port,
            ));
        }

        let mut controller = Controller::create(new);
        self.store.insert_controller(controller.clone()).await?;
        info!(
            controller = %controller.name,
            endpoint = %controller.endpoint(),
            "controller created"
        );

        if probe_endpoint(&controller.host, controller.port, controller.timeout).await {
            controller.status = true;
            if let Err(err) = self.store.set_controller_status(&controller.id, true).await {
                warn!(
                    controller = %controller.name,
                    error = %err,
                    "failed to persist probe outcome"
                );
            }
        } else {
            warn!(
                controller = %controller.name,
                endpoint = %controller.endpoint(),
                "connection probe failed, controller created as unreachable"
            );
        }

        Ok(controller)
    }

    /// Fetches a controller by id.
    pub async fn get_controller(&self, id: &ControllerId) -> IntegrationResult<Controller> {
        self.store
            .controller(id)
            .await?
            .ok_or_else(|| IntegrationError::controller_not_found(id.as_str()))
    }

    /// Lists controllers matching the filter, ordered by name.
    pub async fn list_controllers(
        &self,
        filter: &ControllerFilter,
    ) -> IntegrationResult<Vec<Controller>> {
        Ok(self.store.controllers(filter).await?)
    }

    /// Updates a controller after proving the (possibly new) endpoint
    /// is reachable.
    ///
    /// Unlike creation, the connection test here is mandatory: an
    /// update that would point the record at a dead endpoint is
    /// rejected with `ConnectionFailed` and nothing is stored. A
    /// passing test also flips the status flag to reachable.
    pub async fn update_controller(
        &self,
        id: &ControllerId,
        update: ControllerUpdate,
    ) -> IntegrationResult<Controller> {
        let mut controller = self.get_controller(id).await?;

        let new_host = update.host.clone().unwrap_or_else(|| controller.host.clone());
        let new_port = update.port.unwrap_or(controller.port);
        let new_timeout = update.timeout.unwrap_or(controller.timeout);

        if let Some(existing) = self.store.controller_by_endpoint(&new_host, new_port).await? {
            if existing.id != *id {
                return Err(IntegrationError::controller_duplicate(new_host, new_port));
            }
        }

        if !probe_endpoint(&new_host, new_port, new_timeout).await {
            return Err(IntegrationError::connection_failed(format!(
                "unable to connect to {new_host}:{new_port}"
            )));
        }

        controller.apply(update);
        controller.status = true;
        if !self.store.update_controller(controller.clone()).await? {
            return Err(IntegrationError::controller_not_found(id.as_str()));
        }

        info!(
            controller = %controller.name,
            endpoint = %controller.endpoint(),
            "controller updated"
        );
        Ok(controller)
    }

    /// Deletes a controller, its points, and its pooled handle.
    pub async fn delete_controller(&self, id: &ControllerId) -> IntegrationResult<Controller> {
        let removed = self
            .store
            .delete_controller(id)
            .await?
            .ok_or_else(|| IntegrationError::controller_not_found(id.as_str()))?;

        self.pool.remove(&PoolKey::from(&removed)).await;
        info!(
            controller = %removed.name,
            endpoint = %removed.endpoint(),
            "controller deleted"
        );
        Ok(removed)
    }

    /// Deletes several controllers, reporting each outcome.
    ///
    /// One bad id never aborts the batch.
    pub async fn delete_controllers(&self, ids: &[ControllerId]) -> BatchDeleteSummary {
        let mut results = Vec::with_capacity(ids.len());

        for id in ids {
            let outcome = match self.store.delete_controller(id).await {
                Ok(Some(removed)) => {
                    self.pool.remove(&PoolKey::from(&removed)).await;
                    DeleteOutcome {
                        id: id.as_str().to_string(),
                        status: DeleteStatus::Deleted,
                        message: format!("controller {} deleted", removed.name),
                    }
                }
                Ok(None) => DeleteOutcome {
                    id: id.as_str().to_string(),
                    status: DeleteStatus::NotFound,
                    message: "controller not found".to_string(),
                },
                Err(err) => DeleteOutcome {
                    id: id.as_str().to_string(),
                    status: DeleteStatus::Failed,
                    message: err.to_string(),
                },
            };
            results.push(outcome);
        }

        summarize_deletes(results)
    }

    /// Tests connectivity to an endpoint without persisting anything.
    ///
    /// Works for unsaved parameters (pre-creation checks) as well as
    /// stored controllers; the caller passes whichever fields it has.
    pub async fn test_connection(&self, host: &str, port: u16, timeout: u64) -> TestOutcome {
        let mut config = ClientConfig::new(host, port);
        let deadline = Duration::from_secs(timeout.max(1));
        config.connect_timeout = deadline;
        config.request_timeout = deadline;

        let handle = ClientHandle::new(config);
        let started = Instant::now();
        let connected = handle.connect().await;
        let elapsed = started.elapsed().as_millis() as u64;

        if connected {
            handle.disconnect().await;
            TestOutcome::reachable(elapsed)
        } else {
            let status = handle.status(None).await;
            TestOutcome::unreachable(
                elapsed,
                status
                    .last_error
                    .unwrap_or_else(|| format!("unable to connect to {host}:{port}")),
            )
        }
    }

    // =========================================================================
    // Points
    // =========================================================================

    /// Creates a single point on a controller.
    pub async fn create_point(
        &self,
        controller_id: &ControllerId,
        new: NewPoint,
    ) -> IntegrationResult<Point> {
        self.get_controller(controller_id).await?;
        validate_new_point(&new).map_err(IntegrationError::validation)?;

        let key = new.identity();
        if self.store.find_point(controller_id, &key).await?.is_some() {
            return Err(IntegrationError::point_duplicate(
                key.address,
                key.point_type.to_string(),
                key.unit_id,
            ));
        }

        let point = Point::create(controller_id.clone(), new);
        self.store.insert_point(point.clone()).await?;
        debug!(point = %point.name, controller_id = %controller_id, "point created");
        Ok(point)
    }

    /// Creates several points on a controller, reporting each outcome.
    ///
    /// Identity duplicates are skipped, invalid items fail, and neither
    /// aborts the rest. Items are processed in order, so a duplicate
    /// within the batch itself is skipped once the first copy lands.
    pub async fn create_points(
        &self,
        controller_id: &ControllerId,
        points: Vec<NewPoint>,
    ) -> IntegrationResult<BatchCreateSummary> {
        self.get_controller(controller_id).await?;

        let total_requested = points.len();
        let mut results = Vec::with_capacity(total_requested);
        let mut created = 0usize;
        let mut skipped = 0usize;
        let mut failed = 0usize;

        for new in points {
            let name = new.name.clone();

            if let Err(reason) = validate_new_point(&new) {
                failed += 1;
                results.push(PointCreateOutcome {
                    point_id: None,
                    name,
                    status: CreateStatus::Failed,
                    message: reason,
                });
                continue;
            }

            let key = new.identity();
            match self.store.find_point(controller_id, &key).await {
                Ok(Some(_)) => {
                    skipped += 1;
                    results.push(PointCreateOutcome {
                        point_id: None,
                        name,
                        status: CreateStatus::Skipped,
                        message: "point already exists".to_string(),
                    });
                }
                Ok(None) => {
                    let point = Point::create(controller_id.clone(), new);
                    match self.store.insert_point(point.clone()).await {
                        Ok(()) => {
                            created += 1;
                            results.push(PointCreateOutcome {
                                point_id: Some(point.id),
                                name,
                                status: CreateStatus::Success,
                                message: "created".to_string(),
                            });
                        }
                        Err(err) => {
                            failed += 1;
                            results.push(PointCreateOutcome {
                                point_id: None,
                                name,
                                status: CreateStatus::Failed,
                                message: err.to_string(),
                            });
                        }
                    }
                }
                Err(err) => {
                    failed += 1;
                    results.push(PointCreateOutcome {
                        point_id: None,
                        name,
                        status: CreateStatus::Failed,
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            controller_id = %controller_id,
            total_requested,
            created,
            skipped,
            failed,
            "batch point create finished"
        );
        Ok(BatchCreateSummary {
            total_requested,
            created,
            skipped,
            failed,
            results,
        })
    }

    /// Fetches a point by id.
    pub async fn get_point(&self, id: &PointId) -> IntegrationResult<Point> {
        self.store
            .point(id)
            .await?
            .ok_or_else(|| IntegrationError::point_not_found(id.as_str()))
    }

    /// Lists a controller's points, ordered by address, optionally
    /// filtered by register type.
    pub async fn list_points(
        &self,
        controller_id: &ControllerId,
        point_type: Option<RegisterType>,
    ) -> IntegrationResult<Vec<Point>> {
        self.get_controller(controller_id).await?;
        Ok(self.store.points_for(controller_id, point_type).await?)
    }

    /// Updates a point, enforcing identity-tuple uniqueness on the
    /// merged record.
    pub async fn update_point(
        &self,
        id: &PointId,
        update: PointUpdate,
    ) -> IntegrationResult<Point> {
        let mut point = self.get_point(id).await?;

        let mut merged = point.clone();
        merged.apply(update.clone());
        let key = merged.identity();
        if let Some(existing) = self.store.find_point(&point.controller_id, &key).await? {
            if existing.id != *id {
                return Err(IntegrationError::point_duplicate(
                    key.address,
                    key.point_type.to_string(),
                    key.unit_id,
                ));
            }
        }

        point.apply(update);
        if !self.store.update_point(point.clone()).await? {
            return Err(IntegrationError::point_not_found(id.as_str()));
        }
        debug!(point = %point.name, "point updated");
        Ok(point)
    }

    /// Deletes a point by id.
    pub async fn delete_point(&self, id: &PointId) -> IntegrationResult<Point> {
        self.store
            .delete_point(id)
            .await?
            .ok_or_else(|| IntegrationError::point_not_found(id.as_str()))
    }

    /// Deletes several points, reporting each outcome.
    pub async fn delete_points(&self, ids: &[PointId]) -> BatchDeleteSummary {
        let mut results = Vec::with_capacity(ids.len());

        for id in ids {
            let outcome = match self.store.delete_point(id).await {
                Ok(Some(removed)) => DeleteOutcome {
                    id: id.as_str().to_string(),
                    status: DeleteStatus::Deleted,
                    message: format!("point {} deleted", removed.name),
                },
                Ok(None) => DeleteOutcome {
                    id: id.as_str().to_string(),
                    status: DeleteStatus::NotFound,
                    message: "point not found".to_string(),
                },
                Err(err) => DeleteOutcome {
                    id: id.as_str().to_string(),
                    status: DeleteStatus::Failed,
                    message: err.to_string(),
                },
            };
            results.push(outcome);
        }

        summarize_deletes(results)
    }

    // =========================================================================
    // I/O Passthrough
    // =========================================================================

    /// Reads one point through the full decode pipeline.
    pub async fn read_point(&self, id: &PointId) -> IntegrationResult<ReadResult> {
        let point = self.get_point(id).await?;
        let controller = self.get_controller(&point.controller_id).await?;
        self.engine.read_point(&controller, &point).await
    }

    /// Reads every point of a controller, optionally filtered by type.
    ///
    /// With `convert` off, raw register content is returned instead of
    /// decoded values.
    pub async fn read_controller_points(
        &self,
        controller_id: &ControllerId,
        point_type: Option<RegisterType>,
        convert: bool,
    ) -> IntegrationResult<ControllerReadSummary> {
        let controller = self.get_controller(controller_id).await?;
        let points = self.store.points_for(controller_id, point_type).await?;
        Ok(self
            .engine
            .read_controller_points(&controller, &points, convert)
            .await)
    }

    /// Writes a value to one point.
    pub async fn write_point(
        &self,
        id: &PointId,
        value: &Value,
        unit_id_override: Option<u8>,
    ) -> IntegrationResult<WriteReceipt> {
        let point = self.get_point(id).await?;
        let controller = self.get_controller(&point.controller_id).await?;
        self.engine
            .write_point(&controller, &point, value, unit_id_override)
            .await
    }

    /// Snapshot of the connection pool.
    pub async fn pool_status(&self) -> PoolStatus {
        self.pool.status().await
    }
}

// =============================================================================
// Validation and Helpers
// =============================================================================

fn validate_new_controller(new: &NewController) -> IntegrationResult<()> {
    if new.name.trim().is_empty() {
        return Err(IntegrationError::validation("controller name must not be empty"));
    }
    if new.host.trim().is_empty() {
        return Err(IntegrationError::validation("host must not be empty"));
    }
    if new.port == 0 {
        return Err(IntegrationError::validation("port must be between 1 and 65535"));
    }
    if new.timeout == 0 {
        return Err(IntegrationError::validation("timeout must be at least 1 second"));
    }
    Ok(())
}

fn validate_new_point(new: &NewPoint) -> Result<(), String> {
    if new.name.trim().is_empty() {
        return Err("point name must not be empty".to_string());
    }
    if new.data_type.trim().is_empty() {
        return Err("data_type must not be empty".to_string());
    }
    if new.len == 0 {
        return Err("len must be at least 1".to_string());
    }
    Ok(())
}

/// One-shot connection probe with a throwaway handle.
async fn probe_endpoint(host: &str, port: u16, timeout: u64) -> bool {
    let mut config = ClientConfig::new(host, port);
    let deadline = Duration::from_secs(timeout.max(1));
    config.connect_timeout = deadline;
    config.request_timeout = deadline;

    let handle = ClientHandle::new(config);
    let connected = handle.connect().await;
    if connected {
        handle.disconnect().await;
    }
    connected
}

fn summarize_deletes(results: Vec<DeleteOutcome>) -> BatchDeleteSummary {
    let deleted = results
        .iter()
        .filter(|r| r.status == DeleteStatus::Deleted)
        .count();
    let not_found = results
        .iter()
        .filter(|r| r.status == DeleteStatus::NotFound)
        .count();
    let failed = results
        .iter()
        .filter(|r| r.status == DeleteStatus::Failed)
        .count();

    BatchDeleteSummary {
        total_requested: results.len(),
        deleted,
        not_found,
        failed,
        results,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::MemoryStore;

    fn service() -> DeviceService {
        DeviceService::new(Arc::new(MemoryStore::new()), Arc::new(ConnectionPool::new()))
    }

    fn new_controller(name: &str, port: u16) -> NewController {
        NewController {
            name: name.to_string(),
            host: "127.0.0.1".to_string(),
            // Ports in the reserved low range refuse connects fast, so
            // probes fail without timing out.
            port,
            timeout: 1,
        }
    }

    fn new_point(name: &str, address: u16) -> NewPoint {
        NewPoint {
            name: name.to_string(),
            description: None,
            point_type: RegisterType::HoldingRegister,
            data_type: "uint16".to_string(),
            address,
            len: 1,
            unit_id: 1,
            formula: None,
            unit: None,
            min_value: None,
            max_value: None,
        }
    }

    #[tokio::test]
    async fn test_create_controller_survives_failed_probe() {
        let service = service();
        let controller = service.create_controller(new_controller("plc", 1)).await.unwrap();
        assert!(!controller.status);

        let stored = service.get_controller(&controller.id).await.unwrap();
        assert_eq!(stored.name, "plc");
        assert!(!stored.status);
    }

    #[tokio::test]
    async fn test_create_controller_rejects_duplicate_endpoint() {
        let service = service();
        service.create_controller(new_controller("a", 1)).await.unwrap();

        let err = service
            .create_controller(new_controller("b", 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "controller_duplicate");
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_create_controller_validation() {
        let service = service();

        let err = service
            .create_controller(new_controller("  ", 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_failed");

        let err = service
            .create_controller(new_controller("plc", 0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_failed");
    }

    #[tokio::test]
    async fn test_update_requires_reachable_endpoint() {
        let service = service();
        let controller = service.create_controller(new_controller("plc", 1)).await.unwrap();

        let err = service
            .update_controller(
                &controller.id,
                ControllerUpdate {
                    name: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "connection_failed");

        // The failed test left the record untouched.
        let stored = service.get_controller(&controller.id).await.unwrap();
        assert_eq!(stored.name, "plc");
    }

    #[tokio::test]
    async fn test_update_succeeds_against_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let service = service();
        let controller = service.create_controller(new_controller("plc", 1)).await.unwrap();

        let updated = service
            .update_controller(
                &controller.id,
                ControllerUpdate {
                    name: Some("renamed".to_string()),
                    port: Some(port),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.port, port);
        // A passing connection test marks the controller reachable.
        assert!(updated.status);
    }

    #[tokio::test]
    async fn test_update_duplicate_check_excludes_self() {
        let service = service();
        let a = service.create_controller(new_controller("a", 1)).await.unwrap();
        service.create_controller(new_controller("b", 2)).await.unwrap();

        // Moving a onto b's endpoint collides before any connection test.
        let err = service
            .update_controller(
                &a.id,
                ControllerUpdate {
                    port: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "controller_duplicate");
    }

    #[tokio::test]
    async fn test_delete_controller_cascades() {
        let service = service();
        let controller = service.create_controller(new_controller("plc", 1)).await.unwrap();
        service
            .create_point(&controller.id, new_point("p1", 0))
            .await
            .unwrap();

        let removed = service.delete_controller(&controller.id).await.unwrap();
        assert_eq!(removed.id, controller.id);

        let err = service
            .list_points(&controller.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "controller_not_found");

        let err = service.delete_controller(&controller.id).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_batch_controller_delete_reports_missing() {
        let service = service();
        let controller = service.create_controller(new_controller("plc", 1)).await.unwrap();
        let missing = ControllerId::new("missing");

        let summary = service
            .delete_controllers(&[controller.id.clone(), missing])
            .await;
        assert_eq!(summary.total_requested, 2);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_point_batch_reports_mixed_outcomes() {
        let service = service();
        let controller = service.create_controller(new_controller("plc", 1)).await.unwrap();
        service
            .create_point(&controller.id, new_point("existing", 100))
            .await
            .unwrap();

        let mut invalid = new_point("invalid", 300);
        invalid.len = 0;
        let batch = vec![
            new_point("existing", 100), // identity duplicate
            new_point("fresh", 200),
            invalid,
        ];

        let summary = service.create_points(&controller.id, batch).await.unwrap();
        assert_eq!(summary.total_requested, 3);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.results[0].status, CreateStatus::Skipped);
        assert_eq!(summary.results[1].status, CreateStatus::Success);
        assert!(summary.results[1].point_id.is_some());
        assert_eq!(summary.results[2].status, CreateStatus::Failed);
    }

    #[tokio::test]
    async fn test_batch_skips_duplicate_inside_batch() {
        let service = service();
        let controller = service.create_controller(new_controller("plc", 1)).await.unwrap();

        let summary = service
            .create_points(
                &controller.id,
                vec![new_point("first", 5), new_point("second", 5)],
            )
            .await
            .unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_update_point_duplicate_identity() {
        let service = service();
        let controller = service.create_controller(new_controller("plc", 1)).await.unwrap();
        service
            .create_point(&controller.id, new_point("p1", 1))
            .await
            .unwrap();
        let p2 = service
            .create_point(&controller.id, new_point("p2", 2))
            .await
            .unwrap();

        let err = service
            .update_point(
                &p2.id,
                PointUpdate {
                    address: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "point_duplicate");

        // A rename that keeps the identity tuple is fine, including a
        // no-op on the tuple fields.
        let renamed = service
            .update_point(
                &p2.id,
                PointUpdate {
                    name: Some("p2-renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "p2-renamed");
    }

    #[tokio::test]
    async fn test_delete_points_mixed() {
        let service = service();
        let controller = service.create_controller(new_controller("plc", 1)).await.unwrap();
        let p = service
            .create_point(&controller.id, new_point("p1", 1))
            .await
            .unwrap();

        let summary = service
            .delete_points(&[p.id.clone(), PointId::new("missing")])
            .await;
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_list_points_type_filter() {
        let service = service();
        let controller = service.create_controller(new_controller("plc", 1)).await.unwrap();
        service
            .create_point(&controller.id, new_point("hr", 1))
            .await
            .unwrap();
        let mut coil = new_point("coil", 1);
        coil.point_type = RegisterType::Coil;
        coil.data_type = "bool".to_string();
        service.create_point(&controller.id, coil).await.unwrap();

        let all = service.list_points(&controller.id, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let coils = service
            .list_points(&controller.id, Some(RegisterType::Coil))
            .await
            .unwrap();
        assert_eq!(coils.len(), 1);
        assert_eq!(coils[0].name, "coil");
    }

    #[tokio::test]
    async fn test_read_point_resolves_entities() {
        let service = service();
        let err = service.read_point(&PointId::new("missing")).await.unwrap_err();
        assert_eq!(err.kind(), "point_not_found");
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_write_passthrough_hits_engine_validation() {
        let service = service();
        let controller = service.create_controller(new_controller("plc", 1)).await.unwrap();
        let mut readonly = new_point("sensor", 1);
        readonly.point_type = RegisterType::InputRegister;
        let point = service.create_point(&controller.id, readonly).await.unwrap();

        let err = service
            .write_point(&point.id, &Value::UInt(5), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_failed");
    }

    #[tokio::test]
    async fn test_connection_test_against_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let service = service();
        let outcome = service.test_connection("127.0.0.1", port, 1).await;
        assert!(outcome.reachable);
        assert!(outcome.error.is_none());

        let outcome = service.test_connection("127.0.0.1", 1, 1).await;
        assert!(!outcome.reachable);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn test_pool_stays_clean_after_probes() {
        let service = service();
        service.create_controller(new_controller("plc", 1)).await.unwrap();
        service.test_connection("127.0.0.1", 1, 1).await;

        // Probes use throwaway handles; nothing is pooled until a read.
        let status = service.pool_status().await;
        assert_eq!(status.total, 0);
    }
}
