// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Persistence interface for controllers and points.
//!
//! The subsystem never talks to a database directly; everything goes
//! through the [`DeviceStore`] trait so the backing store can be swapped
//! (SQL, embedded KV, in-memory) without touching the service layer.
//!
//! # Implementation Requirements
//!
//! - All methods are async for non-blocking I/O.
//! - Implementations must be thread-safe (`Send + Sync`).
//! - `replace_points` MUST be atomic per controller: concurrent readers
//!   observe either the old point set or the new one, never a mix.
//! - Identity keys are enforced at the storage layer as a second line
//!   behind the service-level duplicate checks: `(host, port)` for
//!   controllers, `(controller, address, type, unit_id)` for points.
//!
//! [`MemoryStore`] is the bundled implementation, used in production for
//! cache-style deployments and everywhere in tests.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::StorageError;
use crate::types::{Controller, ControllerFilter, ControllerId, Point, PointId, PointKey, RegisterType};

/// Result alias for storage operations.
pub type StoreResult<T> = Result<T, StorageError>;

// =============================================================================
// DeviceStore Trait
// =============================================================================

/// Repository interface for controllers and their points.
///
/// Reads return owned snapshots; callers never hold references into the
/// store. Deleting a controller cascades to its points.
#[async_trait]
pub trait DeviceStore: Send + Sync + Debug {
    // -------------------------------------------------------------------------
    // Controllers
    // -------------------------------------------------------------------------

    /// Inserts a new controller.
    ///
    /// # Returns
    ///
    /// - `Ok(())` on success
    /// - `Err(StorageError::Constraint)` if a controller with the same
    ///   `(host, port)` already exists
    async fn insert_controller(&self, controller: Controller) -> StoreResult<()>;

    /// Fetches a controller by id.
    async fn controller(&self, id: &ControllerId) -> StoreResult<Option<Controller>>;

    /// Fetches a controller by its `(host, port)` endpoint.
    async fn controller_by_endpoint(&self, host: &str, port: u16) -> StoreResult<Option<Controller>>;

    /// Lists controllers matching the filter, ordered by name.
    async fn controllers(&self, filter: &ControllerFilter) -> StoreResult<Vec<Controller>>;

    /// Replaces a stored controller with the given record (matched by id).
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the controller existed and was updated
    /// - `Ok(false)` if no controller with that id exists
    /// - `Err(StorageError::Constraint)` if the update would collide with
    ///   another controller's endpoint
    async fn update_controller(&self, controller: Controller) -> StoreResult<bool>;

    /// Updates only the reachability status flag of a controller.
    ///
    /// Used by the engine and the background sweeps; cheaper than a full
    /// record replacement and never collides.
    async fn set_controller_status(&self, id: &ControllerId, status: bool) -> StoreResult<bool>;

    /// Deletes a controller and all of its points.
    ///
    /// # Returns
    ///
    /// The removed controller, or `None` if the id was unknown.
    async fn delete_controller(&self, id: &ControllerId) -> StoreResult<Option<Controller>>;

    /// Returns the number of stored controllers.
    async fn controller_count(&self) -> StoreResult<usize>;

    // -------------------------------------------------------------------------
    // Points
    // -------------------------------------------------------------------------

    /// Inserts a new point.
    ///
    /// # Returns
    ///
    /// - `Ok(())` on success
    /// - `Err(StorageError::Constraint)` if the point's identity tuple
    ///   collides with an existing point on the same controller
    async fn insert_point(&self, point: Point) -> StoreResult<()>;

    /// Fetches a point by id.
    async fn point(&self, id: &PointId) -> StoreResult<Option<Point>>;

    /// Finds a point on a controller by its identity tuple.
    async fn find_point(&self, controller_id: &ControllerId, key: &PointKey) -> StoreResult<Option<Point>>;

    /// Lists the points of a controller, ordered by register address.
    ///
    /// When `point_type` is given, only points of that register type are
    /// returned.
    async fn points_for(
        &self,
        controller_id: &ControllerId,
        point_type: Option<RegisterType>,
    ) -> StoreResult<Vec<Point>>;

    /// Replaces a stored point with the given record (matched by id).
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the point existed and was updated
    /// - `Ok(false)` if no point with that id exists
    /// - `Err(StorageError::Constraint)` if the update would collide with
    ///   another point's identity tuple
    async fn update_point(&self, point: Point) -> StoreResult<bool>;

    /// Deletes a point by id.
    ///
    /// # Returns
    ///
    /// The removed point, or `None` if the id was unknown.
    async fn delete_point(&self, id: &PointId) -> StoreResult<Option<Point>>;

    /// Deletes all points of a controller, returning how many were removed.
    async fn delete_points_for(&self, controller_id: &ControllerId) -> StoreResult<usize>;

    /// Atomically replaces the full point set of a controller.
    ///
    /// Readers observe either the previous set or `points`, never a mix.
    /// Identity collisions inside `points` reject the whole batch and
    /// leave the previous set in place.
    async fn replace_points(&self, controller_id: &ControllerId, points: Vec<Point>) -> StoreResult<usize>;

    /// Returns the number of stored points across all controllers.
    async fn point_count(&self) -> StoreResult<usize>;
}

// =============================================================================
// Memory Store
// =============================================================================

/// Mutable state behind the store lock.
///
/// Both maps live under one `RwLock` so cascade deletes and point-set
/// replacement are atomic with respect to readers.
#[derive(Debug, Default)]
struct StoreInner {
    controllers: HashMap<ControllerId, Controller>,
    points: HashMap<PointId, Point>,
}

impl StoreInner {
    /// Finds a controller occupying the `(host, port)` endpoint, skipping
    /// `exclude` (used when updating a record in place).
    fn endpoint_owner(&self, host: &str, port: u16, exclude: Option<&ControllerId>) -> Option<&Controller> {
        self.controllers.values().find(|c| {
            c.host == host && c.port == port && Some(&c.id) != exclude
        })
    }

    /// Finds a point occupying the identity tuple on a controller,
    /// skipping `exclude`.
    fn identity_owner(
        &self,
        controller_id: &ControllerId,
        key: &PointKey,
        exclude: Option<&PointId>,
    ) -> Option<&Point> {
        self.points.values().find(|p| {
            &p.controller_id == controller_id && p.identity() == *key && Some(&p.id) != exclude
        })
    }
}

/// In-memory [`DeviceStore`] implementation.
///
/// Backed by two `HashMap`s under a single `parking_lot::RwLock`. Lock
/// hold times are bounded by map operations; no await happens while the
/// lock is held.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn insert_controller(&self, controller: Controller) -> StoreResult<()> {
        let mut inner = self.inner.write();

        if inner.endpoint_owner(&controller.host, controller.port, None).is_some() {
            return Err(StorageError::constraint(format!(
                "endpoint {} already registered",
                controller.endpoint()
            )));
        }

        debug!(controller_id = %controller.id, endpoint = %controller.endpoint(), "Storing controller");
        inner.controllers.insert(controller.id.clone(), controller);
        Ok(())
    }

    async fn controller(&self, id: &ControllerId) -> StoreResult<Option<Controller>> {
        Ok(self.inner.read().controllers.get(id).cloned())
    }

    async fn controller_by_endpoint(&self, host: &str, port: u16) -> StoreResult<Option<Controller>> {
        Ok(self.inner.read().endpoint_owner(host, port, None).cloned())
    }

    async fn controllers(&self, filter: &ControllerFilter) -> StoreResult<Vec<Controller>> {
        let inner = self.inner.read();
        let mut matched: Vec<Controller> = inner
            .controllers
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matched)
    }

    async fn update_controller(&self, controller: Controller) -> StoreResult<bool> {
        let mut inner = self.inner.write();

        if !inner.controllers.contains_key(&controller.id) {
            return Ok(false);
        }
        if inner
            .endpoint_owner(&controller.host, controller.port, Some(&controller.id))
            .is_some()
        {
            return Err(StorageError::constraint(format!(
                "endpoint {} already registered",
                controller.endpoint()
            )));
        }

        inner.controllers.insert(controller.id.clone(), controller);
        Ok(true)
    }

    async fn set_controller_status(&self, id: &ControllerId, status: bool) -> StoreResult<bool> {
        let mut inner = self.inner.write();
        match inner.controllers.get_mut(id) {
            Some(controller) => {
                if controller.status != status {
                    controller.status = status;
                    controller.updated_at = chrono::Utc::now();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_controller(&self, id: &ControllerId) -> StoreResult<Option<Controller>> {
        let mut inner = self.inner.write();
        let removed = inner.controllers.remove(id);
        if removed.is_some() {
            // Cascade: points of a deleted controller never outlive it.
            inner.points.retain(|_, p| &p.controller_id != id);
        }
        Ok(removed)
    }

    async fn controller_count(&self) -> StoreResult<usize> {
        Ok(self.inner.read().controllers.len())
    }

    async fn insert_point(&self, point: Point) -> StoreResult<()> {
        let mut inner = self.inner.write();

        let key = point.identity();
        if inner.identity_owner(&point.controller_id, &key, None).is_some() {
            return Err(StorageError::constraint(format!(
                "point identity {key} already registered on controller {}",
                point.controller_id
            )));
        }

        inner.points.insert(point.id.clone(), point);
        Ok(())
    }

    async fn point(&self, id: &PointId) -> StoreResult<Option<Point>> {
        Ok(self.inner.read().points.get(id).cloned())
    }

    async fn find_point(&self, controller_id: &ControllerId, key: &PointKey) -> StoreResult<Option<Point>> {
        Ok(self.inner.read().identity_owner(controller_id, key, None).cloned())
    }

    async fn points_for(
        &self,
        controller_id: &ControllerId,
        point_type: Option<RegisterType>,
    ) -> StoreResult<Vec<Point>> {
        let inner = self.inner.read();
        let mut matched: Vec<Point> = inner
            .points
            .values()
            .filter(|p| &p.controller_id == controller_id)
            .filter(|p| point_type.map_or(true, |t| p.point_type == t))
            .cloned()
            .collect();
        matched.sort_by_key(|p| (p.address, p.unit_id, p.point_type.as_str()));
        Ok(matched)
    }

    async fn update_point(&self, point: Point) -> StoreResult<bool> {
        let mut inner = self.inner.write();

        if !inner.points.contains_key(&point.id) {
            return Ok(false);
        }
        let key = point.identity();
        if inner
            .identity_owner(&point.controller_id, &key, Some(&point.id))
            .is_some()
        {
            return Err(StorageError::constraint(format!(
                "point identity {key} already registered on controller {}",
                point.controller_id
            )));
        }

        inner.points.insert(point.id.clone(), point);
        Ok(true)
    }

    async fn delete_point(&self, id: &PointId) -> StoreResult<Option<Point>> {
        Ok(self.inner.write().points.remove(id))
    }

    async fn delete_points_for(&self, controller_id: &ControllerId) -> StoreResult<usize> {
        let mut inner = self.inner.write();
        let before = inner.points.len();
        inner.points.retain(|_, p| &p.controller_id != controller_id);
        Ok(before - inner.points.len())
    }

    async fn replace_points(&self, controller_id: &ControllerId, points: Vec<Point>) -> StoreResult<usize> {
        // Pre-check the incoming batch before mutating anything so a
        // rejected replacement leaves the previous set untouched.
        let mut seen: Vec<PointKey> = Vec::with_capacity(points.len());
        for point in &points {
            if &point.controller_id != controller_id {
                return Err(StorageError::constraint(format!(
                    "point {} belongs to controller {}, not {}",
                    point.id, point.controller_id, controller_id
                )));
            }
            let key = point.identity();
            if seen.contains(&key) {
                return Err(StorageError::constraint(format!(
                    "duplicate point identity {key} in replacement set"
                )));
            }
            seen.push(key);
        }

        let count = points.len();
        let mut inner = self.inner.write();
        inner.points.retain(|_, p| &p.controller_id != controller_id);
        for point in points {
            inner.points.insert(point.id.clone(), point);
        }

        debug!(controller_id = %controller_id, count, "Replaced point set");
        Ok(count)
    }

    async fn point_count(&self) -> StoreResult<usize> {
        Ok(self.inner.read().points.len())
    }
}

// =============================================================================
// Tests
// =============================================================================
