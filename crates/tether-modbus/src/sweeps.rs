// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Background maintenance sweeps.
//!
//! Three [`ScheduledTask`] implementations keep the runtime picture in
//! step with reality. The health sweep demotes reachable controllers
//! whose connection went dead, the retry sweep promotes unreachable
//! controllers that answer again, and the collection sweep reads every
//! configured point and hands the values to the sample sink.
//!
//! All three follow the same rule: one controller's trouble never stops
//! the pass. Failures are logged and the loop moves on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tether_core::{
    ControllerFilter, DeviceStore, IntegrationResult, Sample, SampleSink, ScheduledTask, Scheduler,
};

use crate::client::ConnectionPool;
use crate::engine::PointIoEngine;

// =============================================================================
// Sweep Settings
// =============================================================================

/// Intervals for the background sweeps.
///
/// Durations deserialize from humantime strings (`"60s"`, `"2m"`), so a
/// config file reads the way an operator thinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSettings {
    /// How often reachable controllers are health-checked.
    #[serde(with = "humantime_serde", default = "default_health_interval")]
    pub health_interval: Duration,

    /// How often unreachable controllers get a reconnect attempt.
    #[serde(with = "humantime_serde", default = "default_retry_interval")]
    pub retry_interval: Duration,

    /// How often point values are collected for the sink.
    #[serde(with = "humantime_serde", default = "default_collection_interval")]
    pub collection_interval: Duration,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            health_interval: default_health_interval(),
            retry_interval: default_retry_interval(),
            collection_interval: default_collection_interval(),
        }
    }
}

fn default_health_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_retry_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_collection_interval() -> Duration {
    Duration::from_secs(10)
}

// =============================================================================
// Health Sweep
// =============================================================================

/// Health-checks every controller currently marked reachable.
///
/// A handle that fails its probe gets exactly one reconnect attempt.
/// Status is persisted only when it actually changes, so a quiet pass
/// writes nothing.
pub struct HealthSweep {
    store: Arc<dyn DeviceStore>,
    pool: Arc<ConnectionPool>,
}

impl HealthSweep {
    /// Creates a health sweep over the given store and pool.
    pub fn new(store: Arc<dyn DeviceStore>, pool: Arc<ConnectionPool>) -> Self {
        Self { store, pool }
    }
}

#[async_trait]
impl ScheduledTask for HealthSweep {
    fn name(&self) -> &str {
        "health-sweep"
    }

    async fn run(&self) -> IntegrationResult<()> {
        let controllers = self
            .store
            .controllers(&ControllerFilter::with_status(true))
            .await?;
        if controllers.is_empty() {
            debug!("no reachable controllers to check");
            return Ok(());
        }

        let mut demoted = 0usize;
        for controller in &controllers {
            let handle = self.pool.ensure(controller);
            if handle.is_healthy().await {
                continue;
            }

            warn!(
                controller = %controller.name,
                endpoint = %controller.endpoint(),
                "health check failed, reconnecting"
            );

            if handle.connect().await {
                info!(controller = %controller.name, "reconnected");
                continue;
            }

            // The filter guarantees these were marked reachable, so a
            // dead link here is a status change worth persisting.
            demoted += 1;
            if let Err(err) = self
                .store
                .set_controller_status(&controller.id, false)
                .await
            {
                warn!(
                    controller = %controller.name,
                    error = %err,
                    "failed to persist status"
                );
            } else {
                warn!(
                    controller = %controller.name,
                    endpoint = %controller.endpoint(),
                    "reconnect failed, controller marked unreachable"
                );
            }
        }

        debug!(checked = controllers.len(), demoted, "health pass finished");
        Ok(())
    }
}

// =============================================================================
// Retry Sweep
// =============================================================================

/// Attempts to reconnect every controller currently marked unreachable.
///
/// Only recoveries are persisted; a controller that stays down is
/// already recorded as down.
pub struct RetrySweep {
    store: Arc<dyn DeviceStore>,
    pool: Arc<ConnectionPool>,
}

impl RetrySweep {
    /// Creates a retry sweep over the given store and pool.
    pub fn new(store: Arc<dyn DeviceStore>, pool: Arc<ConnectionPool>) -> Self {
        Self { store, pool }
    }
}

#[async_trait]
impl ScheduledTask for RetrySweep {
    fn name(&self) -> &str {
        "retry-sweep"
    }

    async fn run(&self) -> IntegrationResult<()> {
        let controllers = self
            .store
            .controllers(&ControllerFilter::with_status(false))
            .await?;
        if controllers.is_empty() {
            debug!("no unreachable controllers to retry");
            return Ok(());
        }

        info!(count = controllers.len(), "retrying unreachable controllers");

        let mut recovered = 0usize;
        for controller in &controllers {
            let handle = self.pool.ensure(controller);
            if !handle.connect().await {
                debug!(
                    controller = %controller.name,
                    endpoint = %controller.endpoint(),
                    "still unreachable"
                );
                continue;
            }

            recovered += 1;
            if let Err(err) = self.store.set_controller_status(&controller.id, true).await {
                warn!(
                    controller = %controller.name,
                    error = %err,
                    "failed to persist status"
                );
            } else {
                info!(
                    controller = %controller.name,
                    endpoint = %controller.endpoint(),
                    "controller back online"
                );
            }
        }

        debug!(retried = controllers.len(), recovered, "retry pass finished");
        Ok(())
    }
}

// =============================================================================
// Collection Sweep
// =============================================================================

/// Reads every configured point of every reachable controller and
/// publishes the successful readings to the sample sink.
///
/// Point failures ride along inside the read summary and never abort
/// the controller; controller failures never abort the pass. Each
/// controller's samples go to the sink as one batch.
pub struct CollectionSweep {
    store: Arc<dyn DeviceStore>,
    engine: PointIoEngine,
    sink: Arc<dyn SampleSink>,
}

impl CollectionSweep {
    /// Creates a collection sweep reading through the given pool.
    pub fn new(
        store: Arc<dyn DeviceStore>,
        pool: Arc<ConnectionPool>,
        sink: Arc<dyn SampleSink>,
    ) -> Self {
        Self {
            store,
            engine: PointIoEngine::new(pool),
            sink,
        }
    }
}

#[async_trait]
impl ScheduledTask for CollectionSweep {
    fn name(&self) -> &str {
        "collection-sweep"
    }

    async fn run(&self) -> IntegrationResult<()> {
        let controllers = self
            .store
            .controllers(&ControllerFilter::with_status(true))
            .await?;
        if controllers.is_empty() {
            debug!("no reachable controllers to collect from");
            return Ok(());
        }

        let mut collected = 0usize;
        let mut failed = 0usize;

        for controller in &controllers {
            let points = match self.store.points_for(&controller.id, None).await {
                Ok(points) => points,
                Err(err) => {
                    warn!(
                        controller = %controller.name,
                        error = %err,
                        "point listing failed, skipping controller"
                    );
                    continue;
                }
            };
            if points.is_empty() {
                continue;
            }

            let summary = self
                .engine
                .read_controller_points(controller, &points, true)
                .await;
            collected += summary.succeeded;
            failed += summary.failed;

            for outcome in summary.points.iter().filter(|o| !o.success) {
                debug!(
                    controller = %controller.name,
                    point = %outcome.name,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "point read failed"
                );
            }

            let samples: Vec<Sample> = summary
                .points
                .iter()
                .filter(|outcome| outcome.success)
                .filter_map(|outcome| {
                    let point = points.iter().find(|p| p.id == outcome.point_id)?;
                    let value = outcome.value.clone()?;
                    Some(Sample::new(controller, point, value))
                })
                .collect();
            if samples.is_empty() {
                continue;
            }

            if let Err(err) = self.sink.publish(&samples).await {
                warn!(
                    controller = %controller.name,
                    sink = self.sink.name(),
                    error = %err,
                    "sample publish failed"
                );
            }
        }

        info!(collected, failed, "collection pass finished");
        Ok(())
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Registers the standard sweep set on a scheduler.
///
/// The collection sweep is only registered when a sink is attached;
/// without a destination there is nothing to collect for.
pub fn register_sweeps(
    scheduler: &mut Scheduler,
    settings: &SweepSettings,
    store: Arc<dyn DeviceStore>,
    pool: Arc<ConnectionPool>,
    sink: Option<Arc<dyn SampleSink>>,
) {
    scheduler.register(
        Arc::new(HealthSweep::new(store.clone(), pool.clone())),
        settings.health_interval,
    );
    scheduler.register(
        Arc::new(RetrySweep::new(store.clone(), pool.clone())),
        settings.retry_interval,
    );
    if let Some(sink) = sink {
        scheduler.register(
            Arc::new(CollectionSweep::new(store, pool, sink)),
            settings.collection_interval,
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
