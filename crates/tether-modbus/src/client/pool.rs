// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection pool keyed by `(host, port)`.
//!
//! The pool owns every [`ClientHandle`] for the process lifetime; handles
//! are only dropped by explicit [`ConnectionPool::remove`]. Controllers
//! sharing an endpoint (a gateway fronting several unit ids) share one
//! handle.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};

use tether_core::{Controller, ControllerFilter, ControllerId, DeviceStore};

use crate::client::ClientHandle;
use crate::types::{ClientConfig, PoolKey, PoolStatus};

/// Registry of one [`ClientHandle`] per endpoint.
///
/// Creation is first-writer-wins under concurrent callers; lookups are
/// lock-free reads. The pool is an explicitly constructed, injected
/// collaborator, shared via `Arc` between the service, the engine and
/// the sweeps.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    handles: DashMap<PoolKey, Arc<ClientHandle>>,
    /// Endpoint to controller association, consumed by the sweeps to
    /// write reachability back to storage.
    associations: DashMap<PoolKey, ControllerId>,
}

impl ConnectionPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for an endpoint, creating it in the
    /// disconnected state if absent.
    ///
    /// Idempotent: an existing handle wins and the given configuration
    /// is discarded, so the first creator's timeouts stick until the
    /// handle is removed.
    pub fn create(&self, config: ClientConfig) -> Arc<ClientHandle> {
        let key = config.pool_key();
        self.handles
            .entry(key)
            .or_insert_with(|| {
                info!(endpoint = %config.endpoint(), "created connection handle");
                Arc::new(ClientHandle::new(config))
            })
            .value()
            .clone()
    }

    /// Looks up the handle for an endpoint.
    pub fn get(&self, key: &PoolKey) -> Option<Arc<ClientHandle>> {
        self.handles.get(key).map(|r| r.value().clone())
    }

    /// Get-or-create for a controller, recording the endpoint to
    /// controller association as a side effect.
    pub fn ensure(&self, controller: &Controller) -> Arc<ClientHandle> {
        let handle = self.create(ClientConfig::for_controller(controller));
        self.associations
            .insert(handle.config().pool_key(), controller.id.clone());
        handle
    }

    /// Returns the controller currently associated with an endpoint.
    pub fn association(&self, key: &PoolKey) -> Option<ControllerId> {
        self.associations.get(key).map(|r| r.value().clone())
    }

    /// Disconnects and drops the handle for an endpoint.
    ///
    /// Used when a controller is deleted and by the temporary probe in
    /// controller creation. Returns `false` if no handle existed.
    pub async fn remove(&self, key: &PoolKey) -> bool {
        self.associations.remove(key);
        match self.handles.remove(key) {
            Some((_, handle)) => {
                handle.disconnect().await;
                info!(endpoint = %key, "removed connection handle");
                true
            }
            None => false,
        }
    }

    /// Number of pooled handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if the pool holds no handles.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Startup reconciliation: create a handle for every stored
    /// controller, attempt one connection, and write the outcome back.
    ///
    /// Storage being unavailable is logged and reported as `false`, not
    /// fatal; the scheduled sweeps converge the pool once storage comes
    /// back.
    pub async fn reconcile(&self, store: &dyn DeviceStore) -> bool {
        let controllers = match store.controllers(&ControllerFilter::default()).await {
            Ok(controllers) => controllers,
            Err(err) => {
                warn!(error = %err, "storage not ready for connection reconciliation");
                return false;
            }
        };

        info!(
            count = controllers.len(),
            "reconciling stored controllers with the connection pool"
        );

        for controller in controllers {
            let handle = self.ensure(&controller);
            let connected = handle.connect().await;
            if let Err(err) = store.set_controller_status(&controller.id, connected).await {
                warn!(
                    controller = %controller.name,
                    error = %err,
                    "failed to persist controller status"
                );
            }
            if connected {
                info!(
                    controller = %controller.name,
                    endpoint = %handle.endpoint(),
                    "controller connected"
                );
            } else {
                warn!(
                    controller = %controller.name,
                    endpoint = %handle.endpoint(),
                    "controller unreachable at startup"
                );
            }
        }
        true
    }

    /// Snapshot of every handle, sorted by endpoint.
    pub async fn status(&self) -> PoolStatus {
        // Clone the handles out first; holding map guards across awaits
        // would block writers.
        let entries: Vec<(PoolKey, Arc<ClientHandle>)> = self
            .handles
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        let mut handles = Vec::with_capacity(entries.len());
        for (key, handle) in entries {
            let controller_id = self.association(&key);
            handles.push(handle.status(controller_id).await);
        }
        handles.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));

        let connected = handles.iter().filter(|h| h.connected).count();
        PoolStatus {
            total: handles.len(),
            connected,
            handles,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
