// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus TCP client handles and the connection pool.
//!
//! A [`ClientHandle`] owns exactly one TCP connection to a `host:port`
//! endpoint. Unit ids are not part of the handle: every read and write
//! names its target unit, so any number of devices behind one gateway
//! share a single connection. The [`ConnectionPool`] hands out handles
//! keyed by endpoint.

mod pool;
mod tcp;

pub use pool::ConnectionPool;

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tracing::{debug, info, warn};

use tether_core::{ControllerId, RegisterType};

use crate::error::{ModbusError, ModbusResult};
use crate::types::{ClientConfig, HandleStatus, RawValues};

// =============================================================================
// ClientHandle
// =============================================================================

/// One pooled Modbus TCP connection.
///
/// All operations take `&self`; a per-handle async mutex serializes the
/// wire protocol (Modbus TCP is request/response, one exchange at a
/// time per connection) while distinct handles proceed in parallel.
///
/// `connect` and `is_healthy` never return errors: reachability is a
/// state the handle tracks, not an exceptional condition. Read and
/// write operations do fail loudly, carrying the transport reason.
pub struct ClientHandle {
    config: ClientConfig,
    inner: Mutex<HandleInner>,
    connected: AtomicBool,
}

struct HandleInner {
    context: Option<Context>,
    /// Cloned socket handle sharing the connection's file description;
    /// peeked by health checks without touching the protocol stream.
    probe: Option<std::net::TcpStream>,
    last_success: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl HandleInner {
    fn new() -> Self {
        Self {
            context: None,
            probe: None,
            last_success: None,
            last_error: None,
        }
    }

    fn record_success(&mut self) {
        self.last_success = Some(Utc::now());
        self.last_error = None;
    }

    fn record_error(&mut self, error: &ModbusError) {
        self.last_error = Some(error.to_string());
    }
}

impl ClientHandle {
    /// Creates a handle in the disconnected state.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(HandleInner::new()),
            connected: AtomicBool::new(false),
        }
    }

    /// Returns the handle's configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the `host:port` endpoint string.
    pub fn endpoint(&self) -> String {
        self.config.endpoint()
    }

    /// Cached reachability flag.
    ///
    /// Cheap but optimistic; [`ClientHandle::is_healthy`] is the
    /// authoritative check.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Attempts to connect, returning whether the handle is now live.
    ///
    /// A handle whose socket probes alive is left alone. Transport
    /// failures are absorbed into the cached flag and the last-error
    /// field; this method never returns an error.
    pub async fn connect(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let endpoint = self.config.endpoint();

        if inner.context.is_some() && tcp::probe_alive(inner.probe.as_ref()) {
            self.connected.store(true, Ordering::SeqCst);
            debug!(endpoint = %endpoint, "already connected");
            return true;
        }

        // A stale context from a dead connection is replaced wholesale.
        if let Some(mut stale) = inner.context.take() {
            stale.disconnect().await.ok();
            inner.probe = None;
        }

        match tcp::establish(&self.config).await {
            Ok((context, probe)) => {
                inner.context = Some(context);
                inner.probe = Some(probe);
                inner.record_success();
                drop(inner);
                self.connected.store(true, Ordering::SeqCst);
                info!(endpoint = %endpoint, "connected to Modbus device");
                true
            }
            Err(err) => {
                inner.record_error(&err);
                drop(inner);
                self.connected.store(false, Ordering::SeqCst);
                warn!(endpoint = %endpoint, error = %err, "connection attempt failed");
                false
            }
        }
    }

    /// Two-step health check: cached flag, then a live socket probe.
    ///
    /// Long-lived industrial links routinely end up half-open, so the
    /// cached flag alone is not trusted. A failed probe flips the flag
    /// to false.
    pub async fn is_healthy(&self) -> bool {
        if !self.connected.load(Ordering::SeqCst) {
            return false;
        }
        let inner = self.inner.lock().await;
        let alive = inner.context.is_some() && tcp::probe_alive(inner.probe.as_ref());
        drop(inner);
        if !alive {
            self.connected.store(false, Ordering::SeqCst);
            debug!(endpoint = %self.config.endpoint(), "health probe failed");
        }
        alive
    }

    /// Closes the connection. Close errors are logged, never surfaced.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(mut context) = inner.context.take() {
            if let Err(err) = context.disconnect().await {
                debug!(
                    endpoint = %self.config.endpoint(),
                    error = %err,
                    "error while closing connection"
                );
            }
        }
        inner.probe = None;
        drop(inner);
        self.connected.store(false, Ordering::SeqCst);
        debug!(endpoint = %self.config.endpoint(), "disconnected");
    }

    /// Reads `count` units of `register_type` starting at `address`,
    /// addressed to `unit_id`.
    pub async fn read(
        &self,
        register_type: RegisterType,
        address: u16,
        count: u16,
        unit_id: u8,
    ) -> ModbusResult<RawValues> {
        let mut inner = self.inner.lock().await;
        let endpoint = self.config.endpoint();
        let Some(context) = inner.context.as_mut() else {
            return Err(ModbusError::not_connected(endpoint));
        };
        context.set_slave(Slave(unit_id));

        let outcome = issue_read(context, &self.config, register_type, address, count).await;
        match &outcome {
            Ok(_) => inner.record_success(),
            Err(err) => inner.record_error(err),
        }
        outcome
    }

    /// Writes a single coil.
    pub async fn write_coil(
        &self,
        address: u16,
        value: bool,
        unit_id: u8,
    ) -> ModbusResult<()> {
        let mut inner = self.inner.lock().await;
        let endpoint = self.config.endpoint();
        let Some(context) = inner.context.as_mut() else {
            return Err(ModbusError::not_connected(endpoint));
        };
        context.set_slave(Slave(unit_id));

        let outcome = timeout(
            self.config.request_timeout,
            context.write_single_coil(address, value),
        )
        .await
        .map_err(|_| ModbusError::request_timeout("write coil", self.config.request_timeout))
        .and_then(|r| r.map_err(|e| tcp::map_request_error(&endpoint, e)))
        .and_then(|r| r.map_err(|e| ModbusError::exception(0x05, format!("{e:?}"))));

        match &outcome {
            Ok(()) => inner.record_success(),
            Err(err) => inner.record_error(err),
        }
        outcome
    }

    /// Writes a single holding register.
    pub async fn write_register(
        &self,
        address: u16,
        value: u16,
        unit_id: u8,
    ) -> ModbusResult<()> {
        let mut inner = self.inner.lock().await;
        let endpoint = self.config.endpoint();
        let Some(context) = inner.context.as_mut() else {
            return Err(ModbusError::not_connected(endpoint));
        };
        context.set_slave(Slave(unit_id));

        let outcome = timeout(
            self.config.request_timeout,
            context.write_single_register(address, value),
        )
        .await
        .map_err(|_| ModbusError::request_timeout("write register", self.config.request_timeout))
        .and_then(|r| r.map_err(|e| tcp::map_request_error(&endpoint, e)))
        .and_then(|r| r.map_err(|e| ModbusError::exception(0x06, format!("{e:?}"))));

        match &outcome {
            Ok(()) => inner.record_success(),
            Err(err) => inner.record_error(err),
        }
        outcome
    }

    /// Status snapshot; the pool supplies the controller association.
    pub async fn status(&self, controller_id: Option<ControllerId>) -> HandleStatus {
        let inner = self.inner.lock().await;
        HandleStatus {
            endpoint: self.config.endpoint(),
            controller_id,
            connected: self.connected.load(Ordering::SeqCst),
            last_success: inner.last_success,
            last_error: inner.last_error.clone(),
        }
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("endpoint", &self.config.endpoint())
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .finish()
    }
}

/// Type-dispatched read with the per-request deadline applied.
async fn issue_read(
    context: &mut Context,
    config: &ClientConfig,
    register_type: RegisterType,
    address: u16,
    count: u16,
) -> ModbusResult<RawValues> {
    let endpoint = config.endpoint();
    let deadline = config.request_timeout;
    let function_code = register_type.read_function_code();
    let wanted = count as usize;

    match register_type {
        RegisterType::Coil | RegisterType::Input => {
            let request = if register_type == RegisterType::Coil {
                timeout(deadline, context.read_coils(address, count)).await
            } else {
                timeout(deadline, context.read_discrete_inputs(address, count)).await
            };
            let mut bits = request
                .map_err(|_| {
                    ModbusError::request_timeout(format!("read {register_type}"), deadline)
                })?
                .map_err(|e| tcp::map_request_error(&endpoint, e))?
                .map_err(|e| ModbusError::exception(function_code, format!("{e:?}")))?;
            // Responses are byte-padded on the wire; trim to the request.
            bits.truncate(wanted);
            if bits.len() < wanted {
                return Err(ModbusError::short_response(wanted, bits.len()));
            }
            Ok(RawValues::Bits(bits))
        }
        RegisterType::HoldingRegister | RegisterType::InputRegister => {
            let request = if register_type == RegisterType::HoldingRegister {
                timeout(deadline, context.read_holding_registers(address, count)).await
            } else {
                timeout(deadline, context.read_input_registers(address, count)).await
            };
            let registers = request
                .map_err(|_| {
                    ModbusError::request_timeout(format!("read {register_type}"), deadline)
                })?
                .map_err(|e| tcp::map_request_error(&endpoint, e))?
                .map_err(|e| ModbusError::exception(function_code, format!("{e:?}")))?;
            if registers.len() < wanted {
                return Err(ModbusError::short_response(wanted, registers.len()));
            }
            Ok(RawValues::Registers(registers))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
