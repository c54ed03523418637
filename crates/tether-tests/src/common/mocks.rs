// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Test doubles for the collaborators around the Modbus integration
//! layer.
//!
//! ## Design Principles
//!
//! - Configurable behavior for different test scenarios
//! - Recording of interactions for verification
//! - Thread-safe for concurrent testing
//! - Easy to set up error injection
//!
//! The centerpiece is [`PlcSimulator`], a real Modbus TCP server on a
//! loopback port, so transport tests exercise the genuine wire path
//! instead of a stubbed client.

use std::collections::HashMap;
use std::future;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_modbus::prelude::*;
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};
use tracing::debug;

use tether_core::{
    Controller, ControllerFilter, ControllerId, DeviceStore, MemoryStore, Point, PointId,
    PointKey, RegisterType, Sample, SampleSink, SinkError, StorageError, StoreResult,
};

// =============================================================================
// PLC Simulator
// =============================================================================

/// An in-process Modbus TCP device with four seedable register banks.
///
/// Cloning shares the banks, so a test can keep one clone for seeding
/// and assertions while the server task serves connections from another.
/// Reads of unseeded addresses answer with `IllegalDataAddress`, the way
/// a real PLC rejects an out-of-map request; writes always land.
#[derive(Debug, Clone, Default)]
pub struct PlcSimulator {
    coils: Arc<Mutex<HashMap<u16, bool>>>,
    discrete: Arc<Mutex<HashMap<u16, bool>>>,
    holding: Arc<Mutex<HashMap<u16, u16>>>,
    input: Arc<Mutex<HashMap<u16, u16>>>,
}

impl PlcSimulator {
    /// Creates a simulator with empty register banks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a coil.
    pub fn set_coil(&self, address: u16, state: bool) {
        self.coils.lock().insert(address, state);
    }

    /// Seeds a discrete input.
    pub fn set_discrete(&self, address: u16, state: bool) {
        self.discrete.lock().insert(address, state);
    }

    /// Seeds a holding register.
    pub fn set_holding(&self, address: u16, value: u16) {
        self.holding.lock().insert(address, value);
    }

    /// Seeds consecutive holding registers starting at `address`.
    pub fn set_holding_block(&self, address: u16, values: &[u16]) {
        let mut bank = self.holding.lock();
        for (offset, &value) in values.iter().enumerate() {
            bank.insert(address + offset as u16, value);
        }
    }

    /// Seeds an input register.
    pub fn set_input(&self, address: u16, value: u16) {
        self.input.lock().insert(address, value);
    }

    /// Seeds consecutive input registers starting at `address`.
    pub fn set_input_block(&self, address: u16, values: &[u16]) {
        let mut bank = self.input.lock();
        for (offset, &value) in values.iter().enumerate() {
            bank.insert(address + offset as u16, value);
        }
    }

    /// Current value of a holding register, for write assertions.
    pub fn holding(&self, address: u16) -> Option<u16> {
        self.holding.lock().get(&address).copied()
    }

    /// Current state of a coil, for write assertions.
    pub fn coil(&self, address: u16) -> Option<bool> {
        self.coils.lock().get(&address).copied()
    }

    /// Binds a loopback port and starts serving.
    ///
    /// The returned handle owns the server task and aborts it on drop.
    pub async fn spawn(&self) -> io::Result<SimulatorHandle> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let server = Server::new(listener);
        let service = self.clone();

        let task = tokio::spawn(async move {
            let on_connected = move |stream, socket_addr| {
                let service = service.clone();
                async move {
                    accept_tcp_connection(stream, socket_addr, move |_addr| {
                        Ok(Some(service.clone()))
                    })
                }
            };
            let on_process_error = |err| {
                debug!(error = %err, "simulator connection error");
            };
            if let Err(err) = server.serve(&on_connected, on_process_error).await {
                debug!(error = %err, "simulator stopped");
            }
        });

        Ok(SimulatorHandle { port, task })
    }
}

impl tokio_modbus::server::Service for PlcSimulator {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        let res = match req {
            Request::ReadCoils(addr, cnt) => {
                bit_read(&self.coils.lock(), addr, cnt).map(Response::ReadCoils)
            }
            Request::ReadDiscreteInputs(addr, cnt) => {
                bit_read(&self.discrete.lock(), addr, cnt).map(Response::ReadDiscreteInputs)
            }
            Request::ReadHoldingRegisters(addr, cnt) => {
                register_read(&self.holding.lock(), addr, cnt).map(Response::ReadHoldingRegisters)
            }
            Request::ReadInputRegisters(addr, cnt) => {
                register_read(&self.input.lock(), addr, cnt).map(Response::ReadInputRegisters)
            }
            Request::WriteSingleCoil(addr, state) => {
                self.coils.lock().insert(addr, state);
                Ok(Response::WriteSingleCoil(addr, state))
            }
            Request::WriteSingleRegister(addr, value) => {
                self.holding.lock().insert(addr, value);
                Ok(Response::WriteSingleRegister(addr, value))
            }
            Request::WriteMultipleCoils(addr, states) => {
                let mut bank = self.coils.lock();
                for (offset, &state) in states.iter().enumerate() {
                    bank.insert(addr + offset as u16, state);
                }
                Ok(Response::WriteMultipleCoils(addr, states.len() as u16))
            }
            Request::WriteMultipleRegisters(addr, values) => {
                let mut bank = self.holding.lock();
                for (offset, &value) in values.iter().enumerate() {
                    bank.insert(addr + offset as u16, value);
                }
                Ok(Response::WriteMultipleRegisters(addr, values.len() as u16))
            }
            _ => Err(ExceptionCode::IllegalFunction),
        };
        future::ready(res)
    }
}

fn register_read(
    bank: &HashMap<u16, u16>,
    addr: u16,
    cnt: u16,
) -> Result<Vec<u16>, ExceptionCode> {
    let mut values = Vec::with_capacity(cnt as usize);
    for offset in 0..cnt {
        let address = addr.checked_add(offset).ok_or(ExceptionCode::IllegalDataAddress)?;
        let Some(&value) = bank.get(&address) else {
            return Err(ExceptionCode::IllegalDataAddress);
        };
        values.push(value);
    }
    Ok(values)
}

fn bit_read(bank: &HashMap<u16, bool>, addr: u16, cnt: u16) -> Result<Vec<bool>, ExceptionCode> {
    let mut states = Vec::with_capacity(cnt as usize);
    for offset in 0..cnt {
        let address = addr.checked_add(offset).ok_or(ExceptionCode::IllegalDataAddress)?;
        let Some(&state) = bank.get(&address) else {
            return Err(ExceptionCode::IllegalDataAddress);
        };
        states.push(state);
    }
    Ok(states)
}

/// Running [`PlcSimulator`] server bound to a loopback port.
#[derive(Debug)]
pub struct SimulatorHandle {
    port: u16,
    task: JoinHandle<()>,
}

impl SimulatorHandle {
    /// The bound TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// Recording Sink
// =============================================================================

/// A [`SampleSink`] that records every published batch.
#[derive(Debug, Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Vec<Sample>>>,
    fail_next: AtomicBool,
    publish_count: AtomicU64,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next publish fail with an unavailable error.
    pub fn fail_next_publish(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Number of publish calls, including failed ones.
    pub fn publish_count(&self) -> u64 {
        self.publish_count.load(Ordering::SeqCst)
    }

    /// Number of accepted batches.
    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    /// All accepted samples, flattened in publish order.
    pub fn samples(&self) -> Vec<Sample> {
        self.batches.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl SampleSink for RecordingSink {
    async fn publish(&self, samples: &[Sample]) -> Result<(), SinkError> {
        self.publish_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SinkError::unavailable("injected sink outage"));
        }
        self.batches.lock().push(samples.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

// =============================================================================
// Failing Store
// =============================================================================

/// A [`DeviceStore`] wrapper with switchable outage injection.
///
/// Delegates to an inner [`MemoryStore`]; with a failure flag raised,
/// the corresponding operation class returns
/// [`StorageError::Unavailable`] without touching the inner store.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FailingStore {
    /// Creates a store with no failures armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms or clears read-path failures.
    pub fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    /// Arms or clears write-path failures.
    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    fn read_gate(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(StorageError::unavailable("injected storage outage"))
        } else {
            Ok(())
        }
    }

    fn write_gate(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::unavailable("injected storage outage"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DeviceStore for FailingStore {
    async fn insert_controller(&self, controller: Controller) -> StoreResult<()> {
        self.write_gate()?;
        self.inner.insert_controller(controller).await
    }

    async fn controller(&self, id: &ControllerId) -> StoreResult<Option<Controller>> {
        self.read_gate()?;
        self.inner.controller(id).await
    }

    async fn controller_by_endpoint(
        &self,
        host: &str,
        port: u16,
    ) -> StoreResult<Option<Controller>> {
        self.read_gate()?;
        self.inner.controller_by_endpoint(host, port).await
    }

    async fn controllers(&self, filter: &ControllerFilter) -> StoreResult<Vec<Controller>> {
        self.read_gate()?;
        self.inner.controllers(filter).await
    }

    async fn update_controller(&self, controller: Controller) -> StoreResult<bool> {
        self.write_gate()?;
        self.inner.update_controller(controller).await
    }

    async fn set_controller_status(&self, id: &ControllerId, status: bool) -> StoreResult<bool> {
        self.write_gate()?;
        self.inner.set_controller_status(id, status).await
    }

    async fn delete_controller(&self, id: &ControllerId) -> StoreResult<Option<Controller>> {
        self.write_gate()?;
        self.inner.delete_controller(id).await
    }

    async fn controller_count(&self) -> StoreResult<usize> {
        self.read_gate()?;
        self.inner.controller_count().await
    }

    async fn insert_point(&self, point: Point) -> StoreResult<()> {
        self.write_gate()?;
        self.inner.insert_point(point).await
    }

    async fn point(&self, id: &PointId) -> StoreResult<Option<Point>> {
        self.read_gate()?;
        self.inner.point(id).await
    }

    async fn find_point(
        &self,
        controller_id: &ControllerId,
        key: &PointKey,
    ) -> StoreResult<Option<Point>> {
        self.read_gate()?;
        self.inner.find_point(controller_id, key).await
    }

    async fn points_for(
        &self,
        controller_id: &ControllerId,
        point_type: Option<RegisterType>,
    ) -> StoreResult<Vec<Point>> {
        self.read_gate()?;
        self.inner.points_for(controller_id, point_type).await
    }

    async fn update_point(&self, point: Point) -> StoreResult<bool> {
        self.write_gate()?;
        self.inner.update_point(point).await
    }

    async fn delete_point(&self, id: &PointId) -> StoreResult<Option<Point>> {
        self.write_gate()?;
        self.inner.delete_point(id).await
    }

    async fn delete_points_for(&self, controller_id: &ControllerId) -> StoreResult<usize> {
        self.write_gate()?;
        self.inner.delete_points_for(controller_id).await
    }

    async fn replace_points(
        &self,
        controller_id: &ControllerId,
        points: Vec<Point>,
    ) -> StoreResult<usize> {
        self.write_gate()?;
        self.inner.replace_points(controller_id, points).await
    }

    async fn point_count(&self) -> StoreResult<usize> {
        self.read_gate()?;
        self.inner.point_count().await
    }
}
