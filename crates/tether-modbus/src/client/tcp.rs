// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Low-level Modbus TCP plumbing.
//!
//! Establishes connections via `tokio-modbus`, keeps a cloned socket
//! handle for liveness probes, and maps transport failures onto the
//! crate's error types.

use std::io;
use std::net::SocketAddr;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tokio_modbus::Error as TokioModbusError;

use crate::error::{ConnectionError, ModbusError, ModbusResult, ProtocolError};
use crate::types::ClientConfig;

/// Opens a connection and returns the Modbus context together with a
/// cloned socket handle used for later liveness probes.
///
/// The context is attached with a placeholder unit id; every request
/// overrides it via `set_slave` before touching the wire. The whole
/// sequence is bounded by the configured connect timeout.
pub(crate) async fn establish(
    config: &ClientConfig,
) -> ModbusResult<(Context, std::net::TcpStream)> {
    let addr = resolve(config).await?;

    let connect = async {
        let io_error = |e: io::Error| {
            ModbusError::Connection(ConnectionError::Io {
                endpoint: config.endpoint(),
                source: e,
            })
        };

        let stream = TcpStream::connect(addr).await.map_err(|e| {
            ModbusError::Connection(ConnectionError::from_connect_io(
                &config.host,
                config.port,
                e,
            ))
        })?;
        stream.set_nodelay(config.tcp_nodelay).ok();

        // Detour through std to duplicate the socket; the clone shares
        // the file description and sees the same connection state.
        let std_stream = stream.into_std().map_err(io_error)?;
        let probe = std_stream.try_clone().map_err(io_error)?;
        probe.set_nonblocking(true).ok();
        let stream = TcpStream::from_std(std_stream).map_err(io_error)?;

        let context = tcp::attach_slave(stream, Slave(1));
        Ok::<_, ModbusError>((context, probe))
    };

    timeout(config.connect_timeout, connect)
        .await
        .map_err(|_| {
            ModbusError::connect_timed_out(&config.host, config.port, config.connect_timeout)
        })?
}

/// Resolves the configured endpoint, trying a literal `IP:port` parse
/// before DNS.
async fn resolve(config: &ClientConfig) -> ModbusResult<SocketAddr> {
    let endpoint = config.endpoint();
    if let Ok(addr) = endpoint.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let mut addrs = tokio::net::lookup_host(&endpoint)
        .await
        .map_err(|e| ModbusError::dns_failed(&config.host, Some(e)))?;
    addrs
        .next()
        .ok_or_else(|| ModbusError::dns_failed(&config.host, None))
}

/// Non-blocking liveness check on the probe socket.
///
/// A zero-byte read means the peer sent FIN; `WouldBlock` means the
/// connection is idle but open. Half-open links where the peer vanished
/// without a FIN surface as errors here once the kernel notices.
pub(crate) fn probe_alive(probe: Option<&std::net::TcpStream>) -> bool {
    let Some(stream) = probe else {
        return false;
    };
    let mut buf = [0u8; 1];
    match stream.peek(&mut buf) {
        Ok(0) => false,
        Ok(_) => true,
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => true,
        Err(_) => false,
    }
}

/// Maps a `tokio-modbus` request error onto the crate's error types.
pub(crate) fn map_request_error(endpoint: &str, error: TokioModbusError) -> ModbusError {
    match error {
        TokioModbusError::Transport(io_error) => {
            ModbusError::Connection(classify_io(endpoint, io_error))
        }
        TokioModbusError::Protocol(protocol_error) => {
            ModbusError::Protocol(ProtocolError::UnexpectedResponse {
                message: format!("{protocol_error:?}"),
            })
        }
    }
}

fn classify_io(endpoint: &str, error: io::Error) -> ConnectionError {
    match error.kind() {
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => ConnectionError::Closed {
            endpoint: endpoint.to_string(),
        },
        io::ErrorKind::NotConnected => ConnectionError::NotConnected {
            endpoint: endpoint.to_string(),
        },
        _ => ConnectionError::Io {
            endpoint: endpoint.to_string(),
            source: error,
        },
    }
}

// =============================================================================
// Tests
// =============================================================================
