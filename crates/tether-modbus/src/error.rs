// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus transport error types.
//!
//! Failures below the engine boundary are expressed as [`ModbusError`];
//! the engine translates them into the subsystem taxonomy with the
//! operation direction (read/write/connect) it alone knows.
//!
//! # Error Categories
//!
//! ```text
//! ModbusError
//! ├── Connection  - TCP connect/reconnect/liveness failures
//! ├── Protocol    - exception responses, malformed replies
//! └── Timeout     - per-request deadline expiry
//! ```

use std::io;
use std::time::Duration;

use thiserror::Error;

/// A Result type with ModbusError.
pub type ModbusResult<T> = Result<T, ModbusError>;

// =============================================================================
// ModbusError - Main Error Type
// =============================================================================

/// The main error type for Modbus transport operations.
#[derive(Debug, Error)]
pub enum ModbusError {
    /// TCP connection issues.
    #[error("{0}")]
    Connection(#[from] ConnectionError),

    /// Modbus protocol violations and exception responses.
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// A request did not complete within its deadline.
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        /// Operation description (e.g. `read coil`).
        operation: String,
        /// The deadline that expired.
        duration: Duration,
    },
}

impl ModbusError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a connection refused error.
    pub fn refused(host: impl Into<String>, port: u16, source: io::Error) -> Self {
        Self::Connection(ConnectionError::Refused {
            host: host.into(),
            port,
            source: Some(source),
        })
    }

    /// Creates a connect timeout error.
    pub fn connect_timed_out(host: impl Into<String>, port: u16, duration: Duration) -> Self {
        Self::Connection(ConnectionError::TimedOut {
            host: host.into(),
            port,
            duration,
        })
    }

    /// Creates a DNS resolution error.
    pub fn dns_failed(hostname: impl Into<String>, source: Option<io::Error>) -> Self {
        Self::Connection(ConnectionError::DnsFailed {
            hostname: hostname.into(),
            source,
        })
    }

    /// Creates a not-connected error.
    pub fn not_connected(endpoint: impl Into<String>) -> Self {
        Self::Connection(ConnectionError::NotConnected {
            endpoint: endpoint.into(),
        })
    }

    /// Creates a connection-closed error.
    pub fn closed(endpoint: impl Into<String>) -> Self {
        Self::Connection(ConnectionError::Closed {
            endpoint: endpoint.into(),
        })
    }

    /// Creates an exception response error from a device reply.
    pub fn exception(function_code: u8, exception: impl Into<String>) -> Self {
        Self::Protocol(ProtocolError::Exception {
            function_code,
            exception: exception.into(),
        })
    }

    /// Creates a short-response error.
    pub fn short_response(expected: usize, actual: usize) -> Self {
        Self::Protocol(ProtocolError::ShortResponse { expected, actual })
    }

    /// Creates a request timeout error.
    pub fn request_timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns `true` if this error is transient and a later retry could
    /// succeed without any configuration change.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(e) => e.is_retryable(),
            Self::Protocol(e) => e.is_retryable(),
            Self::Timeout { .. } => true,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Protocol(_) => "protocol",
            Self::Timeout { .. } => "timeout",
        }
    }
}

// =============================================================================
// ConnectionError
// =============================================================================

/// TCP connection errors.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The device refused the connection.
    #[error("Connection refused to {host}:{port}")]
    Refused {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
        /// Underlying error.
        #[source]
        source: Option<io::Error>,
    },

    /// Connect did not finish within the deadline.
    #[error("Connection to {host}:{port} timed out after {duration:?}")]
    TimedOut {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
        /// The deadline that expired.
        duration: Duration,
    },

    /// Hostname resolution failed.
    #[error("Failed to resolve hostname '{hostname}'")]
    DnsFailed {
        /// The hostname that failed to resolve.
        hostname: String,
        /// Underlying error.
        #[source]
        source: Option<io::Error>,
    },

    /// An operation was attempted on a handle with no live connection.
    #[error("Not connected to {endpoint}")]
    NotConnected {
        /// Target endpoint.
        endpoint: String,
    },

    /// The peer closed the connection.
    #[error("Connection to {endpoint} closed by peer")]
    Closed {
        /// Target endpoint.
        endpoint: String,
    },

    /// Any other I/O failure.
    #[error("I/O error on {endpoint}: {source}")]
    Io {
        /// Target endpoint.
        endpoint: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl ConnectionError {
    /// Classifies an I/O error from a connect attempt against `host:port`.
    pub fn from_connect_io(host: &str, port: u16, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::ConnectionRefused => Self::Refused {
                host: host.to_string(),
                port,
                source: Some(error),
            },
            io::ErrorKind::TimedOut => Self::TimedOut {
                host: host.to_string(),
                port,
                duration: Duration::from_secs(0),
            },
            _ => Self::Io {
                endpoint: format!("{host}:{port}"),
                source: error,
            },
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Refused { .. }
            | Self::TimedOut { .. }
            | Self::DnsFailed { .. }
            | Self::NotConnected { .. }
            | Self::Closed { .. } => true,
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
            ),
        }
    }
}

// =============================================================================
// ProtocolError
// =============================================================================

/// Modbus protocol-level errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The device answered with a Modbus exception.
    #[error("Modbus exception on function {function_code:#04x}: {exception}")]
    Exception {
        /// The function code the request carried.
        function_code: u8,
        /// Exception description from the wire.
        exception: String,
    },

    /// The response carried fewer values than requested.
    #[error("Short response: expected {expected} values, got {actual}")]
    ShortResponse {
        /// Requested count.
        expected: usize,
        /// Received count.
        actual: usize,
    },

    /// Anything else the device sent that could not be interpreted.
    #[error("Unexpected response: {message}")]
    UnexpectedResponse {
        /// Description.
        message: String,
    },
}

impl ProtocolError {
    /// Returns `true` if this error is retryable.
    ///
    /// Busy-style exceptions (Acknowledge, Device Busy, gateway target
    /// timeouts) clear on their own; address and value exceptions do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Exception { exception, .. } => {
                exception.contains("Acknowledge")
                    || exception.contains("Busy")
                    || exception.contains("GatewayTargetDevice")
            }
            Self::ShortResponse { .. } => false,
            Self::UnexpectedResponse { .. } => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_io_classification() {
        let refused = ConnectionError::from_connect_io(
            "10.0.0.1",
            502,
            io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        );
        assert!(matches!(refused, ConnectionError::Refused { port: 502, .. }));
        assert!(refused.is_retryable());

        let other = ConnectionError::from_connect_io(
            "10.0.0.1",
            502,
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(other, ConnectionError::Io { .. }));
        assert!(!other.is_retryable());
    }

    #[test]
    fn test_reset_io_is_retryable() {
        let reset = ConnectionError::Io {
            endpoint: "10.0.0.1:502".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionReset, "reset"),
        };
        assert!(reset.is_retryable());
    }

    #[test]
    fn test_exception_retryability() {
        let busy = ModbusError::exception(0x03, "ServerDeviceBusy");
        assert!(busy.is_retryable());

        let illegal = ModbusError::exception(0x03, "IllegalDataAddress");
        assert!(!illegal.is_retryable());
    }

    #[test]
    fn test_timeout_is_retryable() {
        let timeout = ModbusError::request_timeout("read coil", Duration::from_secs(3));
        assert!(timeout.is_retryable());
        assert_eq!(timeout.category(), "timeout");
        assert!(timeout.to_string().contains("read coil"));
    }

    #[test]
    fn test_messages_carry_endpoint() {
        let err = ModbusError::not_connected("10.0.0.9:502");
        assert!(err.to_string().contains("10.0.0.9:502"));
        assert_eq!(err.category(), "connection");

        let err = ModbusError::exception(0x06, "IllegalDataValue");
        assert!(err.to_string().contains("0x06"));
    }

    #[test]
    fn test_short_response() {
        let err = ModbusError::short_response(4, 2);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("expected 4"));
    }
}
