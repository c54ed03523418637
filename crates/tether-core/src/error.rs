// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error taxonomy for the device-integration subsystem.
//!
//! [`IntegrationError`] is the single error type crossing the subsystem
//! boundary. Transport-level failures are absorbed below this layer and
//! surface only as the `ConnectionFailed` / `ReadFailed` / `WriteFailed`
//! variants; raw I/O errors never escape.
//!
//! Each variant carries its outward HTTP-style status code so the thin API
//! layer on top never has to re-derive the mapping. `RangeValidationFailed`
//! is deliberately distinct from `ValidationFailed`: a write rejected as
//! "not writable" maps to 409 while "out of range" maps to 422.

use thiserror::Error;

/// Result alias for subsystem operations.
pub type IntegrationResult<T> = Result<T, IntegrationError>;

// =============================================================================
// IntegrationError
// =============================================================================

/// The subsystem-wide error taxonomy.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// Referenced controller does not exist.
    #[error("Controller not found: {id}")]
    ControllerNotFound {
        /// The missing controller id.
        id: String,
    },

    /// Referenced point does not exist.
    #[error("Point not found: {id}")]
    PointNotFound {
        /// The missing point id.
        id: String,
    },

    /// A controller with the same `(host, port)` already exists.
    #[error("Controller already exists for endpoint {host}:{port}")]
    ControllerDuplicate {
        /// Conflicting host.
        host: String,
        /// Conflicting port.
        port: u16,
    },

    /// A point with the same `(address, type, unit_id)` already exists
    /// on the controller.
    #[error("Point already exists at address {address} ({point_type}, unit {unit_id})")]
    PointDuplicate {
        /// Conflicting address.
        address: u16,
        /// Conflicting point type.
        point_type: String,
        /// Conflicting unit id.
        unit_id: u8,
    },

    /// A transport connect attempt did not succeed.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Failure description.
        message: String,
    },

    /// Transport I/O error during an otherwise-valid read.
    #[error("Read failed: {message}")]
    ReadFailed {
        /// Failure description.
        message: String,
    },

    /// Transport I/O error during an otherwise-valid write.
    #[error("Write failed: {message}")]
    WriteFailed {
        /// Failure description.
        message: String,
    },

    /// Semantic precondition violated (wrong value type for the point
    /// type, write attempted on a read-only point type).
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Violation description.
        message: String,
    },

    /// Numeric value outside the configured bounds. Kept distinct from
    /// [`IntegrationError::ValidationFailed`] because it maps to a
    /// different outward status.
    #[error("Range validation failed: {message}")]
    RangeValidationFailed {
        /// Violation description.
        message: String,
    },

    /// Interchange payload failed structural validation or used the
    /// wrong format tag.
    #[error("Invalid configuration format: {message}")]
    ConfigFormat {
        /// Validation failure description.
        message: String,
    },

    /// Any other import/export failure.
    #[error("Configuration operation failed: {message}")]
    Config {
        /// Failure description.
        message: String,
    },

    /// Storage collaborator failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Unanticipated failure; reported without detail leakage.
    #[error("Internal error: {message}")]
    Internal {
        /// Failure description (for logs, not user-facing detail).
        message: String,
    },
}

impl IntegrationError {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a controller-not-found error.
    pub fn controller_not_found(id: impl Into<String>) -> Self {
        Self::ControllerNotFound { id: id.into() }
    }

    /// Creates a point-not-found error.
    pub fn point_not_found(id: impl Into<String>) -> Self {
        Self::PointNotFound { id: id.into() }
    }

    /// Creates a duplicate-controller error for an endpoint.
    pub fn controller_duplicate(host: impl Into<String>, port: u16) -> Self {
        Self::ControllerDuplicate {
            host: host.into(),
            port,
        }
    }

    /// Creates a duplicate-point error for an identity tuple.
    pub fn point_duplicate(address: u16, point_type: impl Into<String>, unit_id: u8) -> Self {
        Self::PointDuplicate {
            address,
            point_type: point_type.into(),
            unit_id,
        }
    }

    /// Creates a connection-failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Creates a read-failed error.
    pub fn read_failed(message: impl Into<String>) -> Self {
        Self::ReadFailed {
            message: message.into(),
        }
    }

    /// Creates a write-failed error.
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// Creates a range-validation error.
    pub fn range_validation(message: impl Into<String>) -> Self {
        Self::RangeValidationFailed {
            message: message.into(),
        }
    }

    /// Creates a config-format error.
    pub fn config_format(message: impl Into<String>) -> Self {
        Self::ConfigFormat {
            message: message.into(),
        }
    }

    /// Creates a generic config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Returns the outward HTTP-style status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ControllerNotFound { .. } | Self::PointNotFound { .. } => 404,
            Self::ControllerDuplicate { .. }
            | Self::PointDuplicate { .. }
            | Self::ValidationFailed { .. } => 409,
            Self::RangeValidationFailed { .. } => 422,
            Self::ConnectionFailed { .. }
            | Self::ReadFailed { .. }
            | Self::WriteFailed { .. }
            | Self::ConfigFormat { .. }
            | Self::Config { .. } => 400,
            Self::Storage(_) | Self::Internal { .. } => 500,
        }
    }

    /// Returns `true` if retrying the operation later could succeed
    /// without any configuration change.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::ReadFailed { .. }
                | Self::WriteFailed { .. }
                | Self::Storage(StorageError::Unavailable { .. })
        )
    }

    /// Short stable name of the error kind, for logs and wire payloads.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ControllerNotFound { .. } => "controller_not_found",
            Self::PointNotFound { .. } => "point_not_found",
            Self::ControllerDuplicate { .. } => "controller_duplicate",
            Self::PointDuplicate { .. } => "point_duplicate",
            Self::ConnectionFailed { .. } => "connection_failed",
            Self::ReadFailed { .. } => "read_failed",
            Self::WriteFailed { .. } => "write_failed",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::RangeValidationFailed { .. } => "range_validation_failed",
            Self::ConfigFormat { .. } => "config_format_error",
            Self::Config { .. } => "config_error",
            Self::Storage(_) => "storage_error",
            Self::Internal { .. } => "internal_error",
        }
    }
}

// =============================================================================
// StorageError
// =============================================================================

/// Failure reported by the storage collaborator.
///
/// The store is reached through a narrow repository interface; these are
/// the only failure shapes it may surface. Uniqueness violations are
/// detected by the service layer before writes, so the store reports a
/// constraint breach only when races get past that check.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store cannot be reached right now.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Failure description.
        message: String,
    },

    /// A storage-level constraint rejected the write.
    #[error("storage constraint violated: {message}")]
    Constraint {
        /// Violation description.
        message: String,
    },

    /// Any other storage failure.
    #[error("storage failure: {message}")]
    Internal {
        /// Failure description.
        message: String,
    },
}

impl StorageError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a constraint-violation error.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint {
            message: message.into(),
        }
    }

    /// Creates an internal storage error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
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
    fn test_status_codes() {
        assert_eq!(IntegrationError::controller_not_found("c1").status_code(), 404);
        assert_eq!(IntegrationError::point_not_found("p1").status_code(), 404);
        assert_eq!(
            IntegrationError::controller_duplicate("10.0.0.1", 502).status_code(),
            409
        );
        assert_eq!(
            IntegrationError::point_duplicate(100, "coil", 1).status_code(),
            409
        );
        assert_eq!(IntegrationError::validation("read-only").status_code(), 409);
        assert_eq!(
            IntegrationError::range_validation("out of range").status_code(),
            422
        );
        assert_eq!(IntegrationError::connection_failed("refused").status_code(), 400);
        assert_eq!(IntegrationError::read_failed("io").status_code(), 400);
        assert_eq!(IntegrationError::write_failed("io").status_code(), 400);
        assert_eq!(IntegrationError::config_format("bad").status_code(), 400);
        assert_eq!(IntegrationError::config("merge").status_code(), 400);
        assert_eq!(IntegrationError::internal("boom").status_code(), 500);
        assert_eq!(
            IntegrationError::from(StorageError::unavailable("down")).status_code(),
            500
        );
    }

    #[test]
    fn test_range_distinct_from_validation() {
        let validation = IntegrationError::validation("not writable");
        let range = IntegrationError::range_validation("above maximum");
        assert_ne!(validation.status_code(), range.status_code());
        assert_ne!(validation.kind(), range.kind());
    }

    #[test]
    fn test_retryability() {
        assert!(IntegrationError::connection_failed("refused").is_retryable());
        assert!(IntegrationError::read_failed("timeout").is_retryable());
        assert!(!IntegrationError::validation("bad type").is_retryable());
        assert!(!IntegrationError::controller_not_found("c1").is_retryable());
        assert!(IntegrationError::from(StorageError::unavailable("down")).is_retryable());
        assert!(!IntegrationError::from(StorageError::internal("bug")).is_retryable());
    }

    #[test]
    fn test_messages_name_the_conflict() {
        let err = IntegrationError::controller_duplicate("10.0.0.1", 502);
        assert!(err.to_string().contains("10.0.0.1:502"));

        let err = IntegrationError::point_duplicate(40001, "holding_register", 3);
        let text = err.to_string();
        assert!(text.contains("40001"));
        assert!(text.contains("holding_register"));
        assert!(text.contains("unit 3"));
    }
}
