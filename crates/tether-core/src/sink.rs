// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Time-series sink interface.
//!
//! Collected samples leave the subsystem through [`SampleSink`]. The
//! collection sweep publishes batches; what sits behind the trait (a
//! historian, a message bus, a log) is none of this crate's business.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Sample;

/// Failure reported by a sample sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink cannot accept data right now.
    #[error("sink unavailable: {message}")]
    Unavailable {
        /// Failure description.
        message: String,
    },

    /// The sink rejected the batch.
    #[error("sink rejected batch: {message}")]
    Rejected {
        /// Rejection description.
        message: String,
    },
}

impl SinkError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Destination for collected samples.
///
/// Implementations send sample batches to downstream systems.
#[async_trait]
pub trait SampleSink: Send + Sync {
    /// Publishes a batch of samples.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if the whole batch was accepted
    /// - `Err(SinkError)` if the publish failed; the caller decides
    ///   whether to drop or retry
    async fn publish(&self, samples: &[Sample]) -> Result<(), SinkError>;

    /// Returns the name of this sink for logging.
    fn name(&self) -> &str;
}
