// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration import/export between interchange formats.
//!
//! Two formats are spoken: the native document (a direct projection of
//! one controller and its points) and the ThingsBoard gateway document
//! (`master.slaves[]` with points scattered across `attributes`,
//! `timeseries` and `rpc` sections). [`validator`] checks structure
//! before any import; [`manager::ConfigManager`] orchestrates the
//! storage side under four duplicate-handling modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use tether_core::IntegrationError;

pub mod manager;
pub mod native;
pub mod thingsboard;
pub mod validator;

pub use manager::{
    ConfigManager, ExportArtifact, ImportReport, ImportStatus, PointImportOutcome,
    PointImportStatus,
};
pub use native::NativeConfig;
pub use thingsboard::{TbDocument, TbItem, TbMaster, TbSlave};

// =============================================================================
// Format and Mode Vocabulary
// =============================================================================

/// Supported interchange formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigFormat {
    /// Native controller + points document.
    Native,
    /// ThingsBoard gateway document.
    Thingsboard,
}

impl ConfigFormat {
    /// Returns the canonical tag (`native` or `thingsboard`).
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigFormat::Native => "native",
            ConfigFormat::Thingsboard => "thingsboard",
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConfigFormat {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(ConfigFormat::Native),
            "thingsboard" => Ok(ConfigFormat::Thingsboard),
            other => Err(IntegrationError::config_format(format!(
                "unsupported format: {other}"
            ))),
        }
    }
}

/// Duplicate-handling policy when an import matches a stored controller
/// by endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Leave the existing controller untouched.
    #[default]
    SkipController,
    /// Update the controller's mutable fields and replace its whole
    /// point set with the imported one.
    OverwriteController,
    /// Merge points, leaving existing identity matches untouched.
    SkipDuplicatesPoint,
    /// Merge points, updating existing identity matches in place.
    OverwriteDuplicatesPoint,
}

impl ImportMode {
    /// Returns the canonical mode tag.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ImportMode::SkipController => "skip_controller",
            ImportMode::OverwriteController => "overwrite_controller",
            ImportMode::SkipDuplicatesPoint => "skip_duplicates_point",
            ImportMode::OverwriteDuplicatesPoint => "overwrite_duplicates_point",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip_controller" => Ok(ImportMode::SkipController),
            "overwrite_controller" => Ok(ImportMode::OverwriteController),
            "skip_duplicates_point" => Ok(ImportMode::SkipDuplicatesPoint),
            "overwrite_duplicates_point" => Ok(ImportMode::OverwriteDuplicatesPoint),
            other => Err(IntegrationError::config_format(format!(
                "unsupported import mode: {other}"
            ))),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
