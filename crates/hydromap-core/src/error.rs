//! Error types for Hydromap

use std::path::PathBuf;
use thiserror::Error;

/// How an error should be surfaced to callers of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A required input dataset is absent (service unavailable)
    MissingData,
    /// The request itself is invalid (client error)
    InvalidInput,
    /// A data or logic problem while computing the result (server error)
    Processing,
    /// Result cache fault; never propagated past the orchestrator
    Cache,
}

#[derive(Debug, Error)]
pub enum HydroError {
    // Missing-data errors
    #[error("Required raster '{name}' not found at {path}")]
    RasterNotFound { name: String, path: PathBuf },

    // Input-validation errors
    #[error("Invalid value for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Pour point is outside the raster extent (row {row}, col {col}; raster is {rows}x{cols})")]
    OutOfBounds {
        row: i64,
        col: i64,
        rows: usize,
        cols: usize,
    },

    // Processing errors
    #[error("Could not delineate watershed: no contributing area found")]
    EmptyWatershed,

    #[error("Projection error ({from} -> {to}): {reason}")]
    Projection {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Failed to read raster {path}: {reason}")]
    RasterRead { path: PathBuf, reason: String },

    #[error("Invalid raster: {0}")]
    InvalidRaster(String),

    #[error("Background task failed: {0}")]
    Task(String),

    // Cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl HydroError {
    /// Classify the error per the engine's error taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            HydroError::RasterNotFound { .. } => ErrorCategory::MissingData,
            HydroError::InvalidInput { .. } | HydroError::OutOfBounds { .. } => {
                ErrorCategory::InvalidInput
            }
            HydroError::Cache(_) => ErrorCategory::Cache,
            _ => ErrorCategory::Processing,
        }
    }

    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        HydroError::InvalidInput { field: field.into(), reason: reason.into() }
    }
}

impl From<serde_json::Error> for HydroError {
    fn from(err: serde_json::Error) -> Self {
        HydroError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HydroError>;
