//! Hydromap Core - Domain models, raster access, and configuration
//!
//! This crate contains the core domain types and port definitions shared by the
//! delineation engine and its adapters.

pub mod config;
pub mod error;
pub mod formats;
pub mod models;
pub mod ports;

pub use error::{ErrorCategory, HydroError, Result};
