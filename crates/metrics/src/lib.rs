//! Metrics collection and export for gamebridge.
//!
//! This crate provides metric names and a unified metrics interface using the
//! `metrics` crate facade. When the `prometheus` feature is enabled, metrics
//! are served in Prometheus format from an HTTP listener.
//!
//! # Usage
//!
//! ```rust,ignore
//! use gamebridge_metrics::{counter, rcon};
//!
//! counter!(rcon::COMMANDS_TOTAL).increment(1);
//! ```

mod definitions;
mod error;
mod recorder;

pub use {
    definitions::*,
    error::{Error, Result},
    recorder::{MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
