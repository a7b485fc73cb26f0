//! # worldfeed-observability
//!
//! Structured logging for WorldFeed: JSON or human-readable output,
//! log levels configurable per component.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, LogConfig};
