//! Error types for the WorldFeed pipeline.
//!
//! Each layer has its own enum and a strict propagation policy: decode
//! issues never become errors at all (identity passthrough), envelope
//! issues stop at the worker boundary as `FaultRecord`s, and only
//! subscription-level faults reach the merged output — as data, never as
//! an unwound failure.

use thiserror::Error;

/// Errors raised while parsing one raw subscription message into a
/// normalized record. Per-message and non-fatal to the stream.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("malformed envelope: {reason}")]
    Malformed { reason: String },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors reported by a transport collaborator. Fatal to the owning
/// subscription only; the `recoverable` classification feeds retry policy.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("connection reset: {reason}")]
    ConnectionReset { reason: String },

    #[error("stream closed unexpectedly")]
    Closed,

    #[error("subscription timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("invalid request parameters: {reason}")]
    InvalidRequest { reason: String },

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether resubscribing with the same parameters could succeed.
    /// Connection-level failures are transient; bad request parameters
    /// are not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TransportError::InvalidRequest { .. })
    }
}
