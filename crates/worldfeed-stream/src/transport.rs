//! `TransportClient` trait — abstraction over the wire protocol.
//!
//! The transport owns channel setup, TLS, and protocol framing; the core
//! only ever sees raw JSON message bodies. Each implementation must
//! support independent concurrent `subscribe` calls and report connection
//! loss as a typed error, never a panic.

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;
use worldfeed_core::{SubscriptionFilter, SubscriptionKind, TransportError};

/// An inbound stream of raw message bodies for a single subscription.
pub type RawMessageStream = Pin<Box<dyn Stream<Item = Result<Value, TransportError>> + Send>>;

/// Abstracts over subscription transports (WebSocket, gRPC gateway, mocks).
#[async_trait]
pub trait TransportClient: Send + Sync {
    /// Open one long-lived subscription of the given kind.
    ///
    /// The returned stream yields message bodies still wrapped in the wire
    /// envelope; [`worldfeed_core::parse_message`] unwraps them.
    async fn subscribe(
        &self,
        kind: SubscriptionKind,
        filter: &SubscriptionFilter,
    ) -> Result<RawMessageStream, TransportError>;
}
