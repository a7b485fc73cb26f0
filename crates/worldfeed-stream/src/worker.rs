//! `SubscriptionWorker` — owns one live subscription.
//!
//! A worker pulls raw messages from its transport stream, parses each one,
//! and forwards the result to the merged output channel. Nothing it does
//! can unwind past `run`: parse failures become recoverable fault records,
//! transport failures become one terminal fault record, and shutdown is a
//! cooperative signal observed at the next suspension point.

use crate::demux::FeedMetrics;
use crate::transport::TransportClient;
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use worldfeed_core::{
    parse_message, FaultRecord, FeedItem, SubscriptionHandle, TransportError,
};

/// Lifecycle of one worker. Transitions are logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Subscribing,
    Streaming,
    Draining,
    Faulted,
    Stopped,
}

pub struct SubscriptionWorker {
    handle: SubscriptionHandle,
    transport: Arc<dyn TransportClient>,
    out: mpsc::Sender<FeedItem>,
    shutdown: watch::Receiver<bool>,
    metrics: Arc<Mutex<FeedMetrics>>,
    state: WorkerState,
}

impl SubscriptionWorker {
    pub fn new(
        handle: SubscriptionHandle,
        transport: Arc<dyn TransportClient>,
        out: mpsc::Sender<FeedItem>,
        shutdown: watch::Receiver<bool>,
        metrics: Arc<Mutex<FeedMetrics>>,
    ) -> Self {
        Self {
            handle,
            transport,
            out,
            shutdown,
            metrics,
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn transition(&mut self, next: WorkerState) {
        debug!(source = %self.handle, from = ?self.state, to = ?next, "worker transition");
        self.state = next;
    }

    /// Drive this subscription until it stops. Always returns `Stopped`;
    /// the path taken (drained vs faulted) is visible in the emitted items
    /// and the logs.
    pub async fn run(mut self) -> WorkerState {
        self.transition(WorkerState::Subscribing);
        let mut stream = match self
            .transport
            .subscribe(self.handle.kind, &self.handle.filter)
            .await
        {
            Ok(s) => s,
            Err(e) => {
                self.emit_terminal_fault(&e).await;
                self.transition(WorkerState::Faulted);
                self.transition(WorkerState::Stopped);
                return self.state;
            }
        };

        self.transition(WorkerState::Streaming);
        let mut shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                // On shutdown the current message pull is abandoned; decode
                // itself is synchronous and never a cancellation point.
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.transition(WorkerState::Draining);
                        break;
                    }
                }
                item = stream.next() => match item {
                    Some(Ok(raw)) => {
                        if !self.forward(&raw).await {
                            // Consumer went away; nothing left to emit to.
                            self.transition(WorkerState::Draining);
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        self.emit_terminal_fault(&e).await;
                        self.transition(WorkerState::Faulted);
                        break;
                    }
                    None => {
                        // Subscriptions are unbounded; a clean end still
                        // means the server hung up on us.
                        self.emit_terminal_fault(&TransportError::Closed).await;
                        self.transition(WorkerState::Faulted);
                        break;
                    }
                },
            }
        }

        self.transition(WorkerState::Stopped);
        info!(source = %self.handle, "subscription stopped");
        self.state
    }

    /// Parse one raw message and push the outcome downstream.
    /// Returns `false` once the merged channel is closed.
    async fn forward(&mut self, raw: &serde_json::Value) -> bool {
        let item = match parse_message(&self.handle.name, self.handle.kind, raw) {
            Ok(record) => {
                self.metrics.lock().unwrap().records += 1;
                FeedItem::record(record)
            }
            Err(e) => {
                warn!(source = %self.handle, error = %e, "malformed message");
                self.metrics.lock().unwrap().parse_errors += 1;
                FeedItem::fault(FaultRecord {
                    source: self.handle.name.clone(),
                    error_kind: "malformed_message".into(),
                    message: e.to_string(),
                    recoverable: true,
                })
            }
        };
        self.out.send(item).await.is_ok()
    }

    async fn emit_terminal_fault(&mut self, e: &TransportError) {
        warn!(source = %self.handle, error = %e, "subscription fault");
        self.metrics.lock().unwrap().faults += 1;
        let fault = FeedItem::fault(FaultRecord {
            source: self.handle.name.clone(),
            error_kind: error_kind(e),
            message: e.to_string(),
            recoverable: e.is_recoverable(),
        });
        let _ = self.out.send(fault).await;
    }
}

fn error_kind(e: &TransportError) -> String {
    match e {
        TransportError::ConnectionFailed { .. } => "connection_failed",
        TransportError::ConnectionReset { .. } => "connection_reset",
        TransportError::Closed => "stream_closed",
        TransportError::Timeout { .. } => "timeout",
        TransportError::InvalidRequest { .. } => "invalid_request",
        TransportError::Other(_) => "transport",
    }
    .to_string()
}
