//! Sinks — where the merged feed goes.
//!
//! `SinkWriter` is the collaborator interface the demultiplexer's consumer
//! writes into. A sink must not stall the feed: `route` disables a sink
//! after its first write error instead of retrying or blocking the merge
//! channel behind it.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{info, warn};
use worldfeed_core::FeedItem;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Receives merged feed items for display or persistence.
#[async_trait]
pub trait SinkWriter: Send {
    async fn write(&mut self, item: &FeedItem) -> Result<(), SinkError>;
}

/// Human-readable one-line-per-item output on stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

#[async_trait]
impl SinkWriter for ConsoleSink {
    async fn write(&mut self, item: &FeedItem) -> Result<(), SinkError> {
        match item {
            FeedItem::Record(r) => {
                println!("[{}] {} {} {}", r.source, r.kind, r.identity, r.payload);
            }
            FeedItem::Fault(f) => {
                let f = &f.fault;
                println!(
                    "[{}] fault ({}, recoverable={}): {}",
                    f.source, f.error_kind, f.recoverable, f.message
                );
            }
        }
        Ok(())
    }
}

/// Appends each item as one JSON object per line.
pub struct JsonLinesSink {
    file: tokio::fs::File,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it if needed.
    pub async fn open(path: impl AsRef<std::path::Path>) -> Result<Self, SinkError> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self { file })
    }
}

#[async_trait]
impl SinkWriter for JsonLinesSink {
    async fn write(&mut self, item: &FeedItem) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(item)?;
        line.push(b'\n');
        self.file.write_all(&line).await?;
        Ok(())
    }
}

/// Emits each item as a structured tracing event.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl SinkWriter for LogSink {
    async fn write(&mut self, item: &FeedItem) -> Result<(), SinkError> {
        match item {
            FeedItem::Record(r) => {
                info!(source = %r.source, kind = %r.kind, identity = %r.identity,
                      payload = %r.payload, "record");
            }
            FeedItem::Fault(f) => {
                let f = &f.fault;
                warn!(source = %f.source, error_kind = %f.error_kind,
                      recoverable = f.recoverable, message = %f.message, "fault");
            }
        }
        Ok(())
    }
}

/// Drain the merged feed into the given sinks until the feed ends.
///
/// A sink that returns an error is dropped from the rotation; the feed
/// itself keeps flowing to the survivors. Returns the number of items
/// routed.
pub async fn route(
    mut rx: mpsc::Receiver<FeedItem>,
    mut sinks: Vec<Box<dyn SinkWriter>>,
) -> u64 {
    let mut routed = 0u64;
    while let Some(item) = rx.recv().await {
        routed += 1;
        let mut failed = Vec::new();
        for (i, sink) in sinks.iter_mut().enumerate() {
            if let Err(e) = sink.write(&item).await {
                warn!(error = %e, "sink write failed, disabling sink");
                failed.push(i);
            }
        }
        for i in failed.into_iter().rev() {
            sinks.remove(i);
        }
    }
    routed
}
