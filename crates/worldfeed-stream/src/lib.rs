//! # worldfeed-stream
//!
//! The streaming layer of WorldFeed. Holds N independent subscriptions
//! open against a world indexer, parses everything each one yields, and
//! merges the results into a single bounded channel of tagged items.
//!
//! ## Architecture
//! ```text
//! TransportClient::subscribe (per handle)
//!       │
//!       ▼
//! SubscriptionWorker (Tokio task, one per subscription)
//!       │  parse_message → NormalizedRecord | FaultRecord
//!       ▼
//! mpsc::Sender<FeedItem>   ← bounded, multi-producer
//!       │
//!       ▼
//! mpsc::Receiver<FeedItem> → SinkWriter(s)
//! ```
//!
//! A faulted worker ends with one terminal `FaultRecord` in the merged
//! output; its siblings never notice.

pub mod config;
pub mod demux;
pub mod sink;
pub mod transport;
pub mod worker;
pub mod ws_transport;

pub use config::{FeedConfig, SubscriptionSpec};
pub use demux::{FeedHandle, FeedMetrics, StreamDemultiplexer};
pub use sink::{ConsoleSink, JsonLinesSink, LogSink, SinkError, SinkWriter};
pub use transport::{RawMessageStream, TransportClient};
pub use worker::{SubscriptionWorker, WorkerState};
pub use ws_transport::GraphqlWsTransport;
