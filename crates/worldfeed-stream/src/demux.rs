//! `StreamDemultiplexer` — merges N subscription workers into one feed.

use crate::config::FeedConfig;
use crate::transport::TransportClient;
use crate::worker::{SubscriptionWorker, WorkerState};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{info, warn};
use worldfeed_core::{FeedItem, SubscriptionHandle};

/// Snapshot counters for the whole feed, shared across workers.
#[derive(Debug, Clone, Default)]
pub struct FeedMetrics {
    pub records: u64,
    pub parse_errors: u64,
    pub faults: u64,
}

/// Owns the worker set and the merge channel.
///
/// Merge policy is first-arrival interleaving: FIFO is guaranteed within
/// one subscription's own sequence, never across subscriptions. The merge
/// channel is bounded, so producers backpressure instead of dropping when
/// the consumer lags.
pub struct StreamDemultiplexer {
    transport: Arc<dyn TransportClient>,
    config: FeedConfig,
}

impl StreamDemultiplexer {
    pub fn new(transport: Arc<dyn TransportClient>, config: FeedConfig) -> Self {
        Self { transport, config }
    }

    /// Start one worker task per handle and return the merged receiver plus
    /// a control handle. The receiver ends once every worker has stopped.
    pub fn spawn(
        self,
        handles: Vec<SubscriptionHandle>,
    ) -> (mpsc::Receiver<FeedItem>, FeedHandle) {
        info!("starting feed with {} subscriptions", handles.len());
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let (cancel, cancel_rx) = watch::channel(false);
        let metrics = Arc::new(Mutex::new(FeedMetrics::default()));

        let mut tasks = JoinSet::new();
        for handle in handles {
            let worker = SubscriptionWorker::new(
                handle,
                Arc::clone(&self.transport),
                tx.clone(),
                cancel_rx.clone(),
                Arc::clone(&metrics),
            );
            tasks.spawn(worker.run());
        }
        // Workers hold the only senders: the channel closes when the last
        // one stops.
        drop(tx);

        let control = FeedHandle {
            cancel,
            tasks,
            grace: Duration::from_millis(self.config.grace_ms),
            metrics,
        };
        (rx, control)
    }
}

/// Control side of a running feed.
pub struct FeedHandle {
    cancel: watch::Sender<bool>,
    tasks: JoinSet<WorkerState>,
    grace: Duration,
    metrics: Arc<Mutex<FeedMetrics>>,
}

impl FeedHandle {
    /// Signal cooperative shutdown once and wait for every worker, bounded
    /// by the grace period. Returns `true` if all workers stopped in time;
    /// stragglers are aborted otherwise.
    pub async fn shutdown(mut self) -> bool {
        let _ = self.cancel.send(true);
        let drained = tokio::time::timeout(self.grace, async {
            while self.tasks.join_next().await.is_some() {}
        })
        .await
        .is_ok();
        if !drained {
            warn!("grace period elapsed, aborting remaining workers");
            self.tasks.abort_all();
        }
        drained
    }

    /// Wait for every worker to stop on its own, without cancelling.
    pub async fn join(mut self) {
        while self.tasks.join_next().await.is_some() {}
    }

    /// Number of workers that have not yet stopped.
    pub fn active_workers(&self) -> usize {
        self.tasks.len()
    }

    pub fn metrics(&self) -> FeedMetrics {
        self.metrics.lock().unwrap().clone()
    }
}
