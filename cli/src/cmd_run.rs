//! `worldfeed run` — drive the demultiplexer against a live endpoint.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use worldfeed_observability::{init_tracing, LogConfig};
use worldfeed_stream::{
    sink::route, ConsoleSink, FeedConfig, GraphqlWsTransport, JsonLinesSink, SinkWriter,
    StreamDemultiplexer,
};

/// On-disk configuration: the feed section plus an optional log section.
#[derive(Debug, Deserialize)]
struct AppConfig {
    #[serde(flatten)]
    feed: FeedConfig,
    #[serde(default)]
    log: LogConfig,
}

pub async fn run(config_path: &Path, out: Option<&Path>, json_logs: bool) -> Result<()> {
    let text = std::fs::read_to_string(config_path)
        .with_context(|| format!("reading config {}", config_path.display()))?;
    let mut app: AppConfig =
        serde_yaml::from_str(&text).context("parsing feed configuration")?;
    if json_logs {
        app.log.json = true;
    }
    init_tracing(&app.log);

    let handles = app.feed.handles();
    if handles.is_empty() {
        bail!("no subscriptions configured");
    }

    let transport = Arc::new(GraphqlWsTransport::new(&app.feed.endpoint));
    let demux = StreamDemultiplexer::new(transport, app.feed);
    let (rx, control) = demux.spawn(handles);

    let mut sinks: Vec<Box<dyn SinkWriter>> = vec![Box::new(ConsoleSink)];
    if let Some(path) = out {
        let sink = JsonLinesSink::open(path)
            .await
            .with_context(|| format!("opening output file {}", path.display()))?;
        sinks.push(Box::new(sink));
    }

    let mut router = tokio::spawn(route(rx, sinks));

    tokio::select! {
        routed = &mut router => {
            // Every subscription ended on its own (all faulted or stopped).
            let metrics = control.metrics();
            control.join().await;
            info!(routed = routed?, records = metrics.records,
                  faults = metrics.faults, "feed ended");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, draining");
            let drained = control.shutdown().await;
            let routed = router.await?;
            info!(routed, drained, "feed shut down");
        }
    }

    Ok(())
}
