//! WorldFeed CLI — follow live world streams and decode captured messages.
//!
//! # Commands
//! ```
//! worldfeed run    --config <feed.yaml> [--out <file.jsonl>] [--json-logs]
//! worldfeed decode --file <captured.json> [--kind <events|entityUpdates|...>]
//! ```

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use worldfeed_core::SubscriptionKind;

mod cmd_decode;
mod cmd_run;

#[derive(Parser)]
#[command(
    name = "worldfeed",
    about = "Real-time observer for Dojo-style world indexers",
    long_about = "
WorldFeed subscribes to a world indexer's event, entity, and model streams,
decodes the self-describing payloads, and routes everything to the console,
a JSON-lines file, or structured logs. A failing stream never takes down
its siblings.
",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the configured subscriptions until interrupted
    Run {
        /// Path to the YAML feed configuration
        #[arg(short, long, default_value = "feed.yaml")]
        config: PathBuf,
        /// Also append every item to this JSON-lines file
        #[arg(long)]
        out: Option<PathBuf>,
        /// Emit JSON structured logs instead of human-readable text
        #[arg(long)]
        json_logs: bool,
    },

    /// Decode captured raw messages (one JSON object, or one per line)
    Decode {
        /// Path to the captured message file
        #[arg(short, long)]
        file: PathBuf,
        /// Subscription kind the messages came from
        #[arg(short, long, value_parser = parse_kind, default_value = "events")]
        kind: SubscriptionKind,
        /// Print full JSON records instead of one-line summaries
        #[arg(long)]
        json: bool,
    },
}

fn parse_kind(s: &str) -> Result<SubscriptionKind> {
    match s {
        "events" => Ok(SubscriptionKind::Events),
        "entityUpdates" => Ok(SubscriptionKind::EntityUpdates),
        "eventMessages" => Ok(SubscriptionKind::EventMessages),
        "modelDefinitions" => Ok(SubscriptionKind::ModelDefinitions),
        other => Err(anyhow!(
            "unknown kind '{other}' (expected events, entityUpdates, eventMessages, or modelDefinitions)"
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            out,
            json_logs,
        } => cmd_run::run(&config, out.as_deref(), json_logs).await,
        Commands::Decode { file, kind, json } => cmd_decode::decode(&file, kind, json),
    }
}
