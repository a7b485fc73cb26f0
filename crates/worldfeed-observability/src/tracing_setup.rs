//! Subscriber setup for the `tracing` stack.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration, usually the `log:` section of the feed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Baseline level applied to every target ("trace" through "error").
    #[serde(default = "default_level")]
    pub level: String,
    /// Per-crate level overrides, keyed by crate name. Dashes in the name
    /// are mapped to the underscored tracing target.
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// Structured JSON lines instead of the human-readable formatter.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: HashMap::new(),
            json: false,
        }
    }
}

/// Initialise tracing with the given log config.
/// Should be called once at application startup. `RUST_LOG`, when set,
/// wins over the config file.
pub fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives(config)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

/// Directive string in EnvFilter syntax: "info,worldfeed_stream=debug" etc.
fn directives(config: &LogConfig) -> String {
    let mut out = config.level.clone();
    for (component, level) in &config.components {
        out.push_str(&format!(",{}={}", component.replace('-', "_"), level));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_config_defaults() {
        let cfg: LogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.level, "info");
        assert!(!cfg.json);
        assert!(cfg.components.is_empty());
    }

    #[test]
    fn component_overrides_use_underscored_targets() {
        let mut cfg = LogConfig::default();
        cfg.components
            .insert("worldfeed-stream".into(), "debug".into());
        let d = directives(&cfg);
        assert!(d.starts_with("info"));
        assert!(d.contains("worldfeed_stream=debug"));
    }
}
