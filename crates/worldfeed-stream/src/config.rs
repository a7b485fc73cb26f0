//! Feed configuration.

use serde::{Deserialize, Serialize};
use worldfeed_core::{SubscriptionFilter, SubscriptionHandle, SubscriptionKind};

/// One configured subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSpec {
    /// Source name for records from this stream. Defaults to the kind name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: SubscriptionKind,
    #[serde(default)]
    pub filter: SubscriptionFilter,
}

impl SubscriptionSpec {
    pub fn handle(&self) -> SubscriptionHandle {
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| self.kind.to_string());
        SubscriptionHandle::named(name, self.kind).with_filter(self.filter.clone())
    }
}

/// Top-level feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Indexer endpoint, e.g. "ws://localhost:8080/graphql"
    pub endpoint: String,
    /// Merge channel capacity. Producers block when the sink side lags.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Grace period for cooperative shutdown, in milliseconds.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionSpec>,
}

fn default_channel_capacity() -> usize { 1_024 }
fn default_grace_ms() -> u64 { 3_000 }

impl FeedConfig {
    /// A config with one open-filter subscription of the given kind.
    pub fn single(endpoint: impl Into<String>, kind: SubscriptionKind) -> Self {
        Self {
            endpoint: endpoint.into(),
            channel_capacity: default_channel_capacity(),
            grace_ms: default_grace_ms(),
            subscriptions: vec![SubscriptionSpec {
                name: None,
                kind,
                filter: SubscriptionFilter::default(),
            }],
        }
    }

    pub fn handles(&self) -> Vec<SubscriptionHandle> {
        self.subscriptions.iter().map(SubscriptionSpec::handle).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_fields_omitted() {
        let cfg: FeedConfig = serde_json::from_str(
            r#"{"endpoint": "ws://localhost:8080/graphql",
                "subscriptions": [{"kind": "events"}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.channel_capacity, 1_024);
        assert_eq!(cfg.grace_ms, 3_000);
        let handles = cfg.handles();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].name, "events");
    }

    #[test]
    fn explicit_name_overrides_kind_name() {
        let spec = SubscriptionSpec {
            name: Some("player-events".into()),
            kind: SubscriptionKind::Events,
            filter: SubscriptionFilter::default(),
        };
        assert_eq!(spec.handle().name, "player-events");
    }

    #[test]
    fn single_builds_one_open_subscription() {
        let cfg = FeedConfig::single("ws://host/graphql", SubscriptionKind::EntityUpdates);
        assert_eq!(cfg.subscriptions.len(), 1);
        assert_eq!(cfg.handles()[0].kind, SubscriptionKind::EntityUpdates);
    }
}
