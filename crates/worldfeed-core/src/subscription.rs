//! Subscription identities and filter parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The stream families a world indexer exposes. Each maps to a distinct
/// subscribe call with kind-specific filter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionKind {
    Events,
    EntityUpdates,
    EventMessages,
    ModelDefinitions,
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubscriptionKind::Events => "events",
            SubscriptionKind::EntityUpdates => "entityUpdates",
            SubscriptionKind::EventMessages => "eventMessages",
            SubscriptionKind::ModelDefinitions => "modelDefinitions",
        };
        write!(f, "{s}")
    }
}

/// How the key filter matches an event's key tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPattern {
    /// The key list must match position-for-position.
    FixedLen,
    /// Listed keys are a prefix; trailing keys are unconstrained.
    #[default]
    VariableLen,
}

/// Filter parameters attached to one subscribe call.
/// An empty filter matches everything, which is the observer default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    /// Key values to match (hex strings). Empty = any.
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub pattern: KeyPattern,
    /// Restrict to these model names (namespaced). Empty = any.
    #[serde(default)]
    pub models: Vec<String>,
}

impl SubscriptionFilter {
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.keys.push(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.models.push(model.into());
        self
    }

    pub fn fixed_len(mut self) -> Self {
        self.pattern = KeyPattern::FixedLen;
        self
    }
}

/// Identifies one live stream. Created when the demultiplexer starts,
/// lives for that stream's lifetime, destroyed on stop or fatal fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionHandle {
    /// Source name tagged onto every record this stream produces.
    pub name: String,
    pub kind: SubscriptionKind,
    #[serde(default)]
    pub filter: SubscriptionFilter,
}

impl SubscriptionHandle {
    /// A handle named after its kind with an open filter.
    pub fn for_kind(kind: SubscriptionKind) -> Self {
        Self {
            name: kind.to_string(),
            kind,
            filter: SubscriptionFilter::default(),
        }
    }

    pub fn named(name: impl Into<String>, kind: SubscriptionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            filter: SubscriptionFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: SubscriptionFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
