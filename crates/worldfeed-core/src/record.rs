//! Record types flowing from workers to sinks.

use crate::value::CanonicalValue;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// What a normalized record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    Event,
    EntityUpdate,
    EventMessage,
    ModelDefinition,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordKind::Event => "event",
            RecordKind::EntityUpdate => "entityUpdate",
            RecordKind::EventMessage => "eventMessage",
            RecordKind::ModelDefinition => "modelDefinition",
        };
        write!(f, "{s}")
    }
}

/// One fully parsed subscription message — the primary output of WorldFeed.
/// Immutable once constructed; ownership passes worker → demultiplexer →
/// sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    /// Name of the subscription that produced this record.
    pub source: String,
    /// Wall-clock receipt time, not an on-chain timestamp.
    pub received_at: DateTime<Utc>,
    pub kind: RecordKind,
    /// Transaction hash or hashed entity keys, as received.
    pub identity: String,
    pub payload: CanonicalValue,
}

impl NormalizedRecord {
    /// First payload value under `name`, if the payload is an object.
    pub fn field(&self, name: &str) -> Option<&CanonicalValue> {
        self.payload.get(name)
    }
}

/// A per-subscription failure carried as data instead of an unwound error.
/// Terminal for its worker when `recoverable` is false, and terminal in
/// practice for transport faults of either class — the classification only
/// informs the caller's retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaultRecord {
    pub source: String,
    /// Short machine-readable class, e.g. "connection_reset",
    /// "malformed_message".
    pub error_kind: String,
    pub message: String,
    pub recoverable: bool,
}

/// One element of the merged output stream. Consumers branch on the serialized
/// `kind` discriminator: records carry their own kind, faults serialize with
/// `kind: "fault"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeedItem {
    Record(NormalizedRecord),
    Fault(TaggedFault),
}

/// `FaultRecord` wrapper that pins `kind: "fault"` into the serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedFault {
    pub kind: &'static str,
    #[serde(flatten)]
    pub fault: FaultRecord,
}

impl FeedItem {
    pub fn record(record: NormalizedRecord) -> Self {
        FeedItem::Record(record)
    }

    pub fn fault(fault: FaultRecord) -> Self {
        FeedItem::Fault(TaggedFault {
            kind: "fault",
            fault,
        })
    }

    /// The subscription this item came from.
    pub fn source(&self) -> &str {
        match self {
            FeedItem::Record(r) => &r.source,
            FeedItem::Fault(f) => &f.fault.source,
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, FeedItem::Fault(_))
    }

    pub fn as_record(&self) -> Option<&NormalizedRecord> {
        match self {
            FeedItem::Record(r) => Some(r),
            FeedItem::Fault(_) => None,
        }
    }

    pub fn as_fault(&self) -> Option<&FaultRecord> {
        match self {
            FeedItem::Fault(f) => Some(&f.fault),
            FeedItem::Record(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_serializes_with_kind_discriminator() {
        let item = FeedItem::fault(FaultRecord {
            source: "events".into(),
            error_kind: "connection_reset".into(),
            message: "peer reset".into(),
            recoverable: true,
        });
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "fault");
        assert_eq!(json["recoverable"], true);
    }

    #[test]
    fn record_serializes_with_its_own_kind() {
        let item = FeedItem::record(NormalizedRecord {
            source: "events".into(),
            received_at: Utc::now(),
            kind: RecordKind::EntityUpdate,
            identity: "0xabc".into(),
            payload: CanonicalValue::Uint(1),
        });
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "entityUpdate");
        assert!(!item.is_fault());
        assert_eq!(item.source(), "events");
    }
}
