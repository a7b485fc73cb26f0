//! The envelope parser: one raw subscription message → `NormalizedRecord`.
//!
//! Raw messages are the JSON bodies a transport yields, still wrapped in
//! whatever envelope the wire protocol used (`event` / `eventEmitted` /
//! `entity` / `model`). This module unwraps them, runs every embedded wire
//! value through the decoder, and produces immutable records. Parse
//! failures surface as [`EnvelopeError`]; callers turn those into fault
//! records — they never escape as a crash.

use crate::decode::{decode, decode_wire_scalar};
use crate::error::EnvelopeError;
use crate::record::{NormalizedRecord, RecordKind};
use crate::subscription::SubscriptionKind;
use crate::value::{CanonicalValue, WireValue};
use chrono::Utc;
use serde_json::Value;

/// Parse one raw message from a subscription of the given kind.
pub fn parse_message(
    source: &str,
    kind: SubscriptionKind,
    raw: &Value,
) -> Result<NormalizedRecord, EnvelopeError> {
    match kind {
        SubscriptionKind::Events => parse_event(source, raw),
        SubscriptionKind::EntityUpdates => parse_entity(source, raw, RecordKind::EntityUpdate),
        SubscriptionKind::EventMessages => parse_entity(source, raw, RecordKind::EventMessage),
        SubscriptionKind::ModelDefinitions => parse_model_definition(source, raw),
    }
}

/// Event envelope: `keys` and `data` are lists of wire scalars, each
/// decoded independently; the transaction hash doubles as the identity.
fn parse_event(source: &str, raw: &Value) -> Result<NormalizedRecord, EnvelopeError> {
    let inner = unwrap_envelope(raw, &["event", "eventEmitted"]);

    let tx_hash = inner
        .get("transactionHash")
        .or_else(|| inner.get("transaction_hash"))
        .and_then(Value::as_str)
        .ok_or_else(|| missing("transactionHash"))?;
    let tx_hash = decode_wire_scalar(tx_hash);

    let keys = scalar_list(inner, "keys");
    let data = scalar_list(inner, "data");

    Ok(NormalizedRecord {
        source: source.to_string(),
        received_at: Utc::now(),
        kind: RecordKind::Event,
        identity: tx_hash.to_string(),
        payload: CanonicalValue::Object(vec![
            ("keys".into(), CanonicalValue::List(keys)),
            ("data".into(), CanonicalValue::List(data)),
            ("transactionHash".into(), tx_hash),
        ]),
    })
}

/// Entity envelope: hashed keys plus one or more co-located model updates.
/// A single-model message is normalized identically to a one-element list,
/// so call sites never special-case.
fn parse_entity(
    source: &str,
    raw: &Value,
    kind: RecordKind,
) -> Result<NormalizedRecord, EnvelopeError> {
    let inner = unwrap_envelope(raw, &["entity"]);

    let identity = inner
        .get("hashedKeys")
        .or_else(|| inner.get("hashed_keys"))
        .and_then(Value::as_str)
        .ok_or_else(|| missing("hashedKeys"))?
        .to_string();

    let models = match inner.get("models") {
        Some(Value::Array(list)) => list.iter().collect::<Vec<_>>(),
        Some(single @ Value::Object(_)) => vec![single],
        _ => Vec::new(),
    };
    if models.is_empty() {
        return Err(missing("models"));
    }

    let mut payload = Vec::with_capacity(models.len());
    for model in models {
        let name = model
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| missing("models[].name"))?;
        let children = model
            .get("children")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let fields = children
            .iter()
            .map(|child| {
                let field = child
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let value = child
                    .get("ty")
                    .map(|ty| decode(WireValue::from_json(ty)))
                    .unwrap_or(CanonicalValue::Raw(Value::Null));
                (field, value)
            })
            .collect();

        payload.push((name.to_string(), CanonicalValue::Object(fields)));
    }

    Ok(NormalizedRecord {
        source: source.to_string(),
        received_at: Utc::now(),
        kind,
        identity,
        payload: CanonicalValue::Object(payload),
    })
}

/// Model-definition envelope. The definition body is not part of the wire
/// value grammar, so beyond the name it flows through as a best-effort
/// tree.
fn parse_model_definition(source: &str, raw: &Value) -> Result<NormalizedRecord, EnvelopeError> {
    let inner = unwrap_envelope(raw, &["model", "modelRegistered"]);

    let name = inner
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("model.name"))?
        .to_string();

    Ok(NormalizedRecord {
        source: source.to_string(),
        received_at: Utc::now(),
        kind: RecordKind::ModelDefinition,
        identity: name.clone(),
        payload: CanonicalValue::Object(vec![(name, CanonicalValue::Raw(inner.clone()))]),
    })
}

/// Step into a wrapper key if present, otherwise treat the message as
/// already unwrapped.
fn unwrap_envelope<'a>(raw: &'a Value, wrappers: &[&str]) -> &'a Value {
    for key in wrappers {
        if let Some(inner) = raw.get(key) {
            return inner;
        }
    }
    raw
}

fn scalar_list(inner: &Value, field: &str) -> Vec<CanonicalValue> {
    inner
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(decode_wire_scalar)
                .collect()
        })
        .unwrap_or_default()
}

fn missing(field: &str) -> EnvelopeError {
    EnvelopeError::MissingField {
        field: field.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_envelope_end_to_end() {
        let raw = json!({
            "event": {
                "keys": ["0x0000000000000000000000000000000000000000000000000000000000000001"],
                "data": ["0x68656c6c6f"],
                "transactionHash":
                    "0xabababababababababababababababababababababababababababababababab"
            }
        });
        let rec = parse_message("events", SubscriptionKind::Events, &raw).unwrap();
        assert_eq!(rec.kind, RecordKind::Event);
        assert_eq!(
            rec.field("keys"),
            Some(&CanonicalValue::List(vec![CanonicalValue::Uint(1)]))
        );
        assert_eq!(
            rec.field("data"),
            Some(&CanonicalValue::List(vec![CanonicalValue::Str(
                "hello".into()
            )]))
        );
        // 32 high-entropy bytes fall back to bare hex.
        assert_eq!(
            rec.field("transactionHash"),
            Some(&CanonicalValue::Str("ab".repeat(32)))
        );
        assert_eq!(rec.identity, "ab".repeat(32));
    }

    #[test]
    fn event_without_transaction_hash_is_malformed() {
        let raw = json!({"event": {"keys": [], "data": []}});
        let err = parse_message("events", SubscriptionKind::Events, &raw).unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingField { ref field } if field == "transactionHash"));
    }

    #[test]
    fn entity_update_preserves_model_field_order() {
        let raw = json!({
            "entity": {
                "hashedKeys": "0x1f",
                "models": [{
                    "name": "Position",
                    "children": [
                        {"name": "x", "ty": {"primitive": {"felt252": "0x05"}}, "key": false},
                        {"name": "y", "ty": {"primitive": {"felt252": "0x0a"}}, "key": false}
                    ]
                }]
            }
        });
        let rec = parse_message("entities", SubscriptionKind::EntityUpdates, &raw).unwrap();
        assert_eq!(rec.kind, RecordKind::EntityUpdate);
        assert_eq!(rec.identity, "0x1f");
        assert_eq!(
            rec.payload,
            CanonicalValue::Object(vec![(
                "Position".into(),
                CanonicalValue::Object(vec![
                    ("x".into(), CanonicalValue::Uint(5)),
                    ("y".into(), CanonicalValue::Uint(10)),
                ])
            )])
        );
    }

    #[test]
    fn single_model_object_normalizes_like_a_list() {
        let as_list = json!({
            "entity": {
                "hashedKeys": "0x2",
                "models": [{"name": "Health", "children": [
                    {"name": "hp", "ty": {"primitive": {"u32": 100}}}
                ]}]
            }
        });
        let as_object = json!({
            "entity": {
                "hashedKeys": "0x2",
                "models": {"name": "Health", "children": [
                    {"name": "hp", "ty": {"primitive": {"u32": 100}}}
                ]}
            }
        });
        let a = parse_message("e", SubscriptionKind::EventMessages, &as_list).unwrap();
        let b = parse_message("e", SubscriptionKind::EventMessages, &as_object).unwrap();
        assert_eq!(a.payload, b.payload);
        assert_eq!(a.kind, RecordKind::EventMessage);
    }

    #[test]
    fn entity_update_requires_identity_and_models() {
        let no_identity = json!({"entity": {"models": [{"name": "P", "children": []}]}});
        assert!(matches!(
            parse_message("e", SubscriptionKind::EntityUpdates, &no_identity),
            Err(EnvelopeError::MissingField { ref field }) if field == "hashedKeys"
        ));

        let no_models = json!({"entity": {"hashedKeys": "0x1"}});
        assert!(matches!(
            parse_message("e", SubscriptionKind::EntityUpdates, &no_models),
            Err(EnvelopeError::MissingField { ref field }) if field == "models"
        ));
    }

    #[test]
    fn multiple_models_share_one_identity() {
        let raw = json!({
            "entity": {
                "hashedKeys": "0x9",
                "models": [
                    {"name": "Position", "children": [
                        {"name": "x", "ty": {"primitive": {"u8": 1}}}
                    ]},
                    {"name": "Moves", "children": [
                        {"name": "remaining", "ty": {"primitive": {"u8": 9}}}
                    ]}
                ]
            }
        });
        let rec = parse_message("e", SubscriptionKind::EntityUpdates, &raw).unwrap();
        match &rec.payload {
            CanonicalValue::Object(models) => {
                assert_eq!(models.len(), 2);
                assert_eq!(models[0].0, "Position");
                assert_eq!(models[1].0, "Moves");
            }
            other => panic!("expected object payload, got {other:?}"),
        }
    }

    #[test]
    fn model_definition_keeps_body_as_raw_tree() {
        let raw = json!({"model": {"name": "world-Position", "layout": {"fixed": [8, 8]}}});
        let rec = parse_message("models", SubscriptionKind::ModelDefinitions, &raw).unwrap();
        assert_eq!(rec.kind, RecordKind::ModelDefinition);
        assert_eq!(rec.identity, "world-Position");
        assert!(rec.field("world-Position").is_some());
    }

    #[test]
    fn unwrapped_message_still_parses() {
        // Some transports hand over the inner object directly.
        let raw = json!({
            "keys": [], "data": [], "transactionHash": "0x01"
        });
        let rec = parse_message("events", SubscriptionKind::Events, &raw).unwrap();
        assert_eq!(rec.identity, "1");
    }
}
