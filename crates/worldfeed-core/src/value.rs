//! The wire value grammar and the canonical value tree.
//!
//! Subscription payloads are self-describing: every value arrives tagged
//! with its own shape (`primitive` / `enum` / `struct` / `array`). WorldFeed
//! normalizes that loosely-typed JSON into the closed `WireValue` union so
//! the decoder can do recursive descent over a grammar instead of
//! duck-typed dictionary access.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// A primitive wire value, as tagged by the remote service.
///
/// Fixed-width field elements (`Felt`) and raw byte payloads carry no
/// string/integer distinction on the wire; the decoder applies a byte-shape
/// heuristic to them (see [`crate::decode`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WirePrimitive {
    Bool(bool),
    Integer(u64),
    /// Field element / hash — raw big-endian bytes, leading zeros included.
    Felt(Vec<u8>),
    Bytes(Vec<u8>),
    Text(String),
}

/// One named child of a wire `Struct`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub name: String,
    pub ty: WireValue,
    /// Whether this member is part of the entity's key tuple.
    pub key: bool,
}

/// Tagged-union representation of a value as received from the remote
/// service, before semantic decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireValue {
    Primitive(WirePrimitive),
    Enum { option: String },
    /// Ordered children. Order is significant and duplicate names are legal;
    /// consumers may rely on positional identity.
    Struct { children: Vec<Member> },
    /// Ordered sequence without field names (wire arrays and tuples).
    List(Vec<WireValue>),
    /// Unrecognized tag — kept verbatim so schema evolution degrades
    /// gracefully instead of failing.
    Other(Value),
}

impl WireValue {
    /// Build a `WireValue` from one self-describing JSON node.
    ///
    /// Total over all JSON: anything that does not match a known tag becomes
    /// [`WireValue::Other`].
    pub fn from_json(v: &Value) -> WireValue {
        let obj = match v.as_object() {
            Some(o) => o,
            None => return WireValue::Other(v.clone()),
        };

        if let Some(prim) = obj.get("primitive") {
            return Self::primitive_from_json(prim)
                .unwrap_or_else(|| WireValue::Other(v.clone()));
        }
        if let Some(en) = obj.get("enum") {
            if let Some(option) = enum_option(en) {
                return WireValue::Enum { option };
            }
            return WireValue::Other(v.clone());
        }
        if let Some(st) = obj.get("struct") {
            if let Some(children) = st.get("children").and_then(Value::as_array) {
                return WireValue::Struct {
                    children: children.iter().map(Member::from_json).collect(),
                };
            }
            return WireValue::Other(v.clone());
        }
        for tag in ["array", "tuple"] {
            if let Some(seq) = obj.get(tag) {
                // Either a bare JSON array or a wrapper with `children`.
                let items = seq
                    .as_array()
                    .or_else(|| seq.get("children").and_then(Value::as_array));
                if let Some(items) = items {
                    return WireValue::List(items.iter().map(WireValue::from_json).collect());
                }
            }
        }

        WireValue::Other(v.clone())
    }

    fn primitive_from_json(prim: &Value) -> Option<WireValue> {
        let obj = prim.as_object()?;
        // The primitive object carries exactly one `{kind: value}` entry.
        let (kind, raw) = obj.iter().next()?;
        let p = match kind.as_str() {
            "bool" => WirePrimitive::Bool(raw.as_bool()?),
            "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" => {
                // gRPC gateways encode 64-bit ints as JSON strings.
                match raw {
                    Value::Number(n) => WirePrimitive::Integer(n.as_u64()?),
                    Value::String(s) => WirePrimitive::Integer(s.parse().ok()?),
                    _ => return None,
                }
            }
            "u128" | "u256" | "felt252" | "class_hash" | "classHash" | "contract_address"
            | "contractAddress" | "eth_address" | "ethAddress" => {
                WirePrimitive::Felt(scalar_bytes(raw.as_str()?))
            }
            "bytes" => WirePrimitive::Bytes(scalar_bytes(raw.as_str()?)),
            "string" | "bytearray" => WirePrimitive::Text(raw.as_str()?.to_string()),
            // Older gateways nest the payload one level deeper under `value`.
            "value" => return Self::primitive_from_json(raw).or_else(|| leaf_primitive(raw)),
            _ => return None,
        };
        Some(WireValue::Primitive(p))
    }
}

impl Member {
    fn from_json(v: &Value) -> Member {
        Member {
            name: v
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            ty: v
                .get("ty")
                .map(WireValue::from_json)
                .unwrap_or_else(|| WireValue::Other(Value::Null)),
            key: v.get("key").and_then(Value::as_bool).unwrap_or(false),
        }
    }
}

/// Dig through nested single-entry objects to the first scalar leaf and
/// classify it. Mirrors the shape of protobuf-JSON `value` wrappers.
fn leaf_primitive(v: &Value) -> Option<WireValue> {
    match v {
        Value::Object(o) => leaf_primitive(o.values().next()?),
        Value::Bool(b) => Some(WireValue::Primitive(WirePrimitive::Bool(*b))),
        Value::Number(n) => Some(WireValue::Primitive(WirePrimitive::Integer(n.as_u64()?))),
        Value::String(s) => Some(WireValue::Primitive(WirePrimitive::Felt(scalar_bytes(s)))),
        _ => None,
    }
}

/// Decode a wire scalar string into raw bytes.
///
/// GraphQL endpoints send `0x`-prefixed hex; gRPC-gateway JSON sends
/// base64. If neither decodes, the string's own bytes are used so the
/// value still flows through the byte-shape heuristic.
pub(crate) fn scalar_bytes(s: &str) -> Vec<u8> {
    use base64::{engine::general_purpose::STANDARD, Engine};

    if let Some(h) = s.strip_prefix("0x") {
        // Odd-length hex is tolerated by left-padding a zero nibble.
        let padded;
        let h = if h.len() % 2 == 1 {
            padded = format!("0{h}");
            &padded
        } else {
            h
        };
        if let Ok(bytes) = hex::decode(h) {
            return bytes;
        }
    }
    if let Ok(bytes) = STANDARD.decode(s) {
        return bytes;
    }
    s.as_bytes().to_vec()
}

fn enum_option(en: &Value) -> Option<String> {
    match en.get("option") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => en.get("name").and_then(Value::as_str).map(String::from),
    }
}

/// Fully decoded, language-agnostic value tree — the decoder's output.
/// Consumers always deal with `CanonicalValue` regardless of which
/// subscription produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    Bool(bool),
    Uint(u128),
    Str(String),
    List(Vec<CanonicalValue>),
    /// Ordered field-name → value mapping. Duplicate names are preserved
    /// positionally, so this is a sequence of pairs rather than a map type.
    Object(Vec<(String, CanonicalValue)>),
    /// Identity passthrough of an unrecognized wire value.
    Raw(Value),
}

impl CanonicalValue {
    pub fn as_uint(&self) -> Option<u128> {
        match self {
            CanonicalValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CanonicalValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// First value under `name`, if this is an `Object`.
    pub fn get(&self, name: &str) -> Option<&CanonicalValue> {
        match self {
            CanonicalValue::Object(fields) => {
                fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }
}

impl Serialize for CanonicalValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::{SerializeMap, SerializeSeq};
        match self {
            CanonicalValue::Bool(b) => serializer.serialize_bool(*b),
            CanonicalValue::Uint(v) => serializer.serialize_u128(*v),
            CanonicalValue::Str(s) => serializer.serialize_str(s),
            CanonicalValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            // Serialized as a map in insertion order; duplicate keys are
            // emitted as-is.
            CanonicalValue::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            CanonicalValue::Raw(v) => v.serialize(serializer),
        }
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalValue::Bool(b) => write!(f, "{b}"),
            CanonicalValue::Uint(v) => write!(f, "{v}"),
            CanonicalValue::Str(s) => write!(f, "{s}"),
            CanonicalValue::List(items) => {
                let parts: Vec<_> = items.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            CanonicalValue::Object(fields) => {
                let parts: Vec<_> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            CanonicalValue::Raw(v) => write!(f, "{v}"),
        }
    }
}
