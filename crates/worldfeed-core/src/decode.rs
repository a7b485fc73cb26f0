//! The typed-value decoder: `WireValue` → `CanonicalValue`.
//!
//! `decode` is pure and total — every wire value has exactly one canonical
//! form and nothing here can fail. Malformed or unrecognized input degrades
//! to a passthrough or a best-effort value instead of an error.

use crate::value::{scalar_bytes, CanonicalValue, WirePrimitive, WireValue};

/// Recursively decode one wire value into its canonical form.
///
/// - Primitives dispatch on kind; felt/byte payloads run the byte-shape
///   heuristic in [`decode_bytes`].
/// - Enums become their option name.
/// - Structs become ordered objects; duplicate field names are kept
///   positionally and child order equals input order.
/// - Unknown tags pass through unchanged.
pub fn decode(value: WireValue) -> CanonicalValue {
    match value {
        WireValue::Primitive(p) => decode_primitive(p),
        WireValue::Enum { option } => CanonicalValue::Str(option),
        WireValue::Struct { children } => CanonicalValue::Object(
            children
                .into_iter()
                .map(|m| (m.name, decode(m.ty)))
                .collect(),
        ),
        WireValue::List(items) => {
            CanonicalValue::List(items.into_iter().map(decode).collect())
        }
        WireValue::Other(v) => CanonicalValue::Raw(v),
    }
}

fn decode_primitive(p: WirePrimitive) -> CanonicalValue {
    match p {
        WirePrimitive::Bool(b) => CanonicalValue::Bool(b),
        WirePrimitive::Integer(n) => CanonicalValue::Uint(n as u128),
        WirePrimitive::Text(s) => CanonicalValue::Str(s),
        WirePrimitive::Felt(raw) | WirePrimitive::Bytes(raw) => decode_bytes(&raw),
    }
}

/// Decode a wire scalar string (`0x`-hex or base64) straight to its
/// canonical form. Used for event `keys`/`data` elements, which arrive as
/// bare strings rather than tagged values.
pub fn decode_wire_scalar(s: &str) -> CanonicalValue {
    decode_bytes(&scalar_bytes(s))
}

/// Best-effort classification of an untagged byte payload.
///
/// The wire format does not say whether a fixed-width scalar is a string,
/// an integer, or opaque bytes, so intent is inferred from byte shape. The
/// precedence order is load-bearing for output compatibility:
///
/// 1. every byte is an ASCII hex digit → the payload is hex text, return it
///    as a string;
/// 2. strip leading zeros: nothing left → integer `0`; remainder all
///    printable ASCII → a short-string payload, return the text; remainder
///    fits in a `u128` → big-endian integer;
/// 3. otherwise → lowercase hex of the raw bytes.
///
/// This is a heuristic, not a schema-accurate decode: an all-zero payload
/// is indistinguishable from an intentionally empty string and decodes to
/// integer `0`.
pub fn decode_bytes(raw: &[u8]) -> CanonicalValue {
    if !raw.is_empty() && raw.iter().all(u8::is_ascii_hexdigit) {
        // Safe: ASCII hex digits are valid UTF-8.
        return CanonicalValue::Str(String::from_utf8_lossy(raw).into_owned());
    }

    let tail = {
        let start = raw.iter().position(|&b| b != 0).unwrap_or(raw.len());
        &raw[start..]
    };
    if tail.is_empty() {
        return CanonicalValue::Uint(0);
    }
    if tail.iter().all(|&b| (0x20..0x7f).contains(&b)) {
        return CanonicalValue::Str(String::from_utf8_lossy(tail).into_owned());
    }
    if tail.len() <= 16 {
        let mut n: u128 = 0;
        for &b in tail {
            n = (n << 8) | u128::from(b);
        }
        return CanonicalValue::Uint(n);
    }

    CanonicalValue::Str(hex::encode(raw))
}
