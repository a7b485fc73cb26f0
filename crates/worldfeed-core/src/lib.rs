//! # worldfeed-core
//!
//! Core types and pure decoding logic shared across all WorldFeed crates.
//! Everything here is synchronous and transport-agnostic: the wire value
//! grammar, the typed-value decoder, the envelope parser, and the record
//! types the streaming layer moves around.

pub mod decode;
pub mod envelope;
pub mod error;
pub mod record;
pub mod subscription;
pub mod value;

pub use decode::{decode, decode_bytes, decode_wire_scalar};
pub use envelope::parse_message;
pub use error::{EnvelopeError, TransportError};
pub use record::{FaultRecord, FeedItem, NormalizedRecord, RecordKind, TaggedFault};
pub use subscription::{KeyPattern, SubscriptionFilter, SubscriptionHandle, SubscriptionKind};
pub use value::{CanonicalValue, Member, WirePrimitive, WireValue};
