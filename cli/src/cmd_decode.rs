//! `worldfeed decode` — one-shot decode of captured raw messages.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use worldfeed_core::{parse_message, FeedItem, SubscriptionKind};

/// Decode a file holding either one JSON message or one message per line.
pub fn decode(file: &Path, kind: SubscriptionKind, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;

    let messages = collect_messages(&text)
        .with_context(|| format!("parsing JSON from {}", file.display()))?;

    let mut failures = 0usize;
    for (idx, raw) in messages.iter().enumerate() {
        match parse_message(&kind.to_string(), kind, raw) {
            Ok(record) => {
                if json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&FeedItem::record(record))?
                    );
                } else {
                    println!("{} {} {}", record.kind, record.identity, record.payload);
                }
            }
            Err(e) => {
                failures += 1;
                eprintln!("message {idx}: {e}");
            }
        }
    }

    if failures > 0 {
        eprintln!("{failures}/{} messages failed to decode", messages.len());
    }
    Ok(())
}

/// Whole-file JSON first; if that fails, JSON-lines.
fn collect_messages(text: &str) -> Result<Vec<Value>, serde_json::Error> {
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        return Ok(match v {
            Value::Array(items) => items,
            single => vec![single],
        });
    }
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(serde_json::from_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_single_object() {
        let msgs = collect_messages(r#"{"a": 1}"#).unwrap();
        assert_eq!(msgs.len(), 1);
    }

    #[test]
    fn collect_array() {
        let msgs = collect_messages(r#"[{"a": 1}, {"b": 2}]"#).unwrap();
        assert_eq!(msgs.len(), 2);
    }

    #[test]
    fn collect_json_lines() {
        let msgs = collect_messages("{\"a\": 1}\n\n{\"b\": 2}\n").unwrap();
        assert_eq!(msgs.len(), 2);
    }
}
