//! `GraphqlWsTransport` — concrete `TransportClient` speaking the
//! graphql-transport-ws protocol over a WebSocket.
//!
//! World indexers expose the event stream as a GraphQL subscription
//! (`eventEmitted`); entity and model streams ride the gRPC surface, which
//! is not this transport's job. Subscribing to a kind this transport does
//! not carry fails fast with `InvalidRequest` so the owning worker faults
//! cleanly without touching the network.

use crate::transport::{RawMessageStream, TransportClient};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Message},
};
use tracing::{debug, info, warn};
use worldfeed_core::{KeyPattern, SubscriptionFilter, SubscriptionKind, TransportError};

const WS_SUBPROTOCOL: &str = "graphql-transport-ws";

pub struct GraphqlWsTransport {
    url: String,
    handshake_timeout: Duration,
}

impl GraphqlWsTransport {
    /// Create a transport for the given `ws://` or `wss://` endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            handshake_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

#[async_trait]
impl TransportClient for GraphqlWsTransport {
    async fn subscribe(
        &self,
        kind: SubscriptionKind,
        filter: &SubscriptionFilter,
    ) -> Result<RawMessageStream, TransportError> {
        let query = subscription_document(kind, filter)?;

        url::Url::parse(&self.url).map_err(|e| TransportError::InvalidRequest {
            reason: format!("bad endpoint url: {e}"),
        })?;
        let mut request =
            self.url
                .as_str()
                .into_client_request()
                .map_err(|e| TransportError::ConnectionFailed {
                    url: self.url.clone(),
                    reason: e.to_string(),
                })?;
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(WS_SUBPROTOCOL));

        info!(url = %self.url, %kind, "connecting");
        let (ws, _) =
            connect_async(request)
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    url: self.url.clone(),
                    reason: e.to_string(),
                })?;
        let (mut write, mut read) = ws.split();

        // graphql-transport-ws handshake: init → ack, then one subscribe.
        write
            .send(Message::Text(json!({"type": "connection_init"}).to_string()))
            .await
            .map_err(|_| TransportError::Closed)?;

        let ack = tokio::time::timeout(self.handshake_timeout, async {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => match parse_server_frame(&text) {
                        ServerFrame::Ack => return Ok(()),
                        ServerFrame::Error(reason) => {
                            return Err(TransportError::InvalidRequest { reason })
                        }
                        _ => {}
                    },
                    Ok(Message::Close(_)) | Err(_) => return Err(TransportError::Closed),
                    Ok(_) => {}
                }
            }
            Err(TransportError::Closed)
        })
        .await;
        match ack {
            Ok(result) => result?,
            Err(_) => {
                return Err(TransportError::Timeout {
                    ms: self.handshake_timeout.as_millis() as u64,
                })
            }
        }

        write
            .send(Message::Text(
                json!({
                    "id": "1",
                    "type": "subscribe",
                    "payload": {"query": query}
                })
                .to_string(),
            ))
            .await
            .map_err(|_| TransportError::Closed)?;

        let (tx, rx) = futures::channel::mpsc::channel::<Result<Value, TransportError>>(512);
        tokio::spawn(pump(write, read, tx));
        Ok(Box::pin(rx))
    }
}

type WsSink = futures::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    Message,
>;
type WsSource = futures::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
>;

/// Forward server frames into the subscription channel until either side
/// goes away.
async fn pump(
    mut write: WsSink,
    mut read: WsSource,
    mut tx: futures::channel::mpsc::Sender<Result<Value, TransportError>>,
) {
    while let Some(msg) = read.next().await {
        match msg {
            Err(e) => {
                let _ = tx
                    .send(Err(TransportError::ConnectionReset {
                        reason: e.to_string(),
                    }))
                    .await;
                break;
            }
            Ok(Message::Text(text)) => {
                debug!("ws frame: {}", preview(&text));
                match parse_server_frame(&text) {
                    ServerFrame::Next(payload) => {
                        if let Some(raw) = event_envelope(&payload) {
                            if tx.send(Ok(raw)).await.is_err() {
                                break; // receiver dropped
                            }
                        }
                    }
                    ServerFrame::Error(reason) => {
                        let _ = tx
                            .send(Err(TransportError::InvalidRequest { reason }))
                            .await;
                        break;
                    }
                    ServerFrame::Complete => {
                        let _ = tx.send(Err(TransportError::Closed)).await;
                        break;
                    }
                    ServerFrame::Ping => {
                        let _ = write
                            .send(Message::Text(json!({"type": "pong"}).to_string()))
                            .await;
                    }
                    ServerFrame::Ack | ServerFrame::Other => {}
                }
            }
            Ok(Message::Close(_)) => {
                let _ = tx.send(Err(TransportError::Closed)).await;
                break;
            }
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(_) => {} // binary / pong — ignore
        }
    }
    info!("graphql-ws pump ended");
}

/// First ~120 bytes of a frame for debug logs, cut on a char boundary so
/// multi-byte payload text never panics the pump.
fn preview(text: &str) -> &str {
    if text.len() <= 120 {
        return text;
    }
    let mut end = 120;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

// ─── Protocol frames ─────────────────────────────────────────────────────────

enum ServerFrame {
    Ack,
    Ping,
    Next(Value),
    Error(String),
    Complete,
    Other,
}

fn parse_server_frame(text: &str) -> ServerFrame {
    let v: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return ServerFrame::Other,
    };
    match v.get("type").and_then(Value::as_str) {
        Some("connection_ack") => ServerFrame::Ack,
        Some("ping") => ServerFrame::Ping,
        Some("next") => ServerFrame::Next(v.get("payload").cloned().unwrap_or(Value::Null)),
        Some("error") => ServerFrame::Error(
            v.get("payload")
                .map(|p| p.to_string())
                .unwrap_or_else(|| "subscription error".into()),
        ),
        Some("complete") => ServerFrame::Complete,
        _ => {
            warn!("unrecognized graphql-ws frame");
            ServerFrame::Other
        }
    }
}

/// Pull the subscription result out of a `next` payload and re-wrap it in
/// the envelope shape the parser expects.
fn event_envelope(payload: &Value) -> Option<Value> {
    let data = payload.get("data")?.as_object()?;
    // The subscription document has exactly one root field.
    let inner = data.values().next()?;
    if inner.is_null() {
        return None;
    }
    Some(json!({"event": inner}))
}

/// Build the GraphQL subscription document for a kind + filter.
fn subscription_document(
    kind: SubscriptionKind,
    filter: &SubscriptionFilter,
) -> Result<String, TransportError> {
    match kind {
        SubscriptionKind::Events => {
            let mut keys = filter.keys.clone();
            if !keys.is_empty() && filter.pattern == KeyPattern::VariableLen {
                // Trailing wildcard: listed keys are a prefix.
                keys.push("*".into());
            }
            let args = if keys.is_empty() {
                String::new()
            } else {
                let quoted: Vec<String> = keys.iter().map(|k| quote_string(k)).collect();
                format!("(keys: [{}])", quoted.join(", "))
            };
            Ok(format!(
                "subscription {{ eventEmitted{args} {{ id keys data transactionHash }} }}"
            ))
        }
        other => Err(TransportError::InvalidRequest {
            reason: format!("{other} is not exposed over the GraphQL transport"),
        }),
    }
}

/// GraphQL string literal: quoted, with `\` and `"` escaped so any
/// configured key yields a well-formed document.
fn quote_string(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_for_open_event_subscription() {
        let doc =
            subscription_document(SubscriptionKind::Events, &SubscriptionFilter::default())
                .unwrap();
        assert_eq!(
            doc,
            "subscription { eventEmitted { id keys data transactionHash } }"
        );
    }

    #[test]
    fn document_with_variable_len_keys_appends_wildcard() {
        let filter = SubscriptionFilter::default().with_key("0x1");
        let doc = subscription_document(SubscriptionKind::Events, &filter).unwrap();
        assert_eq!(
            doc,
            "subscription { eventEmitted(keys: [\"0x1\", \"*\"]) { id keys data transactionHash } }"
        );
    }

    #[test]
    fn document_with_fixed_len_keys_has_no_wildcard() {
        let filter = SubscriptionFilter::default().with_key("0x1").fixed_len();
        let doc = subscription_document(SubscriptionKind::Events, &filter).unwrap();
        assert!(doc.contains("(keys: [\"0x1\"])"));
    }

    #[test]
    fn unsupported_kind_is_a_fatal_request_error() {
        let err = subscription_document(
            SubscriptionKind::EntityUpdates,
            &SubscriptionFilter::default(),
        )
        .unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn next_frame_wraps_event_envelope() {
        let frame = r#"{
            "id": "1", "type": "next",
            "payload": {"data": {"eventEmitted": {
                "id": "0x1", "keys": ["0x2"], "data": [], "transactionHash": "0x3"
            }}}
        }"#;
        match parse_server_frame(frame) {
            ServerFrame::Next(payload) => {
                let raw = event_envelope(&payload).unwrap();
                assert_eq!(raw["event"]["transactionHash"], "0x3");
            }
            _ => panic!("expected next frame"),
        }
    }

    #[test]
    fn ack_error_and_complete_frames() {
        assert!(matches!(
            parse_server_frame(r#"{"type":"connection_ack"}"#),
            ServerFrame::Ack
        ));
        assert!(matches!(
            parse_server_frame(r#"{"id":"1","type":"complete"}"#),
            ServerFrame::Complete
        ));
        match parse_server_frame(r#"{"id":"1","type":"error","payload":[{"message":"bad"}]}"#) {
            ServerFrame::Error(reason) => assert!(reason.contains("bad")),
            _ => panic!("expected error frame"),
        }
    }

    #[test]
    fn preview_cuts_long_frames_on_a_char_boundary() {
        // 119 ASCII bytes, then a 2-byte char straddling offset 120.
        let mut text = "x".repeat(119);
        text.push('é');
        let p = preview(&text);
        assert_eq!(p.len(), 119);
        assert!(text.starts_with(p));

        let short = "é".repeat(10);
        assert_eq!(preview(&short), short);
    }

    #[test]
    fn keys_with_quotes_are_escaped_in_the_document() {
        let filter = SubscriptionFilter::default().with_key("a\"b\\c").fixed_len();
        let doc = subscription_document(SubscriptionKind::Events, &filter).unwrap();
        assert!(doc.contains(r#"(keys: ["a\"b\\c"])"#));
    }

    #[test]
    fn null_subscription_result_is_skipped() {
        let payload = serde_json::json!({"data": {"eventEmitted": null}});
        assert!(event_envelope(&payload).is_none());
    }
}
