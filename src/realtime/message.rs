use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::BazaarError;

/// Type of the handshake sent as soon as a connection opens.
pub const CLIENT_CONNECTED: &str = "CLIENT_CONNECTED";

/// Outbound envelope: `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl RealtimeMessage {
    pub fn new(kind: impl Into<String>, payload: impl Serialize) -> Result<Self, BazaarError> {
        Ok(Self {
            kind: kind.into(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// `{"type":"CLIENT_CONNECTED","payload":{}}`
    pub fn client_connected() -> Self {
        Self {
            kind: CLIENT_CONNECTED.to_owned(),
            payload: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn to_json(&self) -> Result<String, BazaarError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A message received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Json(Value),
    /// Payload that did not parse as JSON, passed through untouched.
    Raw(String),
}

impl Inbound {
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => Inbound::Json(value),
            Err(_) => Inbound::Raw(text.to_owned()),
        }
    }

    /// The `type` field of a JSON object message.
    pub fn message_type(&self) -> Option<&str> {
        match self {
            Inbound::Json(value) => value.get("type").and_then(Value::as_str),
            Inbound::Raw(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_wire_format() {
        let json = RealtimeMessage::client_connected().to_json().unwrap();
        assert_eq!(json, r#"{"type":"CLIENT_CONNECTED","payload":{}}"#);
    }

    #[test]
    fn test_new_message() {
        let message = RealtimeMessage::new("ORDER_PLACED", serde_json::json!({"order": 7})).unwrap();
        assert_eq!(
            message.to_json().unwrap(),
            r#"{"type":"ORDER_PLACED","payload":{"order":7}}"#
        );
    }

    #[test]
    fn test_parse_json() {
        let inbound = Inbound::parse(r#"{"type":"NEW_MESSAGE","payload":{"text":"hi"}}"#);
        assert_eq!(inbound.message_type(), Some("NEW_MESSAGE"));
    }

    #[test]
    fn test_parse_falls_back_to_raw() {
        let inbound = Inbound::parse("pong");
        assert_eq!(inbound, Inbound::Raw("pong".to_owned()));
        assert_eq!(inbound.message_type(), None);
    }

    #[test]
    fn test_json_without_type() {
        assert_eq!(Inbound::parse("[1,2,3]").message_type(), None);
    }
}
