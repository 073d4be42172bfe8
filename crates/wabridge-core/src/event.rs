//! Inbound event wire types.

use serde::{Deserialize, Serialize};

/// One inbound event as delivered by the addon's `/events` endpoint.
///
/// The addon evolves independently of this client, so every field is
/// optional and unknown keys are preserved in `extra` rather than
/// rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Message/event identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Event kind as reported by the addon (e.g. "message").
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    /// JID of the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,

    /// Text content, when the event carries any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Addon-side unix timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Any additional fields the addon sent along.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_message_event() {
        let event: InboundEvent = serde_json::from_str(
            r#"{
                "id": "ABCD1234",
                "type": "message",
                "sender": "49123456789@s.whatsapp.net",
                "content": "hello",
                "timestamp": 1234567890,
                "is_group": false
            }"#,
        )
        .unwrap();

        assert_eq!(event.id.as_deref(), Some("ABCD1234"));
        assert_eq!(event.event_type.as_deref(), Some("message"));
        assert_eq!(event.content.as_deref(), Some("hello"));
        assert_eq!(event.extra.get("is_group"), Some(&serde_json::json!(false)));
    }

    #[test]
    fn test_deserialize_sparse_event() {
        let event: InboundEvent = serde_json::from_str(r#"{"sender": "49@s.whatsapp.net"}"#)
            .unwrap();
        assert!(event.id.is_none());
        assert!(event.content.is_none());
        assert!(event.extra.is_empty());
    }
}
