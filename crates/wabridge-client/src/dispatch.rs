//! Outbound send operations.
//!
//! Every message-sending endpoint of the addon shares one dispatch
//! shape: whitelist check, target normalization, POST with a per-call
//! timeout, retry on retryable failures. [`SendOperation`] captures
//! what differs per endpoint (path, payload, timeout class) so the
//! template in [`crate::client`] exists exactly once.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Timeout for text-sized requests.
pub(crate) const TEXT_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for media requests; the addon downloads and re-encodes the
/// attachment before acknowledging.
pub(crate) const MEDIA_TIMEOUT: Duration = Duration::from_secs(60);

/// Fixed delay between send attempts.
pub(crate) const RETRY_DELAY: Duration = Duration::from_secs(1);

/// An interactive button.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Button {
    /// Callback id reported back when the button is tapped.
    pub id: String,
    /// Label shown to the user.
    #[serde(rename = "displayText")]
    pub display_text: String,
}

/// One row of a list message section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A titled section of a list message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSection {
    pub title: String,
    pub rows: Vec<ListRow>,
}

/// Chat presence states understood by the addon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Available,
    Unavailable,
    Composing,
    Recording,
    Paused,
}

impl Presence {
    /// Wire name of this presence state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Composing => "composing",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }
}

/// One outbound operation, tagged by message type.
#[derive(Debug, Clone)]
pub enum SendOperation {
    /// Plain text message.
    Text {
        body: String,
        quoted_message_id: Option<String>,
    },
    /// Image by URL with optional caption.
    Image {
        url: String,
        caption: Option<String>,
        quoted_message_id: Option<String>,
    },
    /// Poll with a question and answer options.
    Poll {
        question: String,
        options: Vec<String>,
        quoted_message_id: Option<String>,
    },
    /// Geographic location pin.
    Location {
        latitude: f64,
        longitude: f64,
        name: Option<String>,
        address: Option<String>,
        quoted_message_id: Option<String>,
    },
    /// Emoji reaction to an existing message.
    Reaction { reaction: String, message_id: String },
    /// Text with interactive buttons.
    Buttons {
        body: String,
        buttons: Vec<Button>,
        footer: Option<String>,
        quoted_message_id: Option<String>,
    },
    /// Document by URL.
    Document {
        url: String,
        file_name: Option<String>,
        caption: Option<String>,
        quoted_message_id: Option<String>,
    },
    /// Video by URL.
    Video {
        url: String,
        caption: Option<String>,
        quoted_message_id: Option<String>,
    },
    /// Audio by URL; `ptt` marks it as a voice note.
    Audio {
        url: String,
        ptt: bool,
        quoted_message_id: Option<String>,
    },
    /// Sectioned list message.
    List {
        body: String,
        button_text: String,
        sections: Vec<ListSection>,
        footer: Option<String>,
    },
    /// Contact card.
    Contact {
        contact_name: String,
        contact_phone: String,
    },
    /// Revoke (delete for everyone) a previously sent message.
    Revoke { message_id: String },
    /// Edit the body of a previously sent message.
    Edit { message_id: String, body: String },
    /// Update our presence towards the chat.
    SetPresence { presence: Presence },
    /// Mark a message as read.
    MarkRead { message_id: String },
}

impl SendOperation {
    /// Endpoint path for this operation.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Text { .. } => "/send_message",
            Self::Image { .. } => "/send_image",
            Self::Poll { .. } => "/send_poll",
            Self::Location { .. } => "/send_location",
            Self::Reaction { .. } => "/send_reaction",
            Self::Buttons { .. } => "/send_buttons",
            Self::Document { .. } => "/send_document",
            Self::Video { .. } => "/send_video",
            Self::Audio { .. } => "/send_audio",
            Self::List { .. } => "/send_list",
            Self::Contact { .. } => "/send_contact",
            Self::Revoke { .. } => "/revoke_message",
            Self::Edit { .. } => "/edit_message",
            Self::SetPresence { .. } => "/set_presence",
            Self::MarkRead { .. } => "/mark_as_read",
        }
    }

    /// Whether this operation moves media and deserves the longer
    /// timeout.
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            Self::Image { .. } | Self::Document { .. } | Self::Video { .. } | Self::Audio { .. }
        )
    }

    /// Per-call request timeout.
    pub fn timeout(&self) -> Duration {
        if self.is_media() {
            MEDIA_TIMEOUT
        } else {
            TEXT_TIMEOUT
        }
    }

    /// Short description recorded in stats and logs.
    pub fn summary(&self) -> String {
        match self {
            Self::Text { body, .. } => body.clone(),
            Self::Image { caption, .. } => caption.clone().unwrap_or_else(|| "[image]".into()),
            Self::Poll { question, .. } => format!("[poll] {question}"),
            Self::Location { name, .. } => match name {
                Some(name) => format!("[location] {name}"),
                None => "[location]".into(),
            },
            Self::Reaction { reaction, .. } => format!("[reaction] {reaction}"),
            Self::Buttons { body, .. } => body.clone(),
            Self::Document { file_name, .. } => {
                format!("[document] {}", file_name.as_deref().unwrap_or(""))
            }
            Self::Video { caption, .. } => caption.clone().unwrap_or_else(|| "[video]".into()),
            Self::Audio { .. } => "[audio]".into(),
            Self::List { body, .. } => body.clone(),
            Self::Contact { contact_name, .. } => format!("[contact] {contact_name}"),
            Self::Revoke { .. } => "[revoke]".into(),
            Self::Edit { body, .. } => format!("[edit] {body}"),
            Self::SetPresence { presence } => format!("[presence] {}", presence.as_str()),
            Self::MarkRead { .. } => "[mark_as_read]".into(),
        }
    }

    /// Build the request payload for the normalized recipient.
    pub fn payload(&self, jid: &str) -> Value {
        let mut body = Map::new();
        body.insert("to".into(), json!(jid));

        match self {
            Self::Text {
                body: text,
                quoted_message_id,
            } => {
                body.insert("message".into(), json!(text));
                insert_quote(&mut body, quoted_message_id);
            }
            Self::Image {
                url,
                caption,
                quoted_message_id,
            } => {
                body.insert("url".into(), json!(url));
                insert_opt(&mut body, "caption", caption);
                insert_quote(&mut body, quoted_message_id);
            }
            Self::Poll {
                question,
                options,
                quoted_message_id,
            } => {
                body.insert("question".into(), json!(question));
                body.insert("options".into(), json!(options));
                insert_quote(&mut body, quoted_message_id);
            }
            Self::Location {
                latitude,
                longitude,
                name,
                address,
                quoted_message_id,
            } => {
                body.insert("latitude".into(), json!(latitude));
                body.insert("longitude".into(), json!(longitude));
                insert_opt(&mut body, "name", name);
                insert_opt(&mut body, "address", address);
                insert_quote(&mut body, quoted_message_id);
            }
            Self::Reaction {
                reaction,
                message_id,
            } => {
                body.insert("reaction".into(), json!(reaction));
                body.insert("message_id".into(), json!(message_id));
            }
            Self::Buttons {
                body: text,
                buttons,
                footer,
                quoted_message_id,
            } => {
                body.insert("message".into(), json!(text));
                body.insert("buttons".into(), json!(buttons));
                insert_opt(&mut body, "footer", footer);
                insert_quote(&mut body, quoted_message_id);
            }
            Self::Document {
                url,
                file_name,
                caption,
                quoted_message_id,
            } => {
                body.insert("url".into(), json!(url));
                insert_opt(&mut body, "file_name", file_name);
                insert_opt(&mut body, "caption", caption);
                insert_quote(&mut body, quoted_message_id);
            }
            Self::Video {
                url,
                caption,
                quoted_message_id,
            } => {
                body.insert("url".into(), json!(url));
                insert_opt(&mut body, "caption", caption);
                insert_quote(&mut body, quoted_message_id);
            }
            Self::Audio {
                url,
                ptt,
                quoted_message_id,
            } => {
                body.insert("url".into(), json!(url));
                body.insert("ptt".into(), json!(ptt));
                insert_quote(&mut body, quoted_message_id);
            }
            Self::List {
                body: text,
                button_text,
                sections,
                footer,
            } => {
                body.insert("message".into(), json!(text));
                body.insert("button_text".into(), json!(button_text));
                body.insert("sections".into(), json!(sections));
                insert_opt(&mut body, "footer", footer);
            }
            Self::Contact {
                contact_name,
                contact_phone,
            } => {
                body.insert("contact_name".into(), json!(contact_name));
                body.insert("contact_phone".into(), json!(contact_phone));
            }
            Self::Revoke { message_id } => {
                body.insert("message_id".into(), json!(message_id));
            }
            Self::Edit {
                message_id,
                body: text,
            } => {
                body.insert("message_id".into(), json!(message_id));
                body.insert("message".into(), json!(text));
            }
            Self::SetPresence { presence } => {
                body.insert("presence".into(), json!(presence.as_str()));
            }
            Self::MarkRead { message_id } => {
                body.insert("message_id".into(), json!(message_id));
            }
        }

        Value::Object(body)
    }
}

fn insert_opt(body: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        body.insert(key.into(), json!(value));
    }
}

fn insert_quote(body: &mut Map<String, Value>, quoted_message_id: &Option<String>) {
    insert_opt(body, "quoted_message_id", quoted_message_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_and_timeouts() {
        let text = SendOperation::Text {
            body: "hi".into(),
            quoted_message_id: None,
        };
        assert_eq!(text.path(), "/send_message");
        assert!(!text.is_media());
        assert_eq!(text.timeout(), TEXT_TIMEOUT);

        let image = SendOperation::Image {
            url: "http://x/y.png".into(),
            caption: None,
            quoted_message_id: None,
        };
        assert_eq!(image.path(), "/send_image");
        assert!(image.is_media());
        assert_eq!(image.timeout(), MEDIA_TIMEOUT);
    }

    #[test]
    fn test_text_payload_with_quote() {
        let op = SendOperation::Text {
            body: "hello".into(),
            quoted_message_id: Some("MSG1".into()),
        };
        let payload = op.payload("49123@s.whatsapp.net");
        assert_eq!(payload["to"], "49123@s.whatsapp.net");
        assert_eq!(payload["message"], "hello");
        assert_eq!(payload["quoted_message_id"], "MSG1");
    }

    #[test]
    fn test_optional_fields_omitted() {
        let op = SendOperation::Image {
            url: "http://x/y.png".into(),
            caption: None,
            quoted_message_id: None,
        };
        let payload = op.payload("49123@s.whatsapp.net");
        assert!(payload.get("caption").is_none());
        assert!(payload.get("quoted_message_id").is_none());
    }

    #[test]
    fn test_buttons_payload_shape() {
        let op = SendOperation::Buttons {
            body: "pick one".into(),
            buttons: vec![Button {
                id: "yes".into(),
                display_text: "Yes".into(),
            }],
            footer: Some("bot".into()),
            quoted_message_id: None,
        };
        let payload = op.payload("49123@s.whatsapp.net");
        assert_eq!(payload["buttons"][0]["id"], "yes");
        assert_eq!(payload["buttons"][0]["displayText"], "Yes");
        assert_eq!(payload["footer"], "bot");
    }

    #[test]
    fn test_presence_payload() {
        let op = SendOperation::SetPresence {
            presence: Presence::Composing,
        };
        assert_eq!(op.path(), "/set_presence");
        let payload = op.payload("49123@s.whatsapp.net");
        assert_eq!(payload["presence"], "composing");
    }

    #[test]
    fn test_summaries() {
        let op = SendOperation::Text {
            body: "hi".into(),
            quoted_message_id: None,
        };
        assert_eq!(op.summary(), "hi");

        let op = SendOperation::Poll {
            question: "lunch?".into(),
            options: vec!["yes".into(), "no".into()],
            quoted_message_id: None,
        };
        assert_eq!(op.summary(), "[poll] lunch?");
    }
}
