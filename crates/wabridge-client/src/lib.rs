//! REST client for the WhatsApp addon.
//!
//! [`WhatsAppClient`] wraps the addon's HTTP API: outbound sends run
//! through a whitelist-gated, retry-wrapped dispatcher; inbound events
//! arrive via a continuously reconnecting poller that feeds registered
//! callbacks; connection state and counters are tracked alongside.

pub mod client;
pub mod dispatch;
pub mod poller;

pub use client::{EventCallback, GroupInfo, QrResponse, StatusResponse, WhatsAppClient};
pub use dispatch::{Button, ListRow, ListSection, Presence, SendOperation};
pub use poller::DEFAULT_POLL_INTERVAL;
