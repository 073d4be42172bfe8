//! Client configuration.

use serde::{Deserialize, Serialize};

fn default_session_id() -> String {
    "default".to_string()
}

fn default_retry_attempts() -> u32 {
    2
}

/// Configuration for the addon client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the addon REST API (e.g. http://localhost:8066).
    pub base_url: String,

    /// API key sent in the `X-Auth-Token` header. Omitted when `None`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Logical session identifier, sent as a query parameter on every
    /// request.
    #[serde(default = "default_session_id")]
    pub session_id: String,

    /// Ordered whitelist patterns gating outbound sends. Empty
    /// disables filtering.
    #[serde(default)]
    pub whitelist: Vec<String>,

    /// Extra send attempts after the first failure (total attempts =
    /// retry_attempts + 1).
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Mask recipient identifiers in log output.
    #[serde(default)]
    pub mask_sensitive: bool,
}

impl ClientConfig {
    /// Create a new configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            session_id: default_session_id(),
            whitelist: Vec::new(),
            retry_attempts: default_retry_attempts(),
            mask_sensitive: false,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the session identifier.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Set the whitelist patterns.
    pub fn with_whitelist(mut self, whitelist: Vec<String>) -> Self {
        self.whitelist = whitelist;
        self
    }

    /// Set the number of extra send attempts.
    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    /// Enable masking of recipient identifiers in logs.
    pub fn with_masking(mut self) -> Self {
        self.mask_sensitive = true;
        self
    }

    /// The base URL without a trailing slash.
    pub fn api_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Render a recipient identifier for log output, masked when
    /// configured.
    pub fn display_target(&self, target: &str) -> String {
        if !self.mask_sensitive {
            return target.to_string();
        }
        let visible: String = target.chars().take(4).collect();
        format!("{visible}***")
    }
}
