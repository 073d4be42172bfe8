//! Error taxonomy for addon communication.

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge error types.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The addon rejected our credentials. Terminal, never retried.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The recipient is not on the configured whitelist. Raised before
    /// any network call.
    #[error("Recipient not allowed by whitelist: {0}")]
    Blocked(String),

    /// The recipient string could not be normalized into a routable
    /// address.
    #[error("Invalid recipient address: {0}")]
    InvalidTarget(String),

    /// The addon returned a non-success status. Retryable.
    #[error("Addon rejected request (status {status}): {detail}")]
    Remote {
        /// HTTP status code reported by the addon.
        status: u16,
        /// Best-effort human-readable detail from the response body.
        detail: String,
    },

    /// Network-level failure (connect, timeout, broken transfer).
    /// Retryable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The addon responded with a body we could not decode.
    #[error("Invalid response payload: {0}")]
    Decode(String),
}

impl BridgeError {
    /// Whether the dispatcher may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::Transport(_))
    }
}
