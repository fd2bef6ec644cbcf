use thiserror::Error;

/// Errors that can occur while talking to a messaging service.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// A message could not be delivered to the remote endpoint.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The service rejected the supplied token.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// No channel, group, or direct message matched the requested name.
    #[error("{0}")]
    NotFound(String),

    /// The service asked us to slow down.
    #[error("Rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// The API answered but reported a failure (`ok: false`).
    #[error("{method} failed: {error}")]
    Api { method: String, error: String },

    /// Transport-level failure (DNS, TLS, timeout, unexpected body).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Local file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel-specific configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
