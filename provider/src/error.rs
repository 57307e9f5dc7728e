//! Error types for provider adapters

use thiserror::Error;

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, Error>;

/// Provider errors
///
/// The raw provider message is kept verbatim so callers can surface it
/// for diagnostics without re-deriving it from logs.
#[derive(Error, Debug)]
pub enum Error {
    /// Explicit error payload returned by the provider
    #[error("Provider API error {code}: {message}")]
    Api {
        /// Provider error code
        code: i64,
        /// Provider error name/message, verbatim
        message: String,
    },

    /// Transport-level failure (DNS, TLS, timeout, connection reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// `ok: true` response with no result payload
    #[error("Provider response missing result for {0}")]
    MissingResult(&'static str),

    /// Malformed inbound webhook payload
    #[error("Webhook error: {0}")]
    Webhook(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
