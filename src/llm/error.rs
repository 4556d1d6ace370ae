//! Typed errors for completion dispatch
//!
//! Every variant ends up as the `error` string of a `NormalizedResult` at the
//! dispatcher boundary; only `Validation` is surfaced as a hard failure, and
//! only by the relay server.

use super::ProviderKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Missing or invalid input at the relay boundary (HTTP 400)
    #[error("{0}")]
    Validation(String),

    /// Provider answered with a non-success status
    ///
    /// `message` is whatever the provider's error envelope said, or the
    /// adapter's fallback text when the envelope was absent.
    #[error("{message}")]
    Provider { status: u16, message: String },

    /// Connection, timeout, or body read failure before a usable status
    #[error("{0}")]
    Network(String),

    /// 2xx response whose body did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// No adapter exists for this provider tag
    #[error("Provider {0} not supported")]
    Unsupported(ProviderKind),

    /// The selected model's credential group has no key configured
    #[error("API key not provided for {0}")]
    MissingCredential(String),
}

impl LlmError {
    /// Whether the relay should answer this with a 400 instead of a 500
    pub fn is_client_error(&self) -> bool {
        matches!(self, LlmError::Validation(_))
    }

    /// Convert network/connection errors into typed LlmError
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Network(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            LlmError::Network(format!("Connection failed: {}", e))
        } else if e.is_decode() || e.is_body() {
            LlmError::MalformedResponse(e.to_string())
        } else {
            LlmError::Network(e.to_string())
        }
    }
}
