//! Provider adapters and completion dispatch
//!
//! Each provider family gets a small adapter that knows two things: how to
//! turn a prompt into that provider's HTTP request, and how to pull text (or
//! an error message) back out of its response. The dispatcher owns the
//! network call and folds every outcome into a [`NormalizedResult`].

mod claude;
mod cohere;
pub mod dispatcher;
mod error;
mod gemini;
mod openai;
mod types;

pub use claude::ClaudeAdapter;
pub use cohere::CohereAdapter;
pub use dispatcher::{Completer, DirectDispatcher, RelayClient, RelayReply, RelayRequest};
pub use error::LlmError;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiChatAdapter;
pub use types::*;

use serde::Deserialize;

/// Translation between the provider-agnostic request and one wire protocol
pub trait ProviderAdapter: Send + Sync {
    /// Provider label used in fallback error text ("OpenAI API error")
    fn label(&self) -> &'static str;

    /// Build the provider-native request
    fn translate_request(&self, request: &CompletionRequest<'_>) -> WireRequest;

    /// Pull the completion text out of a 2xx body
    fn parse_success(&self, body: &str) -> Result<String, LlmError>;

    /// Map a status + body pair to completion text or a provider error
    fn translate_response(&self, status: u16, body: &str) -> Result<String, LlmError> {
        if !(200..300).contains(&status) {
            let message = error_envelope_message(body)
                .unwrap_or_else(|| format!("{} API error", self.label()));
            return Err(LlmError::Provider { status, message });
        }
        self.parse_success(body)
    }
}

static OPENAI: OpenAiChatAdapter = OpenAiChatAdapter::new("OpenAI");
static DEEPSEEK: OpenAiChatAdapter = OpenAiChatAdapter::new("Deepseek");
static MISTRAL: OpenAiChatAdapter = OpenAiChatAdapter::new("Mistral");
static ANTHROPIC: ClaudeAdapter = ClaudeAdapter;
static GOOGLE: GeminiAdapter = GeminiAdapter;
static COHERE: CohereAdapter = CohereAdapter;

/// Select the adapter for a provider family
pub fn adapter_for(provider: ProviderKind) -> Result<&'static dyn ProviderAdapter, LlmError> {
    match provider {
        ProviderKind::OpenAi => Ok(&OPENAI),
        ProviderKind::Deepseek => Ok(&DEEPSEEK),
        ProviderKind::Mistral => Ok(&MISTRAL),
        ProviderKind::Anthropic => Ok(&ANTHROPIC),
        ProviderKind::Google => Ok(&GOOGLE),
        ProviderKind::Cohere => Ok(&COHERE),
        ProviderKind::Custom => Err(LlmError::Unsupported(provider)),
    }
}

/// `{"error": {"message": "..."}}`, shared by every supported provider
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

fn error_envelope_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()?
        .error?
        .message
        .filter(|m| !m.is_empty())
}

fn malformed(label: &str, path: &str) -> LlmError {
    LlmError::MalformedResponse(format!("{label} response is missing {path}"))
}

fn parse_json<'a, T: Deserialize<'a>>(label: &str, body: &'a str) -> Result<T, LlmError> {
    serde_json::from_str(body)
        .map_err(|e| LlmError::MalformedResponse(format!("{label} returned invalid JSON: {e}")))
}
