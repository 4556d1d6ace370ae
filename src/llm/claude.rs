//! Anthropic messages API adapter
//!
//! The key travels in `x-api-key` next to a pinned `anthropic-version`
//! header. Temperature is never sent.

use super::{malformed, parse_json, CompletionRequest, LlmError, ProviderAdapter, WireRequest};
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct ClaudeAdapter;

impl ProviderAdapter for ClaudeAdapter {
    fn label(&self) -> &'static str {
        "Anthropic"
    }

    fn translate_request(&self, request: &CompletionRequest<'_>) -> WireRequest {
        let body = ClaudeRequest {
            model: &request.model.id,
            messages: vec![ClaudeMessage {
                role: "user",
                content: request.prompt,
            }],
            max_tokens: request.model.generation().max_tokens,
        };

        WireRequest {
            url: request.model.api_endpoint.clone(),
            headers: vec![
                ("Content-Type", "application/json".to_string()),
                ("x-api-key", request.credential.to_string()),
                ("anthropic-version", ANTHROPIC_VERSION.to_string()),
            ],
            body: serde_json::to_value(&body).unwrap_or_default(),
        }
    }

    fn parse_success(&self, body: &str) -> Result<String, LlmError> {
        let response: ClaudeResponse = parse_json(self.label(), body)?;
        response
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| malformed(self.label(), "content[0].text"))
    }
}

// Claude API request/response types

#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    messages: Vec<ClaudeMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContentBlock {
    text: Option<String>,
}
