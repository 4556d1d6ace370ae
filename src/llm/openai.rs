//! OpenAI-style chat completions adapter
//!
//! Deepseek and Mistral expose the same wire format, so one adapter serves all
//! three; only the label used in fallback error text differs.

use super::{malformed, parse_json, CompletionRequest, LlmError, ProviderAdapter, WireRequest};
use serde::{Deserialize, Serialize};

pub struct OpenAiChatAdapter {
    label: &'static str,
}

impl OpenAiChatAdapter {
    pub const fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl ProviderAdapter for OpenAiChatAdapter {
    fn label(&self) -> &'static str {
        self.label
    }

    fn translate_request(&self, request: &CompletionRequest<'_>) -> WireRequest {
        let params = request.model.generation();
        let body = ChatRequest {
            model: &request.model.id,
            messages: vec![ChatMessage {
                role: "user",
                content: request.prompt,
            }],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        WireRequest {
            url: request.model.api_endpoint.clone(),
            headers: vec![
                ("Content-Type", "application/json".to_string()),
                ("Authorization", format!("Bearer {}", request.credential)),
            ],
            body: serde_json::to_value(&body).unwrap_or_default(),
        }
    }

    fn parse_success(&self, body: &str) -> Result<String, LlmError> {
        let response: ChatResponse = parse_json(self.label, body)?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| malformed(self.label, "choices[0].message.content"))?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

// OpenAI API request/response types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
