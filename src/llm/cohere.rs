//! Cohere generate adapter
//!
//! Flat `prompt` string in, `generations[0].text` out, bearer auth.

use super::{malformed, parse_json, CompletionRequest, LlmError, ProviderAdapter, WireRequest};
use serde::{Deserialize, Serialize};

pub struct CohereAdapter;

impl ProviderAdapter for CohereAdapter {
    fn label(&self) -> &'static str {
        "Cohere"
    }

    fn translate_request(&self, request: &CompletionRequest<'_>) -> WireRequest {
        let body = CohereRequest {
            model: &request.model.id,
            prompt: request.prompt,
            max_tokens: request.model.generation().max_tokens,
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
        let response: CohereResponse = parse_json(self.label(), body)?;
        response
            .generations
            .into_iter()
            .next()
            .and_then(|g| g.text)
            .ok_or_else(|| malformed(self.label(), "generations[0].text"))
    }
}

#[derive(Debug, Serialize)]
struct CohereRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CohereResponse {
    #[serde(default)]
    generations: Vec<CohereGeneration>,
}

#[derive(Debug, Deserialize)]
struct CohereGeneration {
    text: Option<String>,
}
