//! Google Gemini generateContent adapter
//!
//! Gemini takes the key as a `key` query parameter rather than a header, and
//! nests the prompt under `contents[].parts[]` with a `generationConfig` block.

use super::{malformed, parse_json, CompletionRequest, LlmError, ProviderAdapter, WireRequest};
use serde::{Deserialize, Serialize};

pub struct GeminiAdapter;

impl ProviderAdapter for GeminiAdapter {
    fn label(&self) -> &'static str {
        "Google"
    }

    fn translate_request(&self, request: &CompletionRequest<'_>) -> WireRequest {
        let params = request.model.generation();
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: request.prompt,
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_tokens,
            },
        };

        WireRequest {
            url: keyed_url(&request.model.api_endpoint, request.credential),
            headers: vec![("Content-Type", "application/json".to_string())],
            body: serde_json::to_value(&body).unwrap_or_default(),
        }
    }

    fn parse_success(&self, body: &str) -> Result<String, LlmError> {
        let response: GeminiResponse = parse_json(self.label(), body)?;
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| malformed(self.label(), "candidates[0].content.parts[0].text"))
    }
}

/// Append the key as an encoded `key` query pair, keeping any existing query
fn keyed_url(endpoint: &str, key: &str) -> String {
    match reqwest::Url::parse(endpoint) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("key", key);
            url.to_string()
        }
        Err(e) => {
            tracing::warn!("Invalid Gemini endpoint '{}': {}", endpoint, e);
            endpoint.to_string()
        }
    }
}

// Gemini API request/response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}
