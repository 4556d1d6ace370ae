//! Shared types for provider adapters and the dispatcher

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Output token cap applied when a model descriptor leaves it unset
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Sampling temperature applied when a model descriptor leaves it unset
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Provider family a model belongs to
///
/// Each family speaks its own wire protocol; see the adapter modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Google,
    Deepseek,
    Mistral,
    Cohere,
    Custom,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::Deepseek => "deepseek",
            ProviderKind::Mistral => "mistral",
            ProviderKind::Cohere => "cohere",
            ProviderKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry describing one model and how to reach it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    /// Provider-side model id, also sent as the wire `model` field
    pub id: String,
    /// Display name
    pub name: String,
    pub provider: ProviderKind,
    #[serde(default)]
    pub description: String,
    /// Credential group; several models may share one key
    pub api_key_name: String,
    pub api_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl ModelDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        provider: ProviderKind,
        api_key_name: impl Into<String>,
        api_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            provider,
            description: String::new(),
            api_key_name: api_key_name.into(),
            api_endpoint: api_endpoint.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Generation parameters with adapter defaults filled in
    pub fn generation(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        }
    }
}

/// Resolved generation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f64,
}

/// One call's worth of input: which model, what prompt, which key
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub model: &'a ModelDescriptor,
    pub prompt: &'a str,
    pub credential: &'a str,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(model: &'a ModelDescriptor, prompt: &'a str, credential: &'a str) -> Self {
        Self {
            model,
            prompt,
            credential,
        }
    }
}

/// A provider-native HTTP request, ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: serde_json::Value,
}

impl WireRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The one response shape every provider is folded into
///
/// On failure `content` is empty and `error` carries the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    pub model_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        default,
        rename = "duration",
        with = "duration_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub elapsed: Option<Duration>,
}

impl NormalizedResult {
    pub fn success(model_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            content: content.into(),
            error: None,
            elapsed: None,
        }
    }

    pub fn failure(model_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            content: String::new(),
            error: Some(error.into()),
            elapsed: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    /// Error text, if the call failed with a non-empty message
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }

    pub fn is_error(&self) -> bool {
        self.error_message().is_some()
    }

    /// Neither content nor an error came back
    pub fn is_blank(&self) -> bool {
        self.content.is_empty() && !self.is_error()
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_u64(d.as_millis() as u64),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_defaults_apply_when_unset() {
        let model = ModelDescriptor::new(
            "gpt-4o",
            "GPT-4o",
            ProviderKind::OpenAi,
            "openai",
            "https://api.openai.com/v1/chat/completions",
        );
        let params = model.generation();
        assert_eq!(params.max_tokens, 2000);
        assert!((params.temperature - 0.7).abs() < f64::EPSILON);

        let params = model.with_max_tokens(512).with_temperature(0.1).generation();
        assert_eq!(params.max_tokens, 512);
        assert!((params.temperature - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_provider_kind_serde_tags() {
        let kind: ProviderKind = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);
        let kind: ProviderKind = serde_json::from_str("\"cohere\"").unwrap();
        assert_eq!(kind, ProviderKind::Cohere);
        assert_eq!(
            serde_json::to_string(&ProviderKind::Anthropic).unwrap(),
            "\"anthropic\""
        );
        assert!(serde_json::from_str::<ProviderKind>("\"bard\"").is_err());
    }

    #[test]
    fn test_normalized_result_json_shape() {
        let result = NormalizedResult::success("gpt-4o", "hi").with_elapsed(Duration::from_millis(1500));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["modelId"], "gpt-4o");
        assert_eq!(json["content"], "hi");
        assert_eq!(json["duration"], 1500);
        assert!(json.get("error").is_none());

        let failed = NormalizedResult::failure("claude", "boom");
        assert!(failed.is_error());
        assert!(!failed.is_blank());
        assert!(NormalizedResult::success("x", "").is_blank());
    }
}
