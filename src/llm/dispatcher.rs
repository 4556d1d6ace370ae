//! Completion dispatch
//!
//! [`Completer`] is the single entry point the orchestration layer talks to.
//! Two implementations exist:
//! - [`DirectDispatcher`] calls the provider itself through its adapter
//! - [`RelayClient`] forwards `{prompt, modelId, apiKey}` to a relay server
//!
//! Neither ever returns an error: every failure is folded into the
//! `error` field of the returned [`NormalizedResult`].

use super::{adapter_for, CompletionRequest, LlmError, ModelDescriptor, NormalizedResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait Completer: Send + Sync {
    /// Run one completion and normalize whatever happens
    async fn complete(
        &self,
        model: &ModelDescriptor,
        prompt: &str,
        credential: &str,
    ) -> NormalizedResult;
}

/// Calls providers directly using their native wire protocol
#[derive(Clone, Default)]
pub struct DirectDispatcher {
    client: reqwest::Client,
}

impl DirectDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Same as [`Completer::complete`] but keeps the typed error
    pub async fn try_complete(&self, request: CompletionRequest<'_>) -> Result<String, LlmError> {
        let adapter = adapter_for(request.model.provider)?;
        let wire = adapter.translate_request(&request);

        tracing::debug!(
            provider = %request.model.provider,
            model = %request.model.id,
            "Sending completion request"
        );

        let mut builder = self.client.post(&wire.url);
        for (name, value) in &wire.headers {
            builder = builder.header(*name, value);
        }

        let response = builder
            .json(&wire.body)
            .send()
            .await
            .map_err(LlmError::from_network_error)?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(LlmError::from_network_error)?;

        adapter.translate_response(status.as_u16(), &body)
    }
}

#[async_trait]
impl Completer for DirectDispatcher {
    async fn complete(
        &self,
        model: &ModelDescriptor,
        prompt: &str,
        credential: &str,
    ) -> NormalizedResult {
        match self
            .try_complete(CompletionRequest::new(model, prompt, credential))
            .await
        {
            Ok(content) => NormalizedResult::success(&model.id, content),
            Err(e) => {
                tracing::warn!("Error generating completion for {}: {}", model.name, e);
                NormalizedResult::failure(&model.id, e.to_string())
            }
        }
    }
}

/// Body accepted by the relay's chat endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub model_id: String,
    #[serde(default)]
    pub api_key: String,
}

/// Either `{content}` or `{error}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RelayReply {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            content: None,
            error: Some(error.into()),
        }
    }
}

/// Sends completions through a relay server instead of calling providers
#[derive(Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    endpoint: String,
}

impl RelayClient {
    /// `base_url` is the relay root, e.g. `http://127.0.0.1:8787`
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &RelayRequest) -> Result<RelayReply, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(LlmError::from_network_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(LlmError::from_network_error)?;

        match serde_json::from_str::<RelayReply>(&body) {
            Ok(reply) => Ok(reply),
            Err(_) if !status.is_success() => Err(LlmError::Provider {
                status: status.as_u16(),
                message: format!("Relay returned HTTP {}", status),
            }),
            Err(e) => Err(LlmError::MalformedResponse(format!(
                "relay returned invalid JSON: {e}"
            ))),
        }
    }
}

#[async_trait]
impl Completer for RelayClient {
    async fn complete(
        &self,
        model: &ModelDescriptor,
        prompt: &str,
        credential: &str,
    ) -> NormalizedResult {
        let request = RelayRequest {
            prompt: prompt.to_string(),
            model_id: model.id.clone(),
            api_key: credential.to_string(),
        };

        match self.send(&request).await {
            Ok(RelayReply {
                error: Some(error), ..
            }) if !error.is_empty() => NormalizedResult::failure(&model.id, error),
            Ok(reply) => NormalizedResult::success(&model.id, reply.content.unwrap_or_default()),
            Err(e) => {
                tracing::warn!("Relay call for {} failed: {}", model.name, e);
                NormalizedResult::failure(&model.id, e.to_string())
            }
        }
    }
}
