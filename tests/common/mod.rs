//! Local stand-in for the real provider APIs
//!
//! One axum server answers all four wire protocols, picked by path prefix:
//! `/openai`, `/anthropic`, `/gemini`, `/cohere`. The reply text depends on
//! the prompt:
//! - `ping` answers `pong`
//! - `empty` answers with a null/empty text field
//! - `garbage` answers 200 with a non-JSON body
//! - anything else is echoed back as `echo: <prompt>`
//!
//! The credential `bad-key` gets a 401 with `Invalid API key`.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use polyprompt::llm::{ModelDescriptor, ProviderKind};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

pub struct MockProvider {
    pub base: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockProvider {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn endpoint(&self, provider: ProviderKind) -> String {
        let prefix = match provider {
            ProviderKind::Anthropic => "anthropic/v1/messages",
            ProviderKind::Google => "gemini/v1beta/models/mock:generateContent",
            ProviderKind::Cohere => "cohere/v1/generate",
            _ => "openai/v1/chat/completions",
        };
        format!("{}/{}", self.base, prefix)
    }

    /// A model of the given family routed to this server
    pub fn model(&self, id: &str, name: &str, provider: ProviderKind) -> ModelDescriptor {
        ModelDescriptor::new(id, name, provider, provider.as_str(), self.endpoint(provider))
    }
}

/// Start the mock on an ephemeral port
pub async fn spawn_provider() -> MockProvider {
    let state = MockState::default();
    let requests = state.requests.clone();
    let app = Router::new().fallback(handle).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockProvider {
        base: format!("http://{}", addr),
        requests,
    }
}

async fn handle(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let path = uri.path().to_string();
    let query = uri.query().map(str::to_string);
    state.requests.lock().unwrap().push(Recorded {
        path: path.clone(),
        query: query.clone(),
        headers: headers.clone(),
        body: body.clone(),
    });

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    let bearer = header("authorization")
        .strip_prefix("Bearer ")
        .unwrap_or_default()
        .to_string();

    let (credential, prompt) = if path.starts_with("/anthropic") {
        (header("x-api-key"), body["messages"][0]["content"].clone())
    } else if path.starts_with("/gemini") {
        let key = query
            .as_deref()
            .and_then(|q| q.strip_prefix("key="))
            .unwrap_or_default()
            .to_string();
        (key, body["contents"][0]["parts"][0]["text"].clone())
    } else if path.starts_with("/cohere") {
        (bearer, body["prompt"].clone())
    } else {
        (bearer, body["messages"][0]["content"].clone())
    };
    let prompt = prompt.as_str().unwrap_or_default().to_string();

    if credential.is_empty() || credential == "bad-key" {
        let envelope = json!({ "error": { "message": "Invalid API key" } });
        return (StatusCode::UNAUTHORIZED, axum::Json(envelope)).into_response();
    }
    if prompt == "garbage" {
        return (StatusCode::OK, "<html>definitely not json</html>").into_response();
    }
    if let Some(ms) = prompt.strip_prefix("sleep ").and_then(|s| s.parse().ok()) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    let text = match prompt.as_str() {
        "ping" => Value::from("pong"),
        "empty" => Value::Null,
        other => Value::from(format!("echo: {other}")),
    };

    let reply = if path.starts_with("/anthropic") {
        json!({ "content": [{ "type": "text", "text": text }] })
    } else if path.starts_with("/gemini") {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    } else if path.starts_with("/cohere") {
        json!({ "generations": [{ "text": text }] })
    } else {
        json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] })
    };
    axum::Json(reply).into_response()
}
