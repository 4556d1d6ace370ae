//! Relay server end to end: HTTP contract and the RelayClient on top of it

mod common;

use common::{spawn_provider, MockProvider};
use polyprompt::catalog::Catalog;
use polyprompt::llm::{Completer, DirectDispatcher, ProviderKind, RelayClient};
use polyprompt::transport::http::{serve, RelayState};
use serde_json::{json, Value};
use std::sync::Arc;

/// Built-in ids rerouted to the mock provider
fn catalog_for(mock: &MockProvider) -> Catalog {
    Catalog::with_overrides([
        mock.model("gpt-4o", "GPT-4o", ProviderKind::OpenAi),
        mock.model("command", "Cohere Command", ProviderKind::Cohere),
    ])
}

async fn spawn_relay(catalog: Catalog) -> String {
    let state = Arc::new(RelayState::new(Arc::new(catalog), DirectDispatcher::new()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        serve(listener, state).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn post_chat(base: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base}/api/chat"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_chat_success() {
    let mock = spawn_provider().await;
    let relay = spawn_relay(catalog_for(&mock)).await;

    let (status, body) = post_chat(
        &relay,
        json!({ "prompt": "ping", "modelId": "gpt-4o", "apiKey": "sk-test" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "content": "pong" }));

    // The relay forwards the caller's key, it keeps none of its own
    let req = &mock.requests()[0];
    assert_eq!(req.headers["authorization"], "Bearer sk-test");
}

#[tokio::test]
async fn test_chat_validation_errors() {
    let mock = spawn_provider().await;
    let relay = spawn_relay(catalog_for(&mock)).await;

    let cases = [
        (json!({ "modelId": "gpt-4o", "apiKey": "k" }), "Prompt is required"),
        (json!({ "prompt": "hi", "apiKey": "k" }), "Model ID is required"),
        (json!({ "prompt": "hi", "modelId": "gpt-4o" }), "API key is required"),
        (
            json!({ "prompt": "hi", "modelId": "gpt-9", "apiKey": "k" }),
            "Invalid model ID",
        ),
    ];
    for (body, message) in cases {
        let (status, reply) = post_chat(&relay, body).await;
        assert_eq!(status, 400);
        assert_eq!(reply, json!({ "error": message }));
    }
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_chat_rejects_non_json_body() {
    let relay = spawn_relay(Catalog::builtin()).await;

    let response = reqwest::Client::new()
        .post(format!("{relay}/api/chat"))
        .header("content-type", "application/json")
        .body("{prompt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_chat_provider_failure_is_500() {
    let mock = spawn_provider().await;
    let relay = spawn_relay(catalog_for(&mock)).await;

    let (status, body) = post_chat(
        &relay,
        json!({ "prompt": "ping", "modelId": "command", "apiKey": "bad-key" }),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(body, json!({ "error": "Invalid API key" }));
}

#[tokio::test]
async fn test_health_and_models() {
    let relay = spawn_relay(Catalog::builtin()).await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{relay}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let models: Vec<Value> = client
        .get(format!("{relay}/api/models"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(models.len(), Catalog::builtin().models().len());
    assert_eq!(models[0]["id"], "gpt-4o");
    assert_eq!(models[0]["apiKeyName"], "openai");
    assert!(models[0].get("apiEndpoint").is_none());
}

#[tokio::test]
async fn test_relay_client_round_trip() {
    let mock = spawn_provider().await;
    let catalog = catalog_for(&mock);
    let model = catalog.get("command").unwrap().clone();
    let relay = spawn_relay(catalog).await;
    let client = RelayClient::new(&relay);

    let result = client.complete(&model, "ping", "co-key").await;
    assert_eq!(result.model_id, "command");
    assert_eq!(result.content, "pong");
    assert!(result.error.is_none());

    let result = client.complete(&model, "ping", "bad-key").await;
    assert_eq!(result.content, "");
    assert_eq!(result.error.as_deref(), Some("Invalid API key"));
}

#[tokio::test]
async fn test_relay_client_unknown_model_is_normalized() {
    let relay = spawn_relay(Catalog::builtin()).await;
    let model = polyprompt::llm::ModelDescriptor::new(
        "not-in-relay",
        "Local Only",
        ProviderKind::OpenAi,
        "openai",
        "http://127.0.0.1:9/unused",
    );

    let result = RelayClient::new(&relay).complete(&model, "hi", "k").await;
    assert_eq!(result.error.as_deref(), Some("Invalid model ID"));
}
