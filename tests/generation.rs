//! Tests for the HTTP generation client against a fake model server.

mod common;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use parking_lot::Mutex;
use pdf_brief::config::LlmConfig;
use pdf_brief::error::Error;
use pdf_brief::llm::{Generator, LlmClient, LlmError, OllamaGenerator};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
enum Behavior {
    Reply(Value),
    Fail,
    Stall(Duration),
}

#[derive(Clone)]
struct FakeModel {
    behavior: Behavior,
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn handle_generate(
    State(fake): State<FakeModel>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.requests.lock().push(body);
    match fake.behavior {
        Behavior::Reply(reply) => (StatusCode::OK, Json(reply)),
        Behavior::Fail => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "model not loaded" })),
        ),
        Behavior::Stall(delay) => {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, Json(json!({ "response": "too late" })))
        }
    }
}

/// Serves `/api/generate` on a free port and returns its config and the
/// recorded request bodies.
async fn start_fake(behavior: Behavior, timeout_secs: u64) -> (LlmConfig, Arc<Mutex<Vec<Value>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let fake = FakeModel {
        behavior,
        requests: requests.clone(),
    };
    let router = Router::new()
        .route("/api/generate", post(handle_generate))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let config = LlmConfig {
        url: format!("http://{}/api/generate", addr),
        model: "llama2".to_string(),
        max_tokens: 64,
        timeout_secs,
    };
    (config, requests)
}

#[tokio::test]
async fn request_body_follows_generate_contract() {
    let (config, requests) =
        start_fake(Behavior::Reply(json!({ "response": "A short summary." })), 5).await;
    let generator = OllamaGenerator::new(&config).unwrap();

    let text = generator.generate("Summarize this", 64).await.unwrap();
    assert_eq!(text, "A short summary.");

    let requests = requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0],
        json!({
            "model": "llama2",
            "prompt": "Summarize this",
            "options": { "num_predict": 64 },
            "stream": false,
        })
    );
}

#[tokio::test]
async fn client_sends_summarize_prompt() {
    let (config, requests) = start_fake(Behavior::Reply(json!({ "response": "ok" })), 5).await;
    let generator = Arc::new(OllamaGenerator::new(&config).unwrap());
    let client = LlmClient::new(generator, config.max_tokens);

    assert_eq!(client.model_name(), "llama2");
    client.summarize("document body").await.unwrap();

    let requests = requests.lock();
    assert_eq!(
        requests[0]["prompt"],
        "Summarize the following document in a concise paragraph:\n\ndocument body"
    );
}

#[tokio::test]
async fn missing_response_field_is_empty_text() {
    let (config, _) = start_fake(Behavior::Reply(json!({ "done": true })), 5).await;
    let generator = OllamaGenerator::new(&config).unwrap();

    assert_eq!(generator.generate("prompt", 16).await.unwrap(), "");
}

#[tokio::test]
async fn error_status_is_upstream_failure() {
    let (config, requests) = start_fake(Behavior::Fail, 5).await;
    let generator = Arc::new(OllamaGenerator::new(&config).unwrap());

    let err = generator.generate("prompt", 16).await.unwrap_err();
    match &err {
        LlmError::Status { status, body } => {
            assert_eq!(*status, 500);
            assert!(body.contains("model not loaded"));
        }
        other => panic!("expected status error, got {:?}", other),
    }

    let client = LlmClient::new(generator, 16);
    let err = client.answer("doc", "question?").await.unwrap_err();
    assert!(matches!(err, Error::Upstream(_)), "got {:?}", err);
    assert_eq!(err.code(), "upstream_error");

    // One attempt per call.
    assert_eq!(requests.lock().len(), 2);
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let (config, _) = start_fake(Behavior::Stall(Duration::from_secs(5)), 1).await;
    let generator = Arc::new(OllamaGenerator::new(&config).unwrap());

    let err = generator.generate("prompt", 16).await.unwrap_err();
    assert!(matches!(err, LlmError::Timeout(1)), "got {:?}", err);

    let client = LlmClient::new(generator, 16);
    let err = client.summarize("doc").await.unwrap_err();
    assert!(matches!(err, Error::UpstreamTimeout(1)));
}

#[tokio::test]
async fn unreachable_endpoint_is_transport_error() {
    let port = common::find_free_port();
    let config = LlmConfig {
        url: format!("http://127.0.0.1:{}/api/generate", port),
        model: "llama2".to_string(),
        max_tokens: 16,
        timeout_secs: 5,
    };
    let generator = OllamaGenerator::new(&config).unwrap();

    let err = generator.generate("prompt", 16).await.unwrap_err();
    assert!(matches!(err, LlmError::Transport(_)), "got {:?}", err);
}
