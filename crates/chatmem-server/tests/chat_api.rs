use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chatmem_core::{
    ChatMessage, ChatService, CompletionClient, Embedder, InMemoryTurnStore, MemoryManager, Role,
    EMPTY_MESSAGE_ERROR, GENERIC_ERROR,
};
use chatmem_server::{router, AppState};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

struct FixedEmbedder;

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
    }

    fn dimension(&self) -> usize {
        2
    }
}

struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("embedding endpoint returned 503"))
    }

    fn dimension(&self) -> usize {
        2
    }
}

struct EchoCompletion {
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionClient for EchoCompletion {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("connection timed out"));
        }
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        Ok(format!("You said: {} ({} messages)", last, messages.len()))
    }

    fn model(&self) -> &str {
        "echo"
    }
}

struct TestApp {
    router: Router,
    store: Arc<InMemoryTurnStore>,
    completion: Arc<EchoCompletion>,
}

fn app(fail: bool) -> TestApp {
    let store = Arc::new(InMemoryTurnStore::new());
    let completion = Arc::new(EchoCompletion {
        fail,
        calls: AtomicUsize::new(0),
    });
    let service = ChatService::new(
        MemoryManager::new(store.clone(), Arc::new(FixedEmbedder)),
        completion.clone(),
    );
    TestApp {
        router: router(AppState::new(service)),
        store,
        completion,
    }
}

fn chat_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn chat_returns_reply_and_persists_both_turns() {
    let app = app(false);

    let (status, body) = send(
        &app.router,
        chat_request(r#"{"message":"Hello","session_id":"web-1"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({"response": "You said: Hello (2 messages)"}));

    let turns = app.store.session_turns("web-1").await;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "Hello");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].content, "You said: Hello (2 messages)");
}

#[tokio::test]
async fn second_message_replays_session_memory() {
    let app = app(false);

    send(&app.router, chat_request(r#"{"message":"Hello","session_id":"s"}"#)).await;
    send(&app.router, chat_request(r#"{"message":"Hi","session_id":"other"}"#)).await;
    let (status, body) = send(
        &app.router,
        chat_request(r#"{"message":"How do I fix this bug?","session_id":"s"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    // system + 2 recalled turns of session "s" + new message
    assert_eq!(
        body["response"],
        "You said: How do I fix this bug? (4 messages)"
    );
}

#[tokio::test]
async fn missing_or_empty_message_is_rejected() {
    let app = app(false);

    for body in [r#"{}"#, r#"{"message":""}"#, r#"{"message":"  ","session_id":"x"}"#] {
        let (status, response) = send(&app.router, chat_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let response: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(response, json!({"error": EMPTY_MESSAGE_ERROR}));
    }

    assert_eq!(app.completion.calls.load(Ordering::SeqCst), 0);
    assert!(app.store.turns().await.is_empty());
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let app = app(false);

    let (status, _) = send(&app.router, chat_request("not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.completion.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn completion_failure_returns_generic_error_without_writes() {
    let app = app(true);

    let (status, body) = send(&app.router, chat_request(r#"{"message":"Hello"}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({"error": GENERIC_ERROR}));
    assert!(!body.to_string().contains("timed out"));
    assert!(app.store.turns().await.is_empty());
}

#[tokio::test]
async fn recall_failure_returns_generic_error_without_writes() {
    let store = Arc::new(InMemoryTurnStore::new());
    let completion = Arc::new(EchoCompletion {
        fail: false,
        calls: AtomicUsize::new(0),
    });
    let service = ChatService::new(
        MemoryManager::new(store.clone(), Arc::new(DownEmbedder)),
        completion.clone(),
    );
    let router = router(AppState::new(service));

    let (status, body) = send(&router, chat_request(r#"{"message":"Hello"}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({"error": GENERIC_ERROR}));
    assert!(!body.to_string().contains("503"));
    assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    assert!(store.turns().await.is_empty());
}

#[tokio::test]
async fn event_stream_reply_ends_with_done() {
    let app = app(false);

    let mut request = chat_request(r#"{"message":"Hello there, streaming world"}"#);
    request.headers_mut().insert(
        header::ACCEPT,
        "text/event-stream".parse().unwrap(),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream")));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
        .collect();

    assert_eq!(data.last(), Some(&"[DONE]"));
    let chunks: Vec<String> = data[..data.len() - 1]
        .iter()
        .map(|chunk| serde_json::from_str(chunk).unwrap())
        .collect();
    assert_eq!(
        chunks.concat(),
        "You said: Hello there, streaming world (2 messages)"
    );
    assert!(chunks.iter().all(|c| c.chars().count() <= 12));
    assert_eq!(app.store.turns().await.len(), 2);
}

#[tokio::test]
async fn health_reports_memory_status() {
    let app = app(false);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({"status": "ok", "memory": true}));
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let app = app(false);

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/chat")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
