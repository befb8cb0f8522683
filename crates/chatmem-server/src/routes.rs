//! HTTP routes: `POST /chat` and `GET /health`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chatmem_core::ChatRequest;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::stream::reply_event_stream;
use crate::AppState;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    memory: bool,
}

/// Create the service router with shared state
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"))
}

/// Chat handler - answers with JSON, or SSE when the client asks for it
async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected chat request body: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, &rejection.body_text());
        }
    };

    match state.chat.chat(request).await {
        Ok(reply) if wants_event_stream(&headers) => {
            reply_event_stream(&reply.response).into_response()
        }
        Ok(reply) => Json(reply).into_response(),
        Err(e) if e.is_client_error() => {
            warn!("Invalid chat request: {}", e);
            error_response(StatusCode::BAD_REQUEST, e.public_message())
        }
        Err(e) => {
            error!("Error occurred: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.public_message())
        }
    }
}

/// Health check handler - reports whether the memory store is reachable
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let memory = match state.chat.memory().health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            warn!("Memory health check failed: {:#}", e);
            false
        }
    };

    Json(HealthResponse {
        status: "ok",
        memory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_wants_event_stream() {
        let mut headers = HeaderMap::new();
        assert!(!wants_event_stream(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(!wants_event_stream(&headers));

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream, */*"),
        );
        assert!(wants_event_stream(&headers));
    }
}
