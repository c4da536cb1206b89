//! The HTTP front end: the page, its script and the JSON API.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::Planner;
use crate::config::ApiStatus;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const SCRIPT: &str = include_str!("../static/script.js");
const EMPTY_QUERY: &str = "Please enter your travel query!";

/// Shared state of the request handlers.
#[derive(Clone)]
pub struct AppState {
    planner: Arc<Planner>,
    status: ApiStatus,
}

impl AppState {
    /// Creates the state.
    #[inline]
    pub fn new(planner: Planner, status: ApiStatus) -> Self {
        Self {
            planner: Arc::new(planner),
            status,
        }
    }
}

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

/// Builds the router with every route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/static/script.js", get(script_handler))
        .route("/api/status", get(status_handler))
        .route("/api/chat", post(chat_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `router` on `listener` until `shutdown` resolves, then lets the
/// in-flight requests finish.
pub async fn serve<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// GET /
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(render_index(state.status))
}

/// GET /static/script.js
async fn script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        SCRIPT,
    )
}

/// GET /api/status
async fn status_handler(State(state): State<AppState>) -> Json<ApiStatus> {
    Json(state.status)
}

/// POST /api/chat
async fn chat_handler(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let query = match body {
        Ok(Json(ChatRequest { query: Some(query) })) => query,
        Ok(_) => String::new(),
        Err(rejection) => {
            debug!("rejected chat request: {rejection}");
            String::new()
        }
    };
    let query = query.trim();
    if query.is_empty() {
        let body = ErrorResponse { error: EMPTY_QUERY };
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    info!(demo = state.planner.is_demo(), "planning a trip");
    let response = state.planner.plan(query).await;
    Json(ChatResponse { response }).into_response()
}

fn render_index(status: ApiStatus) -> String {
    let badge = |ready: bool, ready_text: &str, missing_text: &str| {
        if ready {
            format!(r#"<span class="badge bg-success">{ready_text}</span>"#)
        } else {
            format!(r#"<span class="badge bg-warning text-dark">{missing_text}</span>"#)
        }
    };
    INDEX_TEMPLATE
        .replace(
            "{{OPENAI_STATUS}}",
            &badge(status.openai, "Connected", "Demo mode"),
        )
        .replace(
            "{{SERPER_STATUS}}",
            &badge(status.serper, "Connected", "Using DuckDuckGo"),
        )
        .replace(
            "{{WEATHER_STATUS}}",
            &badge(status.weather, "Connected", "Unavailable"),
        )
}
