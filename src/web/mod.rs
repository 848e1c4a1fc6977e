// Web server — Axum transport over the fetch/translate pipelines.
//
// The interesting part is the two /stream endpoints: each spawns its
// orchestrator into a background task with an EventSink and serves the
// receiver as Server-Sent Events. A client that disconnects drops the
// receiver, which flips the run's cancel flag at the next emit — no
// transport details leak into the pipelines.
//
// Runs as a single default owner; multi-user auth is the surrounding
// application's concern, not this crate's.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::db::PostStore;

pub mod handlers;

/// The single owner this deployment serves.
pub const DEFAULT_OWNER: i64 = 1;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PostStore>,
    pub config: Arc<Config>,
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(
    config: Config,
    store: Arc<dyn PostStore>,
    port: u16,
    bind: &str,
) -> Result<()> {
    let state = AppState {
        store,
        config: Arc::new(config),
    };

    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("Magpie listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/accounts", get(handlers::list_accounts))
        .route("/api/threads", get(handlers::get_threads))
        .route("/api/fetch", post(handlers::run_fetch))
        .route("/api/fetch/stream", get(handlers::fetch_stream))
        .route("/api/translate", post(handlers::run_translate))
        .route("/api/translate/stream", get(handlers::translate_stream))
        .route("/api/posts/{id}/translate", post(handlers::translate_post))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Deployment health check — always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
