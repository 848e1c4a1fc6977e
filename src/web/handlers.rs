// API handlers — JSON single-shot endpoints plus the SSE streaming
// variants of both pipelines.
//
// Each event on the stream carries the event name and a JSON payload,
// exactly as ProgressEvent defines them. The `done` event is terminal;
// a cancelled run simply ends the stream without one.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::error;

use crate::pipeline::fetch::effective_retention;
use crate::pipeline::{CancelFlag, EventSink, FetchOrchestrator, ProgressEvent, TranslationOrchestrator};
use crate::source;
use crate::threads::build_threads;
use crate::translate::AiTranslator;
use crate::web::{api_error, AppState, DEFAULT_OWNER};

// --- Accounts and threads ---

/// GET /api/accounts — the tracked accounts this deployment monitors.
pub async fn list_accounts(State(state): State<AppState>) -> Response {
    match state.store.list_tracked_accounts(DEFAULT_OWNER).await {
        Ok(accounts) => Json(accounts).into_response(),
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct ThreadsQuery {
    pub username: String,
}

/// GET /api/threads?username= — reconstructed threads for one account.
pub async fn get_threads(
    State(state): State<AppState>,
    Query(params): Query<ThreadsQuery>,
) -> Response {
    let account = match state
        .store
        .get_tracked_account(DEFAULT_OWNER, &params.username)
        .await
    {
        Ok(Some(account)) => account,
        Ok(None) => {
            return api_error(
                StatusCode::NOT_FOUND,
                &format!("@{} is not tracked", params.username),
            )
        }
        Err(e) => return api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    };

    let posts = match state.store.posts_for_account(account.id).await {
        Ok(posts) => posts,
        Err(e) => return api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    };

    match build_threads(&posts) {
        Ok(threads) => Json(threads).into_response(),
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

// --- Fetch pipeline ---

/// POST /api/fetch — run a fetch pass and return the final aggregate.
pub async fn run_fetch(State(state): State<AppState>) -> Response {
    let provider = match source::create_provider(&state.config) {
        Ok(provider) => provider,
        Err(e) => return api_error(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let accounts = match state.store.list_tracked_accounts(DEFAULT_OWNER).await {
        Ok(accounts) => accounts,
        Err(e) => return api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    };

    let retention = effective_retention(state.config.retention_days, &accounts);
    let orchestrator = FetchOrchestrator::new(provider, state.store.clone());
    match orchestrator
        .run(
            DEFAULT_OWNER,
            &accounts,
            retention,
            state.config.fetch_limit,
            None,
        )
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// GET /api/fetch/stream — the same run, with per-account SSE progress.
pub async fn fetch_stream(State(state): State<AppState>) -> Response {
    let provider = match source::create_provider(&state.config) {
        Ok(provider) => provider,
        Err(e) => return api_error(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let (sink, rx) = EventSink::channel();
    let store = state.store.clone();
    let config = state.config.clone();

    tokio::spawn(async move {
        let accounts = match store.list_tracked_accounts(DEFAULT_OWNER).await {
            Ok(accounts) => accounts,
            Err(e) => {
                error!(error = %e, "Failed to list tracked accounts");
                return;
            }
        };
        let retention = effective_retention(config.retention_days, &accounts);
        let orchestrator = FetchOrchestrator::new(provider, store);
        if let Err(e) = orchestrator
            .run(
                DEFAULT_OWNER,
                &accounts,
                retention,
                config.fetch_limit,
                Some(&sink),
            )
            .await
        {
            error!(error = %e, "Fetch run failed");
        }
    });

    sse_response(rx).into_response()
}

// --- Translation pipeline ---

#[derive(Deserialize)]
pub struct TranslateQuery {
    /// How many backlog posts to process (default 20)
    pub limit: Option<usize>,
}

/// POST /api/translate — translate the backlog, return the final result.
pub async fn run_translate(
    State(state): State<AppState>,
    Query(params): Query<TranslateQuery>,
) -> Response {
    let translator = match AiTranslator::from_config(&state.config) {
        Ok(translator) => translator,
        Err(e) => return api_error(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let posts = match state
        .store
        .find_untranslated(DEFAULT_OWNER, params.limit.unwrap_or(20))
        .await
    {
        Ok(posts) => posts,
        Err(e) => return api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    };

    let orchestrator = TranslationOrchestrator::new(
        Arc::new(translator),
        state.store.clone(),
        state.config.translate_concurrency,
    );

    match orchestrator
        .run_batch(
            DEFAULT_OWNER,
            &posts,
            None,
            &CancelFlag::new(),
        )
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// GET /api/translate/stream — the same run with per-post SSE progress.
/// Disconnecting cancels the run at the next wave boundary.
pub async fn translate_stream(
    State(state): State<AppState>,
    Query(params): Query<TranslateQuery>,
) -> Response {
    let translator = match AiTranslator::from_config(&state.config) {
        Ok(translator) => translator,
        Err(e) => return api_error(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let (sink, rx) = EventSink::channel();
    let cancel = sink.cancel_flag();
    let store = state.store.clone();
    let concurrency = state.config.translate_concurrency;
    let limit = params.limit.unwrap_or(20);

    tokio::spawn(async move {
        let posts = match store.find_untranslated(DEFAULT_OWNER, limit).await {
            Ok(posts) => posts,
            Err(e) => {
                error!(error = %e, "Failed to load untranslated backlog");
                return;
            }
        };
        let orchestrator =
            TranslationOrchestrator::new(Arc::new(translator), store, concurrency);
        if let Err(e) = orchestrator
            .run_batch(DEFAULT_OWNER, &posts, Some(&sink), &cancel)
            .await
        {
            error!(error = %e, "Translation run failed");
        }
    });

    sse_response(rx).into_response()
}

/// POST /api/posts/{id}/translate — ad-hoc re-translation of one post.
pub async fn translate_post(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let translator = match AiTranslator::from_config(&state.config) {
        Ok(translator) => translator,
        Err(e) => return api_error(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let post = match state.store.get_post(DEFAULT_OWNER, &id).await {
        Ok(Some(post)) => post,
        Ok(None) => return api_error(StatusCode::NOT_FOUND, &format!("post {id} not found")),
        Err(e) => return api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    };

    let orchestrator = TranslationOrchestrator::new(
        Arc::new(translator),
        state.store.clone(),
        state.config.translate_concurrency,
    );

    match orchestrator.translate_one(&post).await {
        Ok(translation) => Json(translation).into_response(),
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

// --- SSE plumbing ---

/// Adapt the progress channel into an SSE response. The stream ends when
/// the orchestrator finishes and drops its sink.
fn sse_response(
    rx: UnboundedReceiver<ProgressEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = UnboundedReceiverStream::new(rx).map(|event| Ok(to_sse_event(&event)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse_event(event: &ProgressEvent) -> Event {
    let base = Event::default().event(event.name());
    match base.json_data(event.payload()) {
        Ok(event) => event,
        // payload() already degraded to Null on serialization trouble, so
        // this branch only guards against axum-level formatting errors
        Err(_) => Event::default().event("error").data("unserializable event"),
    }
}
