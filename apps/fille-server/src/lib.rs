//! HTTP surface for the chat pipeline.
//!
//! `POST /chat/` (and `/chat`) takes `{"message": ...}` and answers with
//! `{"response": ...}` or a failure payload; `GET /health` reports the index.

use anyhow::{anyhow, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use fille_chat::orchestrator::VALIDATION_MESSAGE;
use fille_chat::ChatOrchestrator;
use fille_core::config::{LogFormat, LogSettings, ServerSettings};
use fille_core::{ChatRequest, ChatResponse, FailureKind};

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<ChatOrchestrator>,
}

/// Configure all routes, CORS and request tracing.
pub fn router(orchestrator: Arc<ChatOrchestrator>, settings: &ServerSettings) -> Result<Router> {
    let cors = cors_layer(&settings.cors_origins)?;
    Ok(Router::new()
        .route("/chat/", post(chat))
        .route("/chat", post(chat))
        .route("/health", get(health_check))
        .with_state(ApiState { orchestrator })
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

async fn chat(State(state): State<ApiState>, payload: Result<Json<ChatRequest>, JsonRejection>) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Rejected malformed chat body");
            let body = ChatResponse::failure(FailureKind::Validation, VALIDATION_MESSAGE);
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };
    let response = state.orchestrator.handle(request).await;
    (status_for(&response), Json(response)).into_response()
}

async fn health_check(State(state): State<ApiState>) -> impl IntoResponse {
    let index = state.orchestrator.index();
    Json(json!({
        "status": "ok",
        "corpus_size": index.len(),
        "dimension": index.dim(),
    }))
}

pub fn status_for(response: &ChatResponse) -> StatusCode {
    match response.failure_kind() {
        None => StatusCode::OK,
        Some(FailureKind::Validation) => StatusCode::BAD_REQUEST,
        Some(FailureKind::Upstream) => StatusCode::BAD_GATEWAY,
        Some(FailureKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let values = origins
            .iter()
            .map(|o| HeaderValue::from_str(o).map_err(|e| anyhow!("invalid CORS origin {o:?}: {e}")))
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(values)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600)))
}

/// Install the global subscriber. `RUST_LOG` overrides `log.filter`.
pub fn init_tracing(settings: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    if let Err(e) = installed {
        eprintln!("tracing already initialized: {e}");
    }
}
