//! Relay HTTP API.
//!
//! `GET /health` reports identity and whether the caller's key is valid.
//! `POST /send-message` takes a multipart form (`chat_id`, `message`,
//! `files`) and forwards it to Telegram.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{
        multipart::MultipartRejection, DefaultBodyLimit, FromRequestParts, Multipart, State,
    },
    http::{request::Parts, HeaderMap},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::error::ApiError;
use crate::messenger::Messenger;
use crate::metrics::{self, RequestMetrics};
use crate::relay::{self, Attachment, RelayRequest, RelayResponse};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Telegram bots may upload files up to 50 MB.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared state for the relay router
#[derive(Clone)]
pub struct AppState {
    pub messenger: Arc<dyn Messenger>,
    pub api_key: Arc<str>,
    pub application_name: Arc<str>,
    pub metrics: RequestMetrics,
}

impl AppState {
    pub fn new(config: &Config, messenger: Arc<dyn Messenger>) -> Result<Self> {
        let metrics = RequestMetrics::new().context("Failed to register request metrics")?;
        Ok(Self {
            messenger,
            api_key: config.api.api_key.as_str().into(),
            application_name: config.api.application_name.as_str().into(),
            metrics,
        })
    }
}

/// Constant-time comparison that also hides the expected key's length.
fn key_matches(expected: &str, provided: &str) -> bool {
    let expected = expected.as_bytes();
    let provided = provided.as_bytes();

    let max_len = expected.len().max(provided.len());
    let mut expected_padded = vec![0u8; max_len];
    let mut provided_padded = vec![0u8; max_len];
    expected_padded[..expected.len()].copy_from_slice(expected);
    provided_padded[..provided.len()].copy_from_slice(provided);

    let content_eq: bool = expected_padded.ct_eq(&provided_padded).into();
    content_eq && expected.len() == provided.len()
}

fn is_authenticated(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|provided| key_matches(expected, provided))
}

/// Extractor that admits only callers presenting the shared API key.
///
/// Runs on request parts, so a rejected caller's body is never read.
pub struct ApiKey;

impl FromRequestParts<AppState> for ApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        if is_authenticated(&parts.headers, &state.api_key) {
            Ok(ApiKey)
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub application: String,
    pub version: String,
    pub current_time: String,
    pub authenticated: bool,
}

async fn health(State(state): State<AppState>, headers: HeaderMap) -> Json<HealthResponse> {
    Json(HealthResponse {
        application: state.application_name.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        current_time: chrono::Local::now().to_rfc3339(),
        authenticated: is_authenticated(&headers, &state.api_key),
    })
}

async fn send_message(
    _key: ApiKey,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RelayResponse>, ApiError> {
    let multipart = multipart.map_err(|e| {
        ApiError::BadRequest(format!("Expected multipart form: {}", e.body_text()))
    })?;
    let mut request = read_form(multipart).await?;

    let response = relay::relay(state.messenger.as_ref(), &mut request).await?;
    Ok(Json(response))
}

/// Collect `chat_id`, `message` and `files` parts into a validated request.
async fn read_form(mut multipart: Multipart) -> Result<RelayRequest, ApiError> {
    let mut chat_id = None;
    let mut message = None;
    let mut attachments = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "chat_id" => chat_id = Some(field.text().await?),
            "message" => message = Some(field.text().await?),
            "files" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                // An unselected file input still submits an empty, nameless part
                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                attachments.push(Attachment::new(filename, content_type, data));
            }
            _ => {}
        }
    }

    Ok(RelayRequest::new(chat_id.as_deref(), message, attachments)?)
}

/// Build the relay router around the given state.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/send-message", post(send_message))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            metrics::track_duration,
        ))
        .layer(cors)
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: &Config, messenger: Arc<dyn Messenger>) -> Result<()> {
    let addr = config.socket_addr()?;
    let app = create_app(AppState::new(config, messenger)?);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Relay API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Server error")?;

    Ok(())
}
