// HTTP API: health, metrics and frame analysis

use crate::metrics::Metrics;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use eyes_core::AnalysisResult;
use eyes_vision::{VisionError, VisionPipeline};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info_span, warn, Instrument, Span};
use uuid::Uuid;

/// Multipart field carrying the frame
pub const IMAGE_FIELD: &str = "image";

// API state
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<VisionPipeline>,
    pub metrics: Arc<Metrics>,
    pub max_upload_bytes: usize,
}

impl ApiState {
    pub fn new(pipeline: Arc<VisionPipeline>, metrics: Arc<Metrics>, max_upload_bytes: usize) -> Self {
        Self {
            pipeline,
            metrics,
            max_upload_bytes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Request failure as seen by the client
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    ModelUnavailable(String),

    #[error("{0}")]
    Inference(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            ApiError::Inference(_) => "INFERENCE_FAILURE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Inference(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client; internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::InvalidInput(msg) | ApiError::PayloadTooLarge(msg) => msg.clone(),
            ApiError::ModelUnavailable(_) => "Vision models are not available".to_string(),
            ApiError::Inference(_) => "Frame analysis failed".to_string(),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<VisionError> for ApiError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            VisionError::ModelUnavailable(msg) => ApiError::ModelUnavailable(msg),
            VisionError::Inference(msg) => ApiError::Inference(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge("Upload exceeds the size limit".to_string())
        } else {
            ApiError::InvalidInput(format!("Malformed multipart body: {}", err.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed ({}): {}", self.code(), self);
        } else {
            warn!("Rejected request ({}): {}", self.code(), self);
        }

        let body = Json(ErrorResponse {
            error: self.public_message(),
            code: self.code().to_string(),
        });
        (status, body).into_response()
    }
}

/// Create HTTP router with all API routes
pub fn create_router(state: ApiState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health_handler))
        // Metrics (Prometheus format)
        .route("/metrics", get(metrics_handler))
        .route("/api/analyze", post(analyze_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn metrics_handler(State(state): State<ApiState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.get_prometheus_metrics(),
    )
}

/// Analyze one uploaded frame
async fn analyze_handler(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("analyze", %request_id);

    let pipeline = state.pipeline.clone();

    let outcome = async move {
        let multipart = multipart.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
        let bytes = read_image_field(multipart).await?;

        let span = Span::current();
        tokio::task::spawn_blocking(move || span.in_scope(|| pipeline.analyze(&bytes)))
            .await
            .map_err(|e| ApiError::Internal(format!("Analysis task failed: {}", e)))?
            .map_err(ApiError::from)
    }
    .instrument(span)
    .await;

    match outcome {
        Ok(result) => {
            state.metrics.record_success(&result);
            Ok(Json(result))
        }
        Err(err) => {
            state.metrics.record_failure(err.code());
            Err(err)
        }
    }
}

/// Pull the bytes of the `image` field, skipping any other fields.
async fn read_image_field(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field.bytes().await?;
            if bytes.is_empty() {
                return Err(ApiError::InvalidInput("The 'image' field is empty".to_string()));
            }
            return Ok(bytes.to_vec());
        }
    }

    Err(ApiError::InvalidInput(format!(
        "Missing '{}' field in multipart form",
        IMAGE_FIELD
    )))
}
