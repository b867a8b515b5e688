use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    MalformedRequest(String),

    #[error("Drawing is not a base64 data URL")]
    MalformedDataUrl,

    #[error("Failed to decode drawing: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Failed to read drawing image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to generate images")]
    NoImages,

    #[error("Failed to render page: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Proxy target rejected: {0}")]
    ProxyRejected(String),

    #[error("Proxy upstream failed: {0}")]
    ProxyUpstream(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ProxyRejected(_) => StatusCode::BAD_REQUEST,
            AppError::ProxyUpstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        warn!("Request failed with status {}: {}", status, message);
        (status, Json(json!({ "error": message }))).into_response()
    }
}
