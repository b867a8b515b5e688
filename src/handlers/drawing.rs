use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::art::{decode_drawing, extract_colors, generate_prompt};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::timing::start_request_timer;

#[derive(Debug, Deserialize)]
pub struct DrawingRequest {
    pub drawing: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct DrawingResponse {
    pub image_urls: Vec<String>,
    pub reappraisal_text: String,
}

pub async fn process_drawing(
    State(state): State<AppState>,
    payload: Result<Json<DrawingRequest>, JsonRejection>,
) -> Result<Json<DrawingResponse>, AppError> {
    let mut timer = start_request_timer("POST /api/process-drawing", None);
    let result = match payload {
        Ok(Json(request)) => reinterpret(&state, &request).await,
        Err(rejection) => Err(AppError::MalformedRequest(rejection.body_text())),
    };
    timer.observe(&result);
    result.map(Json)
}

async fn reinterpret(state: &AppState, request: &DrawingRequest) -> Result<DrawingResponse, AppError> {
    let image = decode_drawing(&request.drawing)?;
    let colors = extract_colors(&image);
    let prompt = generate_prompt(&request.description, &colors);
    info!("Generated prompt for image model: {}", prompt);

    let image_urls = state
        .gateway
        .generate_images(&prompt, state.config.image_count)
        .await;
    if image_urls.is_empty() {
        return Err(AppError::NoImages);
    }

    let reappraisal_text = state
        .gateway
        .generate_reappraisal_text(&request.description)
        .await;
    info!("Generated reappraisal text: {}", reappraisal_text);

    Ok(DrawingResponse {
        image_urls,
        reappraisal_text,
    })
}
