//! Highlights API routes

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::annotations::color::normalize_hex;
use crate::annotations::Annotation;
use crate::error::{AppError, Result};
use crate::html::TextRange;
use crate::state::AppState;

use super::documents::RangeRequest;

/// Create the highlights router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/highlights", post(create_highlight))
        .route("/:id/highlights/remove", post(remove_highlight))
}

#[derive(Debug, Deserialize)]
pub struct HighlightRequest {
    pub start: usize,
    pub end: usize,
    /// Defaults to the document's current color
    pub color: Option<String>,
}

#[derive(Serialize)]
pub struct HighlightResponse {
    /// Elements painted or cleared
    pub elements: usize,
    pub annotations: Vec<Annotation>,
}

/// Paint a range
async fn create_highlight(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<HighlightRequest>,
) -> Result<Json<HighlightResponse>> {
    let color = match &request.color {
        Some(raw) => Some(
            normalize_hex(raw).ok_or_else(|| AppError::BadRequest(format!("Invalid color: {}", raw)))?,
        ),
        None => None,
    };

    let shared = state.session(&id).await?;
    let mut session = shared.lock().await;
    let range = TextRange::new(request.start, request.end);
    let elements = session.highlight_range(range, color.as_deref());

    tracing::debug!("Highlighted {:?} in '{}' ({} elements)", range, id, elements);
    Ok(Json(HighlightResponse {
        elements,
        annotations: session.annotations().to_vec(),
    }))
}

/// Remove paint from a range
async fn remove_highlight(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(range): Json<RangeRequest>,
) -> Result<Json<HighlightResponse>> {
    let shared = state.session(&id).await?;
    let mut session = shared.lock().await;
    let elements = session.remove_range(range.into());

    Ok(Json(HighlightResponse {
        elements,
        annotations: session.annotations().to_vec(),
    }))
}
