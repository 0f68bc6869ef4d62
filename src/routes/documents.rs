//! Document API endpoints
//!
//! - Load an HTML document (sanitized, then scanned for existing highlights)
//! - Read its rendered text, settings and current HTML
//! - Change the highlight color and auto-highlight mode
//! - Release a selection, which auto-highlights when enabled

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::annotations::Annotation;
use crate::error::{AppError, Result};
use crate::html::TextRange;
use crate::session::{DocumentSession, HighlightColor, SelectionRelease, HIGHLIGHT_PALETTE};
use crate::state::AppState;

/// Create the documents router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(load_document))
        .route("/:id", get(get_document).delete(delete_document))
        .route("/:id/html", get(get_html))
        .route("/:id/settings", put(update_settings))
        .route("/:id/selection", post(release_selection))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadDocumentRequest {
    pub file_name: Option<String>,
    pub html: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadDocumentResponse {
    pub id: String,
    pub file_name: Option<String>,
    pub annotations: Vec<Annotation>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetailResponse {
    pub id: String,
    pub file_name: Option<String>,
    pub text: String,
    pub color: String,
    pub auto_highlight: bool,
    pub annotation_count: usize,
    pub palette: &'static [HighlightColor],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub color: Option<String>,
    pub auto_highlight: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub color: String,
    pub auto_highlight: bool,
}

/// A rendered-text character range
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RangeRequest {
    pub start: usize,
    pub end: usize,
}

impl From<RangeRequest> for TextRange {
    fn from(range: RangeRequest) -> Self {
        TextRange::new(range.start, range.end)
    }
}

#[derive(Serialize)]
pub struct SelectionResponse {
    pub release: SelectionRelease,
    pub annotations: Vec<Annotation>,
}

/// Load a new document
async fn load_document(
    State(state): State<AppState>,
    Json(request): Json<LoadDocumentRequest>,
) -> Result<(StatusCode, Json<LoadDocumentResponse>)> {
    if request.html.trim().is_empty() {
        return Err(AppError::BadRequest("Document HTML is empty".to_string()));
    }

    let session = DocumentSession::load(&request.html, request.file_name.clone(), state.config())?;
    let annotations = session.annotations().to_vec();
    let id = state.insert(session).await;

    tracing::info!("Document '{}' loaded with {} annotations", id, annotations.len());
    Ok((
        StatusCode::CREATED,
        Json(LoadDocumentResponse {
            id,
            file_name: request.file_name,
            annotations,
        }),
    ))
}

/// Get document details by ID
async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetailResponse>> {
    let shared = state.session(&id).await?;
    let session = shared.lock().await;

    Ok(Json(DocumentDetailResponse {
        id,
        file_name: session.file_name().map(str::to_string),
        text: session.rendered_text(),
        color: session.color().to_string(),
        auto_highlight: session.auto_highlight(),
        annotation_count: session.annotations().len(),
        palette: HIGHLIGHT_PALETTE,
    }))
}

/// Current document HTML, annotations included
async fn get_html(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let shared = state.session(&id).await?;
    let html = shared.lock().await.html();
    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html))
}

/// Delete a document
async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.remove(&id).await {
        return Err(AppError::NotFound(format!("Document '{}' not found", id)));
    }

    tracing::info!("Document '{}' deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Update the highlight color and auto-highlight mode
async fn update_settings(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SettingsRequest>,
) -> Result<Json<SettingsResponse>> {
    let shared = state.session(&id).await?;
    let mut session = shared.lock().await;

    if let Some(color) = &request.color {
        if !session.set_color(color) {
            return Err(AppError::BadRequest(format!("Invalid color: {}", color)));
        }
    }
    if let Some(enabled) = request.auto_highlight {
        session.set_auto_highlight(enabled);
    }

    Ok(Json(SettingsResponse {
        color: session.color().to_string(),
        auto_highlight: session.auto_highlight(),
    }))
}

/// Select a range and release it
async fn release_selection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(range): Json<RangeRequest>,
) -> Result<Json<SelectionResponse>> {
    let shared = state.session(&id).await?;
    let mut session = shared.lock().await;

    session.select(range.into());
    let release = session.on_selection_released().await;

    Ok(Json(SelectionResponse {
        release,
        annotations: session.annotations().to_vec(),
    }))
}
