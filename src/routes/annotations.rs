//! Annotation API routes
//!
//! Listing, comments, deletion, and export/import of annotation files.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::anchor::ImportSummary;
use crate::annotations::{Annotation, AnnotationQuery};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the annotations router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/annotations", get(list_annotations).delete(clear_annotations))
        .route("/:id/annotations/:annotation_id", delete(delete_annotation))
        .route("/:id/annotations/:annotation_id/comment", put(update_comment))
        .route("/:id/export", get(export_annotations))
        .route("/:id/import", post(import_annotations))
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub comment: String,
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

#[derive(Serialize)]
pub struct ImportResponse {
    #[serde(flatten)]
    pub summary: ImportSummary,
    pub annotations: Vec<Annotation>,
}

/// List annotations, optionally filtered by text or color
async fn list_annotations(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AnnotationQuery>,
) -> Result<Json<Vec<Annotation>>> {
    let shared = state.session(&id).await?;
    let session = shared.lock().await;
    Ok(Json(session.filtered(&query)))
}

/// Set or clear a comment
async fn update_comment(
    State(state): State<AppState>,
    Path((id, annotation_id)): Path<(String, String)>,
    Json(request): Json<CommentRequest>,
) -> Result<Json<Annotation>> {
    let shared = state.session(&id).await?;
    let mut session = shared.lock().await;

    if !session.update_comment(&annotation_id, &request.comment) {
        return Err(AppError::NotFound(format!(
            "Annotation not found: {}",
            annotation_id
        )));
    }

    let annotation = session
        .annotations()
        .iter()
        .find(|a| a.id == annotation_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Annotation not found: {}", annotation_id)))?;
    Ok(Json(annotation))
}

/// Delete one annotation
async fn delete_annotation(
    State(state): State<AppState>,
    Path((id, annotation_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let shared = state.session(&id).await?;
    let mut session = shared.lock().await;

    if session.delete(&annotation_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "Annotation not found: {}",
            annotation_id
        )))
    }
}

/// Delete every annotation in the document
async fn clear_annotations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClearResponse>> {
    let shared = state.session(&id).await?;
    let cleared = shared.lock().await.clear_all();

    tracing::info!("Cleared {} annotations from '{}'", cleared, id);
    Ok(Json(ClearResponse { cleared }))
}

/// Export annotations as a downloadable file
async fn export_annotations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let shared = state.session(&id).await?;
    let session = shared.lock().await;

    let file = session.export();
    let disposition = format!("attachment; filename=\"{}\"", session.export_file_name());

    Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(file)))
}

/// Re-anchor an exported annotation file into the document
async fn import_annotations(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: String,
) -> Result<Json<ImportResponse>> {
    let shared = state.session(&id).await?;
    let mut session = shared.lock().await;

    let summary = session.import_json(&body)?;
    tracing::info!(
        "Imported {} of {} annotations into '{}'",
        summary.imported,
        summary.total,
        id
    );

    Ok(Json(ImportResponse {
        summary,
        annotations: session.annotations().to_vec(),
    }))
}
