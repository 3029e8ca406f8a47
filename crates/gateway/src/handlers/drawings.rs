//! Freehand drawing handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{check_page_number, ensure_pdf, SuccessMessage};
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;
use pagemark_common::{
    auth::AuthUser,
    db::{models::Drawing, Repository},
    errors::{AppError, Result},
    metrics,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDrawingRequest {
    pub pdf_uuid: Uuid,

    #[validate(range(min = 1, message = "pageNumber must be at least 1"))]
    pub page_number: i32,

    /// Stroke paths as produced by the client canvas
    pub drawing_data: serde_json::Value,
}

#[derive(Serialize)]
pub struct DrawingResponse {
    pub success: bool,
    pub message: String,
    pub drawing: Drawing,
}

#[derive(Serialize)]
pub struct DrawingListResponse {
    pub success: bool,
    pub count: usize,
    pub drawings: Vec<Drawing>,
}

impl DrawingListResponse {
    fn new(drawings: Vec<Drawing>) -> Self {
        Self {
            success: true,
            count: drawings.len(),
            drawings,
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<CreateDrawingRequest>,
) -> Result<(StatusCode, Json<DrawingResponse>)> {
    request.validate()?;
    if !(request.drawing_data.is_object() || request.drawing_data.is_array()) {
        return Err(AppError::Validation {
            message: "drawingData must be an object or array".to_string(),
            field: Some("drawingData".to_string()),
        });
    }

    let repo = Repository::new(state.db.clone());
    ensure_pdf(&repo, &auth, request.pdf_uuid).await?;

    let drawing = repo
        .create_drawing(
            auth.user_id,
            request.pdf_uuid,
            request.page_number,
            request.drawing_data,
        )
        .await?;

    metrics::record_annotation("drawing", "create");
    tracing::debug!(drawing_id = %drawing.id, page = drawing.page_number, "Drawing saved");

    Ok((
        StatusCode::CREATED,
        Json(DrawingResponse {
            success: true,
            message: "Drawing saved successfully".to_string(),
            drawing,
        }),
    ))
}

/// Every drawing on a PDF, newest first
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(pdf_id): ApiPath<Uuid>,
) -> Result<Json<DrawingListResponse>> {
    let repo = Repository::new(state.db.clone());
    ensure_pdf(&repo, &auth, pdf_id).await?;

    let drawings = repo.list_drawings(auth.user_id, pdf_id, None).await?;

    Ok(Json(DrawingListResponse::new(drawings)))
}

/// Drawings on one page
pub async fn list_page(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((pdf_id, page_number)): ApiPath<(Uuid, i32)>,
) -> Result<Json<DrawingListResponse>> {
    check_page_number(page_number)?;

    let repo = Repository::new(state.db.clone());
    ensure_pdf(&repo, &auth, pdf_id).await?;

    let drawings = repo
        .list_drawings(auth.user_id, pdf_id, Some(page_number))
        .await?;

    Ok(Json(DrawingListResponse::new(drawings)))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(drawing_id): ApiPath<Uuid>,
) -> Result<Json<SuccessMessage>> {
    let repo = Repository::new(state.db.clone());

    if !repo.delete_drawing(auth.user_id, drawing_id).await? {
        return Err(AppError::not_found("Drawing", drawing_id));
    }

    metrics::record_annotation("drawing", "delete");

    Ok(Json(SuccessMessage::new("Drawing deleted successfully")))
}
