//! Sticky note handlers

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
    db::{models::Note, NewNote, NoteChanges, Repository},
    errors::{AppError, Result},
    metrics,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub pdf_uuid: Uuid,

    #[validate(range(min = 1, message = "pageNumber must be at least 1"))]
    pub page_number: i32,

    pub x: f64,

    pub y: f64,

    pub content: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    #[validate(range(min = 1, message = "pageNumber must be at least 1"))]
    pub page_number: Option<i32>,

    pub x: Option<f64>,

    pub y: Option<f64>,

    pub content: Option<String>,
}

#[derive(Serialize)]
pub struct NoteResponse {
    pub success: bool,
    pub note: Note,
}

#[derive(Serialize)]
pub struct NoteListResponse {
    pub success: bool,
    pub notes: Vec<Note>,
}

/// Note positions are page coordinates and cannot be negative
fn check_coordinate(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }

    Err(AppError::Validation {
        message: format!("{} must be a non-negative number", name),
        field: Some(name.to_string()),
    })
}

/// Trimmed note text, rejecting blank notes
fn note_content(content: &str) -> Result<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::Validation {
            message: "Note content is required".to_string(),
            field: Some("content".to_string()),
        });
    }
    Ok(content.to_string())
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<CreateNoteRequest>,
) -> Result<(StatusCode, Json<NoteResponse>)> {
    request.validate()?;
    check_coordinate("x", request.x)?;
    check_coordinate("y", request.y)?;
    let content = note_content(&request.content)?;

    let repo = Repository::new(state.db.clone());
    ensure_pdf(&repo, &auth, request.pdf_uuid).await?;

    let note = repo
        .create_note(
            auth.user_id,
            request.pdf_uuid,
            NewNote {
                page_number: request.page_number,
                x: request.x,
                y: request.y,
                content,
            },
        )
        .await?;

    metrics::record_annotation("note", "create");
    tracing::debug!(note_id = %note.id, page = note.page_number, "Note created");

    Ok((
        StatusCode::CREATED,
        Json(NoteResponse {
            success: true,
            note,
        }),
    ))
}

/// Every note on a PDF, newest first
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(pdf_id): ApiPath<Uuid>,
) -> Result<Json<NoteListResponse>> {
    let repo = Repository::new(state.db.clone());
    ensure_pdf(&repo, &auth, pdf_id).await?;

    let notes = repo.list_notes(auth.user_id, pdf_id, None).await?;

    Ok(Json(NoteListResponse {
        success: true,
        notes,
    }))
}

/// Notes on one page
pub async fn list_page(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((pdf_id, page_number)): ApiPath<(Uuid, i32)>,
) -> Result<Json<NoteListResponse>> {
    check_page_number(page_number)?;

    let repo = Repository::new(state.db.clone());
    ensure_pdf(&repo, &auth, pdf_id).await?;

    let notes = repo
        .list_notes(auth.user_id, pdf_id, Some(page_number))
        .await?;

    Ok(Json(NoteListResponse {
        success: true,
        notes,
    }))
}

/// Move a note or change its text
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(note_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateNoteRequest>,
) -> Result<Json<NoteResponse>> {
    request.validate()?;
    if let Some(x) = request.x {
        check_coordinate("x", x)?;
    }
    if let Some(y) = request.y {
        check_coordinate("y", y)?;
    }
    let content = request.content.as_deref().map(note_content).transpose()?;

    let repo = Repository::new(state.db.clone());
    let changes = NoteChanges {
        page_number: request.page_number,
        x: request.x,
        y: request.y,
        content,
    };

    let note = repo
        .update_note(auth.user_id, note_id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Note", note_id))?;

    metrics::record_annotation("note", "update");

    Ok(Json(NoteResponse {
        success: true,
        note,
    }))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(note_id): ApiPath<Uuid>,
) -> Result<Json<SuccessMessage>> {
    let repo = Repository::new(state.db.clone());

    if !repo.delete_note(auth.user_id, note_id).await? {
        return Err(AppError::not_found("Note", note_id));
    }

    metrics::record_annotation("note", "delete");

    Ok(Json(SuccessMessage::new("Note deleted successfully")))
}
