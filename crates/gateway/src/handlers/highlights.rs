//! Highlight handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ensure_pdf, MessageResponse};
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;
use pagemark_common::{
    auth::AuthUser,
    db::{models::Highlight, HighlightChanges, NewHighlight, Repository},
    errors::{AppError, Result},
    metrics,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateHighlightRequest {
    pub pdf_uuid: Uuid,

    #[validate(range(min = 1, message = "pageNumber must be at least 1"))]
    pub page_number: i32,

    #[validate(length(min = 1, message = "highlightedText is required"))]
    pub highlighted_text: String,

    #[serde(default)]
    pub position: Option<serde_json::Value>,

    #[serde(default)]
    pub bounding_box: Option<serde_json::Value>,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHighlightRequest {
    #[validate(range(min = 1, message = "pageNumber must be at least 1"))]
    pub page_number: Option<i32>,

    #[validate(length(min = 1, message = "highlightedText cannot be empty"))]
    pub highlighted_text: Option<String>,

    /// `null` clears the stored value
    #[serde(default, deserialize_with = "present")]
    pub position: Option<Option<serde_json::Value>>,

    #[serde(default, deserialize_with = "present")]
    pub bounding_box: Option<Option<serde_json::Value>>,

    pub color: Option<String>,

    #[serde(default, deserialize_with = "present")]
    pub comment: Option<Option<String>>,
}

/// Keeps an explicit `null` apart from an absent field
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Serialize)]
pub struct HighlightResponse {
    pub message: String,
    pub highlight: Highlight,
}

#[derive(Serialize)]
pub struct HighlightListResponse {
    pub highlights: Vec<Highlight>,
}

/// Colors are stored as `#rrggbb`
fn check_color(color: &str) -> Result<()> {
    let hex = color.strip_prefix('#').unwrap_or_default();
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(());
    }

    Err(AppError::Validation {
        message: format!("color must be a hex value like #ffff00, got {:?}", color),
        field: Some("color".to_string()),
    })
}

/// Highlight a span of text on one page
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<CreateHighlightRequest>,
) -> Result<(StatusCode, Json<HighlightResponse>)> {
    request.validate()?;
    if let Some(ref color) = request.color {
        check_color(color)?;
    }

    let repo = Repository::new(state.db.clone());
    ensure_pdf(&repo, &auth, request.pdf_uuid).await?;

    let highlight = repo
        .create_highlight(
            auth.user_id,
            request.pdf_uuid,
            NewHighlight {
                page_number: request.page_number,
                highlighted_text: request.highlighted_text,
                position: request.position,
                bounding_box: request.bounding_box,
                color: request.color,
                comment: request.comment,
            },
        )
        .await?;

    metrics::record_annotation("highlight", "create");
    tracing::debug!(highlight_id = %highlight.id, pdf_id = %highlight.pdf_id, "Highlight created");

    Ok((
        StatusCode::CREATED,
        Json(HighlightResponse {
            message: "Highlight created successfully".to_string(),
            highlight,
        }),
    ))
}

/// All highlights of a PDF, by page then creation time
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(pdf_id): ApiPath<Uuid>,
) -> Result<Json<HighlightListResponse>> {
    let repo = Repository::new(state.db.clone());
    ensure_pdf(&repo, &auth, pdf_id).await?;

    let highlights = repo.list_highlights(auth.user_id, pdf_id).await?;

    Ok(Json(HighlightListResponse { highlights }))
}

/// Change any subset of a highlight's fields
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(highlight_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateHighlightRequest>,
) -> Result<Json<HighlightResponse>> {
    request.validate()?;
    if let Some(ref color) = request.color {
        check_color(color)?;
    }

    let repo = Repository::new(state.db.clone());
    let changes = HighlightChanges {
        page_number: request.page_number,
        highlighted_text: request.highlighted_text,
        position: request.position,
        bounding_box: request.bounding_box,
        color: request.color,
        comment: request.comment,
    };

    let highlight = repo
        .update_highlight(auth.user_id, highlight_id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Highlight", highlight_id))?;

    metrics::record_annotation("highlight", "update");

    Ok(Json(HighlightResponse {
        message: "Highlight updated successfully".to_string(),
        highlight,
    }))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(highlight_id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>> {
    let repo = Repository::new(state.db.clone());

    if !repo.delete_highlight(auth.user_id, highlight_id).await? {
        return Err(AppError::not_found("Highlight", highlight_id));
    }

    metrics::record_annotation("highlight", "delete");

    Ok(Json(MessageResponse::new("Highlight deleted successfully")))
}
