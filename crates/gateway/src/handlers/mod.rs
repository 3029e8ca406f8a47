//! API handlers module

pub mod auth;
pub mod drawings;
pub mod health;
pub mod highlights;
pub mod notes;
pub mod pdfs;

use pagemark_common::{
    auth::AuthUser,
    db::Repository,
    errors::{AppError, Result},
};
use serde::Serialize;
use uuid::Uuid;

/// `{message}` body for operations with nothing else to return
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `{success, message}` body used by the drawing and note routes
#[derive(Debug, Serialize)]
pub struct SuccessMessage {
    pub success: bool,
    pub message: String,
}

impl SuccessMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Run CPU-bound work (hashing, PDF parsing) off the async workers
pub(crate) async fn blocking<F, T>(work: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal {
            message: format!("Blocking task failed: {}", e),
        })
}

/// Page numbers in paths and bodies start at 1
pub(crate) fn check_page_number(page_number: i32) -> Result<()> {
    if page_number < 1 {
        return Err(AppError::Validation {
            message: "pageNumber must be at least 1".to_string(),
            field: Some("pageNumber".to_string()),
        });
    }
    Ok(())
}

/// Annotations may only be attached to, or listed for, the caller's own PDFs
pub(crate) async fn ensure_pdf(repo: &Repository, auth: &AuthUser, pdf_id: Uuid) -> Result<()> {
    match repo.find_pdf(auth.user_id, pdf_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::PdfNotFound {
            id: pdf_id.to_string(),
        }),
    }
}
