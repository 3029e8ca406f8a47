//! PDF management handlers

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, EXPIRES, PRAGMA},
        StatusCode,
    },
    response::Response,
    Json,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use super::{blocking, MessageResponse};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;
use pagemark_common::{
    auth::AuthUser,
    db::{models::Pdf, Repository},
    errors::{AppError, Result},
    metrics,
    pdf::{self, PageMatch},
    storage,
};

/// Multipart field carrying the upload
const UPLOAD_FIELD: &str = "pdf";

const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedPdf {
    pub uuid: Uuid,
    pub filename: String,
    pub file_size: i64,
    pub page_count: Option<i32>,
    pub uploaded_at: DateTime<FixedOffset>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub pdf: UploadedPdf,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfSummary {
    pub uuid: Uuid,
    pub original_name: String,
    pub file_size: i64,
    pub page_count: Option<i32>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<Pdf> for PdfSummary {
    fn from(pdf: Pdf) -> Self {
        Self {
            uuid: pdf.id,
            original_name: pdf.original_name,
            file_size: pdf.file_size,
            page_count: pdf.page_count,
            created_at: pdf.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ListResponse {
    pub pdfs: Vec<PdfSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    #[serde(default)]
    pub new_name: String,
}

#[derive(Serialize)]
pub struct RenamedPdf {
    pub uuid: Uuid,
    pub filename: String,
}

#[derive(Serialize)]
pub struct RenameResponse {
    pub message: String,
    pub pdf: RenamedPdf,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfHealthResponse {
    pub uuid: Uuid,
    pub filename: String,
    pub file_exists: bool,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_match: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum_match: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub total_matches: usize,
    pub results: Vec<PageMatch>,
}

async fn owned_pdf(repo: &Repository, auth: &AuthUser, id: Uuid) -> Result<Pdf> {
    repo.find_pdf(auth.user_id, id)
        .await?
        .ok_or_else(|| AppError::PdfNotFound { id: id.to_string() })
}

/// `inline; filename="..."` with characters that cannot appear in a
/// quoted header value replaced
fn inline_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    format!("inline; filename=\"{}\"", safe)
}

/// Accept a PDF from the `pdf` multipart field and store it
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let limit = state.config.storage.max_upload_bytes;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::from_multipart(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field
            .file_name()
            .map(str::to_owned)
            .unwrap_or_else(|| "document.pdf".to_owned());
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::from_multipart(e, limit))?;

        upload = Some((original_name, content_type, bytes));
        break;
    }

    let Some((original_name, content_type, bytes)) = upload else {
        return Err(AppError::MissingField {
            field: UPLOAD_FIELD.to_string(),
            message: "No file uploaded".to_string(),
        });
    };

    if bytes.len() > limit {
        return Err(AppError::PayloadTooLarge { limit });
    }

    if content_type.as_deref() != Some(PDF_CONTENT_TYPE) || !pdf::looks_like_pdf(&bytes) {
        return Err(AppError::InvalidFormat {
            message: "Only PDF files are allowed".to_string(),
        });
    }

    let inspected = bytes.clone();
    let (page_count, checksum) =
        blocking(move || (pdf::page_count(&inspected), storage::checksum(&inspected))).await?;

    let id = Uuid::new_v4();
    let key = storage::generate_key(&original_name);
    state.store.put(&key, &bytes).await?;

    let repo = Repository::new(state.db.clone());
    let record = repo
        .create_pdf(
            id,
            auth.user_id,
            key.clone(),
            original_name,
            bytes.len() as i64,
            page_count.map(|count| count as i32),
            checksum,
        )
        .await;

    let record = match record {
        Ok(record) => record,
        Err(e) => {
            // Do not leave an orphaned file behind
            if let Err(cleanup) = state.store.delete(&key).await {
                tracing::warn!(key = %key, error = %cleanup, "Failed to remove file after insert error");
            }
            return Err(e);
        }
    };

    metrics::record_upload(bytes.len() as u64);

    tracing::info!(
        pdf_id = %record.id,
        user_id = %auth.user_id,
        size = record.file_size,
        pages = ?record.page_count,
        "PDF uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "PDF uploaded successfully".to_string(),
            pdf: UploadedPdf {
                uuid: record.id,
                filename: record.original_name,
                file_size: record.file_size,
                page_count: record.page_count,
                uploaded_at: record.created_at,
            },
        }),
    ))
}

/// List the caller's PDFs, newest first
pub async fn list(State(state): State<AppState>, auth: AuthUser) -> Result<Json<ListResponse>> {
    let repo = Repository::new(state.db.clone());
    let pdfs = repo.list_pdfs(auth.user_id).await?;

    Ok(Json(ListResponse {
        pdfs: pdfs.into_iter().map(PdfSummary::from).collect(),
    }))
}

/// Stream the raw PDF bytes
pub async fn get_pdf(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(pdf_id): ApiPath<Uuid>,
) -> Result<Response> {
    let repo = Repository::new(state.db.clone());
    let pdf = owned_pdf(&repo, &auth, pdf_id).await?;

    let file = state.store.open(&pdf.stored_name).await?.ok_or_else(|| {
        tracing::warn!(pdf_id = %pdf.id, key = %pdf.stored_name, "PDF record has no file on disk");
        AppError::FileNotFound {
            key: pdf.stored_name.clone(),
        }
    })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, PDF_CONTENT_TYPE)
        .header(CONTENT_LENGTH, file.len)
        .header(CONTENT_DISPOSITION, inline_disposition(&pdf.original_name))
        .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(PRAGMA, "no-cache")
        .header(EXPIRES, "0")
        .body(Body::from_stream(file.stream))
        .map_err(|e| AppError::Internal {
            message: format!("Failed to build PDF response: {}", e),
        })
}

/// Delete a PDF, its annotations and its file
pub async fn delete_pdf(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(pdf_id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>> {
    let repo = Repository::new(state.db.clone());
    let pdf = owned_pdf(&repo, &auth, pdf_id).await?;

    let removed = repo
        .delete_pdf_cascade(auth.user_id, pdf_id)
        .await?
        .ok_or_else(|| AppError::PdfNotFound {
            id: pdf_id.to_string(),
        })?;

    match state.store.delete(&pdf.stored_name).await {
        Ok(true) => {}
        Ok(false) => tracing::warn!(key = %pdf.stored_name, "Stored file was already missing"),
        Err(e) => tracing::warn!(key = %pdf.stored_name, error = %e, "Failed to remove stored file"),
    }

    tracing::info!(
        pdf_id = %pdf_id,
        user_id = %auth.user_id,
        highlights = removed.highlights,
        drawings = removed.drawings,
        notes = removed.notes,
        "PDF deleted"
    );

    Ok(Json(MessageResponse::new("PDF deleted successfully")))
}

/// Change the display name
pub async fn rename(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(pdf_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<RenameRequest>,
) -> Result<Json<RenameResponse>> {
    let new_name = request.new_name.trim();
    if new_name.is_empty() {
        return Err(AppError::Validation {
            message: "Invalid name provided".to_string(),
            field: Some("newName".to_string()),
        });
    }

    let repo = Repository::new(state.db.clone());
    let pdf = repo
        .rename_pdf(auth.user_id, pdf_id, new_name.to_string())
        .await?
        .ok_or_else(|| AppError::PdfNotFound {
            id: pdf_id.to_string(),
        })?;

    tracing::info!(pdf_id = %pdf.id, "PDF renamed");

    Ok(Json(RenameResponse {
        message: "PDF renamed successfully".to_string(),
        pdf: RenamedPdf {
            uuid: pdf.id,
            filename: pdf.original_name,
        },
    }))
}

/// Compare the stored file against its database record
pub async fn health(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(pdf_id): ApiPath<Uuid>,
) -> Result<Json<PdfHealthResponse>> {
    let repo = Repository::new(state.db.clone());
    let pdf = owned_pdf(&repo, &auth, pdf_id).await?;

    let mut report = PdfHealthResponse {
        uuid: pdf.id,
        filename: pdf.original_name.clone(),
        file_exists: false,
        file_path: state.store.locate(&pdf.stored_name),
        file_size: None,
        database_size: None,
        size_match: None,
        checksum_match: None,
    };

    if let Some(bytes) = state.store.read(&pdf.stored_name).await? {
        let file_size = bytes.len() as u64;
        let checksum = blocking(move || storage::checksum(&bytes)).await?;

        report.file_exists = true;
        report.file_size = Some(file_size);
        report.database_size = Some(pdf.file_size);
        report.size_match = Some(file_size as i64 == pdf.file_size);
        report.checksum_match = Some(checksum == pdf.checksum);
    }

    Ok(Json(report))
}

/// Find the pages containing a phrase
pub async fn search(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(pdf_id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let query = params.q.trim().to_string();
    if query.is_empty() {
        return Err(AppError::Validation {
            message: "Search query is required".to_string(),
            field: Some("q".to_string()),
        });
    }

    let repo = Repository::new(state.db.clone());
    let record = owned_pdf(&repo, &auth, pdf_id).await?;

    let bytes = state
        .store
        .read(&record.stored_name)
        .await?
        .ok_or_else(|| AppError::FileNotFound {
            key: record.stored_name.clone(),
        })?;

    let start = Instant::now();
    let needle = query.clone();
    let results = blocking(move || {
        pdf::page_texts(&bytes).map(|pages| pdf::search_pages(&pages, &needle))
    })
    .await?
    .map_err(|e| AppError::InvalidFormat {
        message: format!("Could not read PDF text: {}", e),
    })?;

    metrics::record_search(start.elapsed().as_secs_f64(), results.len());

    let total_matches: usize = results.iter().map(|page| page.match_count).sum();

    tracing::debug!(pdf_id = %pdf_id, pages = results.len(), total_matches, "PDF searched");

    Ok(Json(SearchResponse {
        query,
        total_matches,
        results,
    }))
}
