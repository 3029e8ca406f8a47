//! Repository pattern for database operations
//!
//! Every PDF and annotation query is scoped by owner, so a caller can never
//! read or change another user's records by guessing an id.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

/// Message for a registration whose email is already taken
pub const DUPLICATE_EMAIL: &str = "An account with this email already exists";

/// Fields for a new highlight
#[derive(Debug, Clone)]
pub struct NewHighlight {
    pub page_number: i32,
    pub highlighted_text: String,
    pub position: Option<serde_json::Value>,
    pub bounding_box: Option<serde_json::Value>,
    pub color: Option<String>,
    pub comment: Option<String>,
}

/// Partial highlight update; `None` leaves the field unchanged
///
/// The nullable fields take `Some(None)` to clear the stored value.
#[derive(Debug, Clone, Default)]
pub struct HighlightChanges {
    pub page_number: Option<i32>,
    pub highlighted_text: Option<String>,
    pub position: Option<Option<serde_json::Value>>,
    pub bounding_box: Option<Option<serde_json::Value>>,
    pub color: Option<String>,
    pub comment: Option<Option<String>>,
}

/// Fields for a new note
#[derive(Debug, Clone)]
pub struct NewNote {
    pub page_number: i32,
    pub x: f64,
    pub y: f64,
    pub content: String,
}

/// Partial note update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default)]
pub struct NoteChanges {
    pub page_number: Option<i32>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub content: Option<String>,
}

/// Row counts removed by a cascading PDF delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeCounts {
    pub highlights: u64,
    pub drawings: u64,
    pub notes: u64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a new user; `email` is expected to be normalized already
    ///
    /// A concurrent registration that wins the race on the unique email
    /// index surfaces as `AppError::Duplicate`.
    pub async fn create_user(&self, name: String, email: String, password_hash: String) -> Result<User> {
        let now = Utc::now();

        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            email: Set(email),
            password_hash: Set(password_hash),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        user.insert(self.write_conn())
            .await
            .map_err(|e| AppError::from_insert(e, DUPLICATE_EMAIL))
    }

    /// Find user by ID
    pub async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find user by normalized email
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // PDF Operations
    // ========================================================================

    /// Record an uploaded PDF
    #[allow(clippy::too_many_arguments)]
    pub async fn create_pdf(
        &self,
        id: Uuid,
        owner_id: Uuid,
        stored_name: String,
        original_name: String,
        file_size: i64,
        page_count: Option<i32>,
        checksum: String,
    ) -> Result<Pdf> {
        let now = Utc::now();

        let pdf = PdfActiveModel {
            id: Set(id),
            owner_id: Set(owner_id),
            stored_name: Set(stored_name),
            original_name: Set(original_name),
            file_size: Set(file_size),
            page_count: Set(page_count),
            checksum: Set(checksum),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        pdf.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find a PDF owned by the given user
    pub async fn find_pdf(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Pdf>> {
        PdfEntity::find_by_id(id)
            .filter(PdfColumn::OwnerId.eq(owner_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List a user's PDFs, newest first
    pub async fn list_pdfs(&self, owner_id: Uuid) -> Result<Vec<Pdf>> {
        PdfEntity::find()
            .filter(PdfColumn::OwnerId.eq(owner_id))
            .order_by_desc(PdfColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Change the display name; returns `None` if the PDF is not the user's
    pub async fn rename_pdf(&self, owner_id: Uuid, id: Uuid, new_name: String) -> Result<Option<Pdf>> {
        let Some(pdf) = PdfEntity::find_by_id(id)
            .filter(PdfColumn::OwnerId.eq(owner_id))
            .one(self.write_conn())
            .await?
        else {
            return Ok(None);
        };

        let mut pdf = pdf.into_active_model();
        pdf.original_name = Set(new_name);
        pdf.updated_at = Set(Utc::now().into());

        Ok(Some(pdf.update(self.write_conn()).await?))
    }

    /// Delete a PDF record together with all of its annotations
    ///
    /// Returns `None` when the PDF does not exist for this owner.
    pub async fn delete_pdf_cascade(&self, owner_id: Uuid, id: Uuid) -> Result<Option<CascadeCounts>> {
        let txn = self.write_conn().begin().await?;

        let exists = PdfEntity::find_by_id(id)
            .filter(PdfColumn::OwnerId.eq(owner_id))
            .one(&txn)
            .await?
            .is_some();

        if !exists {
            txn.rollback().await?;
            return Ok(None);
        }

        let highlights = HighlightEntity::delete_many()
            .filter(HighlightColumn::PdfId.eq(id))
            .filter(HighlightColumn::OwnerId.eq(owner_id))
            .exec(&txn)
            .await?
            .rows_affected;

        let drawings = DrawingEntity::delete_many()
            .filter(DrawingColumn::PdfId.eq(id))
            .filter(DrawingColumn::OwnerId.eq(owner_id))
            .exec(&txn)
            .await?
            .rows_affected;

        let notes = NoteEntity::delete_many()
            .filter(NoteColumn::PdfId.eq(id))
            .filter(NoteColumn::OwnerId.eq(owner_id))
            .exec(&txn)
            .await?
            .rows_affected;

        PdfEntity::delete_many()
            .filter(PdfColumn::Id.eq(id))
            .filter(PdfColumn::OwnerId.eq(owner_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        Ok(Some(CascadeCounts {
            highlights,
            drawings,
            notes,
        }))
    }

    // ========================================================================
    // Highlight Operations
    // ========================================================================

    /// Create a highlight on a PDF the caller owns
    pub async fn create_highlight(&self, owner_id: Uuid, pdf_id: Uuid, input: NewHighlight) -> Result<Highlight> {
        let now = Utc::now();

        let highlight = HighlightActiveModel {
            id: Set(Uuid::new_v4()),
            pdf_id: Set(pdf_id),
            owner_id: Set(owner_id),
            page_number: Set(input.page_number),
            highlighted_text: Set(input.highlighted_text),
            position: Set(input.position),
            bounding_box: Set(input.bounding_box),
            color: Set(input.color.unwrap_or_else(|| DEFAULT_COLOR.to_string())),
            comment: Set(input.comment),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        highlight.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Highlights of a PDF ordered by page, then creation time
    pub async fn list_highlights(&self, owner_id: Uuid, pdf_id: Uuid) -> Result<Vec<Highlight>> {
        HighlightEntity::find()
            .filter(HighlightColumn::PdfId.eq(pdf_id))
            .filter(HighlightColumn::OwnerId.eq(owner_id))
            .order_by_asc(HighlightColumn::PageNumber)
            .order_by_asc(HighlightColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Apply a partial update to one of the caller's highlights
    pub async fn update_highlight(
        &self,
        owner_id: Uuid,
        id: Uuid,
        changes: HighlightChanges,
    ) -> Result<Option<Highlight>> {
        let Some(highlight) = HighlightEntity::find_by_id(id)
            .filter(HighlightColumn::OwnerId.eq(owner_id))
            .one(self.write_conn())
            .await?
        else {
            return Ok(None);
        };

        let mut highlight = highlight.into_active_model();
        if let Some(page_number) = changes.page_number {
            highlight.page_number = Set(page_number);
        }
        if let Some(text) = changes.highlighted_text {
            highlight.highlighted_text = Set(text);
        }
        if let Some(position) = changes.position {
            highlight.position = Set(position);
        }
        if let Some(bounding_box) = changes.bounding_box {
            highlight.bounding_box = Set(bounding_box);
        }
        if let Some(color) = changes.color {
            highlight.color = Set(color);
        }
        if let Some(comment) = changes.comment {
            highlight.comment = Set(comment);
        }
        highlight.updated_at = Set(Utc::now().into());

        Ok(Some(highlight.update(self.write_conn()).await?))
    }

    /// Delete one of the caller's highlights; false if it did not exist
    pub async fn delete_highlight(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let result = HighlightEntity::delete_many()
            .filter(HighlightColumn::Id.eq(id))
            .filter(HighlightColumn::OwnerId.eq(owner_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Drawing Operations
    // ========================================================================

    /// Store a drawing payload for a page
    pub async fn create_drawing(
        &self,
        owner_id: Uuid,
        pdf_id: Uuid,
        page_number: i32,
        drawing_data: serde_json::Value,
    ) -> Result<Drawing> {
        let drawing = DrawingActiveModel {
            id: Set(Uuid::new_v4()),
            pdf_id: Set(pdf_id),
            owner_id: Set(owner_id),
            page_number: Set(page_number),
            drawing_data: Set(drawing_data),
            created_at: Set(Utc::now().into()),
        };

        drawing.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Drawings of a PDF, optionally for one page, newest first
    pub async fn list_drawings(&self, owner_id: Uuid, pdf_id: Uuid, page_number: Option<i32>) -> Result<Vec<Drawing>> {
        let mut query = DrawingEntity::find()
            .filter(DrawingColumn::PdfId.eq(pdf_id))
            .filter(DrawingColumn::OwnerId.eq(owner_id));

        if let Some(page) = page_number {
            query = query.filter(DrawingColumn::PageNumber.eq(page));
        }

        query
            .order_by_desc(DrawingColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Delete one of the caller's drawings
    pub async fn delete_drawing(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let result = DrawingEntity::delete_many()
            .filter(DrawingColumn::Id.eq(id))
            .filter(DrawingColumn::OwnerId.eq(owner_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Note Operations
    // ========================================================================

    /// Create a sticky note
    pub async fn create_note(&self, owner_id: Uuid, pdf_id: Uuid, input: NewNote) -> Result<Note> {
        let now = Utc::now();

        let note = NoteActiveModel {
            id: Set(Uuid::new_v4()),
            pdf_id: Set(pdf_id),
            owner_id: Set(owner_id),
            page_number: Set(input.page_number),
            x: Set(input.x),
            y: Set(input.y),
            content: Set(input.content),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        note.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Notes of a PDF, optionally for one page, newest first
    pub async fn list_notes(&self, owner_id: Uuid, pdf_id: Uuid, page_number: Option<i32>) -> Result<Vec<Note>> {
        let mut query = NoteEntity::find()
            .filter(NoteColumn::PdfId.eq(pdf_id))
            .filter(NoteColumn::OwnerId.eq(owner_id));

        if let Some(page) = page_number {
            query = query.filter(NoteColumn::PageNumber.eq(page));
        }

        query
            .order_by_desc(NoteColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Apply a partial update to one of the caller's notes
    pub async fn update_note(&self, owner_id: Uuid, id: Uuid, changes: NoteChanges) -> Result<Option<Note>> {
        let Some(note) = NoteEntity::find_by_id(id)
            .filter(NoteColumn::OwnerId.eq(owner_id))
            .one(self.write_conn())
            .await?
        else {
            return Ok(None);
        };

        let mut note = note.into_active_model();
        if let Some(page_number) = changes.page_number {
            note.page_number = Set(page_number);
        }
        if let Some(x) = changes.x {
            note.x = Set(x);
        }
        if let Some(y) = changes.y {
            note.y = Set(y);
        }
        if let Some(content) = changes.content {
            note.content = Set(content);
        }
        note.updated_at = Set(Utc::now().into());

        Ok(Some(note.update(self.write_conn()).await?))
    }

    /// Delete one of the caller's notes
    pub async fn delete_note(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let result = NoteEntity::delete_many()
            .filter(NoteColumn::Id.eq(id))
            .filter(NoteColumn::OwnerId.eq(owner_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}
