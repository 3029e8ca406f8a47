//! Pagemark Common Library
//!
//! Shared code for the Pagemark PDF annotation service including:
//! - Database models and repository patterns
//! - PDF file storage
//! - PDF inspection and text search
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod pdf;
pub mod storage;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use storage::{LocalPdfStore, PdfStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
