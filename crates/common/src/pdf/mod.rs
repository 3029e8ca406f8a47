//! PDF inspection
//!
//! Page counting and per-page text extraction using lopdf, plus the
//! page-level search built on top of it.

mod search;

pub use search::{search_pages, PageMatch, PREVIEW_CHARS};

use lopdf::Document;
use thiserror::Error;
use tracing::{debug, warn};

/// Leading bytes of every PDF file
pub const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to parse PDF: {0}")]
    Parse(#[from] lopdf::Error),
}

/// Quick magic-byte check, done before anything is written to disk
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Number of pages, or `None` if the document cannot be parsed
pub fn page_count(bytes: &[u8]) -> Option<u32> {
    match Document::load_mem(bytes) {
        Ok(doc) => Some(doc.get_pages().len() as u32),
        Err(e) => {
            debug!(error = %e, "Could not parse PDF for page count");
            None
        }
    }
}

/// Extract `(page_number, text)` for every page, in page order
///
/// A page whose content cannot be decoded yields empty text rather than
/// failing the whole document.
pub fn page_texts(bytes: &[u8]) -> Result<Vec<(u32, String)>, PdfError> {
    let doc = Document::load_mem(bytes)?;
    let pages = doc.get_pages();

    debug!(page_count = pages.len(), "Extracting text from PDF");

    let texts = pages
        .keys()
        .map(|&page_num| {
            let text = match doc.extract_text(&[page_num]) {
                Ok(text) => clean_text(&text),
                Err(e) => {
                    warn!(page = page_num, error = %e, "Failed to extract text from page, skipping");
                    String::new()
                }
            };
            (page_num, text)
        })
        .collect();

    Ok(texts)
}

/// Collapse runs of whitespace into single spaces
fn clean_text(text: &str) -> String {
    text.replace('\u{FEFF}', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
