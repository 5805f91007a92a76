//! PDF text extraction.
//!
//! Extraction is stateless: a path goes in, UTF-8 text comes out. Pages are
//! read one at a time and concatenated; a page with no text layer (a scanned
//! image without OCR, for instance) contributes an empty string rather than
//! failing the document.
//!
//! Truncation is a separate step ([`truncate_chars`]) applied by the caller
//! before text is handed to the LLM.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use thiserror::Error;

use crate::error::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF file not found: {0}")]
    NotFound(String),
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

impl From<ExtractError> for Error {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::NotFound(_) => Error::NotFound(err.to_string()),
            other => Error::Extraction(other.to_string()),
        }
    }
}

/// Extracts the full text of the PDF at `path`.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|e| read_error(path, e))?;
    extract_pdf(&bytes)
}

fn read_error(path: &Path, err: std::io::Error) -> ExtractError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ExtractError::NotFound(path.display().to_string())
    } else {
        ExtractError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Extracts text from in-memory PDF bytes.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed inputs instead of returning an
    // error, so the call is fenced.
    let pages = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| ExtractError::Pdf("parser panicked on malformed input".to_string()))?
    .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    Ok(join_pages(pages))
}

fn join_pages(pages: Vec<String>) -> String {
    let mut out = String::new();
    for page in pages {
        out.push_str(&page);
    }
    out
}

/// Returns at most `max_chars` characters of `text`, cutting on a char
/// boundary. The second element is true when anything was dropped.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}
