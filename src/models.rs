//! Data types exchanged between the store, the pipeline, and the HTTP API.
//!
//! The response structs mirror the JSON bodies of the HTTP endpoints
//! one-to-one, so handlers serialize them directly.

use serde::{Deserialize, Serialize};

/// A stored PDF. `id` is assigned once at upload and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfRecord {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
}

/// A text chunk of a PDF. No chunking is performed, so detail responses
/// always carry an empty list.
#[derive(Debug, Clone, Serialize)]
pub struct PdfChunk {
    pub index: i64,
    pub text: String,
}

/// Response for `GET /pdf/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct PdfDetail {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
    pub chunks: Vec<PdfChunk>,
}

impl From<PdfRecord> for PdfDetail {
    fn from(record: PdfRecord) -> Self {
        Self {
            id: record.id,
            filename: record.filename,
            filepath: record.filepath,
            chunks: Vec::new(),
        }
    }
}

/// Response for `POST /upload`.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub text: String,
    pub chunks: i64,
    pub pdf_id: i64,
}

impl UploadResponse {
    pub fn for_record(record: &PdfRecord) -> Self {
        Self {
            text: "Uploaded".to_string(),
            chunks: 0,
            pdf_id: record.id,
        }
    }
}

/// Response for `DELETE /pdf/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub detail: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizeRequest {
    pub pdf_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QaRequest {
    pub pdf_id: i64,
    pub question: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QaResponse {
    pub answer: String,
}
