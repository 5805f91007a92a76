//! Error taxonomy shared by the store, caches, pipeline, and HTTP layer.
//!
//! Every collaborator failure is translated into one of these variants
//! before it reaches a handler, and [`Error`] converts itself into an HTTP
//! response with a stable JSON body:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "PDF not found: 7" } }
//! ```
//!
//! | Variant | Status | Code |
//! |---------|--------|------|
//! | `NotFound` | 404 | `not_found` |
//! | `InvalidRequest` | 400 | `bad_request` |
//! | `Storage` | 500 | `storage_error` |
//! | `Extraction` | 500 | `extraction_error` |
//! | `Upstream` | 500 | `upstream_error` |
//! | `UpstreamTimeout` | 500 | `upstream_timeout` |
//! | `Database`, `Internal` | 500 | `internal` |
//!
//! Messages from the underlying failure are passed through to the caller.
//! That is fine for an internal tool; a public deployment would want to
//! redact them.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Unknown PDF id, or a stored file that is no longer on disk.
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidRequest(String),

    /// Writing or removing files under the storage root failed, or the
    /// upload collides with an existing filename.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("generation endpoint error: {0}")]
    Upstream(String),

    #[error("generation endpoint timed out after {0}s")]
    UpstreamTimeout(u64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn pdf_not_found(id: i64) -> Self {
        Self::NotFound(format!("PDF not found: {}", id))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::InvalidRequest(_) => "bad_request",
            Error::Storage(_) => "storage_error",
            Error::Extraction(_) => "extraction_error",
            Error::Upstream(_) => "upstream_error",
            Error::UpstreamTimeout(_) => "upstream_timeout",
            Error::Database(_) | Error::Internal(_) => "internal",
        }
    }
}

// Extractor rejections are reported with the same body as every other error.
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        } else {
            tracing::debug!(code = self.code(), "{}", self);
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
