//! PDF store: uploaded files on disk plus the id registry.
//!
//! Files live directly under the storage root, named by their sanitized
//! upload filename. The `pdfs` table maps ids to filenames; ids come from
//! SQLite `AUTOINCREMENT`, so they start at 1, only ever grow, and are never
//! handed out again after a delete or a restart. Listing reads the registry,
//! never the directory, so existing ids cannot shift when files come and go.
//!
//! Uploading a filename that is already stored is rejected; the existing
//! file and its id are left alone.

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::PdfRecord;

pub struct PdfStore {
    pool: SqlitePool,
    root: PathBuf,
}

impl PdfStore {
    pub fn new(pool: SqlitePool, root: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            root: root.into(),
        }
    }

    /// Writes `bytes` under the storage root and assigns the next id.
    pub async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<PdfRecord> {
        let filename = sanitize_filename(filename)?;

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            Error::Storage(format!(
                "cannot create storage root {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let size = bytes.len() as i64;
        let root = self.root.clone();
        let dest = self.root.join(&filename);
        let dest_for_write = dest.clone();
        let name_for_write = filename.clone();
        tokio::task::spawn_blocking(move || {
            write_new_file(&root, &dest_for_write, &name_for_write, &bytes)
        })
        .await
        .map_err(|e| Error::Internal(format!("upload task failed: {}", e)))??;

        let inserted =
            sqlx::query("INSERT INTO pdfs (filename, uploaded_at, size_bytes) VALUES (?, ?, ?)")
                .bind(&filename)
                .bind(Utc::now().timestamp())
                .bind(size)
                .execute(&self.pool)
                .await;

        let id = match inserted {
            Ok(result) => result.last_insert_rowid(),
            Err(err) => {
                // Registry write failed: take the file back out so disk and
                // registry stay in step.
                if let Err(e) = tokio::fs::remove_file(&dest).await {
                    tracing::warn!(file = %dest.display(), error = %e, "could not roll back upload");
                }
                return Err(match err {
                    sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                        already_stored(&filename)
                    }
                    other => other.into(),
                });
            }
        };

        tracing::info!(pdf_id = id, filename = %filename, bytes = size, "stored PDF");
        Ok(self.record(id, filename))
    }

    /// All records in upload order.
    pub async fn list(&self) -> Result<Vec<PdfRecord>> {
        let rows = sqlx::query("SELECT id, filename FROM pdfs ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| self.record(row.get("id"), row.get("filename")))
            .collect())
    }

    pub async fn resolve(&self, id: i64) -> Result<PdfRecord> {
        let filename: Option<String> = sqlx::query_scalar("SELECT filename FROM pdfs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match filename {
            Some(filename) => Ok(self.record(id, filename)),
            None => Err(Error::pdf_not_found(id)),
        }
    }

    /// Removes the file and its registry entry. The id stays retired.
    pub async fn delete(&self, id: i64) -> Result<PdfRecord> {
        let record = self.resolve(id).await?;

        match tokio::fs::remove_file(&record.filepath).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(pdf_id = id, file = %record.filepath, "file already gone, dropping record");
            }
            Err(e) => {
                return Err(Error::Storage(format!(
                    "cannot remove {}: {}",
                    record.filepath, e
                )));
            }
        }

        sqlx::query("DELETE FROM pdfs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::info!(pdf_id = id, filename = %record.filename, "deleted PDF");
        Ok(record)
    }

    fn record(&self, id: i64, filename: String) -> PdfRecord {
        PdfRecord {
            id,
            filepath: self.root.join(&filename).display().to_string(),
            filename,
        }
    }
}

fn already_stored(filename: &str) -> Error {
    Error::Storage(format!("a PDF named '{}' is already stored", filename))
}

/// Writes through a temporary file in `root` and renames it into place
/// without replacing an existing file, so readers never see a partial PDF.
fn write_new_file(root: &Path, dest: &Path, filename: &str, bytes: &[u8]) -> Result<()> {
    let io_err = |e: std::io::Error| Error::Storage(format!("cannot write {}: {}", filename, e));

    let mut tmp = tempfile::Builder::new()
        .prefix(".upload-")
        .suffix(".part")
        .tempfile_in(root)
        .map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;

    tmp.persist_noclobber(dest).map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::AlreadyExists {
            already_stored(filename)
        } else {
            io_err(e.error)
        }
    })?;
    Ok(())
}

/// Reduces a client-supplied filename to a safe final path component.
///
/// Directory parts (either separator) are dropped. Empty names, names
/// starting with a dot, control characters, and anything without a `.pdf`
/// extension are rejected.
pub fn sanitize_filename(raw: &str) -> Result<String> {
    let name = raw.trim().rsplit(['/', '\\']).next().unwrap_or("").trim();

    if name.is_empty() || name.starts_with('.') {
        return Err(Error::InvalidRequest(format!(
            "invalid filename: '{}'",
            raw
        )));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(Error::InvalidRequest(
            "filename contains control characters".to_string(),
        ));
    }
    if !name.to_ascii_lowercase().ends_with(".pdf") || name.len() == ".pdf".len() {
        return Err(Error::InvalidRequest(format!(
            "only .pdf files can be uploaded, got '{}'",
            name
        )));
    }

    Ok(name.to_string())
}
