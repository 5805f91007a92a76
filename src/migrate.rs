use sqlx::SqlitePool;

use crate::error::Result;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // AUTOINCREMENT keeps ids strictly increasing and never hands out the id
    // of a deleted row again.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pdfs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            filename TEXT NOT NULL UNIQUE,
            uploaded_at INTEGER NOT NULL,
            size_bytes INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Durable summary cache, keyed by the PDF id rendered as text
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS summaries (
            pdf_id TEXT PRIMARY KEY,
            summary TEXT NOT NULL,
            model TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
