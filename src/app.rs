//! The application object: store, caches, and LLM client wired together.
//!
//! [`App`] is built once at startup and shared (behind an `Arc`) by the HTTP
//! handlers and the CLI. It owns every piece of mutable state in the
//! process; nothing lives in globals.
//!
//! # Pipeline
//!
//! ```text
//! summarize(id)        resolve ─▶ summary cache ─(miss)─▶ extract ─▶ truncate ─▶ LLM
//! answer(id, question) resolve ─▶ answer cache  ─(miss)─▶ extract ─▶ truncate ─▶ LLM
//! ```
//!
//! The id is always resolved before a cache lookup, so a deleted PDF answers
//! 404 even if a summary for it is still on file.

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::cache::{AnswerCache, SummaryCache};
use crate::config::Config;
use crate::db;
use crate::error::{Error, Result};
use crate::extract;
use crate::llm::{Generator, LlmClient, OllamaGenerator};
use crate::migrate;
use crate::models::{PdfDetail, PdfRecord};
use crate::store::PdfStore;

pub struct App {
    config: Config,
    pool: SqlitePool,
    store: PdfStore,
    summaries: SummaryCache,
    answers: AnswerCache,
    llm: LlmClient,
}

impl App {
    /// Opens the database (running migrations), prepares the storage root,
    /// and talks to the generation endpoint configured under `[llm]`.
    pub async fn open(config: &Config) -> Result<Self> {
        let generator = Arc::new(OllamaGenerator::new(&config.llm)?);
        Self::open_with_generator(config, generator).await
    }

    /// Like [`App::open`], with a caller-supplied [`Generator`].
    pub async fn open_with_generator(
        config: &Config,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::run_migrations(&pool).await?;

        tokio::fs::create_dir_all(&config.storage.root)
            .await
            .map_err(|e| {
                Error::Storage(format!(
                    "cannot create storage root {}: {}",
                    config.storage.root.display(),
                    e
                ))
            })?;

        tracing::info!(
            db = %config.db.path.display(),
            storage = %config.storage.root.display(),
            model = generator.model_name(),
            "application ready"
        );

        Ok(Self {
            config: config.clone(),
            store: PdfStore::new(pool.clone(), config.storage.root.clone()),
            summaries: SummaryCache::new(pool.clone()),
            answers: AnswerCache::new(config.cache.qa_capacity),
            llm: LlmClient::new(generator, config.llm.max_tokens),
            pool,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn answers(&self) -> &AnswerCache {
        &self.answers
    }

    pub async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<PdfRecord> {
        self.store.upload(bytes, filename).await
    }

    pub async fn list(&self) -> Result<Vec<PdfRecord>> {
        self.store.list().await
    }

    pub async fn detail(&self, pdf_id: i64) -> Result<PdfDetail> {
        Ok(self.store.resolve(pdf_id).await?.into())
    }

    pub async fn delete(&self, pdf_id: i64) -> Result<PdfRecord> {
        self.store.delete(pdf_id).await
    }

    /// Summary of the PDF, served from the durable cache when present.
    pub async fn summarize(&self, pdf_id: i64) -> Result<String> {
        let record = self.store.resolve(pdf_id).await?;
        self.summaries
            .get_or_compute(pdf_id, || async {
                let text = self.document_text(&record).await?;
                let summary = self.llm.summarize(&text).await?;
                Ok((summary, self.llm.model_name().to_string()))
            })
            .await
    }

    /// Answer to `question` about the PDF. The cache key uses the
    /// normalized question; the model sees the question as asked.
    pub async fn answer(&self, pdf_id: i64, question: &str) -> Result<String> {
        if question.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "question must not be empty".to_string(),
            ));
        }

        let record = self.store.resolve(pdf_id).await?;
        self.answers
            .get_or_compute(pdf_id, question, || async {
                let text = self.document_text(&record).await?;
                self.llm.answer(&text, question).await
            })
            .await
    }

    /// Extracted text of the stored file, cut to the configured budget.
    async fn document_text(&self, record: &PdfRecord) -> Result<String> {
        let path = std::path::PathBuf::from(&record.filepath);
        let text = tokio::task::spawn_blocking(move || extract::extract_text(&path))
            .await
            .map_err(|e| Error::Internal(format!("extraction task failed: {}", e)))??;

        let max_chars = self.config.extract.max_chars;
        let (cut, truncated) = extract::truncate_chars(&text, max_chars);
        if truncated {
            tracing::debug!(
                pdf_id = record.id,
                total_chars = text.chars().count(),
                max_chars,
                "document text truncated"
            );
        }
        Ok(cut.to_string())
    }

    /// Closes the database pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
