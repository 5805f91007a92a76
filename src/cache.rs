//! Memoization of the extract + generate pipeline.
//!
//! - [`SummaryCache`] is durable: entries live in the `summaries` table and
//!   survive restarts. Keys are PDF ids rendered as strings.
//! - [`AnswerCache`] is in memory and bounded by an LRU policy. Keys are
//!   `(pdf_id, normalized question)`.
//!
//! Both caches collapse concurrent misses on the same key through
//! [`InFlight`], so the compute closure runs once per key even when several
//! requests arrive before the first one finishes. A failed computation
//! writes nothing.

use chrono::Utc;
use lru::LruCache;
use parking_lot::Mutex;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::error::Result;

/// Per-key async locks for single-flight computation.
pub struct InFlight<K> {
    slots: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
}

impl<K: Hash + Eq + Clone> InFlight<K> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `f` while holding the lock for `key`. Callers for the same key
    /// run one after another; callers for different keys do not block each
    /// other. The slot is released even if the returned future is dropped
    /// before it completes.
    pub async fn run<F, Fut, T>(&self, key: K, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let slot = self.slots.lock().entry(key.clone()).or_default().clone();
        let release = SlotRelease {
            in_flight: self,
            key,
            slot,
        };

        let _guard = release.slot.lock().await;
        f().await
    }

    /// Number of keys with a computation running or queued.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes the slot for `key` once nobody else holds or awaits it.
struct SlotRelease<'a, K: Hash + Eq> {
    in_flight: &'a InFlight<K>,
    key: K,
    slot: Arc<tokio::sync::Mutex<()>>,
}

impl<K: Hash + Eq> Drop for SlotRelease<'_, K> {
    fn drop(&mut self) {
        // The map and this release hold the only references.
        let mut slots = self.in_flight.slots.lock();
        if let Some(existing) = slots.get(&self.key) {
            if Arc::ptr_eq(existing, &self.slot) && Arc::strong_count(existing) == 2 {
                slots.remove(&self.key);
            }
        }
    }
}

impl<K: Hash + Eq + Clone> Default for InFlight<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Durable summary cache backed by SQLite.
pub struct SummaryCache {
    pool: SqlitePool,
    in_flight: InFlight<String>,
}

impl SummaryCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            in_flight: InFlight::new(),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let summary: Option<String> =
            sqlx::query_scalar("SELECT summary FROM summaries WHERE pdf_id = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(summary)
    }

    pub async fn put(&self, key: &str, summary: &str, model: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO summaries (pdf_id, summary, model, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(pdf_id) DO UPDATE SET
                summary = excluded.summary,
                model = excluded.model,
                created_at = excluded.created_at
            "#,
        )
        .bind(key)
        .bind(summary)
        .bind(model)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns the cached summary for `pdf_id`, computing and storing it on
    /// a miss. `compute` yields the summary and the model that produced it.
    pub async fn get_or_compute<F, Fut>(&self, pdf_id: i64, compute: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(String, String)>>,
    {
        let key = pdf_id.to_string();
        self.in_flight
            .run(key.clone(), || async {
                if let Some(summary) = self.get(&key).await? {
                    tracing::debug!(pdf_id, "summary cache hit");
                    return Ok(summary);
                }
                tracing::debug!(pdf_id, "summary cache miss");
                let (summary, model) = compute().await?;
                self.put(&key, &summary, &model).await?;
                Ok(summary)
            })
            .await
    }
}

/// Lowercases and trims a question so trivially different phrasings share a
/// cache entry.
pub fn normalize_question(question: &str) -> String {
    question.trim().to_lowercase()
}

type AnswerKey = (i64, String);

/// Bounded in-memory question/answer cache.
pub struct AnswerCache {
    entries: Mutex<LruCache<AnswerKey, String>>,
    in_flight: InFlight<AnswerKey>,
}

impl AnswerCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: InFlight::new(),
        }
    }

    pub fn get(&self, pdf_id: i64, question: &str) -> Option<String> {
        let key = (pdf_id, normalize_question(question));
        self.entries.lock().get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached answer for the normalized `(pdf_id, question)`
    /// pair, computing and storing it on a miss.
    pub async fn get_or_compute<F, Fut>(
        &self,
        pdf_id: i64,
        question: &str,
        compute: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let key = (pdf_id, normalize_question(question));
        self.in_flight
            .run(key.clone(), || async {
                if let Some(answer) = self.entries.lock().get(&key).cloned() {
                    tracing::debug!(pdf_id, "answer cache hit");
                    return Ok(answer);
                }
                tracing::debug!(pdf_id, "answer cache miss");
                let answer = compute().await?;
                self.entries.lock().put(key.clone(), answer.clone());
                Ok(answer)
            })
            .await
    }
}
