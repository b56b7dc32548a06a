//! In-memory similarity index with brute-force cosine search.
//!
//! Search is O(n) over all stored chunks, which is fine for a personal
//! work-log corpus.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use worklog_core::{RetrievalDocument, ScoredCandidate, WorklogError};
use worklog_retrieval::{RetrievalError, SimilarityIndex};

use crate::embedding::{cosine_similarity, EmbeddingService};

/// An embedded chunk stored in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct IndexEntry {
    pub(crate) id: Uuid,
    pub(crate) embedding: Vec<f32>,
    pub(crate) document: RetrievalDocument,
}

/// Thread-safe in-memory index of embedded work-log chunks.
///
/// Scores are cosine distances (`1 - similarity`), lower is closer. Equal
/// distances rank the newer embedded date first, then insertion order.
pub struct MemoryIndex<E: EmbeddingService> {
    entries: Arc<RwLock<Vec<IndexEntry>>>,
    embedder: E,
}

impl<E: EmbeddingService> MemoryIndex<E> {
    /// Create an empty index that embeds with `embedder`.
    pub fn new(embedder: E) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            embedder,
        }
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Embed and append `documents`. Returns the ids assigned to them.
    ///
    /// Nothing is stored if any document fails to embed.
    pub async fn add_documents(
        &self,
        documents: Vec<RetrievalDocument>,
    ) -> Result<Vec<Uuid>, WorklogError> {
        let prepared = self.embed_all(documents).await?;
        let ids: Vec<Uuid> = prepared.iter().map(|e| e.id).collect();

        let mut entries = self.write()?;
        entries.extend(prepared);
        debug!(added = ids.len(), total = entries.len(), "Documents indexed");
        Ok(ids)
    }

    /// Replace the whole index with `documents`.
    ///
    /// The previous contents stay searchable until the new set is embedded.
    pub async fn replace_all(&self, documents: Vec<RetrievalDocument>) -> Result<usize, WorklogError> {
        let prepared = self.embed_all(documents).await?;
        let count = prepared.len();

        let mut entries = self.write()?;
        *entries = prepared;
        info!(documents = count, "Index rebuilt");
        Ok(count)
    }

    /// Drop every chunk whose source id is in `source_ids`, then append
    /// `documents`. Returns the number of chunks removed.
    ///
    /// The new documents are embedded first; on failure nothing changes.
    pub async fn replace_sources<S: AsRef<str>>(
        &self,
        source_ids: &[S],
        documents: Vec<RetrievalDocument>,
    ) -> Result<usize, WorklogError> {
        let prepared = self.embed_all(documents).await?;
        let doomed: HashSet<&str> = source_ids.iter().map(AsRef::as_ref).collect();

        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|entry| !doomed.contains(entry.document.source_id()));
        let removed = before - entries.len();
        let added = prepared.len();
        entries.extend(prepared);
        debug!(removed, added, total = entries.len(), "Sources replaced");
        Ok(removed)
    }

    /// Every distinct source id currently indexed.
    pub fn source_ids(&self) -> Result<BTreeSet<String>, WorklogError> {
        Ok(self
            .read()?
            .iter()
            .map(|entry| entry.document.source_id().to_string())
            .collect())
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<(), WorklogError> {
        self.write()?.clear();
        Ok(())
    }

    /// Return the number of chunks currently stored.
    pub fn len(&self) -> Result<usize, WorklogError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, WorklogError> {
        Ok(self.read()?.is_empty())
    }

    /// Rank stored chunks against an already embedded query.
    ///
    /// Returns at most `k` candidates by ascending distance.
    pub fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<ScoredCandidate>, WorklogError> {
        let entries = self.read()?;

        let mut scored: Vec<(f64, &IndexEntry)> = entries
            .iter()
            .map(|entry| (1.0 - cosine_similarity(query, &entry.embedding), entry))
            .collect();

        // Undated chunks sort after dated ones on a tie; the sort is stable.
        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    b.1.document
                        .embedded_date()
                        .cmp(&a.1.document.embedded_date())
                })
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, entry)| ScoredCandidate::new(entry.document.clone(), distance as f32))
            .collect())
    }

    /// Copy of every stored entry, in insertion order.
    pub(crate) fn entries(&self) -> Result<Vec<IndexEntry>, WorklogError> {
        Ok(self.read()?.clone())
    }

    /// Replace the contents with previously embedded entries.
    pub(crate) fn restore(&self, restored: Vec<IndexEntry>) -> Result<usize, WorklogError> {
        let expected = self.embedder.dimensions();
        if let Some(bad) = restored.iter().find(|e| e.embedding.len() != expected) {
            return Err(WorklogError::Index(format!(
                "stored entry {} has {} dimensions, embedder produces {}",
                bad.id,
                bad.embedding.len(),
                expected
            )));
        }
        let count = restored.len();
        *self.write()? = restored;
        Ok(count)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<IndexEntry>>, WorklogError> {
        self.entries
            .read()
            .map_err(|e| WorklogError::Index(format!("Lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<IndexEntry>>, WorklogError> {
        self.entries
            .write()
            .map_err(|e| WorklogError::Index(format!("Lock poisoned: {}", e)))
    }

    async fn embed_all(
        &self,
        documents: Vec<RetrievalDocument>,
    ) -> Result<Vec<IndexEntry>, WorklogError> {
        let mut prepared = Vec::with_capacity(documents.len());
        for document in documents {
            let embedding = self.embedder.embed(document.text()).await?;
            if embedding.len() != self.embedder.dimensions() {
                return Err(WorklogError::Embedding(format!(
                    "expected {} dimensions, got {}",
                    self.embedder.dimensions(),
                    embedding.len()
                )));
            }
            prepared.push(IndexEntry {
                id: Uuid::new_v4(),
                embedding,
                document,
            });
        }
        Ok(prepared)
    }
}

#[async_trait]
impl<E: EmbeddingService> SimilarityIndex for MemoryIndex<E> {
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| RetrievalError::Search(e.to_string()))?;
        self.search_vector(&embedding, limit)
            .map_err(|e| RetrievalError::Search(e.to_string()))
    }

    async fn document_count(&self) -> Result<usize, RetrievalError> {
        self.len().map_err(|e| RetrievalError::Search(e.to_string()))
    }
}
