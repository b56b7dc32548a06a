//! Retrieval selection: decides which indexed chunks answer a query and in
//! what order they are presented.
//!
//! A temporal query probes the index with a fixed umbrella text and keeps the
//! chunks whose embedded date falls inside the parsed window, newest first.
//! Any other query searches with the literal text and keeps candidates under
//! the distance threshold in index order. There is no fallback between the
//! two strategies.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use worklog_core::{DateRange, RetrievalConfig, RetrievalDocument};

use crate::error::RetrievalError;
use crate::index::SimilarityIndex;
use crate::parser::TemporalQueryParser;

/// The context assembled for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    /// Rendered documents joined by the configured separator.
    pub context_text: String,
    /// Unique source identifiers of the selected documents.
    pub source_ids: BTreeSet<String>,
    pub is_temporal: bool,
    pub document_count: usize,
    /// The window a temporal query resolved to.
    pub date_range: Option<DateRange>,
}

impl RetrievalResult {
    fn empty(date_range: Option<DateRange>) -> Self {
        Self {
            context_text: String::new(),
            source_ids: BTreeSet::new(),
            is_temporal: date_range.is_some(),
            document_count: 0,
            date_range,
        }
    }

    /// True when nothing survived selection.
    pub fn is_empty(&self) -> bool {
        self.document_count == 0
    }
}

/// Chooses and runs a retrieval strategy per query.
///
/// Holds no per-query state; concurrent calls are independent.
pub struct RetrievalSelector {
    index: Arc<dyn SimilarityIndex>,
    parser: TemporalQueryParser,
    config: RetrievalConfig,
}

impl RetrievalSelector {
    pub fn new(index: Arc<dyn SimilarityIndex>, config: RetrievalConfig) -> Self {
        Self {
            index,
            parser: TemporalQueryParser::new(),
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Select the context for `query`.
    ///
    /// Issues exactly one index search. `max_results` overrides the branch
    /// budget when given. Index failures propagate unchanged.
    pub async fn select(
        &self,
        query: &str,
        max_results: Option<usize>,
        now: NaiveDateTime,
    ) -> Result<RetrievalResult, RetrievalError> {
        let range = self.parser.parse(query, now);

        let documents = match range {
            Some(ref range) => {
                let budget = max_results.unwrap_or(self.config.temporal_budget);
                self.select_by_date(range, budget).await?
            }
            None => {
                let budget = max_results.unwrap_or(self.config.content_budget);
                self.select_by_score(query, budget).await?
            }
        };

        if documents.is_empty() {
            debug!(is_temporal = range.is_some(), "No documents selected");
            return Ok(RetrievalResult::empty(range));
        }

        Ok(self.assemble(&documents, range))
    }

    async fn select_by_date(
        &self,
        range: &DateRange,
        budget: usize,
    ) -> Result<Vec<RetrievalDocument>, RetrievalError> {
        let candidates = self
            .index
            .search(&self.config.probe_text, self.config.temporal_candidate_limit)
            .await?;
        let pool = candidates.len();

        let mut documents: Vec<RetrievalDocument> = candidates
            .into_iter()
            .map(|c| c.document)
            .filter(|doc| doc.is_within_range(range))
            .collect();
        // Stable: equal dates keep index order.
        documents.sort_by_cached_key(|doc| Reverse(doc.embedded_date()));
        let in_range = documents.len();
        documents.truncate(budget);

        debug!(
            strategy = "date_windowed",
            range = %range,
            pool,
            in_range,
            kept = documents.len(),
            "Temporal selection finished"
        );
        Ok(documents)
    }

    async fn select_by_score(
        &self,
        query: &str,
        budget: usize,
    ) -> Result<Vec<RetrievalDocument>, RetrievalError> {
        let candidates = self
            .index
            .search(query, self.config.content_candidate_limit)
            .await?;
        let pool = candidates.len();
        let threshold = self.config.relevance_threshold;

        let documents: Vec<RetrievalDocument> = candidates
            .into_iter()
            .filter(|c| c.score < threshold)
            .map(|c| c.document)
            .take(budget)
            .collect();

        debug!(
            strategy = "score_windowed",
            pool,
            threshold,
            kept = documents.len(),
            "Content selection finished"
        );
        Ok(documents)
    }

    fn assemble(
        &self,
        documents: &[RetrievalDocument],
        date_range: Option<DateRange>,
    ) -> RetrievalResult {
        let context_text = documents
            .iter()
            .map(RetrievalDocument::display_string)
            .collect::<Vec<_>>()
            .join(&self.config.separator);
        let source_ids = documents
            .iter()
            .map(|doc| doc.source_id().to_string())
            .collect();

        RetrievalResult {
            context_text,
            source_ids,
            is_temporal: date_range.is_some(),
            document_count: documents.len(),
            date_range,
        }
    }
}
