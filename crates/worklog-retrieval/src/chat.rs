//! Chat use case: validates a question, runs retrieval selection, and hands
//! the assembled context to an answer generator.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use worklog_core::RetrievalConfig;

use crate::error::RetrievalError;
use crate::index::SimilarityIndex;
use crate::selector::RetrievalSelector;

/// Maximum query length in characters.
pub const MAX_QUERY_LENGTH: usize = 2000;

/// Answer returned when selection finds nothing.
pub const NO_DATA_ANSWER: &str = "I don't have enough data from the logs for that time period.";

/// Longest entry excerpt the extractive answerer prints.
const EXCERPT_CHARS: usize = 240;

// =============================================================================
// Request / response
// =============================================================================

/// A question about the work logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    /// Overrides the selection budget when set.
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: None,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Reject blank or oversized queries.
    pub fn validate(&self) -> Result<(), RetrievalError> {
        if self.query.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }
        if self.query.chars().count() > MAX_QUERY_LENGTH {
            return Err(RetrievalError::QueryTooLong(MAX_QUERY_LENGTH));
        }
        Ok(())
    }
}

/// The answer to a [`ChatRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    /// Unique source identifiers, sorted.
    pub sources: Vec<String>,
    pub is_temporal: bool,
    pub documents_found: usize,
}

impl ChatResponse {
    fn no_data(is_temporal: bool) -> Self {
        Self {
            answer: NO_DATA_ANSWER.to_string(),
            sources: Vec::new(),
            is_temporal,
            documents_found: 0,
        }
    }
}

// =============================================================================
// Answer generation
// =============================================================================

/// Turns a selected context into a natural-language answer.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(
        &self,
        query: &str,
        context: &str,
        is_temporal: bool,
        today: NaiveDate,
    ) -> Result<String, RetrievalError>;
}

/// Render the generation prompt for a language model backend.
fn build_prompt(query: &str, context: &str, is_temporal: bool, today: NaiveDate) -> String {
    let focus = if is_temporal {
        "When answering temporal queries like \"last week\" or \"this week\", focus on the \
         relevant date range and organize the response chronologically."
    } else {
        "Focus on the content and provide relevant information based on semantic similarity."
    };

    format!(
        "You are a professional assistant reviewing detailed work logs. Today's date is {today}.\n\
         \n\
         Use the context below to generate a full, rich, and organized summary. Be as specific \
         as possible about dates and tasks.\n\
         Each entry is prefixed with [YYYY-MM-DD] to show the date.\n\
         \n\
         {focus}\n\
         \n\
         ONLY say \"{no_data}\" if the context is completely empty or contains no relevant \
         information.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question:\n\
         {query}\n\
         \n\
         Detailed Answer:\n",
        today = today.format("%Y-%m-%d"),
        no_data = NO_DATA_ANSWER.trim_end_matches('.'),
    )
}

/// Generator whose answer is the rendered language-model prompt itself, for
/// handing the selected context to an external model.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptAnswerer;

#[async_trait]
impl AnswerGenerator for PromptAnswerer {
    async fn generate(
        &self,
        query: &str,
        context: &str,
        is_temporal: bool,
        today: NaiveDate,
    ) -> Result<String, RetrievalError> {
        Ok(build_prompt(query, context, is_temporal, today))
    }
}

/// Generator that restates the selected entries without a language model.
pub struct ExtractiveAnswerer {
    separator: String,
}

impl ExtractiveAnswerer {
    /// Split contexts on the separator configured for retrieval.
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            separator: config.separator.clone(),
        }
    }
}

impl Default for ExtractiveAnswerer {
    fn default() -> Self {
        Self::new(&RetrievalConfig::default())
    }
}

#[async_trait]
impl AnswerGenerator for ExtractiveAnswerer {
    async fn generate(
        &self,
        query: &str,
        context: &str,
        is_temporal: bool,
        today: NaiveDate,
    ) -> Result<String, RetrievalError> {
        let entries: Vec<String> = context
            .split(self.separator.as_str())
            .map(excerpt)
            .filter(|e| !e.is_empty())
            .collect();
        if entries.is_empty() {
            return Ok(NO_DATA_ANSWER.to_string());
        }

        let heading = if is_temporal {
            format!(
                "Work log entries for \"{}\" (as of {}), most recent first:",
                query.trim(),
                today.format("%Y-%m-%d")
            )
        } else {
            format!("Work log entries related to \"{}\":", query.trim())
        };

        let mut answer = heading;
        for entry in entries {
            answer.push_str("\n- ");
            answer.push_str(&entry);
        }
        Ok(answer)
    }
}

/// Collapse whitespace and cap the length of one rendered entry.
fn excerpt(entry: &str) -> String {
    let flat = entry.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(EXCERPT_CHARS).collect();
    cut.push_str("...");
    cut
}

// =============================================================================
// ChatService
// =============================================================================

/// Answers questions about the indexed work logs.
pub struct ChatService {
    index: Arc<dyn SimilarityIndex>,
    selector: RetrievalSelector,
    generator: Arc<dyn AnswerGenerator>,
}

impl ChatService {
    pub fn new(
        index: Arc<dyn SimilarityIndex>,
        generator: Arc<dyn AnswerGenerator>,
        config: RetrievalConfig,
    ) -> Self {
        let selector = RetrievalSelector::new(Arc::clone(&index), config);
        Self {
            index,
            selector,
            generator,
        }
    }

    pub fn selector(&self) -> &RetrievalSelector {
        &self.selector
    }

    /// Answer `request` as of `now`.
    ///
    /// Fails when the index is unreachable or holds no documents. An empty
    /// selection is answered with [`NO_DATA_ANSWER`] without consulting the
    /// generator.
    pub async fn process_query(
        &self,
        request: &ChatRequest,
        now: NaiveDateTime,
    ) -> Result<ChatResponse, RetrievalError> {
        request.validate()?;

        if !self.index.is_available().await {
            warn!("Similarity index unavailable");
            return Err(RetrievalError::IndexUnavailable(
                "ensure the index backend is running".to_string(),
            ));
        }
        if self.index.document_count().await? == 0 {
            return Err(RetrievalError::EmptyIndex);
        }

        let result = self
            .selector
            .select(&request.query, request.max_results, now)
            .await?;

        if result.is_empty() {
            info!(is_temporal = result.is_temporal, "No matching log entries");
            return Ok(ChatResponse::no_data(result.is_temporal));
        }

        debug!(
            documents = result.document_count,
            sources = result.source_ids.len(),
            "Generating answer"
        );
        let answer = self
            .generator
            .generate(
                &request.query,
                &result.context_text,
                result.is_temporal,
                now.date(),
            )
            .await?;

        Ok(ChatResponse {
            answer,
            sources: result.source_ids.into_iter().collect(),
            is_temporal: result.is_temporal,
            documents_found: result.document_count,
        })
    }
}
