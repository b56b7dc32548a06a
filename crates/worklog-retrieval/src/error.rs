//! Error types for retrieval and the chat use case.

use worklog_core::WorklogError;

/// Errors from retrieval selection and query answering.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("similarity index is unavailable: {0}")]
    IndexUnavailable(String),
    #[error("no documents are indexed; run the embedding process first")]
    EmptyIndex,
    #[error("search error: {0}")]
    Search(String),
    #[error("answer generation error: {0}")]
    Generation(String),
    #[error("query cannot be empty")]
    EmptyQuery,
    #[error("query exceeds maximum length of {0} characters")]
    QueryTooLong(usize),
    #[error(transparent)]
    Core(#[from] WorklogError),
}
