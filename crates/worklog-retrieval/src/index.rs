//! The similarity-index capability consumed by retrieval.

use async_trait::async_trait;
use worklog_core::ScoredCandidate;

use crate::error::RetrievalError;

/// An external vector-similarity index.
///
/// `search` returns at most `limit` candidates ranked by ascending distance
/// (lower is more relevant). It may return fewer. Implementations report an
/// unreachable backend as [`RetrievalError::IndexUnavailable`].
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Rank indexed chunks against `query`.
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError>;

    /// Whether the backend can currently be reached.
    async fn is_available(&self) -> bool {
        true
    }

    /// Number of chunks currently indexed.
    async fn document_count(&self) -> Result<usize, RetrievalError>;
}
