//! Retrieval selection for questions about dated work logs.
//!
//! Parses temporal phrases out of free-text queries, picks a date-windowed
//! or score-windowed strategy against an external similarity index, and
//! assembles the bounded context handed to answer generation.

pub mod chat;
pub mod error;
pub mod index;
pub mod parser;
pub mod selector;

pub use chat::{
    AnswerGenerator, ChatRequest, ChatResponse, ChatService, ExtractiveAnswerer, PromptAnswerer,
    MAX_QUERY_LENGTH, NO_DATA_ANSWER,
};
pub use error::RetrievalError;
pub use index::SimilarityIndex;
pub use parser::{TemporalCue, TemporalQueryParser};
pub use selector::{RetrievalResult, RetrievalSelector};
pub use worklog_core::{DateRange, RetrievalDocument, ScoredCandidate};
