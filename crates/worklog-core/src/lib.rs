//! Shared building blocks for the work-log assistant: configuration, the
//! top-level error type, date windows, and retrievable document chunks.

pub mod config;
pub mod date_range;
pub mod document;
pub mod error;

pub use config::{EmbedderKind, GeneralConfig, IngestConfig, RetrievalConfig, WorklogConfig};
pub use date_range::{month_from_name, DateRange, MonthThird};
pub use document::{extract_date, RetrievalDocument, ScoredCandidate};
pub use error::{Result, WorklogError};
