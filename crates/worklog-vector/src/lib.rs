//! Worklog Vector crate - embedding, in-memory similarity index, work-log
//! loading, text splitting, index snapshots, and the ingestion pipeline.
//!
//! Provides the in-process collaborators behind the retrieval seam: an ONNX
//! sentence-transformer embedder (with a lexical token-hash fallback), a
//! cosine-distance `MemoryIndex` that implements `SimilarityIndex`, an
//! `IndexStore` that persists it between runs, and an `IndexBuilder` that
//! fills or incrementally updates it from a directory of dated markdown files.

pub mod embedding;
pub mod index;
pub mod loader;
pub mod pipeline;
pub mod splitter;
pub mod store;

pub use embedding::{
    cosine_similarity, BoxedEmbedder, DynEmbeddingService, EmbeddingService, OnnxEmbeddingService,
    TokenHashEmbedder, DEFAULT_DIMENSIONS,
};
pub use index::MemoryIndex;
pub use loader::{ChangedFile, WorkLog, WorkLogLoader};
pub use pipeline::{IndexBuilder, IngestSummary, UpdateOutcome, DEFAULT_MAX_INCREMENTAL_FILES};
pub use splitter::{TextSplitter, SEPARATORS};
pub use store::{IndexStore, LAST_UPDATE_FILE, SNAPSHOT_FILE};
