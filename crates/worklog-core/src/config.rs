use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WorklogError};

/// Top-level configuration for the work-log assistant.
///
/// Loaded from `~/.worklog/config.toml` by default. Missing sections fall
/// back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorklogConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl WorklogConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WorklogConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or invalid. Only an unusable file is reported as a warning.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("No config file at {}. Using defaults.", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject settings the selector and splitter cannot work with.
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.probe_text.trim().is_empty() {
            return Err(WorklogError::Config(
                "retrieval.probe_text must not be empty".to_string(),
            ));
        }
        if r.temporal_candidate_limit == 0 || r.content_candidate_limit == 0 {
            return Err(WorklogError::Config(
                "retrieval candidate limits must be positive".to_string(),
            ));
        }
        if !r.relevance_threshold.is_finite() {
            return Err(WorklogError::Config(
                "retrieval.relevance_threshold must be finite".to_string(),
            ));
        }
        let i = &self.ingest;
        if i.chunk_size == 0 {
            return Err(WorklogError::Config(
                "ingest.chunk_size must be positive".to_string(),
            ));
        }
        if i.chunk_overlap >= i.chunk_size {
            return Err(WorklogError::Config(format!(
                "ingest.chunk_overlap ({}) must be smaller than chunk_size ({})",
                i.chunk_overlap, i.chunk_size
            )));
        }
        if i.embedding_dim == 0 {
            return Err(WorklogError::Config(
                "ingest.embedding_dim must be positive".to_string(),
            ));
        }
        if i.embedder == EmbedderKind::Onnx && i.model_dir.trim().is_empty() {
            return Err(WorklogError::Config(
                "ingest.model_dir must be set for the onnx embedder".to_string(),
            ));
        }
        if self.general.index_dir.trim().is_empty() {
            return Err(WorklogError::Config(
                "general.index_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the dated markdown work logs.
    pub data_dir: String,
    /// Where the embedded index snapshot and last-update marker are kept.
    pub index_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            index_dir: "~/.worklog/index".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Retrieval selection constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Topic-agnostic text used to pull a broad pool for date filtering.
    pub probe_text: String,
    /// Candidates requested from the index for temporal queries.
    pub temporal_candidate_limit: usize,
    /// Documents kept after date filtering.
    pub temporal_budget: usize,
    /// Candidates requested from the index for content queries.
    pub content_candidate_limit: usize,
    /// Documents kept after score filtering.
    pub content_budget: usize,
    /// Candidates must score strictly below this distance.
    pub relevance_threshold: f32,
    /// Delimiter between rendered documents in the context block.
    pub separator: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            probe_text: "work tasks projects".to_string(),
            temporal_candidate_limit: 100,
            temporal_budget: 20,
            content_candidate_limit: 20,
            content_budget: 10,
            relevance_threshold: 0.5,
            separator: "\n\n---\n\n".to_string(),
        }
    }
}

/// Embedding backend used to index and query work logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbedderKind {
    /// Sentence-transformer ONNX model loaded from `ingest.model_dir`.
    #[default]
    Onnx,
    /// Lexical feature hashing; needs no model files.
    TokenHash,
}

/// Work-log ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Trailing characters carried into the next chunk.
    pub chunk_overlap: usize,
    /// File extension of work-log documents.
    pub extension: String,
    pub embedder: EmbedderKind,
    /// Directory holding `model.onnx` and `tokenizer.json`.
    pub model_dir: String,
    /// Dimensionality of the token-hash embedding.
    pub embedding_dim: usize,
    /// An incremental update touching more files than this asks for a full
    /// rebuild instead.
    pub max_incremental_files: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
            extension: "md".to_string(),
            embedder: EmbedderKind::Onnx,
            model_dir: "~/.worklog/models/all-MiniLM-L6-v2".to_string(),
            embedding_dim: 384,
            max_incremental_files: 10,
        }
    }
}
