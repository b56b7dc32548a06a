//! Retrievable document chunks and the scored candidates an index returns.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::date_range::DateRange;
use crate::error::{Result, WorklogError};

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}").unwrap());

/// Label rendered in place of a date when a source carries none.
pub const UNKNOWN_DATE: &str = "Unknown date";

/// Find the first `YYYY-MM-DD` substring in `text` and parse it.
///
/// Only the first match is considered: an invalid first match (e.g. month 13)
/// yields `None` even if a valid date appears later.
pub fn extract_date(text: &str) -> Option<NaiveDate> {
    let m = ISO_DATE_RE.find(text)?;
    NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok()
}

/// A chunk of a work-log document as stored in the similarity index.
///
/// Two documents with equal `(source_id, chunk_index)` are the same logical
/// chunk across retrievals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalDocument {
    text: String,
    source_id: String,
    chunk_index: usize,
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl RetrievalDocument {
    /// Create a document, rejecting blank text or a blank source identifier.
    pub fn new(
        text: impl Into<String>,
        source_id: impl Into<String>,
        chunk_index: usize,
    ) -> Result<Self> {
        let text = text.into();
        let source_id = source_id.into();
        if text.trim().is_empty() {
            return Err(WorklogError::InvalidDocument(format!(
                "chunk {} of '{}' has empty text",
                chunk_index, source_id
            )));
        }
        if source_id.trim().is_empty() {
            return Err(WorklogError::InvalidDocument(
                "source identifier must not be empty".to_string(),
            ));
        }
        Ok(Self {
            text,
            source_id,
            chunk_index,
            metadata: Map::new(),
        })
    }

    /// Attach extra metadata carried through from the index.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Identity of the logical chunk.
    pub fn key(&self) -> (&str, usize) {
        (&self.source_id, self.chunk_index)
    }

    /// The calendar date embedded in the source identifier, if any.
    pub fn embedded_date(&self) -> Option<NaiveDate> {
        extract_date(&self.source_id)
    }

    /// The embedded date as an instant at midnight.
    pub fn embedded_instant(&self) -> Option<NaiveDateTime> {
        self.embedded_date().map(|d| d.and_time(NaiveTime::MIN))
    }

    /// Whether the embedded date falls inside `range`. Undated documents
    /// never match.
    pub fn is_within_range(&self, range: &DateRange) -> bool {
        self.embedded_date()
            .is_some_and(|date| range.contains_date(date))
    }

    /// `"[YYYY-MM-DD] text"`, or `"[Unknown date] text"` for undated sources.
    pub fn display_string(&self) -> String {
        match self.embedded_date() {
            Some(date) => format!("[{}] {}", date.format("%Y-%m-%d"), self.text),
            None => format!("[{}] {}", UNKNOWN_DATE, self.text),
        }
    }
}

/// A document paired with the index's distance score (lower is closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub document: RetrievalDocument,
    pub score: f32,
}

impl ScoredCandidate {
    pub fn new(document: RetrievalDocument, score: f32) -> Self {
        Self { document, score }
    }
}
