//! Recursive text splitter for markdown work logs.
//!
//! Splits on the coarsest separator present (section headers first, then
//! paragraphs, lines, and words), recursing into pieces that are still too
//! large, then packs pieces into chunks of at most `chunk_size` characters.
//! Consecutive chunks share up to `chunk_overlap` trailing characters.

use std::collections::VecDeque;

use serde_json::{Map, Value};

use worklog_core::{IngestConfig, RetrievalDocument, WorklogError};

use crate::loader::WorkLog;

/// Separators tried in order, coarsest first.
pub const SEPARATORS: [&str; 5] = ["\n## ", "\n### ", "\n\n", "\n", " "];

/// Splits work-log text into retrieval documents.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Create a splitter. The overlap must be smaller than the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, WorklogError> {
        if chunk_size == 0 {
            return Err(WorklogError::Config(
                "chunk_size must be positive".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(WorklogError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self, WorklogError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    /// Split `content` into documents attributed to `source_id`, with
    /// contiguous chunk indices from 0.
    pub fn split_document(
        &self,
        content: &str,
        source_id: &str,
    ) -> Result<Vec<RetrievalDocument>, WorklogError> {
        self.split_text(content)
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| RetrievalDocument::new(chunk, source_id, index))
            .collect()
    }

    /// Split a loaded work log, tagging each chunk with the log's date.
    pub fn split_work_log(&self, log: &WorkLog) -> Result<Vec<RetrievalDocument>, WorklogError> {
        let mut metadata = Map::new();
        metadata.insert(
            "date".to_string(),
            Value::String(log.date.format("%Y-%m-%d").to_string()),
        );
        metadata.insert("work_log_id".to_string(), Value::String(log.id.clone()));

        Ok(self
            .split_document(&log.content, &log.relative_path)?
            .into_iter()
            .map(|doc| doc.with_metadata(metadata.clone()))
            .collect())
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators.iter().position(|sep| text.contains(sep));
        let (pieces, finer) = match position {
            Some(i) => (split_keeping(text, separators[i]), &separators[i + 1..]),
            None => (text.chars().map(String::from).collect::<Vec<_>>(), &separators[..0]),
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        for piece in pieces {
            if char_len(&piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if finer.is_empty() && position.is_none() {
                // A single character at least as long as the chunk size.
                chunks.extend(trimmed(&piece));
            } else {
                chunks.extend(self.split_recursive(&piece, finer));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks
    }

    /// Pack pieces into chunks, carrying an overlap window forward.
    fn merge(&self, pieces: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                chunks.extend(trimmed(&join(&window)));
                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((piece.as_str(), len));
            total += len;
        }
        if !window.is_empty() {
            chunks.extend(trimmed(&join(&window)));
        }
        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

/// Split on `sep`, keeping the separator at the start of each later piece.
fn split_keeping(text: &str, sep: &str) -> Vec<String> {
    let mut parts = text.split(sep);
    let mut pieces = Vec::new();
    if let Some(first) = parts.next() {
        pieces.push(first.to_string());
    }
    pieces.extend(parts.map(|p| format!("{}{}", sep, p)));
    pieces.retain(|p| !p.is_empty());
    pieces
}

fn join(window: &VecDeque<(&str, usize)>) -> String {
    window.iter().map(|(piece, _)| *piece).collect()
}

fn trimmed(text: &str) -> Option<String> {
    let t = text.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn splitter(size: usize, overlap: usize) -> TextSplitter {
        TextSplitter::new(size, overlap).unwrap()
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = TextSplitter::default().split_text("Hello, world!");
        assert_eq!(chunks, vec!["Hello, world!"]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(TextSplitter::default().split_text("").is_empty());
        assert!(TextSplitter::default().split_text(" \n\n ").is_empty());
    }

    #[test]
    fn test_splits_on_section_headers() {
        let text = "# Day\n## Morning\nstandup notes\n## Afternoon\ndeploy";
        let chunks = splitter(30, 0).split_text(text);
        assert_eq!(
            chunks,
            vec!["# Day\n## Morning\nstandup notes", "## Afternoon\ndeploy"]
        );
    }

    #[test]
    fn test_overlap_carries_trailing_words() {
        let chunks = splitter(20, 6).split_text("aaaa bbbb cccc dddd eeee ffff");
        assert_eq!(chunks, vec!["aaaa bbbb cccc dddd", "dddd eeee ffff"]);
    }

    #[test]
    fn test_hard_split_without_separators() {
        let chunks = splitter(10, 0).split_text("abcdefghijklmnopqrstuvwxy");
        assert_eq!(chunks, vec!["abcdefghij", "klmnopqrst", "uvwxy"]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = "## Monday\n".to_string()
            + &"Worked on the billing migration and reviewed pull requests. ".repeat(40)
            + "\n## Tuesday\n"
            + &"Paired on the parser rewrite.\n\n".repeat(30);
        let chunks = TextSplitter::default().split_text(&text);
        assert!(chunks.len() > 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= 800));
        assert!(chunks.iter().any(|c| c.starts_with("## Tuesday")));
    }

    #[test]
    fn test_split_document_indices_are_contiguous() {
        let text = "## A\none\n## B\ntwo\n## C\nthree";
        let docs = splitter(12, 0).split_document(text, "2024-09-10.md").unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[2].text(), "## C\nthree");
        for (i, doc) in docs.iter().enumerate() {
            assert_eq!(doc.chunk_index(), i);
            assert_eq!(doc.source_id(), "2024-09-10.md");
        }
    }

    #[test]
    fn test_split_work_log_adds_metadata() {
        let log = WorkLog {
            id: "2024/2024-09-10.md".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 9, 10).unwrap(),
            content: "## Tue\nshipped the release".to_string(),
            relative_path: "2024/2024-09-10.md".to_string(),
        };
        let docs = TextSplitter::default().split_work_log(&log).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata()["date"], "2024-09-10");
        assert_eq!(
            docs[0].embedded_date(),
            NaiveDate::from_ymd_opt(2024, 9, 10)
        );
    }

    #[test]
    fn test_multibyte_text_counts_characters() {
        let chunks = splitter(4, 0).split_text("ééééé");
        assert_eq!(chunks, vec!["éééé", "é"]);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(TextSplitter::new(0, 0).is_err());
        assert!(TextSplitter::new(100, 100).is_err());
        assert!(TextSplitter::from_config(&IngestConfig::default()).is_ok());
    }
}
