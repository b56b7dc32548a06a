//! Ingestion pipeline: load work logs, split them into chunks, and rebuild
//! or incrementally update the similarity index.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use worklog_core::WorklogError;

use crate::embedding::EmbeddingService;
use crate::index::MemoryIndex;
use crate::loader::WorkLogLoader;
use crate::splitter::TextSplitter;

/// Outcome of one index build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Work logs that were loaded and split.
    pub files_processed: usize,
    /// Files found but skipped (undated, empty, or unreadable).
    pub files_skipped: usize,
    /// Chunks written to the index.
    pub documents_processed: usize,
    /// Indexed files that no longer exist (updates only).
    pub files_removed: usize,
}

/// Outcome of an incremental update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Nothing changed since the last update.
    UpToDate,
    /// Changed files were re-embedded.
    Updated(IngestSummary),
    /// Too many files changed; the index was left as it was.
    RebuildRecommended { changed: usize },
}

/// Default ceiling on files an incremental update will touch.
pub const DEFAULT_MAX_INCREMENTAL_FILES: usize = 10;

/// Builds a [`MemoryIndex`] from a directory of work logs.
pub struct IndexBuilder {
    loader: WorkLogLoader,
    splitter: TextSplitter,
    max_incremental_files: usize,
}

impl IndexBuilder {
    pub fn new(loader: WorkLogLoader, splitter: TextSplitter) -> Self {
        Self {
            loader,
            splitter,
            max_incremental_files: DEFAULT_MAX_INCREMENTAL_FILES,
        }
    }

    /// Updates touching more than `limit` files recommend a rebuild.
    pub fn with_max_incremental_files(mut self, limit: usize) -> Self {
        self.max_incremental_files = limit;
        self
    }

    pub fn loader(&self) -> &WorkLogLoader {
        &self.loader
    }

    /// Replace the contents of `index` with every chunk of every work log.
    pub async fn build<E: EmbeddingService>(
        &self,
        index: &MemoryIndex<E>,
    ) -> Result<IngestSummary, WorklogError> {
        let found = self.loader.list_files()?.len();
        let logs = self.loader.load_all()?;

        let mut documents = Vec::new();
        for log in &logs {
            let chunks = self.splitter.split_work_log(log)?;
            debug!(path = %log.relative_path, chunks = chunks.len(), "Split work log");
            documents.extend(chunks);
        }

        let documents_processed = index.replace_all(documents).await?;
        let summary = IngestSummary {
            files_processed: logs.len(),
            files_skipped: found.saturating_sub(logs.len()),
            documents_processed,
            files_removed: 0,
        };
        info!(
            root = %self.loader.root().display(),
            files = summary.files_processed,
            skipped = summary.files_skipped,
            documents = summary.documents_processed,
            "Work logs indexed"
        );
        Ok(summary)
    }

    /// Re-embed the files modified after `since` and drop chunks of files
    /// that were deleted.
    ///
    /// Leaves `index` unchanged when nothing changed or when more files
    /// changed than the incremental limit allows.
    pub async fn update<E: EmbeddingService>(
        &self,
        index: &MemoryIndex<E>,
        since: NaiveDateTime,
    ) -> Result<UpdateOutcome, WorklogError> {
        let changed = self.loader.modified_after(since)?;
        let on_disk: BTreeSet<String> = self.loader.relative_paths()?.into_iter().collect();
        let deleted: Vec<String> = index
            .source_ids()?
            .into_iter()
            .filter(|source| !on_disk.contains(source))
            .collect();

        let touched = changed.len() + deleted.len();
        if touched == 0 {
            debug!(since = %since, "Index is up to date");
            return Ok(UpdateOutcome::UpToDate);
        }
        if touched > self.max_incremental_files {
            warn!(
                changed = touched,
                limit = self.max_incremental_files,
                "Many files changed; a full rebuild is recommended"
            );
            return Ok(UpdateOutcome::RebuildRecommended { changed: touched });
        }

        let mut stale: Vec<&str> = deleted.iter().map(String::as_str).collect();
        let mut documents = Vec::new();
        let mut files_processed = 0;
        for file in &changed {
            stale.push(&file.relative_path);
            if let Some(log) = &file.log {
                documents.extend(self.splitter.split_work_log(log)?);
                files_processed += 1;
            }
        }

        let documents_processed = documents.len();
        index.replace_sources(&stale, documents).await?;

        let summary = IngestSummary {
            files_processed,
            files_skipped: changed.len() - files_processed,
            documents_processed,
            files_removed: deleted.len(),
        };
        info!(
            root = %self.loader.root().display(),
            files = summary.files_processed,
            skipped = summary.files_skipped,
            removed = summary.files_removed,
            documents = summary.documents_processed,
            "Work logs updated"
        );
        Ok(UpdateOutcome::Updated(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    use chrono::NaiveDate;
    use worklog_retrieval::SimilarityIndex;

    use crate::embedding::TokenHashEmbedder;

    /// Set a file's mtime to November 2023, before [`last_update`].
    fn backdate(path: &Path) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
            .unwrap();
    }

    fn last_update() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    /// Build an index over `files`, then backdate them all.
    async fn built(
        root: &Path,
        files: &[(&str, &str)],
    ) -> (IndexBuilder, MemoryIndex<TokenHashEmbedder>) {
        for (name, content) in files {
            fs::write(root.join(name), content).unwrap();
        }
        let builder = IndexBuilder::new(WorkLogLoader::new(root), TextSplitter::default());
        let index = MemoryIndex::new(TokenHashEmbedder::default());
        builder.build(&index).await.unwrap();
        for (name, _) in files {
            backdate(&root.join(name));
        }
        (builder, index)
    }

    #[tokio::test]
    async fn test_update_reembeds_changed_and_drops_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let (builder, index) = built(
            dir.path(),
            &[
                ("2024-09-10.md", "kafka consumer lag"),
                ("2024-09-11.md", "budget review"),
                ("2024-09-12.md", "standup notes"),
            ],
        )
        .await;

        fs::write(dir.path().join("2024-09-10.md"), "kafka lag fixed for good").unwrap();
        fs::remove_file(dir.path().join("2024-09-12.md")).unwrap();

        let outcome = builder.update(&index, last_update()).await.unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::Updated(IngestSummary {
                files_processed: 1,
                files_skipped: 0,
                documents_processed: 1,
                files_removed: 1,
            })
        );

        let sources: Vec<String> = index.source_ids().unwrap().into_iter().collect();
        assert_eq!(sources, vec!["2024-09-10.md", "2024-09-11.md"]);
        let hits = index.search("kafka lag fixed for good", 1).await.unwrap();
        assert_eq!(hits[0].document.text(), "kafka lag fixed for good");
        assert_eq!(index.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_without_changes_is_up_to_date() {
        let dir = tempfile::tempdir().unwrap();
        let (builder, index) = built(dir.path(), &[("2024-09-10.md", "kafka consumer lag")]).await;
        assert_eq!(
            builder.update(&index, last_update()).await.unwrap(),
            UpdateOutcome::UpToDate
        );
        assert_eq!(index.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_drops_file_that_became_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (builder, index) = built(
            dir.path(),
            &[("2024-09-10.md", "kafka consumer lag"), ("2024-09-11.md", "budget review")],
        )
        .await;
        fs::write(dir.path().join("2024-09-10.md"), "\n").unwrap();

        let outcome = builder.update(&index, last_update()).await.unwrap();
        let UpdateOutcome::Updated(summary) = outcome else {
            panic!("expected an update, got {:?}", outcome);
        };
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.documents_processed, 0);
        let sources: Vec<String> = index.source_ids().unwrap().into_iter().collect();
        assert_eq!(sources, vec!["2024-09-11.md"]);
    }

    #[tokio::test]
    async fn test_update_with_many_changes_recommends_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        for day in 1..=12 {
            fs::write(dir.path().join(format!("2024-09-{:02}.md", day)), "daily notes").unwrap();
        }
        let builder = IndexBuilder::new(WorkLogLoader::new(dir.path()), TextSplitter::default());
        let index = MemoryIndex::new(TokenHashEmbedder::default());

        let outcome = builder.update(&index, last_update()).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::RebuildRecommended { changed: 12 });
        assert!(index.is_empty().unwrap());

        let relaxed = IndexBuilder::new(WorkLogLoader::new(dir.path()), TextSplitter::default())
            .with_max_incremental_files(20);
        let outcome = relaxed.update(&index, last_update()).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated(ref s) if s.files_processed == 12));
        assert_eq!(index.len().unwrap(), 12);
    }

    #[tokio::test]
    async fn test_build_indexes_dated_logs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2024-09-10.md"), "## Tue\nreviewed PRs").unwrap();
        fs::write(
            dir.path().join("2024-09-11.md"),
            "## Wed\nshipped billing\n\n## Notes\nfollow up with finance",
        )
        .unwrap();
        fs::write(dir.path().join("ideas.md"), "undated").unwrap();

        let builder = IndexBuilder::new(
            WorkLogLoader::new(dir.path()),
            TextSplitter::new(25, 0).unwrap(),
        );
        let index = MemoryIndex::new(TokenHashEmbedder::default());
        let summary = builder.build(&index).await.unwrap();

        assert_eq!(summary.files_processed, 2);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.documents_processed, index.len().unwrap());
        assert!(summary.documents_processed >= 3);
        assert_eq!(index.document_count().await.unwrap(), summary.documents_processed);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-09-10.md");
        fs::write(&path, "first version").unwrap();

        let builder = IndexBuilder::new(WorkLogLoader::new(dir.path()), TextSplitter::default());
        let index = MemoryIndex::new(TokenHashEmbedder::default());
        builder.build(&index).await.unwrap();

        fs::write(&path, "second version").unwrap();
        let summary = builder.build(&index).await.unwrap();
        assert_eq!(summary.documents_processed, 1);

        let hits = index.search("version", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.text(), "second version");
    }

    #[tokio::test]
    async fn test_build_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let builder = IndexBuilder::new(WorkLogLoader::new(dir.path()), TextSplitter::default());
        let index = MemoryIndex::new(TokenHashEmbedder::default());
        let summary = builder.build(&index).await.unwrap();
        assert_eq!(summary, IngestSummary::default());
        assert!(index.is_empty().unwrap());
    }
}
