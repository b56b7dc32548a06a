//! Filesystem loader for dated markdown work logs.
//!
//! Every `*.md` file under the data directory is one work log. Its date comes
//! from the first ISO date in its path relative to the data directory, e.g.
//! `2024/09/2024-09-10.md` or `standups/2024-09-10-notes.md`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use worklog_core::{extract_date, WorklogError};

/// One dated work-log file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkLog {
    /// Stable identifier, the `/`-separated relative path.
    pub id: String,
    pub date: NaiveDate,
    pub content: String,
    pub relative_path: String,
}

/// A file modified since some instant.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedFile {
    /// `/`-separated path relative to the data directory.
    pub relative_path: String,
    /// The parsed log, or `None` when the file is now undated, empty, or
    /// unreadable.
    pub log: Option<WorkLog>,
}

/// Reads work logs from a data directory.
#[derive(Debug, Clone)]
pub struct WorkLogLoader {
    root: PathBuf,
    extension: String,
}

impl WorkLogLoader {
    /// Load `*.md` files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_extension(root, "md")
    }

    /// Load files with the given extension (without the dot) under `root`.
    pub fn with_extension(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the data directory holds at least one work-log file.
    pub fn exists(&self) -> Result<bool, WorklogError> {
        Ok(!self.list_files()?.is_empty())
    }

    /// All matching files under the root, sorted by path. A missing root
    /// yields an empty list.
    pub fn list_files(&self) -> Result<Vec<PathBuf>, WorklogError> {
        if !self.root.exists() {
            debug!(root = %self.root.display(), "Data directory does not exist");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| WorklogError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = entry
                .path()
                .extension()
                .is_some_and(|ext| ext.to_string_lossy() == self.extension);
            if matches {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Every dated work log, in path order.
    pub fn load_all(&self) -> Result<Vec<WorkLog>, WorklogError> {
        let files = self.list_files()?;
        Ok(files.iter().filter_map(|path| self.read(path)).collect())
    }

    /// Relative paths of every matching file, in path order.
    pub fn relative_paths(&self) -> Result<Vec<String>, WorklogError> {
        Ok(self
            .list_files()?
            .iter()
            .map(|path| self.relative_path(path))
            .collect())
    }

    /// Files modified strictly after `instant` (local time), in path order.
    pub fn modified_after(&self, instant: NaiveDateTime) -> Result<Vec<ChangedFile>, WorklogError> {
        let mut changed = Vec::new();
        for path in self.list_files()? {
            let modified = std::fs::metadata(&path)?.modified()?;
            let modified = DateTime::<Local>::from(modified).naive_local();
            if modified > instant {
                changed.push(ChangedFile {
                    relative_path: self.relative_path(&path),
                    log: self.read(&path),
                });
            }
        }
        debug!(
            root = %self.root.display(),
            changed = changed.len(),
            since = %instant,
            "Scanned for modified work logs"
        );
        Ok(changed)
    }

    /// Read one file. Unreadable, undated, and empty files are skipped.
    fn read(&self, path: &Path) -> Option<WorkLog> {
        let relative_path = self.relative_path(path);

        let Some(date) = extract_date(&relative_path) else {
            warn!(path = %relative_path, "Could not extract date from file path; skipping");
            return None;
        };

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %relative_path, error = %e, "Failed to read work log; skipping");
                return None;
            }
        };
        if content.trim().is_empty() {
            debug!(path = %relative_path, "Skipping empty work log");
            return None;
        }

        Some(WorkLog {
            id: relative_path.clone(),
            date,
            content,
            relative_path,
        })
    }

    fn relative_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}
