//! On-disk snapshot of a [`MemoryIndex`] and the last-update marker.
//!
//! The snapshot is a JSON file holding every embedded chunk together with a
//! fingerprint of the data directory and embedder that produced it. A
//! snapshot whose fingerprint does not match is ignored, so switching models
//! or data directories never mixes incompatible vectors.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use worklog_core::WorklogError;

use crate::embedding::EmbeddingService;
use crate::index::{IndexEntry, MemoryIndex};

/// File name of the index snapshot inside the index directory.
pub const SNAPSHOT_FILE: &str = "index.json";

/// File name of the last-update marker inside the index directory.
pub const LAST_UPDATE_FILE: &str = "last_update";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Serialize, Deserialize)]
struct IndexSnapshot {
    fingerprint: String,
    saved_at: NaiveDateTime,
    entries: Vec<IndexEntry>,
}

/// Reads and writes index snapshots under one directory.
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
    fingerprint: String,
}

impl IndexStore {
    /// `fingerprint` identifies the data directory, embedder and chunking
    /// settings the index is built with.
    pub fn new(dir: impl Into<PathBuf>, fingerprint: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            fingerprint: fingerprint.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    pub fn last_update_path(&self) -> PathBuf {
        self.dir.join(LAST_UPDATE_FILE)
    }

    /// Write the index contents and mark `updated_at` as the last update.
    ///
    /// Returns the number of chunks saved.
    pub fn save<E: EmbeddingService>(
        &self,
        index: &MemoryIndex<E>,
        updated_at: NaiveDateTime,
    ) -> Result<usize, WorklogError> {
        std::fs::create_dir_all(&self.dir)?;

        let snapshot = IndexSnapshot {
            fingerprint: self.fingerprint.clone(),
            saved_at: updated_at,
            entries: index.entries()?,
        };
        let count = snapshot.entries.len();

        // Atomic replace.
        let tmp = self.dir.join(format!("{}.tmp", SNAPSHOT_FILE));
        std::fs::write(&tmp, serde_json::to_vec(&snapshot)?)?;
        std::fs::rename(&tmp, self.snapshot_path())?;

        std::fs::write(
            self.last_update_path(),
            updated_at.format(TIMESTAMP_FORMAT).to_string(),
        )?;
        info!(path = %self.snapshot_path().display(), chunks = count, "Index snapshot saved");
        Ok(count)
    }

    /// Fill `index` from the snapshot.
    ///
    /// Returns `None` when there is no snapshot or it was built with a
    /// different fingerprint; `index` is left untouched in both cases.
    pub fn load<E: EmbeddingService>(
        &self,
        index: &MemoryIndex<E>,
    ) -> Result<Option<usize>, WorklogError> {
        let path = self.snapshot_path();
        if !path.exists() {
            debug!(path = %path.display(), "No index snapshot");
            return Ok(None);
        }

        let snapshot: IndexSnapshot = serde_json::from_slice(&std::fs::read(&path)?)?;
        if snapshot.fingerprint != self.fingerprint {
            warn!(
                path = %path.display(),
                saved = %snapshot.fingerprint,
                current = %self.fingerprint,
                "Index snapshot was built with different settings; ignoring it"
            );
            return Ok(None);
        }

        let count = index.restore(snapshot.entries)?;
        info!(
            path = %path.display(),
            chunks = count,
            saved_at = %snapshot.saved_at,
            "Index snapshot loaded"
        );
        Ok(Some(count))
    }

    /// When the index was last brought up to date, if ever.
    ///
    /// A marker that cannot be parsed counts as never.
    pub fn last_update(&self) -> Result<Option<NaiveDateTime>, WorklogError> {
        let path = self.last_update_path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        match NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT) {
            Ok(at) => Ok(Some(at)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable last-update marker");
                Ok(None)
            }
        }
    }
}
