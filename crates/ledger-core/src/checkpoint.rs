//! The checkpoint file: a small on-disk record of the current open batch
//! (spec §4.4). Absent file == empty batch. Every write is a
//! write-then-rename so a crash mid-write can never be read back as a torn,
//! half-written-but-valid-looking state.

use crate::digest::Digest;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to read checkpoint {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse checkpoint {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write checkpoint {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("checkpoint digest field was not valid hex: {0}")]
    BadHex(#[from] hex::FromHexError),
}

/// On-disk representation: hex strings, matching the Python original's
/// `binascii.b2a_hex` fields verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct CheckpointFile {
    left: Option<String>,
    right: Option<String>,
    digest: Option<String>,
    prev: Option<String>,
    count: u64,
}

impl Default for CheckpointFile {
    fn default() -> Self {
        Self {
            left: None,
            right: None,
            digest: None,
            prev: None,
            count: 0,
        }
    }
}

/// The open-batch state, decoded from hex into digests for the engine to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBatch {
    pub left: Option<Digest>,
    pub right: Option<Digest>,
    pub digest: Option<Digest>,
    pub prev: Option<Digest>,
    pub count: u64,
}

impl Default for OpenBatch {
    fn default() -> Self {
        Self {
            left: None,
            right: None,
            digest: None,
            prev: None,
            count: 0,
        }
    }
}

impl OpenBatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.digest.is_none() && self.prev.is_none()
    }

    fn to_file(&self) -> CheckpointFile {
        CheckpointFile {
            left: self.left.map(Digest::to_hex),
            right: self.right.map(Digest::to_hex),
            digest: self.digest.map(Digest::to_hex),
            prev: self.prev.map(Digest::to_hex),
            count: self.count,
        }
    }

    fn from_file(f: CheckpointFile) -> Result<Self, CheckpointError> {
        Ok(Self {
            left: f.left.map(|s| Digest::from_hex(&s)).transpose()?,
            right: f.right.map(|s| Digest::from_hex(&s)).transpose()?,
            digest: f.digest.map(|s| Digest::from_hex(&s)).transpose()?,
            prev: f.prev.map(|s| Digest::from_hex(&s)).transpose()?,
            count: f.count,
        })
    }
}

/// Owns the checkpoint file path and provides atomic load/store.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the open batch, or the empty default if the file doesn't exist
    /// (spec §4.4: "Absent file means no open batch").
    pub fn load(&self) -> Result<OpenBatch, CheckpointError> {
        if !self.path.exists() {
            return Ok(OpenBatch::default());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|source| CheckpointError::Read {
            path: self.path.clone(),
            source,
        })?;
        let file: CheckpointFile =
            serde_json::from_str(&text).map_err(|source| CheckpointError::Parse {
                path: self.path.clone(),
                source,
            })?;
        OpenBatch::from_file(file)
    }

    /// Atomically persist `batch` by writing to a sibling temp file then
    /// renaming over the real path (rename is atomic on the same filesystem).
    pub fn store(&self, batch: &OpenBatch) -> Result<(), CheckpointError> {
        let file = batch.to_file();
        let json = serde_json::to_string_pretty(&file).expect("checkpoint is always serializable");

        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|source| CheckpointError::Write {
            path: self.path.clone(),
            source,
        })?;
        use std::io::Write as _;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.flush())
            .map_err(|source| CheckpointError::Write {
                path: self.path.clone(),
                source,
            })?;
        tmp.persist(&self.path)
            .map_err(|e| CheckpointError::Write {
                path: self.path.clone(),
                source: e.error,
            })?;
        Ok(())
    }

    /// Reset the on-disk checkpoint to the empty batch.
    pub fn clear(&self) -> Result<(), CheckpointError> {
        self.store(&OpenBatch::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("ledger_subsystem.json"));
        let batch = store.load().unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.count, 0);
    }

    #[test]
    fn roundtrip_preserves_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("ledger_subsystem.json"));
        let batch = OpenBatch {
            left: Some(Digest([1u8; 32])),
            right: None,
            digest: None,
            prev: Some(Digest([2u8; 32])),
            count: 4,
        };
        store.store(&batch).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, batch);
    }

    #[test]
    fn clear_resets_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("ledger_subsystem.json"));
        store
            .store(&OpenBatch {
                left: Some(Digest([9u8; 32])),
                ..OpenBatch::default()
            })
            .unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_empty());
    }
}
