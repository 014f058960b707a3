//! Baseline loading and the pending key pool
//!
//! The baseline is the map file as it existed before the current save, read
//! fresh from storage. It only biases key reuse and is never modified.

use std::fs;
use std::path::{Path, PathBuf};

use crate::dmm::{MapData, ParseError, parse_map};
use crate::keys::Key;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Read and parse a previously persisted map file
pub fn load_baseline(path: &Path) -> Result<MapData, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let map = parse_map(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!(
        "Loaded baseline {}: {} keys, key length {}, extents {}",
        path.display(),
        map.dictionary.len(),
        map.key_length,
        map.extents()
    );
    Ok(map)
}

/// Baseline keys not yet reused by the current save, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingPool {
    keys: Vec<Key>,
}

impl PendingPool {
    pub fn from_baseline(baseline: &MapData) -> Self {
        Self {
            keys: baseline.dictionary.keys().cloned().collect(),
        }
    }

    /// Remove a key wherever it sits, keeping the order of the rest
    pub fn remove(&mut self, key: &Key) -> bool {
        match self.keys.iter().position(|k| k == key) {
            Some(idx) => {
                self.keys.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Take the first remaining key
    pub fn pop_front(&mut self) -> Option<Key> {
        if self.keys.is_empty() {
            None
        } else {
            Some(self.keys.remove(0))
        }
    }

    /// Snapshot of the remaining keys in order
    pub fn keys(&self) -> Vec<Key> {
        self.keys.clone()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
