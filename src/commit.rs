//! Persistence committer
//!
//! Hands a finished map to storage. File writes are staged next to the
//! target and renamed into place, so a failed commit leaves the previous
//! file untouched.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dmm::{MapData, render_map};

/// Receives the single, fully built output of a save
pub trait MapCommitter {
    fn commit(&mut self, output: &MapData) -> io::Result<()>;

    /// Where the output ends up, for error reports
    fn target(&self) -> PathBuf;
}

/// Writes maps to a file path with stage-then-rename replacement
#[derive(Debug, Clone)]
pub struct FileCommitter {
    path: PathBuf,
}

impl FileCommitter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "map".to_string());
        self.path
            .with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), seq))
    }
}

impl MapCommitter for FileCommitter {
    fn commit(&mut self, output: &MapData) -> io::Result<()> {
        let text = render_map(output);
        let staging = self.staging_path();

        let result = write_synced(&staging, text.as_bytes())
            .and_then(|()| fs::rename(&staging, &self.path));
        if result.is_err() {
            let _ = fs::remove_file(&staging);
        }
        result?;

        log::debug!("Committed {} bytes to {}", text.len(), self.path.display());
        Ok(())
    }

    fn target(&self) -> PathBuf {
        self.path.clone()
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
