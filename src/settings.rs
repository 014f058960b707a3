//! Saver settings
//!
//! Persisted as JSON next to the user's other editor preferences.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_MAX_KEY_LENGTH, KEY_LENGTH_CEILING};
use crate::coord::Extents;
use crate::dmm::{LineBreak, MapData, MapFormat};

/// Key allocation and file layout preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Widest key the generator may grow to
    pub max_key_length: usize,

    // === New maps ===
    /// Key width for maps saved without a baseline
    pub new_map_key_length: usize,
    /// Layout for maps saved without a baseline
    pub new_map_format: MapFormat,
    /// Line breaks for maps saved without a baseline
    pub new_map_line_break: LineBreak,

    /// Where open-time backups live (system temp dir when unset)
    pub backup_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            new_map_key_length: 1,
            new_map_format: MapFormat::Standard,
            new_map_line_break: LineBreak::Lf,
            backup_dir: None,
        }
    }
}

impl Settings {
    /// Generator ceiling, clamped to what the map grammar supports
    pub fn effective_max_key_length(&self) -> usize {
        self.max_key_length.clamp(1, KEY_LENGTH_CEILING)
    }

    /// Key width for new maps, never above the ceiling
    pub fn effective_new_map_key_length(&self) -> usize {
        self.new_map_key_length
            .clamp(1, self.effective_max_key_length())
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.backup_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("dmm-compact-backups"))
    }

    /// Empty baseline for a map that has never been saved
    pub fn empty_baseline(&self, extents: Extents) -> MapData {
        MapData::new(
            self.new_map_format,
            self.new_map_line_break,
            self.effective_new_map_key_length(),
            extents,
        )
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    return settings;
                }
                Err(err) => log::warn!("Ignoring malformed settings {}: {}", path.display(), err),
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => log::warn!("Unable to read settings {}: {}", path.display(), err),
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(path, json)?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        assert_eq!(Settings::load(&dir.join("settings.json")), Settings::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let path = dir.join("settings.json");
        fs::write(&path, r#"{ "max_key_length": 2, "new_map_format": "Tgm" }"#).unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.max_key_length, 2);
        assert_eq!(settings.new_map_format, MapFormat::Tgm);
        assert_eq!(settings.new_map_key_length, 1);
    }

    #[test]
    fn test_save_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let path = dir.join("settings.json");
        let settings = Settings {
            max_key_length: 2,
            backup_dir: Some(dir.to_path_buf()),
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn test_limits_are_clamped() {
        let settings = Settings {
            max_key_length: 9,
            new_map_key_length: 0,
            ..Default::default()
        };
        assert_eq!(settings.effective_max_key_length(), KEY_LENGTH_CEILING);
        assert_eq!(settings.effective_new_map_key_length(), 1);
    }
}
