//! Open map documents
//!
//! A document pairs the editable tile grid with its file. When a map is
//! opened (and after every successful save) the file is copied aside; that
//! copy is the baseline the next save compacts against, so in-memory edits
//! never leak into it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::baseline::{LoadError, load_baseline};
use crate::commit::FileCommitter;
use crate::coord::Extents;
use crate::model::{TileGrid, TileSource};
use crate::save::{self, SaveError, SaveReport};
use crate::settings::Settings;

#[derive(Debug)]
pub struct MapDocument {
    path: Option<PathBuf>,
    backup: Option<PathBuf>,
    tiles: TileGrid,
    settings: Settings,
}

impl MapDocument {
    /// An untitled map filled with empty tiles
    pub fn new(extents: Extents, settings: Settings) -> Self {
        Self {
            path: None,
            backup: None,
            tiles: TileGrid::new(extents, Default::default()),
            settings,
        }
    }

    /// Open a map file and take its backup
    pub fn open(path: &Path, settings: Settings) -> Result<Self, LoadError> {
        let map = load_baseline(path)?;
        let backup = backup_path(&settings, path);
        take_backup(path, &backup).map_err(|source| LoadError::Io {
            path: backup.clone(),
            source,
        })?;
        log::info!(
            "Opened {} ({} tiles, {} keys)",
            path.display(),
            map.extents().count(),
            map.dictionary.len()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            backup: Some(backup),
            tiles: TileGrid::from_map(&map),
            settings,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn backup(&self) -> Option<&Path> {
        self.backup.as_deref()
    }

    pub fn tiles(&self) -> &TileGrid {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut TileGrid {
        &mut self.tiles
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Save back to the file the document came from
    pub fn save(&mut self) -> Result<SaveReport, SaveError> {
        let path = self.path.clone().ok_or(SaveError::Untitled)?;
        self.save_as(&path)
    }

    /// Save to `path`, compacting against the current backup
    pub fn save_as(&mut self, path: &Path) -> Result<SaveReport, SaveError> {
        let mut committer = FileCommitter::new(path);
        let report = match &self.backup {
            Some(backup) => save::save(backup, &self.tiles, &mut committer, &self.settings)?,
            None => {
                let baseline = self.settings.empty_baseline(self.tiles.extents());
                save::save_with_baseline(&baseline, &self.tiles, &mut committer, &self.settings)?
            }
        };

        self.path = Some(path.to_path_buf());
        let backup = backup_path(&self.settings, path);
        match take_backup(path, &backup) {
            Ok(()) => self.backup = Some(backup),
            Err(err) => log::warn!(
                "Map saved but backup {} was not refreshed: {}",
                backup.display(),
                err
            ),
        }

        Ok(report)
    }
}

/// Backup location for a map, unique per absolute path
fn backup_path(settings: &Settings, path: &Path) -> PathBuf {
    let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let hash = const_fnv1a_hash::fnv1a_hash_str_64(&absolute.to_string_lossy());
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "map".to_string());
    settings
        .backup_dir()
        .join(format!("{}.{:016x}.backup", name, hash))
}

fn take_backup(path: &Path, backup: &Path) -> io::Result<()> {
    if let Some(dir) = backup.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::copy(path, backup)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Instance, TileContent};
    use crate::coord::Coord;
    use crate::dmm::{MapFormat, parse_map};
    use crate::keys::Key;
    use tempfile::TempDir;

    const MAP: &str = "\"a\" = (/turf/floor,/area/hall)
\"b\" = (/turf/wall,/area/hall)
\"c\" = (/obj/door{dir = 4},/turf/floor,/area/hall)

(1,1,1) = {\"
bbb
aca
bbb
\"}
";

    fn settings_in(dir: &Path) -> Settings {
        Settings {
            backup_dir: Some(dir.join("backups")),
            ..Default::default()
        }
    }

    fn write_map(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("station.dmm");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_unmodified_save_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let path = write_map(dir, MAP);

        let mut doc = MapDocument::open(&path, settings_in(dir)).unwrap();
        let report = doc.save().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), MAP);
        assert_eq!(report.reused_by_content, 9);
        assert_eq!(report.generated, 0);
    }

    #[test]
    fn test_edit_keeps_untouched_keys() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let path = write_map(dir, MAP);

        let mut doc = MapDocument::open(&path, settings_in(dir)).unwrap();
        let center = Coord::new(2, 2, 1);
        doc.tiles_mut()
            .set_tile(center, TileContent::new(vec![Instance::new("/turf/space")]));
        doc.save().unwrap();

        let saved = parse_map(&fs::read_to_string(&path).unwrap()).unwrap();
        // The door key stays at its old coordinate with the new content
        assert_eq!(saved.grid.get(center), Some(&Key::new("c")));
        assert_eq!(saved.content_at(center).unwrap().0[0].path, "/turf/space");
        assert_eq!(saved.grid.get(Coord::new(1, 1, 1)), Some(&Key::new("b")));
        assert_eq!(saved.grid.get(Coord::new(1, 2, 1)), Some(&Key::new("a")));
    }

    #[test]
    fn test_second_save_uses_refreshed_backup() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let path = write_map(dir, MAP);

        let mut doc = MapDocument::open(&path, settings_in(dir)).unwrap();
        doc.tiles_mut()
            .push_instance(Coord::new(1, 1, 1), Instance::new("/obj/item/crowbar"));
        doc.save().unwrap();
        let first = fs::read_to_string(&path).unwrap();

        let report = doc.save().unwrap();
        assert_eq!(report.reused_by_content, 9);
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_exhausted_key_space_leaves_file_untouched() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let path = write_map(dir, MAP);
        let settings = Settings {
            max_key_length: 1,
            ..settings_in(dir)
        };

        let mut doc = MapDocument::open(&path, settings).unwrap();
        // 52 single-symbol keys cannot cover 54 distinct tiles
        let mut n = 0;
        *doc.tiles_mut() = TileGrid::new(Extents::new(9, 6, 1), TileContent::default());
        for coord in Extents::new(9, 6, 1).iter() {
            doc.tiles_mut().set_tile(
                coord,
                TileContent::new(vec![Instance::new("/obj/marker").with_var("id", n.to_string())]),
            );
            n += 1;
        }

        let err = doc.save().unwrap_err();
        assert!(matches!(err, SaveError::KeySpaceExhausted { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), MAP);
    }

    #[test]
    fn test_missing_backup_is_baseline_unreadable() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let path = write_map(dir, MAP);

        let mut doc = MapDocument::open(&path, settings_in(dir)).unwrap();
        fs::remove_file(doc.backup().unwrap()).unwrap();

        let err = doc.save().unwrap_err();
        assert!(matches!(err, SaveError::BaselineUnreadable(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), MAP);
    }

    #[test]
    fn test_write_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let path = write_map(dir, MAP);

        let mut doc = MapDocument::open(&path, settings_in(dir)).unwrap();
        let err = doc.save_as(&dir.join("missing").join("out.dmm")).unwrap_err();
        assert!(matches!(err, SaveError::WriteFailure { .. }));
        assert_eq!(doc.path(), Some(path.as_path()));
    }

    #[test]
    fn test_untitled_map_uses_new_map_settings() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let settings = Settings {
            new_map_format: MapFormat::Tgm,
            new_map_key_length: 2,
            ..settings_in(dir)
        };

        let mut doc = MapDocument::new(Extents::new(2, 2, 1), settings);
        assert!(matches!(doc.save(), Err(SaveError::Untitled)));
        assert!(fs::read_dir(dir).unwrap().next().is_none());

        doc.tiles_mut()
            .set_tile(Coord::new(1, 1, 1), TileContent::new(vec![Instance::new("/turf/floor")]));
        let path = dir.join("new.dmm");
        let report = doc.save_as(&path).unwrap();
        assert_eq!(report.dictionary_size, 2);

        let saved = parse_map(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.format, MapFormat::Tgm);
        assert_eq!(saved.key_length, 2);
        assert_eq!(saved.grid.get(Coord::new(1, 1, 1)), Some(&Key::new("aa")));
        assert!(doc.backup().is_some());
    }
}
