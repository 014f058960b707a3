//! Dictionary + grid pair and file metadata

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::content::TileContent;
use crate::coord::{Coord, Extents};
use crate::keys::Key;

/// Header line that marks a map as TGM
pub const TGM_HEADER: &str =
    "//MAP CONVERTED BY dmm2tgm.py THIS HEADER COMMENT PREVENTS RECONVERSION, DO NOT REMOVE";

/// Textual layout of a map file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MapFormat {
    /// One dictionary entry per line, one grid block per z-level
    #[default]
    Standard,
    /// Merge-friendly layout: one instance per line, one grid block per column
    Tgm,
}

impl MapFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapFormat::Standard => "standard",
            MapFormat::Tgm => "tgm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LineBreak {
    #[default]
    Lf,
    CrLf,
}

impl LineBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineBreak::Lf => "\n",
            LineBreak::CrLf => "\r\n",
        }
    }
}

/// Key → content mapping that remembers declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    order: Vec<Key>,
    entries: HashMap<Key, TileContent>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A new key goes to the end of the declaration order.
    pub fn insert(&mut self, key: Key, content: TileContent) -> Option<TileContent> {
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(key, content)
    }

    pub fn get(&self, key: &Key) -> Option<&TileContent> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.order.iter()
    }

    /// Entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &TileContent)> {
        self.order.iter().map(|key| (key, &self.entries[key]))
    }
}

/// Dense coordinate → key storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    extents: Extents,
    cells: Vec<Option<Key>>,
}

impl Grid {
    pub fn new(extents: Extents) -> Self {
        Self {
            extents,
            cells: vec![None; extents.count()],
        }
    }

    pub fn extents(&self) -> Extents {
        self.extents
    }

    pub fn get(&self, coord: Coord) -> Option<&Key> {
        self.cells.get(self.extents.index(coord)?)?.as_ref()
    }

    /// Assign a key. Returns false when `coord` is out of bounds.
    pub fn set(&mut self, coord: Coord, key: Key) -> bool {
        match self.extents.index(coord) {
            Some(index) => {
                self.cells[index] = Some(key);
                true
            }
            None => false,
        }
    }

    /// Coordinates without a key, in scan order
    pub fn unassigned(&self) -> Vec<Coord> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(i, _)| self.extents.coord_at(i))
            .collect()
    }

    pub fn assigned_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Assigned cells in scan order
    pub fn iter(&self) -> impl Iterator<Item = (Coord, &Key)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| cell.as_ref().map(|key| (self.extents.coord_at(i), key)))
    }
}

/// Broken invariant on a finished map
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("coordinate {0} has no key")]
    Unassigned(Coord),
    #[error("key \"{key}\" has width {width}, expected {expected}")]
    KeyWidth {
        key: Key,
        width: usize,
        expected: usize,
    },
    #[error("grid references key \"{0}\" missing from the dictionary")]
    MissingEntry(Key),
    #[error("dictionary key \"{0}\" is not used by the grid")]
    Orphan(Key),
}

/// A complete map file: dictionary, grid and formatting metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapData {
    pub format: MapFormat,
    pub line_break: LineBreak,
    pub key_length: usize,
    pub dictionary: Dictionary,
    pub grid: Grid,
}

impl MapData {
    /// Empty map with the given key width and bounds
    pub fn new(
        format: MapFormat,
        line_break: LineBreak,
        key_length: usize,
        extents: Extents,
    ) -> Self {
        Self {
            format,
            line_break,
            key_length,
            dictionary: Dictionary::new(),
            grid: Grid::new(extents),
        }
    }

    pub fn extents(&self) -> Extents {
        self.grid.extents()
    }

    /// Content at a coordinate, resolved through its key
    pub fn content_at(&self, coord: Coord) -> Option<&TileContent> {
        self.dictionary.get(self.grid.get(coord)?)
    }

    /// Dictionary keys the grid never references, in declaration order
    pub fn unused_keys(&self) -> Vec<Key> {
        let used: HashSet<&Key> = self.grid.iter().map(|(_, key)| key).collect();
        self.dictionary
            .keys()
            .filter(|key| !used.contains(key))
            .cloned()
            .collect()
    }

    /// Verify a finished map: full coverage, uniform key width, and grid
    /// keys equal to dictionary keys.
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        if let Some(&coord) = self.grid.unassigned().first() {
            return Err(IntegrityError::Unassigned(coord));
        }

        let mut used = HashSet::new();
        for (_, key) in self.grid.iter() {
            if !self.dictionary.contains_key(key) {
                return Err(IntegrityError::MissingEntry(key.clone()));
            }
            used.insert(key);
        }

        for key in self.dictionary.keys() {
            if key.width() != self.key_length {
                return Err(IntegrityError::KeyWidth {
                    key: key.clone(),
                    width: key.width(),
                    expected: self.key_length,
                });
            }
            if !used.contains(key) {
                return Err(IntegrityError::Orphan(key.clone()));
            }
        }

        Ok(())
    }
}
