//! Editable tile grid
//!
//! The live map the editor mutates. Saving reads it through [`TileSource`].

use crate::content::{Instance, TileContent};
use crate::coord::{Coord, Extents};
use crate::dmm::MapData;

/// Supplies the current content of each coordinate.
///
/// Must return identical values for repeated calls on the same coordinate
/// for as long as a save holds the borrow.
pub trait TileSource {
    fn extents(&self) -> Extents;
    fn content(&self, coord: Coord) -> TileContent;
}

/// Dense in-memory tile storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    extents: Extents,
    tiles: Vec<TileContent>,
}

impl TileGrid {
    /// Grid where every tile holds `fill`
    pub fn new(extents: Extents, fill: TileContent) -> Self {
        Self {
            extents,
            tiles: vec![fill; extents.count()],
        }
    }

    /// Expand a map's dictionary + grid into per-tile contents
    pub fn from_map(map: &MapData) -> Self {
        let extents = map.extents();
        let tiles = extents
            .iter()
            .map(|coord| map.content_at(coord).cloned().unwrap_or_default())
            .collect();
        Self { extents, tiles }
    }

    pub fn tile(&self, coord: Coord) -> Option<&TileContent> {
        self.tiles.get(self.extents.index(coord)?)
    }

    pub fn tile_mut(&mut self, coord: Coord) -> Option<&mut TileContent> {
        let index = self.extents.index(coord)?;
        self.tiles.get_mut(index)
    }

    /// Replace a tile. Returns false when `coord` is out of bounds.
    pub fn set_tile(&mut self, coord: Coord, content: TileContent) -> bool {
        match self.tile_mut(coord) {
            Some(tile) => {
                *tile = content;
                true
            }
            None => false,
        }
    }

    /// Place an instance on top of a tile's stack
    pub fn push_instance(&mut self, coord: Coord, instance: Instance) -> bool {
        match self.tile_mut(coord) {
            Some(tile) => {
                tile.0.push(instance);
                true
            }
            None => false,
        }
    }
}

impl TileSource for TileGrid {
    fn extents(&self) -> Extents {
        self.extents
    }

    fn content(&self, coord: Coord) -> TileContent {
        self.tile(coord).cloned().unwrap_or_default()
    }
}
