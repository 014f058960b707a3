//! Map coordinates and extents
//!
//! Coordinates are 1-indexed, matching the map file grammar.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tile position, 1-indexed on every axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Coord {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

/// Map bounds. Every axis is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extents {
    pub max_x: u32,
    pub max_y: u32,
    pub max_z: u32,
}

impl Extents {
    /// Create extents, clamping each axis to at least 1
    pub fn new(max_x: u32, max_y: u32, max_z: u32) -> Self {
        Self {
            max_x: max_x.max(1),
            max_y: max_y.max(1),
            max_z: max_z.max(1),
        }
    }

    /// Total number of coordinates inside the bounds
    pub fn count(&self) -> usize {
        self.max_x as usize * self.max_y as usize * self.max_z as usize
    }

    pub fn contains(&self, coord: Coord) -> bool {
        (1..=self.max_x).contains(&coord.x)
            && (1..=self.max_y).contains(&coord.y)
            && (1..=self.max_z).contains(&coord.z)
    }

    /// Dense storage index for an in-bounds coordinate.
    ///
    /// Index order equals scan order, so iterating storage front to back
    /// visits z, then y, then x ascending.
    pub fn index(&self, coord: Coord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let x = (coord.x - 1) as usize;
        let y = (coord.y - 1) as usize;
        let z = (coord.z - 1) as usize;
        Some((z * self.max_y as usize + y) * self.max_x as usize + x)
    }

    /// Inverse of [`Extents::index`]
    pub fn coord_at(&self, index: usize) -> Coord {
        let mx = self.max_x as usize;
        let my = self.max_y as usize;
        Coord {
            x: (index % mx) as u32 + 1,
            y: ((index / mx) % my) as u32 + 1,
            z: (index / (mx * my)) as u32 + 1,
        }
    }

    /// Every coordinate in scan order (z, then y, then x, ascending)
    pub fn iter(&self) -> impl Iterator<Item = Coord> + use<> {
        let extents = *self;
        (0..extents.count()).map(move |i| extents.coord_at(i))
    }
}

impl fmt::Display for Extents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.max_x, self.max_y, self.max_z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_order_is_z_then_y_then_x() {
        let extents = Extents::new(2, 2, 2);
        let order: Vec<Coord> = extents.iter().collect();
        assert_eq!(order.len(), 8);
        assert_eq!(order[0], Coord::new(1, 1, 1));
        assert_eq!(order[1], Coord::new(2, 1, 1));
        assert_eq!(order[2], Coord::new(1, 2, 1));
        assert_eq!(order[4], Coord::new(1, 1, 2));
        assert_eq!(order[7], Coord::new(2, 2, 2));
    }

    #[test]
    fn test_index_round_trip() {
        let extents = Extents::new(3, 4, 2);
        for (i, coord) in extents.iter().enumerate() {
            assert_eq!(extents.index(coord), Some(i));
        }
        assert_eq!(extents.index(Coord::new(0, 1, 1)), None);
        assert_eq!(extents.index(Coord::new(4, 1, 1)), None);
    }

    #[test]
    fn test_extents_clamp_to_one() {
        let extents = Extents::new(0, 5, 0);
        assert_eq!(extents.count(), 5);
    }
}
