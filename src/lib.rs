//! dmm-compact - diff-friendly key-dictionary compaction for tile maps
//!
//! Core modules:
//! - `content`: Tile contents, digests and equality-confirmed lookup
//! - `keys`: Dictionary keys and the growing key generator
//! - `save`: Three-phase reuse / fill / grow save orchestrator
//! - `baseline`: Previously persisted map as a stability reference
//! - `commit`: Atomic hand-off of the finished map to storage
//! - `dmm`: Map data and the DMM / TGM text grammar
//! - `document`: Open maps with backup-based baselines
//! - `settings`: JSON-persisted saver settings

pub mod baseline;
pub mod commit;
pub mod content;
pub mod coord;
pub mod dmm;
pub mod document;
pub mod keys;
pub mod model;
pub mod save;
pub mod settings;

pub use content::{Instance, TileContent};
pub use coord::{Coord, Extents};
pub use document::MapDocument;
pub use keys::Key;
pub use model::{TileGrid, TileSource};
pub use save::{SaveError, SaveReport};
pub use settings::Settings;

/// Key space constants
pub mod consts {
    /// Key symbols in generation order
    pub const KEY_ALPHABET: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    /// Widest key the map grammar accepts
    pub const KEY_LENGTH_CEILING: usize = 3;
    /// Generator ceiling unless settings say otherwise
    pub const DEFAULT_MAX_KEY_LENGTH: usize = KEY_LENGTH_CEILING;
}

