//! Map file data and its textual grammar
//!
//! - `data`: dictionary + grid pair with formatting metadata
//! - `parse`: DMM / TGM reader
//! - `write`: DMM / TGM writer

pub mod data;
pub mod parse;
pub mod write;

pub use data::{Dictionary, Grid, IntegrityError, LineBreak, MapData, MapFormat, TGM_HEADER};
pub use parse::{ParseError, parse_map};
pub use write::render_map;
