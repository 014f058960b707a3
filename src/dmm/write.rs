//! DMM / TGM map writer
//!
//! Dictionary entries are written in key-rank order; the grid follows the
//! map's layout (per z-level for standard maps, per column for TGM).

use std::fmt::Write as _;

use crate::content::{Instance, TileContent};
use crate::coord::Coord;
use crate::dmm::data::{MapData, MapFormat, TGM_HEADER};
use crate::keys::Key;

/// Render a map to text in its own format and line-break style
pub fn render_map(map: &MapData) -> String {
    let nl = map.line_break.as_str();
    let mut out = String::new();

    if map.format == MapFormat::Tgm {
        out.push_str(TGM_HEADER);
        out.push_str(nl);
    }

    let mut keys: Vec<&Key> = map.dictionary.keys().collect();
    keys.sort_by_key(|key| (key.rank(), key.as_str().to_string()));

    for key in keys {
        let Some(content) = map.dictionary.get(key) else {
            continue;
        };
        let _ = write!(out, "\"{}\" = (", key);
        match map.format {
            MapFormat::Standard => write_content_inline(&mut out, content),
            MapFormat::Tgm => write_content_tgm(&mut out, content, nl),
        }
        out.push(')');
        out.push_str(nl);
    }

    match map.format {
        MapFormat::Standard => write_grid_standard(&mut out, map, nl),
        MapFormat::Tgm => write_grid_tgm(&mut out, map, nl),
    }

    out
}

fn write_content_inline(out: &mut String, content: &TileContent) {
    for (i, instance) in content.instances().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{}", instance);
    }
}

fn write_content_tgm(out: &mut String, content: &TileContent, nl: &str) {
    for (i, instance) in content.instances().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(nl);
        write_instance_tgm(out, instance, nl);
    }
}

fn write_instance_tgm(out: &mut String, instance: &Instance, nl: &str) {
    out.push_str(&instance.path);
    if instance.vars.is_empty() {
        return;
    }
    out.push('{');
    for (i, (name, value)) in instance.vars.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        let _ = write!(out, "{}\t{} = {}", nl, name, value);
    }
    let _ = write!(out, "{}\t}}", nl);
}

fn key_at(map: &MapData, coord: Coord) -> &str {
    map.grid.get(coord).map(Key::as_str).unwrap_or_default()
}

fn write_grid_standard(out: &mut String, map: &MapData, nl: &str) {
    let extents = map.extents();
    for z in 1..=extents.max_z {
        out.push_str(nl);
        let _ = write!(out, "(1,1,{}) = {{\"{}", z, nl);
        for y in (1..=extents.max_y).rev() {
            for x in 1..=extents.max_x {
                out.push_str(key_at(map, Coord::new(x, y, z)));
            }
            out.push_str(nl);
        }
        out.push_str("\"}");
        out.push_str(nl);
    }
}

fn write_grid_tgm(out: &mut String, map: &MapData, nl: &str) {
    let extents = map.extents();
    for z in 1..=extents.max_z {
        for x in 1..=extents.max_x {
            out.push_str(nl);
            let _ = write!(out, "({},1,{}) = {{\"{}", x, z, nl);
            for y in (1..=extents.max_y).rev() {
                out.push_str(key_at(map, Coord::new(x, y, z)));
                out.push_str(nl);
            }
            out.push_str("\"}");
            out.push_str(nl);
        }
    }
}
