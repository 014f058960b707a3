//! DMM / TGM map reader
//!
//! Both layouts share one grammar: quoted-key dictionary entries followed by
//! grid blocks. A block at origin `(bx, by, bz)` with `n` rows puts row `i`,
//! key column `j` at `(bx + j, by + n - 1 - i, bz)`, so standard (one block
//! per z-level) and TGM (one block per column) files parse the same way.

use std::collections::HashMap;

use crate::content::{Instance, TileContent};
use crate::coord::{Coord, Extents};
use crate::dmm::data::{Dictionary, Grid, LineBreak, MapData, MapFormat, TGM_HEADER};
use crate::keys::Key;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("{0}")]
    Structure(String),
}

/// Parse a whole map file
pub fn parse_map(text: &str) -> Result<MapData, ParseError> {
    let format = if text.trim_start_matches('\u{feff}').starts_with(TGM_HEADER) {
        MapFormat::Tgm
    } else {
        MapFormat::Standard
    };
    let line_break = if text.contains("\r\n") {
        LineBreak::CrLf
    } else {
        LineBreak::Lf
    };

    let mut parser = Parser::new(text);
    let mut dictionary = Dictionary::new();
    let mut key_length = None;
    let mut cells: HashMap<Coord, Key> = HashMap::new();

    loop {
        parser.skip_trivia();
        match parser.peek() {
            None => break,
            Some(b'"') => {
                let line = parser.line;
                let (key, content) = parser.dictionary_entry()?;
                match key_length {
                    None => key_length = Some(key.width()),
                    Some(width) if width != key.width() => {
                        return Err(ParseError::Syntax {
                            line,
                            message: format!(
                                "key \"{}\" has width {}, expected {}",
                                key,
                                key.width(),
                                width
                            ),
                        });
                    }
                    Some(_) => {}
                }
                if dictionary.insert(key.clone(), content).is_some() {
                    return Err(ParseError::Syntax {
                        line,
                        message: format!("duplicate key \"{}\"", key),
                    });
                }
            }
            Some(b'(') => {
                let width = key_length.ok_or_else(|| {
                    parser.error("grid block before any dictionary entry")
                })?;
                parser.grid_block(width, &mut cells)?;
            }
            Some(c) => {
                return Err(parser.error(&format!("unexpected character '{}'", c as char)));
            }
        }
    }

    let key_length =
        key_length.ok_or_else(|| ParseError::Structure("map has no dictionary".to_string()))?;
    if cells.is_empty() {
        return Err(ParseError::Structure("map has no grid".to_string()));
    }

    let extents = cells.keys().fold(Extents::new(1, 1, 1), |e, c| {
        Extents::new(e.max_x.max(c.x), e.max_y.max(c.y), e.max_z.max(c.z))
    });
    // Cells are distinct and in bounds, so an equal count means full coverage
    let tile_count = (extents.max_x as usize)
        .checked_mul(extents.max_y as usize)
        .and_then(|n| n.checked_mul(extents.max_z as usize));
    if tile_count != Some(cells.len()) {
        return Err(ParseError::Structure(format!(
            "grid holds {} keys but spans {}",
            cells.len(),
            extents
        )));
    }

    let mut grid = Grid::new(extents);
    for (coord, key) in cells {
        if !dictionary.contains_key(&key) {
            return Err(ParseError::Structure(format!(
                "grid references undefined key \"{}\" at {}",
                key, coord
            )));
        }
        grid.set(coord, key);
    }

    Ok(MapData {
        format,
        line_break,
        key_length,
        dictionary,
        grid,
    })
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError::Syntax {
            line: self.line,
            message: message.to_string(),
        }
    }

    fn expect(&mut self, wanted: u8) -> Result<(), ParseError> {
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            Some(c) => Err(self.error(&format!(
                "expected '{}', found '{}'",
                wanted as char, c as char
            ))),
            None => Err(self.error(&format!("expected '{}', found end of file", wanted as char))),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.bump();
        }
    }

    /// Whitespace, byte order marks and `//` comment lines
    fn skip_trivia(&mut self) {
        loop {
            self.skip_whitespace();
            let rest = &self.src[self.pos..];
            if rest.starts_with("//") {
                while !matches!(self.peek(), None | Some(b'\n')) {
                    self.bump();
                }
            } else if rest.starts_with('\u{feff}') {
                self.pos += '\u{feff}'.len_utf8();
            } else {
                break;
            }
        }
    }

    /// `"key" = (instance, instance, ...)`
    fn dictionary_entry(&mut self) -> Result<(Key, TileContent), ParseError> {
        self.expect(b'"')?;
        let start = self.pos;
        while !matches!(self.peek(), None | Some(b'"') | Some(b'\n')) {
            self.bump();
        }
        let raw = &self.src[start..self.pos];
        let key = Key::parse(raw).ok_or_else(|| self.error(&format!("invalid key \"{}\"", raw)))?;
        self.expect(b'"')?;
        self.skip_whitespace();
        self.expect(b'=')?;
        self.skip_whitespace();
        self.expect(b'(')?;

        let mut instances = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b')') => {
                    self.bump();
                    break;
                }
                None => return Err(self.error("unterminated dictionary entry")),
                _ => {}
            }

            instances.push(self.instance()?);

            self.skip_whitespace();
            match self.bump() {
                Some(b',') => continue,
                Some(b')') => break,
                _ => return Err(self.error("expected ',' or ')' after instance")),
            }
        }

        Ok((key, TileContent::new(instances)))
    }

    /// `/type/path{name = value; ...}`
    fn instance(&mut self) -> Result<Instance, ParseError> {
        let start = self.pos;
        while !matches!(self.peek(), None | Some(b'{' | b',' | b')')) {
            if matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
                break;
            }
            self.bump();
        }
        let path = &self.src[start..self.pos];
        if !path.starts_with('/') {
            return Err(self.error(&format!("invalid type path \"{}\"", path)));
        }
        let mut instance = Instance::new(path);

        self.skip_whitespace();
        if self.peek() == Some(b'{') {
            self.bump();
            let line = self.line;
            let body = self.balanced(b'}')?;
            for statement in split_top_level(body, b';') {
                let statement = statement.trim();
                if statement.is_empty() {
                    continue;
                }
                let (name, value) = split_assignment(statement).ok_or_else(|| {
                    ParseError::Syntax {
                        line,
                        message: format!("malformed variable \"{}\"", statement),
                    }
                })?;
                instance.vars.push((name.to_string(), value.to_string()));
            }
        }

        Ok(instance)
    }

    /// Consume up to the `close` byte matching an already-consumed opener,
    /// skipping over quoted text and nested brackets. Returns the inner text.
    fn balanced(&mut self, close: u8) -> Result<&'a str, ParseError> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut quote = None;
        loop {
            let c = self
                .bump()
                .ok_or_else(|| self.error("unterminated block"))?;
            match quote {
                Some(q) => {
                    if c == b'\\' {
                        self.bump();
                    } else if c == q {
                        quote = None;
                    }
                }
                None => match c {
                    b'"' | b'\'' => quote = Some(c),
                    b'(' | b'[' | b'{' => depth += 1,
                    b')' | b']' | b'}' if depth > 0 => depth -= 1,
                    _ if c == close => {
                        let src = self.src;
                        return Ok(&src[start..self.pos - 1]);
                    }
                    _ => {}
                },
            }
        }
    }

    /// `(x,y,z) = {"` rows `"}`
    fn grid_block(
        &mut self,
        key_length: usize,
        cells: &mut HashMap<Coord, Key>,
    ) -> Result<(), ParseError> {
        self.expect(b'(')?;
        let header_line = self.line;
        let origin = self.balanced(b')')?;
        let parts: Vec<u32> = origin
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| ParseError::Syntax {
                line: header_line,
                message: format!("invalid block origin \"({})\"", origin),
            })?;
        let &[bx, by, bz] = parts.as_slice() else {
            return Err(ParseError::Syntax {
                line: header_line,
                message: format!("block origin needs three components, got \"({})\"", origin),
            });
        };
        if bx == 0 || by == 0 || bz == 0 {
            return Err(ParseError::Syntax {
                line: header_line,
                message: "block origin is 1-indexed".to_string(),
            });
        }

        self.skip_whitespace();
        self.expect(b'=')?;
        self.skip_whitespace();
        self.expect(b'{')?;
        self.expect(b'"')?;

        let body_line = self.line;
        let src = self.src;
        let rest = &src[self.pos..];
        let end = rest
            .find("\"}")
            .ok_or_else(|| self.error("unterminated grid block"))?;
        let body = &rest[..end];
        for _ in 0..end + 2 {
            self.bump();
        }

        let rows: Vec<&str> = body
            .lines()
            .map(|row| row.trim_end_matches('\r'))
            .filter(|row| !row.is_empty())
            .collect();
        let out_of_range = |line| ParseError::Syntax {
            line,
            message: format!("block at ({}) runs past the largest coordinate", origin),
        };
        for (i, row) in rows.iter().enumerate() {
            let line = body_line + 1 + i;
            if row.len() % key_length != 0 || !row.is_ascii() {
                return Err(ParseError::Syntax {
                    line,
                    message: format!("row length is not a multiple of key width {}", key_length),
                });
            }
            let y = u32::try_from(rows.len() - 1 - i)
                .ok()
                .and_then(|dy| by.checked_add(dy))
                .ok_or_else(|| out_of_range(line))?;
            for (j, chunk) in row.as_bytes().chunks(key_length).enumerate() {
                let raw = std::str::from_utf8(chunk).unwrap_or_default();
                let key = Key::parse(raw).ok_or_else(|| ParseError::Syntax {
                    line,
                    message: format!("invalid key \"{}\" in grid", raw),
                })?;
                let x = u32::try_from(j)
                    .ok()
                    .and_then(|dx| bx.checked_add(dx))
                    .ok_or_else(|| out_of_range(line))?;
                cells.insert(Coord::new(x, y, bz), key);
            }
        }

        Ok(())
    }
}

/// Split on `sep` outside quotes and brackets
fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut quote = None;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) => {
                if c == b'\\' {
                    i += 1;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                b'"' | b'\'' => quote = Some(c),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth = depth.saturating_sub(1),
                _ if c == sep && depth == 0 => {
                    parts.push(&text[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
        i += 1;
    }
    parts.push(&text[start..]);
    parts
}

/// `name = value`, splitting on the first top-level '='
fn split_assignment(statement: &str) -> Option<(&str, &str)> {
    let (name, value) = statement.split_once('=')?;
    let name = name.trim();
    if name.is_empty() || name.contains(['"', '\'']) {
        return None;
    }
    Some((name, value.trim()))
}
