//! Tile content model
//!
//! What occupies one grid cell: an ordered stack of object instances.
//! Digests are lookup hints only. Every digest hit is confirmed with a full
//! structural comparison before a key is reused.

use std::collections::HashMap;
use std::fmt;

use crate::dmm::Dictionary;
use crate::keys::Key;

/// One placed object: a type path plus its variable overrides
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Instance {
    pub path: String,
    /// Overrides in declaration order. Values are literal source text.
    pub vars: Vec<(String, String)>,
}

impl Instance {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            vars: Vec::new(),
        }
    }

    /// Builder-style variable override
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.push((name.into(), value.into()));
        self
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if !self.vars.is_empty() {
            f.write_str("{")?;
            for (i, (name, value)) in self.vars.iter().enumerate() {
                if i > 0 {
                    f.write_str("; ")?;
                }
                write!(f, "{} = {}", name, value)?;
            }
            f.write_str("}")?;
        }
        Ok(())
    }
}

/// The ordered instance stack of one tile. Order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TileContent(pub Vec<Instance>);

impl TileContent {
    pub fn new(instances: Vec<Instance>) -> Self {
        Self(instances)
    }

    pub fn instances(&self) -> &[Instance] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Deterministic 64-bit FNV-1a digest of the ordered instances.
    ///
    /// Separators are ASCII control characters, which never appear in
    /// paths, names or literal values, so distinct stacks produce distinct
    /// canonical strings.
    pub fn digest(&self) -> u64 {
        let mut canonical = String::new();
        for instance in &self.0 {
            canonical.push_str(&instance.path);
            for (name, value) in &instance.vars {
                canonical.push('\u{1e}');
                canonical.push_str(name);
                canonical.push('\u{1f}');
                canonical.push_str(value);
            }
            canonical.push('\u{1c}');
        }
        const_fnv1a_hash::fnv1a_hash_str_64(&canonical)
    }
}

impl From<Vec<Instance>> for TileContent {
    fn from(instances: Vec<Instance>) -> Self {
        Self(instances)
    }
}

/// Digest-bucketed reverse lookup from content to dictionary key.
///
/// Buckets hold candidate keys in insertion order; `find` returns the first
/// candidate whose dictionary content is structurally equal.
#[derive(Debug, Clone)]
pub struct ContentIndex {
    buckets: HashMap<u64, Vec<Key>>,
    digest: fn(&TileContent) -> u64,
}

impl Default for ContentIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentIndex {
    pub fn new() -> Self {
        Self::with_digest(TileContent::digest)
    }

    /// Index using a custom digest function (tests force collisions this way)
    pub fn with_digest(digest: fn(&TileContent) -> u64) -> Self {
        Self {
            buckets: HashMap::new(),
            digest,
        }
    }

    /// Index every entry of a dictionary in declaration order
    pub fn build(dictionary: &Dictionary) -> Self {
        let mut index = Self::new();
        index.extend_from(dictionary);
        index
    }

    pub fn extend_from(&mut self, dictionary: &Dictionary) {
        for (key, content) in dictionary.iter() {
            self.insert(key.clone(), content);
        }
    }

    pub fn insert(&mut self, key: Key, content: &TileContent) {
        let bucket = self.buckets.entry((self.digest)(content)).or_default();
        if !bucket.contains(&key) {
            bucket.push(key);
        }
    }

    /// Find the key whose entry in `dictionary` equals `content`
    pub fn find<'a>(&'a self, dictionary: &Dictionary, content: &TileContent) -> Option<&'a Key> {
        self.buckets
            .get(&(self.digest)(content))?
            .iter()
            .find(|key| dictionary.get(key) == Some(content))
    }
}
