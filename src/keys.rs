//! Dictionary keys and the key generator
//!
//! Keys are fixed-width strings over a 52-symbol alphabet. Their rank is the
//! base-52 value of the string, which is the order the generator walks.

use std::fmt;

use crate::consts::KEY_ALPHABET;
use crate::dmm::Dictionary;

/// Number of symbols a key character can take
pub const ALPHABET_SIZE: u64 = KEY_ALPHABET.len() as u64;

/// An opaque dictionary key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    /// Wrap a key string without validation
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Validate that every character belongs to the alphabet
    pub fn parse(key: &str) -> Option<Self> {
        if key.is_empty() || !key.bytes().all(|b| KEY_ALPHABET.contains(&b)) {
            return None;
        }
        Some(Self(key.to_string()))
    }

    /// Key at `rank` in the ordered space of the given width
    pub fn from_rank(mut rank: u64, width: usize) -> Self {
        let mut bytes = vec![KEY_ALPHABET[0]; width];
        for slot in bytes.iter_mut().rev() {
            *slot = KEY_ALPHABET[(rank % ALPHABET_SIZE) as usize];
            rank /= ALPHABET_SIZE;
        }
        Self(bytes.into_iter().map(char::from).collect())
    }

    /// Position in the ordered key space, or None for foreign characters
    pub fn rank(&self) -> Option<u64> {
        self.0.bytes().try_fold(0u64, |acc, b| {
            let digit = KEY_ALPHABET.iter().position(|&c| c == b)? as u64;
            Some(acc * ALPHABET_SIZE + digit)
        })
    }

    pub fn width(&self) -> usize {
        self.0.len()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Number of keys available at a width
pub fn key_space(width: usize) -> u64 {
    ALPHABET_SIZE.saturating_pow(width as u32)
}

/// Outcome of asking the generator for a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAlloc {
    Key(Key),
    /// The current width is used up; grow and retry
    NeedsGrowth,
    /// The width ceiling is reached and used up
    Exhausted,
}

/// Walks the key space at the current width in rank order.
///
/// Owned by a single save attempt.
#[derive(Debug)]
pub struct KeyGenerator {
    key_length: usize,
    max_key_length: usize,
    cursor: u64,
}

impl KeyGenerator {
    pub fn new(key_length: usize, max_key_length: usize) -> Self {
        Self {
            key_length: key_length.max(1),
            max_key_length,
            cursor: 0,
        }
    }

    pub fn key_length(&self) -> usize {
        self.key_length
    }

    /// Next key not already present in `taken`
    pub fn next(&mut self, taken: &Dictionary) -> KeyAlloc {
        let space = key_space(self.key_length);
        while self.cursor < space {
            let key = Key::from_rank(self.cursor, self.key_length);
            self.cursor += 1;
            if !taken.contains_key(&key) {
                return KeyAlloc::Key(key);
            }
        }

        if self.key_length < self.max_key_length {
            KeyAlloc::NeedsGrowth
        } else {
            KeyAlloc::Exhausted
        }
    }

    /// Widen keys by one symbol and restart from the first key
    pub fn grow(&mut self) -> usize {
        self.key_length += 1;
        self.cursor = 0;
        self.key_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::TileContent;

    #[test]
    fn test_rank_round_trip() {
        assert_eq!(Key::from_rank(0, 2).as_str(), "aa");
        assert_eq!(Key::from_rank(1, 2).as_str(), "ab");
        assert_eq!(Key::from_rank(26, 2).as_str(), "aA");
        assert_eq!(Key::from_rank(52, 2).as_str(), "ba");
        assert_eq!(Key::from_rank(52 * 52 - 1, 2).as_str(), "ZZ");
        assert_eq!(Key::new("bZ").rank(), Some(52 + 51));
        assert_eq!(Key::new("a1").rank(), None);
    }

    #[test]
    fn test_parse_rejects_foreign_characters() {
        assert!(Key::parse("aZ").is_some());
        assert!(Key::parse("a-").is_none());
        assert!(Key::parse("").is_none());
    }

    #[test]
    fn test_generator_skips_taken_keys() {
        let mut taken = Dictionary::new();
        taken.insert(Key::new("a"), TileContent::default());
        taken.insert(Key::new("c"), TileContent::default());

        let mut generator = KeyGenerator::new(1, 3);
        assert_eq!(generator.next(&taken), KeyAlloc::Key(Key::new("b")));
        assert_eq!(generator.next(&taken), KeyAlloc::Key(Key::new("d")));
    }

    #[test]
    fn test_generator_growth_and_exhaustion() {
        let taken = Dictionary::new();
        let mut generator = KeyGenerator::new(1, 2);
        for _ in 0..52 {
            assert!(matches!(generator.next(&taken), KeyAlloc::Key(_)));
        }
        assert_eq!(generator.next(&taken), KeyAlloc::NeedsGrowth);
        assert_eq!(generator.grow(), 2);
        assert_eq!(generator.next(&taken), KeyAlloc::Key(Key::new("aa")));

        let mut capped = KeyGenerator::new(1, 1);
        for _ in 0..52 {
            capped.next(&taken);
        }
        assert_eq!(capped.next(&taken), KeyAlloc::Exhausted);
    }
}
