//! Save orchestrator
//!
//! Re-encodes the live tile grid into a dictionary + grid pair while keeping
//! the baseline's key assignments wherever it can:
//!
//! 1. `ReusingBaseline`: content-addressed reuse of baseline keys
//! 2. `RestoringPositional`: unused baseline keys return to their old coordinates
//! 3. `FillingAndGrowing`: dedup, then pending pool, then fresh keys; widen
//!    keys and start over when the key space runs out
//! 4. `Committed`: the finished map goes to the committer in one call

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::baseline::{LoadError, PendingPool, load_baseline};
use crate::commit::MapCommitter;
use crate::content::{ContentIndex, TileContent};
use crate::coord::{Coord, Extents};
use crate::dmm::MapData;
use crate::keys::{Key, KeyAlloc, KeyGenerator};
use crate::model::TileSource;
use crate::settings::Settings;

/// Where a save attempt is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    ReusingBaseline,
    RestoringPositional,
    FillingAndGrowing,
    /// Terminal: the output was handed to the committer
    Committed,
    /// Terminal: nothing was written
    Aborted,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("unable to read map backup: {0}")]
    BaselineUnreadable(#[from] LoadError),
    #[error("unable to save the map: limit of keys exceeded (key length {max_key_length})")]
    KeySpaceExhausted { max_key_length: usize },
    #[error("unable to write {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("the map has no file yet; use save-as")]
    Untitled,
}

/// What a save did, for logs and the CLI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReport {
    /// Tiles that kept a baseline key by matching content
    pub reused_by_content: usize,
    /// Tiles that kept their old key at their old coordinate
    pub restored_by_position: usize,
    /// Tiles that shared a key assigned earlier in this save
    pub deduplicated: usize,
    /// Tiles given a leftover baseline key
    pub taken_from_pool: usize,
    /// Tiles given a freshly generated key
    pub generated: usize,
    /// Times the key width grew
    pub growths: usize,
    pub final_key_length: usize,
    pub dictionary_size: usize,
}

/// A finished, not yet committed, save result
#[derive(Debug)]
pub struct Compaction {
    pub output: MapData,
    pub report: SaveReport,
}

impl Compaction {
    /// Phase D: hand the output to storage in a single call
    pub fn commit<C: MapCommitter + ?Sized>(self, committer: &mut C) -> Result<SaveReport, SaveError> {
        debug_assert_eq!(self.output.check_integrity(), Ok(()));

        if let Err(source) = committer.commit(&self.output) {
            log::debug!("Save phase: {:?}", SavePhase::Aborted);
            return Err(SaveError::WriteFailure {
                path: committer.target(),
                source,
            });
        }

        log::debug!("Save phase: {:?}", SavePhase::Committed);
        log::info!(
            "Map saved to {}: {} keys of length {} ({} reused, {} restored, {} new, {} growths)",
            committer.target().display(),
            self.report.dictionary_size,
            self.report.final_key_length,
            self.report.reused_by_content,
            self.report.restored_by_position,
            self.report.taken_from_pool + self.report.generated,
            self.report.growths,
        );
        Ok(self.report)
    }
}

/// Load the baseline from `baseline_path`, compact `tiles` against it and
/// commit the result.
pub fn save<S, C>(
    baseline_path: &Path,
    tiles: &S,
    committer: &mut C,
    settings: &Settings,
) -> Result<SaveReport, SaveError>
where
    S: TileSource + ?Sized,
    C: MapCommitter + ?Sized,
{
    let baseline = load_baseline(baseline_path).inspect_err(|err| {
        log::error!("Unable to read map backup: {}", err);
    })?;
    save_with_baseline(&baseline, tiles, committer, settings)
}

/// Compact and commit against an already loaded baseline
pub fn save_with_baseline<S, C>(
    baseline: &MapData,
    tiles: &S,
    committer: &mut C,
    settings: &Settings,
) -> Result<SaveReport, SaveError>
where
    S: TileSource + ?Sized,
    C: MapCommitter + ?Sized,
{
    compact(baseline, tiles, settings.effective_max_key_length())?.commit(committer)
}

/// Phases A to C: build the output dictionary + grid without touching storage
pub fn compact<S: TileSource + ?Sized>(
    baseline: &MapData,
    tiles: &S,
    max_key_length: usize,
) -> Result<Compaction, SaveError> {
    compact_with_digest(baseline, tiles, max_key_length, TileContent::digest)
}

pub(crate) fn compact_with_digest<S: TileSource + ?Sized>(
    baseline: &MapData,
    tiles: &S,
    max_key_length: usize,
    digest: fn(&TileContent) -> u64,
) -> Result<Compaction, SaveError> {
    let mut state = SaveState::new(baseline, tiles.extents(), max_key_length, digest);

    state.reuse_baseline(tiles);
    state.restore_positional(tiles);
    if let Err(err) = state.fill_and_grow(tiles) {
        state.enter(SavePhase::Aborted);
        log::error!("{}", err);
        return Err(err);
    }

    Ok(state.finish())
}

/// Everything one save attempt owns
struct SaveState<'b> {
    baseline: &'b MapData,
    extents: Extents,
    digest: fn(&TileContent) -> u64,
    output: MapData,
    output_index: ContentIndex,
    pool: PendingPool,
    generator: KeyGenerator,
    phase: SavePhase,
    report: SaveReport,
}

impl<'b> SaveState<'b> {
    fn new(
        baseline: &'b MapData,
        extents: Extents,
        max_key_length: usize,
        digest: fn(&TileContent) -> u64,
    ) -> Self {
        let generator = KeyGenerator::new(baseline.key_length, max_key_length);
        Self {
            baseline,
            extents,
            digest,
            output: MapData::new(
                baseline.format,
                baseline.line_break,
                generator.key_length(),
                extents,
            ),
            output_index: ContentIndex::with_digest(digest),
            pool: PendingPool::from_baseline(baseline),
            generator,
            phase: SavePhase::ReusingBaseline,
            report: SaveReport::default(),
        }
    }

    fn enter(&mut self, phase: SavePhase) {
        log::debug!("Save phase: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Put `key` at `coord`. A key only ever names one content.
    fn assign(&mut self, coord: Coord, key: Key, content: TileContent) {
        match self.output.dictionary.get(&key) {
            Some(existing) => debug_assert_eq!(
                existing, &content,
                "key \"{}\" assigned two different contents",
                key
            ),
            None => {
                self.output_index.insert(key.clone(), &content);
                self.output.dictionary.insert(key.clone(), content);
            }
        }
        self.output.grid.set(coord, key);
    }

    /// Phase A. Prefers the coordinate's own baseline key when its content
    /// still matches, then the earliest declared equal entry.
    fn reuse_baseline<S: TileSource + ?Sized>(&mut self, tiles: &S) {
        let baseline = self.baseline;
        let mut index = ContentIndex::with_digest(self.digest);
        index.extend_from(&baseline.dictionary);

        for coord in self.extents.iter() {
            let content = tiles.content(coord);
            let own = baseline
                .grid
                .get(coord)
                .filter(|key| baseline.dictionary.get(key) == Some(&content));
            let Some(key) = own.or_else(|| index.find(&baseline.dictionary, &content)) else {
                continue;
            };
            let key = key.clone();
            self.pool.remove(&key);
            self.assign(coord, key, content);
            self.report.reused_by_content += 1;
        }
    }

    /// Phase B. Each pending key goes back to the first unassigned
    /// coordinate (scan order) the baseline grid put it at.
    fn restore_positional<S: TileSource + ?Sized>(&mut self, tiles: &S) {
        self.enter(SavePhase::RestoringPositional);
        if self.pool.is_empty() {
            return;
        }

        let pending: HashSet<Key> = self.pool.keys().into_iter().collect();
        let mut old_home: HashMap<Key, Coord> = HashMap::new();
        for coord in self.output.grid.unassigned() {
            if let Some(key) = self.baseline.grid.get(coord) {
                if pending.contains(key) && !old_home.contains_key(key) {
                    old_home.insert(key.clone(), coord);
                }
            }
        }

        for key in self.pool.keys() {
            let Some(&coord) = old_home.get(&key) else {
                continue;
            };
            self.pool.remove(&key);
            self.assign(coord, key, tiles.content(coord));
            self.report.restored_by_position += 1;
        }
    }

    /// Phase C, restarted from scratch at a wider key length whenever the
    /// generator runs dry.
    fn fill_and_grow<S: TileSource + ?Sized>(&mut self, tiles: &S) -> Result<(), SaveError> {
        self.enter(SavePhase::FillingAndGrowing);

        'fill: loop {
            for coord in self.output.grid.unassigned() {
                let content = tiles.content(coord);

                let key = if let Some(key) = self.output_index.find(&self.output.dictionary, &content) {
                    self.report.deduplicated += 1;
                    key.clone()
                } else if let Some(key) = self.pool.pop_front() {
                    self.report.taken_from_pool += 1;
                    key
                } else {
                    match self.generator.next(&self.output.dictionary) {
                        KeyAlloc::Key(key) => {
                            self.report.generated += 1;
                            key
                        }
                        KeyAlloc::NeedsGrowth => {
                            self.grow();
                            continue 'fill;
                        }
                        KeyAlloc::Exhausted => {
                            return Err(SaveError::KeySpaceExhausted {
                                max_key_length: self.generator.key_length(),
                            });
                        }
                    }
                };

                self.assign(coord, key, content);
            }
            return Ok(());
        }
    }

    /// Widen keys and discard everything built so far
    fn grow(&mut self) {
        let key_length = self.generator.grow();
        log::warn!(
            "Key space exhausted, growing key length to {} and re-encoding the whole map",
            key_length
        );

        self.output = MapData::new(
            self.output.format,
            self.output.line_break,
            key_length,
            self.extents,
        );
        self.output_index = ContentIndex::with_digest(self.digest);
        // Only reached once the pool is empty; narrower keys must not return
        self.pool.clear();

        self.report = SaveReport {
            growths: self.report.growths + 1,
            ..Default::default()
        };
    }

    fn finish(mut self) -> Compaction {
        self.report.final_key_length = self.output.key_length;
        self.report.dictionary_size = self.output.dictionary.len();
        Compaction {
            output: self.output,
            report: self.report,
        }
    }
}
