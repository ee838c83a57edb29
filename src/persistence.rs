//! Saving and restoring sessions.
//!
//! The save record is camelCase JSON:
//! - `version`: schema version, currently [`SAVE_VERSION`]
//! - `handPieces`: `[{type, expiry?}]`
//! - `tier1Puzzles`, `tier2Puzzles`: active puzzles
//! - `seenCanonicalKeys`: newest `seen_key_cap` keys, oldest first
//! - `puzzleHistory`: newest `history_cap` finished puzzles
//! - `puzzleSequenceCounters`: `{"1": n, "2": n}`
//! - `points`, `totalTurns`, `stats`
//!
//! Older records are brought forward by [`MIGRATIONS`]. Anything that cannot
//! be migrated or decoded, or whose boards could not have come out of the
//! placement engine, is dropped and the caller starts fresh.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::GameConfig;
use crate::error::{RecordError, StoreError};
use crate::generator::PuzzleGenerator;
use crate::grid::CanonicalKey;
use crate::pieces::HandPiece;
use crate::placement::check_layout;
use crate::puzzle::{Puzzle, Tier};
use crate::session::{GameSession, HistoryEntry, Stats};

pub const SAVE_VERSION: u64 = 3;
pub const SAVE_KEY: &str = "polyfit.save";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceCounters {
    #[serde(rename = "1")]
    pub tier1: u32,
    #[serde(rename = "2")]
    pub tier2: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    pub version: u64,
    pub hand_pieces: Vec<HandPiece>,
    pub tier1_puzzles: Vec<Puzzle>,
    pub tier2_puzzles: Vec<Puzzle>,
    #[serde(default)]
    pub seen_canonical_keys: Vec<CanonicalKey>,
    pub puzzle_history: Vec<HistoryEntry>,
    pub puzzle_sequence_counters: SequenceCounters,
    pub points: u64,
    pub total_turns: u64,
    pub stats: Stats,
}

fn newest<T: Clone>(items: &[T], cap: usize) -> Vec<T> {
    items[items.len().saturating_sub(cap)..].to_vec()
}

impl SaveRecord {
    /// Snapshots a session, applying the configured caps.
    pub fn from_session(session: &GameSession) -> Self {
        let config = session.config();
        let [tier1, tier2] = session.generator().counters();
        Self {
            version: SAVE_VERSION,
            hand_pieces: session.hand().pieces().to_vec(),
            tier1_puzzles: session.tier(Tier::One).puzzles().to_vec(),
            tier2_puzzles: session.tier(Tier::Two).puzzles().to_vec(),
            seen_canonical_keys: newest(session.generator().seen_keys(), config.seen_key_cap),
            puzzle_history: newest(session.history(), config.history_cap),
            puzzle_sequence_counters: SequenceCounters { tier1, tier2 },
            points: session.points(),
            total_turns: session.total_turns(),
            stats: session.stats(),
        }
    }

    fn puzzles(&self, tier: Tier) -> &[Puzzle] {
        match tier {
            Tier::One => &self.tier1_puzzles,
            Tier::Two => &self.tier2_puzzles,
        }
    }

    /// Checks that every stored puzzle sits in its own tier's list and
    /// replays cleanly through the placement rules.
    pub fn check(&self) -> Result<(), RecordError> {
        for tier in Tier::ALL {
            for puzzle in self.puzzles(tier) {
                if puzzle.tier != tier {
                    return Err(RecordError::WrongTier {
                        id: puzzle.id.clone(),
                        listed: tier.number(),
                    });
                }
                check_layout(puzzle).map_err(|source| RecordError::Layout {
                    id: puzzle.id.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    /// Checks the tier lists against the active counts of `config`.
    pub fn check_capacity(&self, config: &GameConfig) -> Result<(), RecordError> {
        for tier in Tier::ALL {
            let found = self.puzzles(tier).len();
            let active = config.tier(tier).active;
            if found > active {
                return Err(RecordError::TooManyPuzzles {
                    tier: tier.number(),
                    found,
                    active,
                });
            }
        }
        Ok(())
    }

    /// Rebuilds a session. The RNG is not part of the record, so the
    /// restored session continues from `seed`.
    pub fn into_session(self, config: GameConfig, seed: u64) -> GameSession {
        let mut generator = PuzzleGenerator::new(seed);
        let counters = self.puzzle_sequence_counters;
        generator.restore(self.seen_canonical_keys, [counters.tier1, counters.tier2]);
        GameSession::from_parts(
            config,
            generator,
            self.hand_pieces,
            self.tier1_puzzles,
            self.tier2_puzzles,
            self.points,
            self.total_turns,
            self.stats,
            self.puzzle_history,
        )
    }
}

/// One schema upgrade, from the version in the table to the next.
pub type Migration = fn(Value) -> Value;

/// Known upgrades, applied in order.
pub const MIGRATIONS: [(u64, Migration); 2] =
    [(1, add_progress_fields), (2, hand_entries_to_objects)];

/// 1 -> 2: fill in the progress fields introduced in version 2.
fn add_progress_fields(mut record: Value) -> Value {
    if let Some(fields) = record.as_object_mut() {
        fields.entry("stats").or_insert_with(|| json!(Stats::default()));
        fields.entry("totalTurns").or_insert(json!(0));
        fields.entry("puzzleHistory").or_insert(json!([]));
        fields
            .entry("puzzleSequenceCounters")
            .or_insert(json!({ "1": 0, "2": 0 }));
        fields.insert("version".into(), json!(2));
    }
    record
}

/// 2 -> 3: bare piece names in the hand become `{type}` objects.
fn hand_entries_to_objects(mut record: Value) -> Value {
    if let Some(fields) = record.as_object_mut() {
        if let Some(Value::Array(hand)) = fields.get_mut("handPieces") {
            for entry in hand.iter_mut() {
                if let Value::String(name) = entry {
                    *entry = json!({ "type": name });
                }
            }
        }
        fields.insert("version".into(), json!(3));
    }
    record
}

/// Brings a raw record up to [`SAVE_VERSION`].
///
/// A record without a version is treated as version 1. Returns `None` when
/// the record is from a newer build or no migration path exists.
pub fn migrate(mut record: Value) -> Option<Value> {
    let mut version = match record.get("version") {
        None => 1,
        Some(found) => found.as_u64()?,
    };
    if version > SAVE_VERSION {
        log::warn!("save version {version} is newer than {SAVE_VERSION}");
        return None;
    }
    for (from, step) in MIGRATIONS {
        if version == from {
            record = step(record);
            version = from + 1;
            log::info!("migrated save from version {from} to {version}");
        }
    }
    (version == SAVE_VERSION).then_some(record)
}

/// Parses, migrates and decodes a saved record.
pub fn load_record(contents: &str) -> Option<SaveRecord> {
    let raw: Value = match serde_json::from_str(contents) {
        Ok(raw) => raw,
        Err(err) => {
            log::warn!("discarding unreadable save: {err}");
            return None;
        }
    };
    let Some(current) = migrate(raw) else {
        log::warn!("discarding save with unsupported version");
        return None;
    };
    let record: SaveRecord = match serde_json::from_value(current) {
        Ok(record) => record,
        Err(err) => {
            log::warn!("discarding malformed save: {err}");
            return None;
        }
    };
    match record.check() {
        Ok(()) => Some(record),
        Err(err) => {
            log::warn!("discarding inconsistent save: {err}");
            None
        }
    }
}

/// Key/value storage for save records.
pub trait SaveStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&mut self, key: &str, contents: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Stores each key as `<key>.json` in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl SaveStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path)(err)),
        }
    }

    fn write(&mut self, key: &str, contents: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        let path = self.path_for(key);
        // write then rename so a crash never leaves half a save behind
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, contents).map_err(io_error(&staging))?;
        fs::rename(&staging, &path).map_err(io_error(&path))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(io_error(&path)(err)),
            _ => Ok(()),
        }
    }
}

/// In-process store, used by tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: FxHashMap<String, String>,
}

impl SaveStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, contents: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), contents.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

pub fn save_session(store: &mut impl SaveStore, session: &GameSession) -> Result<(), StoreError> {
    let contents = serde_json::to_string(&SaveRecord::from_session(session))?;
    store.write(SAVE_KEY, &contents)
}

/// Restores the saved session, or `None` if there is nothing usable.
pub fn load_session(store: &impl SaveStore, config: GameConfig, seed: u64) -> Option<GameSession> {
    let contents = match store.read(SAVE_KEY) {
        Ok(contents) => contents?,
        Err(err) => {
            log::warn!("cannot read save: {err}");
            return None;
        }
    };
    let record = load_record(&contents)?;
    if let Err(err) = record.check_capacity(&config) {
        log::warn!("discarding save for a different configuration: {err}");
        return None;
    }
    Some(record.into_session(config, seed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pieces::{Orientation, PieceType};
    use crate::placement::Cell;
    use crate::session::PuzzleRef;

    fn played_session() -> GameSession {
        let mut session = GameSession::new(GameConfig::default(), 5);
        let dot = session
            .hand()
            .pieces()
            .iter()
            .position(|held| held.piece == PieceType::Dot)
            .unwrap();
        session
            .place_from_hand(
                dot,
                PuzzleRef::new(Tier::Two, 0),
                Orientation::IDENTITY,
                Cell::new(0, 0),
            )
            .unwrap();
        session
    }

    fn record_value(session: &GameSession) -> Value {
        serde_json::to_value(SaveRecord::from_session(session)).unwrap()
    }

    #[test]
    fn test_round_trip_through_store() {
        let session = played_session();
        let mut store = MemoryStore::default();
        save_session(&mut store, &session).unwrap();

        let restored = load_session(&store, GameConfig::default(), 1).unwrap();
        assert_eq!(restored.total_turns(), 1);
        assert_eq!(restored.hand().pieces(), session.hand().pieces());
        for tier in Tier::ALL {
            assert_eq!(restored.tier(tier).puzzles(), session.tier(tier).puzzles());
        }
        assert_eq!(
            restored.generator().counters(),
            session.generator().counters()
        );
        assert_eq!(restored.generator().seen_keys(), session.generator().seen_keys());
    }

    #[test]
    fn test_record_uses_camel_case_keys() {
        let value = record_value(&played_session());
        for key in [
            "version",
            "handPieces",
            "tier1Puzzles",
            "tier2Puzzles",
            "seenCanonicalKeys",
            "puzzleHistory",
            "puzzleSequenceCounters",
            "points",
            "totalTurns",
            "stats",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["version"], json!(3));
        assert_eq!(value["puzzleSequenceCounters"]["1"], json!(4));
        assert_eq!(value["stats"]["tier1Solved"], json!(0));
        assert_eq!(value["handPieces"][0]["type"], json!("domino"));
        assert_eq!(value["tier1Puzzles"][0]["tier"], json!(1));
    }

    #[test]
    fn test_version_two_hand_strings_are_normalized() {
        let mut value = record_value(&played_session());
        value["version"] = json!(2);
        value["handPieces"] = json!(["dot", "tetro_s"]);

        let record = load_record(&value.to_string()).unwrap();
        assert_eq!(record.version, SAVE_VERSION);
        assert_eq!(
            record.hand_pieces,
            vec![
                HandPiece::new(PieceType::Dot, None),
                HandPiece::new(PieceType::TetroS, None)
            ]
        );
    }

    #[test]
    fn test_version_one_gains_progress_fields() {
        let mut value = record_value(&played_session());
        let fields = value.as_object_mut().unwrap();
        for key in ["stats", "totalTurns", "puzzleHistory", "puzzleSequenceCounters"] {
            fields.remove(key);
        }
        fields.insert("version".into(), json!(1));
        fields.insert("handPieces".into(), json!(["domino"]));

        let record = load_record(&value.to_string()).unwrap();
        assert_eq!(record.stats, Stats::default());
        assert_eq!(record.total_turns, 0);
        assert!(record.puzzle_history.is_empty());
        assert_eq!(record.puzzle_sequence_counters, SequenceCounters::default());
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let mut value = record_value(&played_session());
        value["version"] = json!(1);
        value["handPieces"] = json!(["dot"]);
        for (_, step) in MIGRATIONS {
            let once = step(value.clone());
            assert_eq!(step(once.clone()), once);
        }
    }

    #[test]
    fn test_unusable_saves_are_discarded() {
        let mut future = record_value(&played_session());
        future["version"] = json!(SAVE_VERSION + 1);
        assert!(load_record(&future.to_string()).is_none());
        assert!(load_record("{not json").is_none());
        assert!(load_record(r#"{"version":3,"handPieces":7}"#).is_none());

        let mut store = MemoryStore::default();
        store.write(SAVE_KEY, "garbage").unwrap();
        assert!(load_session(&store, GameConfig::default(), 0).is_none());
        assert!(load_session(&MemoryStore::default(), GameConfig::default(), 0).is_none());
    }

    #[test]
    fn test_impossible_boards_are_discarded() {
        let mut value = record_value(&played_session());
        value["tier1Puzzles"][0]["grid"] = json!([[1, 1, 1, 1]]);
        value["tier1Puzzles"][0]["requiredPiece"] = Value::Null;
        value["tier1Puzzles"][0]["placedPieces"] = json!([
            {"type": "domino", "rotation": 0, "mirror": false, "row": 0, "col": 0},
            {"type": "dot", "rotation": 0, "mirror": false, "row": 40, "col": 40},
        ]);
        assert!(load_record(&value.to_string()).is_none());

        // the same board without the stray dot is fine
        value["tier1Puzzles"][0]["placedPieces"] = json!([
            {"type": "domino", "rotation": 0, "mirror": false, "row": 0, "col": 0},
        ]);
        assert!(load_record(&value.to_string()).is_some());

        let mut overlapping = value.clone();
        overlapping["tier1Puzzles"][0]["placedPieces"] = json!([
            {"type": "domino", "rotation": 0, "mirror": false, "row": 0, "col": 0},
            {"type": "domino", "rotation": 0, "mirror": false, "row": 0, "col": 1},
        ]);
        assert!(load_record(&overlapping.to_string()).is_none());

        let mut no_timer = value.clone();
        no_timer["tier1Puzzles"][0]["maxTurns"] = json!(0);
        assert!(load_record(&no_timer.to_string()).is_none());

        let mut misfiled = value.clone();
        misfiled["tier1Puzzles"][0]["tier"] = json!(2);
        assert!(load_record(&misfiled.to_string()).is_none());
    }

    #[test]
    fn test_too_many_active_puzzles_are_discarded() {
        let session = played_session();
        let mut record = SaveRecord::from_session(&session);
        let extra = record.tier2_puzzles[0].clone();
        record.tier2_puzzles.push(extra);
        assert!(record.check().is_ok());
        assert!(matches!(
            record.check_capacity(&GameConfig::default()),
            Err(RecordError::TooManyPuzzles { tier: 2, .. })
        ));

        let mut store = MemoryStore::default();
        store
            .write(SAVE_KEY, &serde_json::to_string(&record).unwrap())
            .unwrap();
        assert!(load_session(&store, GameConfig::default(), 0).is_none());
    }

    #[test]
    fn test_caps_keep_newest_entries() {
        let mut config = GameConfig::default();
        config.seen_key_cap = 3;
        let session = GameSession::new(config, 8);
        let record = SaveRecord::from_session(&session);
        let seen = session.generator().seen_keys();
        assert_eq!(record.seen_canonical_keys, seen[seen.len() - 3..].to_vec());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("polyfit-store-{}", std::process::id()));
        let mut store = FileStore::new(&dir);
        assert_eq!(store.read("slot").unwrap(), None);
        store.write("slot", "{}").unwrap();
        assert_eq!(store.read("slot").unwrap().as_deref(), Some("{}"));
        assert!(store.path_for("slot").exists());
        store.remove("slot").unwrap();
        store.remove("slot").unwrap();
        assert_eq!(store.read("slot").unwrap(), None);
        fs::remove_dir_all(&dir).unwrap();
    }
}
