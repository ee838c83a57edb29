//! Error types for the fallible edges of the crate.
//!
//! Gameplay rejections (illegal placements, bad sacrifice selections) are not
//! errors; they surface as `None`/`false` from the session. Only I/O, config
//! and malformed data reach these types.

use std::path::PathBuf;

use thiserror::Error;

use crate::pieces::PieceType;

/// A grid could not be built from raw rows.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("row {row} contains {value}, cells must be 0 or 1")]
    InvalidCell { row: usize, value: u8 },
}

/// The hand is at its size limit; the piece was not added.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("hand is full ({limit} pieces), {piece} was not added")]
pub struct HandFull {
    pub piece: PieceType,
    pub limit: usize,
}

/// Failure reading or writing the save store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("save store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("save record could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A puzzle whose timer or layout could not have come from the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("board has no fillable cells")]
    EmptyBoard,
    #[error("timer {turns_left}/{max_turns} is out of range")]
    Timer { turns_left: u32, max_turns: u32 },
    #[error("required {0} does not fit the board")]
    Required(PieceType),
    #[error("placed piece {index} ({piece}) is off the board or overlaps another")]
    Placed { index: usize, piece: PieceType },
}

/// A decoded save record that breaks a session invariant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("puzzle {id}: {source}")]
    Layout {
        id: String,
        #[source]
        source: LayoutError,
    },
    #[error("puzzle {id} is listed under tier {listed}")]
    WrongTier { id: String, listed: u8 },
    #[error("tier {tier} holds {found} puzzles, at most {active} may be active")]
    TooManyPuzzles { tier: u8, found: usize, active: usize },
}
