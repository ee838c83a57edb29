//! Polyomino Placement Game Library
//!
//! Provides the engine for a two-tier polyomino packing game: procedurally
//! generated boards, a hand of pieces to fill them with, and a shared turn
//! clock that ticks every active board at once.

pub mod config;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod grid;
pub mod hand;
pub mod library;
pub mod persistence;
pub mod pieces;
pub mod placement;
pub mod puzzle;
pub mod puzzle_set;
pub mod render;
pub mod session;

pub use config::{GameConfig, RuleSet, TierConfig};
pub use geometry::Grid;
pub use grid::{canonical_key, CanonicalKey};
pub use pieces::{Orientation, PieceType, PlacedPiece};
pub use placement::Cell;
pub use puzzle::{Puzzle, Tier};
pub use session::{GameSession, PuzzleRef};
