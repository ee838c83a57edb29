//! The puzzle value type: a board, its timer and the pieces placed on it.

use serde::{Deserialize, Serialize};

use crate::config::RuleSet;
use crate::geometry::Grid;
use crate::pieces::{PieceType, PlacedPiece};

/// Difficulty/reward class of a puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Tier {
    /// Small boards that reward a piece.
    One,
    /// Larger boards that reward points.
    Two,
}

impl Tier {
    pub const ALL: [Tier; 2] = [Tier::One, Tier::Two];

    pub fn number(self) -> u8 {
        match self {
            Tier::One => 1,
            Tier::Two => 2,
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.number() as usize - 1
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.number()
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Tier::One),
            2 => Ok(Tier::Two),
            other => Err(format!("unknown tier {other}")),
        }
    }
}

/// An active puzzle.
///
/// `grid` marks fillable cells with `true`. Placed pieces are pairwise
/// disjoint and lie on fillable cells; the placement engine is the only
/// path that adds to `placed_pieces`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Puzzle {
    pub id: String,
    pub grid: Grid,
    pub tier: Tier,
    /// Fixed award, or the par value when par scoring is on.
    pub points: u32,
    #[serde(default)]
    pub reward_piece_type: Option<PieceType>,
    pub turns_left: u32,
    pub max_turns: u32,
    #[serde(default)]
    pub placed_pieces: Vec<PlacedPiece>,
    #[serde(default)]
    pub required_piece: Option<PlacedPiece>,
}

impl Puzzle {
    pub fn fillable_count(&self) -> usize {
        self.grid.cell_count()
    }

    /// Cells covered by placed pieces, counted by their transformed shapes.
    pub fn covered_count(&self) -> usize {
        self.placed_pieces
            .iter()
            .map(|placed| placed.piece.cell_count())
            .sum()
    }

    /// True when the required placement (if any) is on the board verbatim.
    pub fn has_required_placement(&self) -> bool {
        match &self.required_piece {
            None => true,
            Some(required) => self
                .placed_pieces
                .iter()
                .any(|placed| placed.same_placement(required)),
        }
    }

    /// Every fillable cell is covered and the required placement is present.
    pub fn is_complete(&self) -> bool {
        self.covered_count() == self.fillable_count() && self.has_required_placement()
    }

    /// Points earned by completing the puzzle with `turns_left` remaining.
    ///
    /// With par scoring, the par is paid in full above 60% of the timer,
    /// two thirds from 30% to 60%, and one third below 30%.
    pub fn award(&self, rules: &RuleSet) -> u32 {
        if !rules.par_scoring || self.tier == Tier::One || self.max_turns == 0 {
            return self.points;
        }
        // integer percent comparisons avoid float rounding at the band edges
        let left = u64::from(self.turns_left) * 10;
        let max = u64::from(self.max_turns);
        if left > max * 6 {
            self.points
        } else if left >= max * 3 {
            self.points * 2 / 3
        } else {
            self.points / 3
        }
    }

    /// Piece types currently on the board, in placement order.
    pub fn placed_types(&self) -> Vec<PieceType> {
        self.placed_pieces.iter().map(|placed| placed.piece).collect()
    }
}
