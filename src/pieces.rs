//! Piece catalog and the placement/hand records built from it.
//!
//! Each piece type has a fixed, tightly cropped base shape and a level from 1
//! to [`MAX_LEVEL`]. Levels drive hand sorting and the sacrifice upgrade path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::{resolve, Grid};

/// Highest piece level; pieces at this level cannot be sacrificed.
pub const MAX_LEVEL: u8 = 5;

/// Every piece the game knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceType {
    Dot,
    Domino,
    TrominoI,
    TrominoL,
    TetroI,
    TetroL,
    TetroT,
    TetroS,
    TetroO,
    PentoP,
    PentoU,
    PentoV,
    PentoT,
    PentoZ,
}

/// Static definition of one piece type.
struct PieceDef {
    name: &'static str,
    shape: &'static [&'static [u8]],
    level: u8,
}

/// Catalog rows, indexed by `PieceType as usize`.
static CATALOG: [PieceDef; 14] = [
    PieceDef { name: "dot", shape: &[&[1]], level: 1 },
    PieceDef { name: "domino", shape: &[&[1, 1]], level: 2 },
    PieceDef { name: "tromino_i", shape: &[&[1, 1, 1]], level: 3 },
    PieceDef { name: "tromino_l", shape: &[&[1, 0], &[1, 1]], level: 3 },
    PieceDef { name: "tetro_i", shape: &[&[1, 1, 1, 1]], level: 4 },
    PieceDef { name: "tetro_l", shape: &[&[1, 0], &[1, 0], &[1, 1]], level: 4 },
    PieceDef { name: "tetro_t", shape: &[&[1, 1, 1], &[0, 1, 0]], level: 4 },
    PieceDef { name: "tetro_s", shape: &[&[0, 1, 1], &[1, 1, 0]], level: 4 },
    PieceDef { name: "tetro_o", shape: &[&[1, 1], &[1, 1]], level: 4 },
    PieceDef { name: "pento_p", shape: &[&[1, 1], &[1, 1], &[1, 0]], level: 5 },
    PieceDef { name: "pento_u", shape: &[&[1, 0, 1], &[1, 1, 1]], level: 5 },
    PieceDef { name: "pento_v", shape: &[&[1, 0, 0], &[1, 0, 0], &[1, 1, 1]], level: 5 },
    PieceDef { name: "pento_t", shape: &[&[1, 1, 1], &[0, 1, 0], &[0, 1, 0]], level: 5 },
    PieceDef { name: "pento_z", shape: &[&[1, 1, 0], &[0, 1, 0], &[0, 1, 1]], level: 5 },
];

impl PieceType {
    pub const ALL: [PieceType; 14] = [
        PieceType::Dot,
        PieceType::Domino,
        PieceType::TrominoI,
        PieceType::TrominoL,
        PieceType::TetroI,
        PieceType::TetroL,
        PieceType::TetroT,
        PieceType::TetroS,
        PieceType::TetroO,
        PieceType::PentoP,
        PieceType::PentoU,
        PieceType::PentoV,
        PieceType::PentoT,
        PieceType::PentoZ,
    ];

    #[inline]
    fn def(self) -> &'static PieceDef {
        &CATALOG[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.def().name
    }

    pub fn level(self) -> u8 {
        self.def().level
    }

    /// The untransformed shape.
    pub fn base_shape(self) -> Grid {
        Grid::from_rows(self.def().shape)
    }

    /// The shape after applying `orientation` (rotate, then mirror).
    pub fn resolve(self, orientation: Orientation) -> Grid {
        resolve(&self.base_shape(), orientation.rotation, orientation.mirror)
    }

    pub fn cell_count(self) -> usize {
        self.def()
            .shape
            .iter()
            .map(|row| row.iter().filter(|&&v| v != 0).count())
            .sum()
    }

    /// All piece types at `level`, in catalog order.
    pub fn at_level(level: u8) -> Vec<PieceType> {
        Self::ALL
            .into_iter()
            .filter(|piece| piece.level() == level)
            .collect()
    }
}

impl fmt::Display for PieceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PieceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|piece| piece.name() == s)
            .ok_or_else(|| format!("unknown piece type '{s}'"))
    }
}

/// A rotation (quarter turns clockwise) plus an optional mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Orientation {
    pub rotation: u8,
    pub mirror: bool,
}

impl Orientation {
    pub const IDENTITY: Self = Self {
        rotation: 0,
        mirror: false,
    };

    /// Builds an orientation, reducing `rotation` mod 4.
    pub const fn new(rotation: u8, mirror: bool) -> Self {
        Self {
            rotation: rotation % 4,
            mirror,
        }
    }

    /// All eight orientations: rotations 0..4, each plain then mirrored.
    pub fn all() -> [Orientation; 8] {
        let mut all = [Self::IDENTITY; 8];
        for (i, slot) in all.iter_mut().enumerate() {
            *slot = Self::new((i / 2) as u8, i % 2 == 1);
        }
        all
    }
}

/// A piece placed on a puzzle board.
///
/// `row`/`col` is the anchor: the top-left corner of the transformed shape's
/// bounding box, in puzzle-grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacedPiece {
    #[serde(rename = "type")]
    pub piece: PieceType,
    pub rotation: u8,
    pub mirror: bool,
    pub row: i32,
    pub col: i32,
}

impl PlacedPiece {
    pub fn new(piece: PieceType, orientation: Orientation, row: i32, col: i32) -> Self {
        Self {
            piece,
            rotation: orientation.rotation % 4,
            mirror: orientation.mirror,
            row,
            col,
        }
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::new(self.rotation, self.mirror)
    }

    pub fn shape(&self) -> Grid {
        self.piece.resolve(self.orientation())
    }

    /// Absolute board cells covered by this placement.
    pub fn cells(&self) -> Vec<(i32, i32)> {
        self.shape()
            .filled_cells()
            .map(|(r, c)| (self.row + r as i32, self.col + c as i32))
            .collect()
    }

    /// True when both records describe the same piece in the same pose and spot.
    pub fn same_placement(&self, other: &PlacedPiece) -> bool {
        self.piece == other.piece
            && self.orientation() == other.orientation()
            && self.row == other.row
            && self.col == other.col
    }
}

/// A piece held in the player's hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandPiece {
    #[serde(rename = "type")]
    pub piece: PieceType,
    /// Turns until the piece disappears; only used with piece expiry enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u32>,
}

impl HandPiece {
    pub fn new(piece: PieceType, expiry: Option<u32>) -> Self {
        Self { piece, expiry }
    }
}
