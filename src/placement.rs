//! Placement validation and snap-to-nearest search.
//!
//! The search is a bounded brute-force scan over every anchor that keeps at
//! least one shape cell on the board:
//! - occupied cells are collected once into an `FxHashSet` per query
//! - candidates are checked in row-major anchor order
//! - the first minimum wins, so ties resolve top-to-bottom, left-to-right

use rustc_hash::FxHashSet;

use crate::error::LayoutError;
use crate::geometry::Grid;
use crate::pieces::{Orientation, PieceType, PlacedPiece};
use crate::puzzle::Puzzle;

/// A row/column position in puzzle-grid coordinates. May lie off the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

impl Cell {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

/// Which piece, in which pose, a candidate shape was resolved from.
///
/// Only candidates with an identity can ever match a puzzle's required piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceIdentity {
    pub piece: PieceType,
    pub orientation: Orientation,
}

impl PieceIdentity {
    pub fn new(piece: PieceType, orientation: Orientation) -> Self {
        Self { piece, orientation }
    }

    /// The resolved shape for this identity.
    pub fn shape(&self) -> Grid {
        self.piece.resolve(self.orientation)
    }

    pub fn at(&self, anchor: Cell) -> PlacedPiece {
        PlacedPiece::new(self.piece, self.orientation, anchor.row, anchor.col)
    }
}

/// A legal anchor found by [`find_nearest_fit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fit {
    pub anchor: Cell,
    /// Manhattan distance from the target to the nearest shape cell.
    pub distance: u32,
}

/// Cells covered by placed pieces, skipping `ignore` if given.
pub fn occupied_cells(puzzle: &Puzzle, ignore: Option<usize>) -> FxHashSet<(i32, i32)> {
    puzzle
        .placed_pieces
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != ignore)
        .flat_map(|(_, placed)| placed.cells())
        .collect()
}

/// Cells reserved for the puzzle's required placement, if any.
fn reserved_cells(puzzle: &Puzzle) -> FxHashSet<(i32, i32)> {
    puzzle
        .required_piece
        .map(|required| required.cells().into_iter().collect())
        .unwrap_or_default()
}

/// Precomputed board state shared by every anchor of one query.
struct Board<'a> {
    puzzle: &'a Puzzle,
    occupied: FxHashSet<(i32, i32)>,
    reserved: FxHashSet<(i32, i32)>,
}

impl<'a> Board<'a> {
    fn new(puzzle: &'a Puzzle, ignore: Option<usize>) -> Self {
        Self {
            puzzle,
            occupied: occupied_cells(puzzle, ignore),
            reserved: reserved_cells(puzzle),
        }
    }

    fn accepts(&self, shape: &Grid, anchor: Cell, identity: Option<&PieceIdentity>) -> bool {
        let exact_required = match (&self.puzzle.required_piece, identity) {
            (Some(required), Some(identity)) => required.same_placement(&identity.at(anchor)),
            _ => false,
        };

        shape.filled_cells().all(|(r, c)| {
            let cell = (anchor.row + r as i32, anchor.col + c as i32);
            self.puzzle.grid.is_filled_at(cell.0, cell.1)
                && !self.occupied.contains(&cell)
                && (exact_required || !self.reserved.contains(&cell))
        })
    }

    /// Same as [`Board::accepts`] for a stored placement whose anchor may be
    /// arbitrary; anchors outside the search range are refused before any
    /// cell arithmetic.
    fn accepts_placed(&self, placed: &PlacedPiece) -> bool {
        let identity = PieceIdentity::new(placed.piece, placed.orientation());
        let shape = identity.shape();
        let anchor = Cell::new(placed.row, placed.col);
        anchor_rows(self.puzzle, &shape).contains(&anchor.row)
            && anchor_cols(self.puzzle, &shape).contains(&anchor.col)
            && self.accepts(&shape, anchor, Some(&identity))
    }
}

fn anchor_rows(puzzle: &Puzzle, shape: &Grid) -> std::ops::Range<i32> {
    -(shape.height() as i32) + 1..puzzle.grid.height() as i32
}

fn anchor_cols(puzzle: &Puzzle, shape: &Grid) -> std::ops::Range<i32> {
    -(shape.width() as i32) + 1..puzzle.grid.width() as i32
}

/// Checks whether `shape` can sit with its top-left at `anchor`.
///
/// Every filled shape cell must land on a fillable board cell not covered by
/// another placed piece (other than `ignore`). If the puzzle has a required
/// piece, only the exact required placement may touch its footprint.
pub fn can_place(
    puzzle: &Puzzle,
    shape: &Grid,
    anchor: Cell,
    ignore: Option<usize>,
    identity: Option<&PieceIdentity>,
) -> bool {
    Board::new(puzzle, ignore).accepts(shape, anchor, identity)
}

/// First legal anchor in row-major order over the on-board anchors.
pub fn find_first_fit(
    puzzle: &Puzzle,
    shape: &Grid,
    identity: Option<&PieceIdentity>,
) -> Option<Cell> {
    let board = Board::new(puzzle, None);
    let (height, width) = (puzzle.grid.height() as i32, puzzle.grid.width() as i32);
    (0..height)
        .flat_map(|row| (0..width).map(move |col| Cell::new(row, col)))
        .find(|&anchor| board.accepts(shape, anchor, identity))
}

/// Every legal anchor, in row-major order over the extended range that lets
/// the shape's bounding box overhang the board edge.
pub fn legal_anchors(
    puzzle: &Puzzle,
    shape: &Grid,
    ignore: Option<usize>,
    identity: Option<&PieceIdentity>,
) -> Vec<Cell> {
    let board = Board::new(puzzle, ignore);
    let cols = anchor_cols(puzzle, shape);
    anchor_rows(puzzle, shape)
        .flat_map(|row| cols.clone().map(move |col| Cell::new(row, col)))
        .filter(|&anchor| board.accepts(shape, anchor, identity))
        .collect()
}

/// Minimum Manhattan distance from `target` to any filled cell of `shape` at `anchor`.
pub fn distance_to(shape: &Grid, anchor: Cell, target: Cell) -> u32 {
    shape
        .filled_cells()
        .map(|(r, c)| {
            (anchor.row + r as i32).abs_diff(target.row)
                + (anchor.col + c as i32).abs_diff(target.col)
        })
        .min()
        .unwrap_or(u32::MAX)
}

/// Snaps `shape` to the legal anchor nearest to `target`.
pub fn find_nearest_fit(
    puzzle: &Puzzle,
    shape: &Grid,
    target: Cell,
    ignore: Option<usize>,
    identity: Option<&PieceIdentity>,
) -> Option<Fit> {
    legal_anchors(puzzle, shape, ignore, identity)
        .into_iter()
        .map(|anchor| Fit {
            anchor,
            distance: distance_to(shape, anchor, target),
        })
        // min_by_key keeps the first of equal minimums, i.e. row-major order
        .min_by_key(|fit| fit.distance)
}

/// True if `piece` fits somewhere on the puzzle in any of its eight poses.
pub fn fits_anywhere(puzzle: &Puzzle, piece: PieceType) -> bool {
    Orientation::all().into_iter().any(|orientation| {
        let identity = PieceIdentity::new(piece, orientation);
        !legal_anchors(puzzle, &identity.shape(), None, Some(&identity)).is_empty()
    })
}

/// Replays a stored puzzle through the placement rules.
///
/// The required piece goes down first, then each placed piece in order, each
/// checked against the cells claimed so far. The timer must lie in
/// `1..=max_turns`.
pub fn check_layout(puzzle: &Puzzle) -> Result<(), LayoutError> {
    if puzzle.fillable_count() == 0 {
        return Err(LayoutError::EmptyBoard);
    }
    if puzzle.turns_left == 0 || puzzle.turns_left > puzzle.max_turns {
        return Err(LayoutError::Timer {
            turns_left: puzzle.turns_left,
            max_turns: puzzle.max_turns,
        });
    }

    let mut board = Board {
        puzzle,
        occupied: FxHashSet::default(),
        reserved: FxHashSet::default(),
    };
    if let Some(required) = &puzzle.required_piece {
        if !board.accepts_placed(required) {
            return Err(LayoutError::Required(required.piece));
        }
        board.reserved.extend(required.cells());
    }
    for (index, placed) in puzzle.placed_pieces.iter().enumerate() {
        if !board.accepts_placed(placed) {
            return Err(LayoutError::Placed {
                index,
                piece: placed.piece,
            });
        }
        board.occupied.extend(placed.cells());
    }
    Ok(())
}
