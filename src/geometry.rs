//! Boolean grid algebra shared by piece shapes and puzzle boards.
//!
//! A [`Grid`] is a row-major matrix of cells. Piece shapes are tightly cropped
//! grids; puzzle boards use `true` for fillable cells and `false` for solid
//! ones. Every transform returns a new grid and leaves its input untouched.

use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// A rectangular boolean matrix stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<u8>>", try_from = "Vec<Vec<u8>>")]
pub struct Grid {
    height: usize,
    width: usize,
    cells: Vec<bool>,
}

impl Grid {
    /// Creates a grid of the given size with every cell empty.
    pub fn empty(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            cells: vec![false; height * width],
        }
    }

    /// Creates a grid of the given size with every cell filled.
    pub fn filled(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            cells: vec![true; height * width],
        }
    }

    /// Builds a grid from rows of `0`/`1` values.
    ///
    /// Panics on ragged rows; use [`Grid::try_from`] for untrusted input.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Self {
        let width = rows.first().map_or(0, |row| row.as_ref().len());
        let mut grid = Self::empty(rows.len(), width);
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            assert_eq!(row.len(), width, "row {r} has a different width");
            for (c, &value) in row.iter().enumerate() {
                grid.set(r, c, value != 0);
            }
        }
        grid
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        self.cells[row * self.width + col] = value;
    }

    /// Returns true when `(row, col)` is inside the grid and filled.
    ///
    /// Accepts signed coordinates so callers can probe overhanging anchors.
    #[inline]
    pub fn is_filled_at(&self, row: i32, col: i32) -> bool {
        row >= 0
            && col >= 0
            && (row as usize) < self.height
            && (col as usize) < self.width
            && self.get(row as usize, col as usize)
    }

    /// Number of filled cells.
    pub fn cell_count(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell).count()
    }

    /// Iterates over the `(row, col)` of every filled cell in row-major order.
    pub fn filled_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &cell)| cell)
            .map(move |(idx, _)| (idx / width, idx % width))
    }

    /// Rotates 90 degrees clockwise: `rotated[c][k] = self[height - 1 - k][c]`.
    pub fn rotate_cw(&self) -> Self {
        let mut rotated = Self::empty(self.width, self.height);
        for c in 0..self.width {
            for k in 0..self.height {
                rotated.set(c, k, self.get(self.height - 1 - k, c));
            }
        }
        rotated
    }

    /// Reverses every row left-to-right.
    pub fn mirror(&self) -> Self {
        let mut mirrored = Self::empty(self.height, self.width);
        for r in 0..self.height {
            for c in 0..self.width {
                mirrored.set(r, self.width - 1 - c, self.get(r, c));
            }
        }
        mirrored
    }

    /// Crops to the bounding box of filled cells, or `None` if nothing is filled.
    pub fn crop(&self) -> Option<Self> {
        let mut min_row = usize::MAX;
        let mut max_row = 0;
        let mut min_col = usize::MAX;
        let mut max_col = 0;
        for (r, c) in self.filled_cells() {
            min_row = min_row.min(r);
            max_row = max_row.max(r);
            min_col = min_col.min(c);
            max_col = max_col.max(c);
        }
        if min_row == usize::MAX {
            return None;
        }

        let mut cropped = Self::empty(max_row - min_row + 1, max_col - min_col + 1);
        for r in min_row..=max_row {
            for c in min_col..=max_col {
                cropped.set(r - min_row, c - min_col, self.get(r, c));
            }
        }
        Some(cropped)
    }

    /// True when no border row or column is entirely empty.
    pub fn is_cropped(&self) -> bool {
        self.crop().is_some_and(|cropped| cropped == *self)
    }

    /// Rows as `0`/`1` bytes.
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        (0..self.height)
            .map(|r| (0..self.width).map(|c| u8::from(self.get(r, c))).collect())
            .collect()
    }
}

impl From<Grid> for Vec<Vec<u8>> {
    fn from(grid: Grid) -> Self {
        grid.to_rows()
    }
}

impl TryFrom<Vec<Vec<u8>>> for Grid {
    type Error = GridError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        let width = rows.first().map_or(0, Vec::len);
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != width {
                return Err(GridError::Ragged {
                    row,
                    expected: width,
                    found: cells.len(),
                });
            }
            if let Some(&value) = cells.iter().find(|&&v| v > 1) {
                return Err(GridError::InvalidCell { row, value });
            }
        }
        Ok(Self::from_rows(&rows))
    }
}

/// Applies `rotation mod 4` clockwise turns, then mirrors when `mirror` is set.
///
/// Rotate-then-mirror is the only composition order used in this crate.
pub fn resolve(base: &Grid, rotation: u8, mirror: bool) -> Grid {
    let mut shape = base.clone();
    for _ in 0..rotation % 4 {
        shape = shape.rotate_cw();
    }
    if mirror {
        shape = shape.mirror();
    }
    shape
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[u8]]) -> Grid {
        Grid::from_rows(rows)
    }

    #[test]
    fn test_rotate_horizontal_to_vertical() {
        assert_eq!(
            grid(&[&[1, 1, 1, 1]]).rotate_cw(),
            grid(&[&[1], &[1], &[1], &[1]])
        );
    }

    #[test]
    fn test_rotate_l_piece() {
        let l = grid(&[&[1, 0], &[1, 0], &[1, 1]]);
        assert_eq!(l.rotate_cw(), grid(&[&[1, 1, 1], &[1, 0, 0]]));
    }

    #[test]
    fn test_four_rotations_are_identity() {
        let shapes = [
            grid(&[&[1, 1, 0], &[0, 1, 1]]),
            grid(&[&[1, 0], &[1, 0], &[1, 1]]),
            grid(&[&[0, 1, 0, 1], &[1, 1, 1, 1], &[0, 0, 1, 0]]),
        ];
        for shape in shapes {
            let mut s = shape.clone();
            for _ in 0..4 {
                s = s.rotate_cw();
            }
            assert_eq!(s, shape);
        }
    }

    #[test]
    fn test_mirror_is_involution() {
        let shape = grid(&[&[1, 0, 0], &[1, 1, 1]]);
        assert_eq!(shape.mirror(), grid(&[&[0, 0, 1], &[1, 1, 1]]));
        assert_eq!(shape.mirror().mirror(), shape);
    }

    #[test]
    fn test_resolve_rotates_then_mirrors() {
        let tetro_t = grid(&[&[1, 1, 1], &[0, 1, 0]]);
        assert_eq!(resolve(&tetro_t, 1, false), grid(&[&[0, 1], &[1, 1], &[0, 1]]));
        assert_eq!(resolve(&tetro_t, 1, true), grid(&[&[1, 0], &[1, 1], &[1, 0]]));
    }

    #[test]
    fn test_resolve_l_piece_all_orientations() {
        let l = grid(&[&[1, 0], &[1, 0], &[1, 1]]);
        assert_eq!(resolve(&l, 0, false), l);
        assert_eq!(resolve(&l, 1, false), grid(&[&[1, 1, 1], &[1, 0, 0]]));
        assert_eq!(resolve(&l, 2, false), grid(&[&[1, 1], &[0, 1], &[0, 1]]));
        assert_eq!(resolve(&l, 3, false), grid(&[&[0, 0, 1], &[1, 1, 1]]));
        assert_eq!(resolve(&l, 0, true), grid(&[&[0, 1], &[0, 1], &[1, 1]]));
        assert_eq!(resolve(&l, 1, true), grid(&[&[1, 1, 1], &[0, 0, 1]]));
        assert_eq!(resolve(&l, 2, true), grid(&[&[1, 1], &[1, 0], &[1, 0]]));
        assert_eq!(resolve(&l, 3, true), grid(&[&[1, 0, 0], &[1, 1, 1]]));
        assert_eq!(resolve(&l, 4, true), resolve(&l, 0, true));
    }

    #[test]
    fn test_crop_drops_empty_border() {
        let padded = grid(&[&[0, 0, 0], &[0, 1, 1], &[0, 1, 0], &[0, 0, 0]]);
        assert_eq!(padded.crop(), Some(grid(&[&[1, 1], &[1, 0]])));
        assert!(!padded.is_cropped());
        assert_eq!(Grid::empty(2, 2).crop(), None);
    }

    #[test]
    fn test_serde_uses_digit_rows() {
        let shape = grid(&[&[1, 0], &[1, 1]]);
        let json = serde_json::to_string(&shape).unwrap();
        assert_eq!(json, "[[1,0],[1,1]]");
        let back: Grid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, shape);
        assert!(serde_json::from_str::<Grid>("[[1,0],[1]]").is_err());
        assert!(serde_json::from_str::<Grid>("[[2]]").is_err());
    }
}
