//! Symmetry-invariant identity for shapes and puzzle boards.
//!
//! The canonical key of a grid is the lexicographically smallest serialized
//! form among its eight rotation/mirror variants, each cropped to the bounding
//! box of its filled cells. Two grids are the same polyomino (up to rotation,
//! reflection and translation) iff their keys are equal.
//!
//! Both the live generator and the offline library tools call into this
//! module, so the serialization below must stay bit-for-bit stable.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::geometry::Grid;

/// Marker returned by [`normalize`] for grids with no filled cells.
pub const EMPTY_KEY: &str = "[]";

/// Opaque symmetry-invariant identity of a shape. Used only as a set key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Crops `grid` to its filled bounding box and serializes it as `[[1,0],[1,1]]`.
///
/// Returns [`EMPTY_KEY`] if no cell is filled.
pub fn normalize(grid: &Grid) -> String {
    let Some(cropped) = grid.crop() else {
        return EMPTY_KEY.to_string();
    };

    let mut out = String::with_capacity(cropped.height() * (cropped.width() * 2 + 2) + 2);
    out.push('[');
    for r in 0..cropped.height() {
        if r > 0 {
            out.push(',');
        }
        out.push('[');
        for c in 0..cropped.width() {
            if c > 0 {
                out.push(',');
            }
            out.push(if cropped.get(r, c) { '1' } else { '0' });
        }
        out.push(']');
    }
    out.push(']');
    out
}

/// The eight symmetry variants: for each of 4 rotations, plain then mirrored.
pub fn all_variants(grid: &Grid) -> Vec<Grid> {
    let mut variants = Vec::with_capacity(8);
    let mut rotated = grid.clone();
    for _ in 0..4 {
        variants.push(rotated.mirror());
        let next = rotated.rotate_cw();
        variants.push(rotated);
        rotated = next;
    }
    variants
}

/// Computes the canonical key of a grid.
pub fn canonical_key(grid: &Grid) -> CanonicalKey {
    // there are always eight variants, so min() always exists
    let smallest = all_variants(grid)
        .iter()
        .map(normalize)
        .min()
        .unwrap_or_else(|| EMPTY_KEY.to_string());
    CanonicalKey(smallest)
}

/// True when two grids are the same shape up to symmetry and translation.
pub fn equivalent(a: &Grid, b: &Grid) -> bool {
    canonical_key(a) == canonical_key(b)
}

/// Six hex digits derived from a canonical key, for human-readable ids.
pub fn short_hash(key: &CanonicalKey) -> String {
    let mut hasher = FxHasher::default();
    key.as_str().hash(&mut hasher);
    format!("{:06x}", hasher.finish() & 0xff_ffff)
}
