//! Offline puzzle libraries: generation and duplicate validation.
//!
//! Both tools key shapes with [`canonical_key`], the same function the live
//! generator uses, so a library validated here never repeats a shape the
//! engine would consider equivalent.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::config::{GameConfig, TierConfig};
use crate::generator::{fixed_points, grow, reward_for};
use crate::geometry::Grid;
use crate::grid::{canonical_key, CanonicalKey};
use crate::pieces::PieceType;
use crate::puzzle::Tier;

/// Attempts allowed per requested entry.
const ATTEMPTS_PER_ENTRY: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub id: String,
    pub grid: Grid,
    pub cells: usize,
    pub points: u32,
    pub reward: Option<PieceType>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub tier1: Vec<LibraryEntry>,
    pub tier2: Vec<LibraryEntry>,
}

/// An entry whose shape already appeared earlier in the same list.
/// Both positions are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duplicate {
    pub index: usize,
    pub duplicate_of: usize,
}

fn unique_shapes<R: Rng>(
    rng: &mut R,
    tier: &TierConfig,
    count: usize,
    dimension_limit: usize,
    seen: &mut FxHashSet<CanonicalKey>,
) -> Vec<Grid> {
    let mut shapes = Vec::with_capacity(count);
    let mut attempts = 0;
    while shapes.len() < count && attempts < count * ATTEMPTS_PER_ENTRY {
        attempts += 1;
        let target = rng.random_range(tier.min_cells..=tier.max_cells);
        let Some(grid) = grow(rng, target, dimension_limit) else {
            continue;
        };
        let cells = grid.cell_count();
        if cells < tier.min_cells || cells > tier.max_cells {
            continue;
        }
        if seen.insert(canonical_key(&grid)) {
            shapes.push(grid);
        }
    }
    if shapes.len() < count {
        log::warn!(
            "only {} of {count} unique shapes found after {attempts} attempts",
            shapes.len()
        );
    }
    // stable, so equal sizes keep discovery order
    shapes.sort_by_key(Grid::cell_count);
    shapes
}

/// Builds a library with up to `tier1_count` and `tier2_count` entries.
///
/// One seen set spans both tiers, so no shape appears twice in the library.
pub fn generate_library(
    config: &GameConfig,
    tier1_count: usize,
    tier2_count: usize,
    seed: u64,
) -> Library {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut seen = FxHashSet::default();
    let mut library = Library::default();

    for (tier, count) in [(Tier::One, tier1_count), (Tier::Two, tier2_count)] {
        let shapes = unique_shapes(
            &mut rng,
            config.tier(tier),
            count,
            config.dimension_limit,
            &mut seen,
        );
        let entries = shapes
            .into_iter()
            .enumerate()
            .map(|(i, grid)| {
                let cells = grid.cell_count();
                let (points, reward) = match tier {
                    Tier::One => (0, Some(reward_for(&mut rng, cells))),
                    Tier::Two => (fixed_points(cells), None),
                };
                LibraryEntry {
                    id: format!("T{}-{:02}", tier.number(), i + 1),
                    grid,
                    cells,
                    points,
                    reward,
                }
            })
            .collect();
        match tier {
            Tier::One => library.tier1 = entries,
            Tier::Two => library.tier2 = entries,
        }
    }
    library
}

/// Reports every grid whose canonical key matches an earlier grid.
pub fn find_duplicates<'a>(grids: impl IntoIterator<Item = &'a Grid>) -> Vec<Duplicate> {
    let mut first_seen: FxHashMap<CanonicalKey, usize> = FxHashMap::default();
    let mut duplicates = Vec::new();
    for (i, grid) in grids.into_iter().enumerate() {
        let index = i + 1;
        match first_seen.get(&canonical_key(grid)) {
            Some(&duplicate_of) => duplicates.push(Duplicate {
                index,
                duplicate_of,
            }),
            None => {
                first_seen.insert(canonical_key(grid), index);
            }
        }
    }
    duplicates
}

impl Library {
    pub fn entries(&self, tier: Tier) -> &[LibraryEntry] {
        match tier {
            Tier::One => &self.tier1,
            Tier::Two => &self.tier2,
        }
    }

    /// Duplicates within each tier's list.
    pub fn validate(&self) -> [(Tier, Vec<Duplicate>); 2] {
        Tier::ALL.map(|tier| {
            let grids = self.entries(tier).iter().map(|entry| &entry.grid);
            (tier, find_duplicates(grids))
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str(contents)
    }
}
