//! Procedural puzzle generation.
//!
//! Boards are grown as random connected polyominoes, cropped, filtered for
//! "interesting" silhouettes and deduplicated by canonical key against every
//! shape this generator has produced so far. The generation loop is bounded:
//! after `max_attempts` rejected candidates the seen-shape memory is cleared
//! and the loop runs once more, so a call always returns.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;

use crate::config::{GameConfig, TierConfig};
use crate::geometry::Grid;
use crate::grid::{canonical_key, short_hash, CanonicalKey};
use crate::pieces::{Orientation, PieceType, PlacedPiece};
use crate::placement::{legal_anchors, Cell};
use crate::puzzle::{Puzzle, Tier};

/// 4-neighbourhood offsets.
const NEIGHBOURS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Reward pool for 3-cell tier-1 boards.
const MID_REWARDS: [PieceType; 2] = [PieceType::TrominoI, PieceType::TrominoL];

/// Reward pool for tier-1 boards with 4 or more cells.
const HIGH_REWARDS: [PieceType; 5] = [
    PieceType::TetroI,
    PieceType::TetroO,
    PieceType::TetroT,
    PieceType::TetroS,
    PieceType::TetroL,
];

/// Grows a random connected shape of up to `target_cells` cells.
///
/// The bounding box is `width x height`, each drawn from
/// `[2, min(dimension_limit, target_cells)]`. Growth stops early when the box
/// has no free neighbour left. Returns the cropped shape.
pub fn grow<R: Rng>(rng: &mut R, target_cells: usize, dimension_limit: usize) -> Option<Grid> {
    let cap = dimension_limit.min(target_cells).max(2);
    let width = rng.random_range(2..=cap);
    let height = rng.random_range(2..=cap);

    let mut grid = Grid::empty(height, width);
    let seed = (rng.random_range(0..height), rng.random_range(0..width));
    grid.set(seed.0, seed.1, true);
    let mut cells = vec![seed];

    while cells.len() < target_cells {
        // one entry per (filled cell, free neighbour) pair
        let mut frontier = Vec::new();
        for &(r, c) in &cells {
            for (dr, dc) in NEIGHBOURS {
                let (nr, nc) = (r as i32 + dr, c as i32 + dc);
                if nr >= 0
                    && nc >= 0
                    && (nr as usize) < height
                    && (nc as usize) < width
                    && !grid.get(nr as usize, nc as usize)
                {
                    frontier.push((nr as usize, nc as usize));
                }
            }
        }
        if frontier.is_empty() {
            break;
        }
        let next = frontier[rng.random_range(0..frontier.len())];
        grid.set(next.0, next.1, true);
        cells.push(next);
    }

    grid.crop()
}

/// Empty cells with at least three filled orthogonal neighbours.
pub fn count_holes(grid: &Grid) -> usize {
    let mut holes = 0;
    for r in 0..grid.height() {
        for c in 0..grid.width() {
            if grid.get(r, c) {
                continue;
            }
            let filled = NEIGHBOURS
                .iter()
                .filter(|(dr, dc)| grid.is_filled_at(r as i32 + dr, c as i32 + dc))
                .count();
            if filled >= 3 {
                holes += 1;
            }
        }
    }
    holes
}

/// Rejects boards that are boring to fill: full rectangles, near-rectangles,
/// overly dense boards and dense blobs without any notch.
pub fn is_interesting(grid: &Grid) -> bool {
    let (height, width) = (grid.height(), grid.width());
    let area = height * width;
    let cells = grid.cell_count();
    if area == 0 || cells == 0 {
        return false;
    }
    let fill_ratio = cells as f64 / area as f64;

    if cells == area && height > 1 && width > 1 {
        return false;
    }
    if area - cells <= 2 && height >= 2 && width >= 2 && cells > 4 {
        return false;
    }
    if fill_ratio > 0.75 && height.min(width) > 2 {
        return false;
    }
    if fill_ratio > 0.65 && cells >= 8 && count_holes(grid) == 0 {
        return false;
    }
    true
}

/// Tier-2 points under fixed scoring.
pub fn fixed_points(cells: usize) -> u32 {
    (cells * 4 / 5) as u32
}

/// Reward piece for a tier-1 board, keyed by its cell count.
pub fn reward_for<R: Rng>(rng: &mut R, cells: usize) -> PieceType {
    match cells {
        0..=2 => PieceType::Domino,
        3 => MID_REWARDS[rng.random_range(0..MID_REWARDS.len())],
        _ => HIGH_REWARDS[rng.random_range(0..HIGH_REWARDS.len())],
    }
}

/// Picks a piece type with probability proportional to its level.
///
/// Dots are excluded: a single required cell is not a constraint worth showing.
pub fn weighted_piece<R: Rng>(rng: &mut R) -> PieceType {
    let eligible = PieceType::ALL.iter().filter(|piece| piece.level() >= 2);
    let total: u32 = eligible.clone().map(|piece| u32::from(piece.level())).sum();
    let mut roll = rng.random_range(0..total);
    for &piece in eligible {
        let weight = u32::from(piece.level());
        if roll < weight {
            return piece;
        }
        roll -= weight;
    }
    PieceType::Domino
}

/// Picks an exact placement the board must contain, or `None` if the chosen
/// piece and pose fit nowhere.
pub fn required_placement<R: Rng>(rng: &mut R, grid: &Grid) -> Option<PlacedPiece> {
    let piece = weighted_piece(rng);
    let orientation = Orientation::new(rng.random_range(0..4), rng.random_bool(0.5));
    let shape = piece.resolve(orientation);

    let board = Puzzle {
        id: String::new(),
        grid: grid.clone(),
        tier: Tier::Two,
        points: 0,
        reward_piece_type: None,
        turns_left: 0,
        max_turns: 0,
        placed_pieces: Vec::new(),
        required_piece: None,
    };
    let anchors = legal_anchors(&board, &shape, None, None);
    if anchors.is_empty() {
        return None;
    }
    let Cell { row, col } = anchors[rng.random_range(0..anchors.len())];
    Some(PlacedPiece::new(piece, orientation, row, col))
}

/// Stateful puzzle factory: owns the RNG, the seen-shape memory and the
/// per-tier sequence counters.
#[derive(Debug, Clone)]
pub struct PuzzleGenerator {
    rng: StdRng,
    seen: FxHashSet<CanonicalKey>,
    /// Insertion order of `seen`, oldest first, so saves can keep the newest.
    seen_order: Vec<CanonicalKey>,
    counters: [u32; 2],
}

impl PuzzleGenerator {
    pub fn new(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            seen: FxHashSet::default(),
            seen_order: Vec::new(),
            counters: [0; 2],
        }
    }

    /// Restores the dedup memory and id counters from a save.
    pub fn restore(&mut self, seen: Vec<CanonicalKey>, counters: [u32; 2]) {
        self.seen.clear();
        self.seen_order.clear();
        for key in seen {
            self.remember(key);
        }
        self.counters = counters;
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn has_seen(&self, key: &CanonicalKey) -> bool {
        self.seen.contains(key)
    }

    /// Seen keys, oldest first.
    pub fn seen_keys(&self) -> &[CanonicalKey] {
        &self.seen_order
    }

    pub fn counters(&self) -> [u32; 2] {
        self.counters
    }

    fn remember(&mut self, key: CanonicalKey) {
        if self.seen.insert(key.clone()) {
            self.seen_order.push(key);
        }
    }

    /// Forgets every seen shape.
    pub fn reset_seen(&mut self) {
        self.seen.clear();
        self.seen_order.clear();
    }

    /// One generation attempt: grow, range check, interest filter, dedup.
    ///
    /// On success the shape's key is recorded as seen.
    pub fn attempt(
        &mut self,
        tier: &TierConfig,
        dimension_limit: usize,
    ) -> Option<(Grid, CanonicalKey)> {
        let target = self.rng.random_range(tier.min_cells..=tier.max_cells);
        let grid = grow(&mut self.rng, target, dimension_limit)?;

        let cells = grid.cell_count();
        if cells < tier.min_cells || cells > tier.max_cells || !is_interesting(&grid) {
            return None;
        }

        let key = canonical_key(&grid);
        if self.seen.contains(&key) {
            return None;
        }
        self.remember(key.clone());
        Some((grid, key))
    }

    /// Produces a fresh board shape for `tier`, always terminating.
    pub fn next_shape(
        &mut self,
        tier: &TierConfig,
        dimension_limit: usize,
        max_attempts: usize,
    ) -> (Grid, CanonicalKey) {
        for round in 0..2 {
            for _ in 0..max_attempts {
                if let Some(found) = self.attempt(tier, dimension_limit) {
                    return found;
                }
            }
            if round == 0 {
                log::warn!(
                    "no new shape in {max_attempts} attempts for cells [{}, {}]; resetting {} seen shapes",
                    tier.min_cells,
                    tier.max_cells,
                    self.seen.len()
                );
                self.reset_seen();
            }
        }

        // only reachable when the tier range admits no interesting shape at all
        log::warn!("falling back to a straight board of {} cells", tier.min_cells);
        let grid = Grid::filled(1, tier.min_cells);
        let key = canonical_key(&grid);
        self.remember(key.clone());
        (grid, key)
    }

    fn next_id(&mut self, tier: Tier, key: &CanonicalKey) -> String {
        let counter = &mut self.counters[tier.index()];
        *counter += 1;
        format!("T{}-{:03}-{}", tier.number(), counter, short_hash(key))
    }

    /// Generates a complete puzzle for `tier`.
    pub fn generate(&mut self, tier: Tier, config: &GameConfig) -> Puzzle {
        let tier_config = config.tier(tier);
        let (grid, key) =
            self.next_shape(tier_config, config.dimension_limit, config.max_attempts);
        let cells = grid.cell_count();
        let id = self.next_id(tier, &key);

        let (points, reward_piece_type) = match tier {
            Tier::One => (0, Some(reward_for(&mut self.rng, cells))),
            // par is the cell count; fixed scoring pays 80% of it
            Tier::Two if config.rules.par_scoring => (cells as u32, None),
            Tier::Two => (fixed_points(cells), None),
        };

        let chance = config.rules.required_piece_chance;
        let required_piece = if tier == Tier::Two && chance > 0.0 && self.rng.random_bool(chance)
        {
            required_placement(&mut self.rng, &grid)
        } else {
            None
        };

        log::debug!("generated {id} with {cells} cells");
        Puzzle {
            id,
            grid,
            tier,
            points,
            reward_piece_type,
            turns_left: tier_config.max_turns,
            max_turns: tier_config.max_turns,
            placed_pieces: Vec::new(),
            required_piece,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::can_place;

    fn grid(rows: &[&[u8]]) -> Grid {
        Grid::from_rows(rows)
    }

    fn is_connected(grid: &Grid) -> bool {
        let cells: Vec<(usize, usize)> = grid.filled_cells().collect();
        let Some(&start) = cells.first() else {
            return false;
        };
        let mut seen = FxHashSet::default();
        let mut stack = vec![start];
        while let Some((r, c)) = stack.pop() {
            if !seen.insert((r, c)) {
                continue;
            }
            for (dr, dc) in NEIGHBOURS {
                let (nr, nc) = (r as i32 + dr, c as i32 + dc);
                if grid.is_filled_at(nr, nc) {
                    stack.push((nr as usize, nc as usize));
                }
            }
        }
        seen.len() == cells.len()
    }

    #[test]
    fn test_grow_produces_connected_cropped_shapes() {
        let mut rng = StdRng::seed_from_u64(7);
        for target in 1..=14 {
            for _ in 0..20 {
                let shape = grow(&mut rng, target, 6).unwrap();
                assert!(shape.cell_count() <= target);
                assert!(shape.cell_count() >= 1);
                assert!(shape.height() <= 6 && shape.width() <= 6);
                assert!(shape.is_cropped());
                assert!(is_connected(&shape));
            }
        }
    }

    #[test]
    fn test_rejects_full_rectangle() {
        assert!(!is_interesting(&grid(&[&[1, 1], &[1, 1]])));
        assert!(is_interesting(&grid(&[&[1, 1, 1, 1]])));
    }

    #[test]
    fn test_rejects_near_rectangle() {
        // 3x2 box with one missing cell: 5 cells, gap of 1
        assert!(!is_interesting(&grid(&[&[1, 1, 1], &[1, 1, 0]])));
        // 4 cells never counts as a near-rectangle
        assert!(is_interesting(&grid(&[&[1, 1, 1], &[1, 0, 0]])));
    }

    #[test]
    fn test_rejects_dense_boards() {
        // 7 of 9 cells, shorter side 3
        assert!(!is_interesting(&grid(&[&[1, 1, 1], &[1, 0, 1], &[1, 0, 1]])));
        assert!(is_interesting(&grid(&[&[1, 1, 1], &[1, 0, 0], &[1, 0, 0]])));
    }

    #[test]
    fn test_rejects_hole_free_blobs() {
        // 8 of 12 cells (0.67), no empty cell has 3 filled neighbours
        let blob = grid(&[&[1, 1, 0, 0], &[1, 1, 1, 1], &[0, 0, 1, 1]]);
        assert_eq!(count_holes(&blob), 0);
        assert!(!is_interesting(&blob));
    }

    #[test]
    fn test_counts_notch_as_hole() {
        let notched = grid(&[&[1, 1, 1], &[1, 0, 1], &[1, 1, 1]]);
        assert_eq!(count_holes(&notched), 1);
    }

    #[test]
    fn test_reward_pools_by_cell_count() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert_eq!(reward_for(&mut rng, 2), PieceType::Domino);
            assert!(MID_REWARDS.contains(&reward_for(&mut rng, 3)));
            assert!(HIGH_REWARDS.contains(&reward_for(&mut rng, 5)));
        }
    }

    #[test]
    fn test_weighted_piece_never_picks_dot() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            assert_ne!(weighted_piece(&mut rng), PieceType::Dot);
        }
    }

    #[test]
    fn test_required_placement_fits_board() {
        let mut rng = StdRng::seed_from_u64(5);
        let board = grid(&[
            &[1, 1, 1, 0],
            &[1, 1, 1, 1],
            &[0, 1, 1, 1],
            &[0, 1, 1, 0],
        ]);
        let empty = Puzzle {
            id: String::new(),
            grid: board.clone(),
            tier: Tier::Two,
            points: 0,
            reward_piece_type: None,
            turns_left: 1,
            max_turns: 1,
            placed_pieces: Vec::new(),
            required_piece: None,
        };
        for _ in 0..100 {
            if let Some(required) = required_placement(&mut rng, &board) {
                let anchor = Cell::new(required.row, required.col);
                assert!(can_place(&empty, &required.shape(), anchor, None, None));
            }
        }
    }

    #[test]
    fn test_required_placement_omitted_when_nothing_fits() {
        let mut rng = StdRng::seed_from_u64(9);
        // weighted_piece never picks the dot, so nothing fits a single cell
        assert_eq!(required_placement(&mut rng, &grid(&[&[1]])), None);
    }

    #[test]
    fn test_generated_puzzles_respect_tier_config() {
        let config = GameConfig::default();
        let mut generator = PuzzleGenerator::new(42);
        for tier in Tier::ALL {
            let tier_config = config.tier(tier);
            for _ in 0..10 {
                let puzzle = generator.generate(tier, &config);
                let cells = puzzle.fillable_count();
                assert!((tier_config.min_cells..=tier_config.max_cells).contains(&cells));
                assert!(is_interesting(&puzzle.grid));
                assert_eq!(puzzle.turns_left, tier_config.max_turns);
                match tier {
                    Tier::One => {
                        assert_eq!(puzzle.points, 0);
                        assert!(puzzle.reward_piece_type.is_some());
                    }
                    Tier::Two => {
                        assert_eq!(puzzle.points, fixed_points(cells));
                        assert!(puzzle.reward_piece_type.is_none());
                        assert!(puzzle.required_piece.is_none());
                    }
                }
            }
        }
    }

    #[test]
    fn test_generated_shapes_are_unique_until_reset() {
        let config = GameConfig::default();
        let mut generator = PuzzleGenerator::new(1);
        let mut keys = FxHashSet::default();
        for _ in 0..20 {
            let puzzle = generator.generate(Tier::Two, &config);
            assert!(keys.insert(canonical_key(&puzzle.grid)), "duplicate {}", puzzle.id);
        }
        assert_eq!(generator.seen_keys().len(), 20);
    }

    #[test]
    fn test_exhaustion_resets_seen_shapes() {
        let config = GameConfig::default();
        let tier = TierConfig {
            min_cells: 2,
            max_cells: 2,
            max_turns: 5,
            active: 1,
        };
        let mut generator = PuzzleGenerator::new(2);
        // the domino is the only 2-cell shape
        let (first, key) = generator.next_shape(&tier, config.dimension_limit, 50);
        assert_eq!(first.cell_count(), 2);
        let (second, again) = generator.next_shape(&tier, config.dimension_limit, 50);
        assert_eq!(key, again);
        assert_eq!(second.cell_count(), 2);
        assert_eq!(generator.seen_keys().len(), 1);
    }

    #[test]
    fn test_ids_are_sequential_per_tier() {
        let config = GameConfig::default();
        let mut generator = PuzzleGenerator::new(8);
        let a = generator.generate(Tier::One, &config);
        let b = generator.generate(Tier::Two, &config);
        let c = generator.generate(Tier::One, &config);
        assert!(a.id.starts_with("T1-001-"));
        assert!(b.id.starts_with("T2-001-"));
        assert!(c.id.starts_with("T1-002-"));
        assert_eq!(generator.counters(), [2, 1]);
    }

    #[test]
    fn test_advanced_rules_use_par_points() {
        let mut config = GameConfig::advanced();
        config.rules.required_piece_chance = 1.0;
        let mut generator = PuzzleGenerator::new(21);
        let mut constrained = 0;
        for _ in 0..20 {
            let puzzle = generator.generate(Tier::Two, &config);
            assert_eq!(puzzle.points as usize, puzzle.fillable_count());
            if let Some(required) = puzzle.required_piece {
                constrained += 1;
                assert!(required.cells().iter().all(|&(r, c)| puzzle.grid.is_filled_at(r, c)));
            }
        }
        assert!(constrained > 0);
    }
}
