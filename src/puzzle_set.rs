//! The active puzzles of one tier.
//!
//! Puzzles move from active to solved or expired, and both end states remove
//! the puzzle. [`PuzzleSet::refill`] tops the tier back up to its configured
//! active count, so between actions the count never changes.

use crate::config::GameConfig;
use crate::generator::PuzzleGenerator;
use crate::puzzle::{Puzzle, Tier};

#[derive(Debug, Clone)]
pub struct PuzzleSet {
    tier: Tier,
    puzzles: Vec<Puzzle>,
}

impl PuzzleSet {
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            puzzles: Vec::new(),
        }
    }

    /// Wraps puzzles restored from a save, dropping any from another tier.
    pub fn from_puzzles(tier: Tier, puzzles: Vec<Puzzle>) -> Self {
        let puzzles = puzzles
            .into_iter()
            .filter(|puzzle| puzzle.tier == tier)
            .collect();
        Self { tier, puzzles }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn puzzles(&self) -> &[Puzzle] {
        &self.puzzles
    }

    pub fn len(&self) -> usize {
        self.puzzles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puzzles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Puzzle> {
        self.puzzles.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Puzzle> {
        self.puzzles.get_mut(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.puzzles.iter().position(|puzzle| puzzle.id == id)
    }

    /// Removes a puzzle, keeping the order of the rest.
    pub fn remove(&mut self, index: usize) -> Option<Puzzle> {
        (index < self.puzzles.len()).then(|| self.puzzles.remove(index))
    }

    /// Generates puzzles until the tier holds its configured active count.
    ///
    /// Returns how many puzzles were added.
    pub fn refill(&mut self, generator: &mut PuzzleGenerator, config: &GameConfig) -> usize {
        let target = config.tier(self.tier).active;
        let mut added = 0;
        while self.puzzles.len() < target {
            self.puzzles.push(generator.generate(self.tier, config));
            added += 1;
        }
        added
    }

    /// Advances this tier's share of the shared clock by one turn.
    ///
    /// Every puzzle loses one turn; those that reach zero are removed and
    /// returned in their previous order.
    pub fn tick(&mut self) -> Vec<Puzzle> {
        for puzzle in &mut self.puzzles {
            puzzle.turns_left = puzzle.turns_left.saturating_sub(1);
        }
        let (expired, active): (Vec<Puzzle>, Vec<Puzzle>) = self
            .puzzles
            .drain(..)
            .partition(|puzzle| puzzle.turns_left == 0);
        self.puzzles = active;
        expired
    }

    /// Gives every active puzzle one turn back, capped at its budget.
    pub fn rewind(&mut self) {
        for puzzle in &mut self.puzzles {
            puzzle.turns_left = (puzzle.turns_left + 1).min(puzzle.max_turns);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_set(config: &GameConfig) -> (PuzzleSet, PuzzleGenerator) {
        let mut generator = PuzzleGenerator::new(17);
        let mut set = PuzzleSet::new(Tier::One);
        assert_eq!(set.refill(&mut generator, config), 4);
        (set, generator)
    }

    #[test]
    fn test_refill_tops_up_to_active_count() {
        let config = GameConfig::default();
        let (mut set, mut generator) = filled_set(&config);
        assert_eq!(set.len(), 4);
        assert_eq!(set.refill(&mut generator, &config), 0);

        let removed = set.remove(1).unwrap();
        assert_eq!(set.position(&removed.id), None);
        assert_eq!(set.refill(&mut generator, &config), 1);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_tick_decrements_every_puzzle_once() {
        let config = GameConfig::default();
        let (mut set, _) = filled_set(&config);
        let turns = [5, 1, 3, 1];
        for (puzzle, &left) in set.puzzles.iter_mut().zip(&turns) {
            puzzle.turns_left = left;
        }
        let ids: Vec<String> = set.puzzles().iter().map(|p| p.id.clone()).collect();

        let expired = set.tick();
        assert_eq!(
            expired.iter().map(|p| p.id.clone()).collect::<Vec<_>>(),
            vec![ids[1].clone(), ids[3].clone()]
        );
        let left: Vec<u32> = set.puzzles().iter().map(|p| p.turns_left).collect();
        assert_eq!(left, vec![4, 2]);
    }

    #[test]
    fn test_rewind_caps_at_budget() {
        let config = GameConfig::default();
        let (mut set, _) = filled_set(&config);
        set.puzzles[0].turns_left = 3;
        set.rewind();
        assert_eq!(set.puzzles()[0].turns_left, 4);
        assert_eq!(set.puzzles()[1].turns_left, set.puzzles()[1].max_turns);
    }

    #[test]
    fn test_from_puzzles_filters_tier() {
        let config = GameConfig::default();
        let mut generator = PuzzleGenerator::new(4);
        let one = generator.generate(Tier::One, &config);
        let two = generator.generate(Tier::Two, &config);
        let set = PuzzleSet::from_puzzles(Tier::Two, vec![one, two.clone()]);
        assert_eq!(set.puzzles(), &[two]);
    }

    #[test]
    fn test_remove_out_of_range_is_none() {
        let mut set = PuzzleSet::new(Tier::Two);
        assert!(set.remove(0).is_none());
        assert!(set.is_empty());
    }
}
