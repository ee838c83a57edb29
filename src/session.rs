//! A game session: both tiers, the hand, the score and the shared clock.
//!
//! Every state change goes through one of the `&mut self` entry points, each
//! of which runs to completion before returning. A committed action follows
//! one fixed order:
//! 1. apply the placement (or sacrifice)
//! 2. settle a completed puzzle, scoring it with its pre-tick timer
//! 3. tick the shared clock: hand expiries, then every puzzle in both tiers
//! 4. pay refunds and rewards into the hand
//! 5. refill both tiers to their active count

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::generator::PuzzleGenerator;
use crate::geometry::Grid;
use crate::hand::{draw_upgrade, Hand};
use crate::pieces::{HandPiece, Orientation, PieceType, PlacedPiece};
use crate::placement::{find_nearest_fit, fits_anywhere, Cell, PieceIdentity};
use crate::puzzle::{Puzzle, Tier};
use crate::puzzle_set::PuzzleSet;

/// Pieces every new session starts with.
pub const STARTING_HAND: [PieceType; 2] = [PieceType::Dot, PieceType::Domino];

/// Identifies one active puzzle by tier and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PuzzleRef {
    pub tier: Tier,
    pub index: usize,
}

impl PuzzleRef {
    pub const fn new(tier: Tier, index: usize) -> Self {
        Self { tier, index }
    }
}

/// Solved/expired counters per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub tier1_solved: u32,
    pub tier1_expired: u32,
    pub tier2_solved: u32,
    pub tier2_expired: u32,
}

impl Stats {
    fn record(&mut self, tier: Tier, status: PuzzleStatus) {
        let counter = match (tier, status) {
            (Tier::One, PuzzleStatus::Solved) => &mut self.tier1_solved,
            (Tier::One, PuzzleStatus::Expired) => &mut self.tier1_expired,
            (Tier::Two, PuzzleStatus::Solved) => &mut self.tier2_solved,
            (Tier::Two, PuzzleStatus::Expired) => &mut self.tier2_expired,
        };
        *counter += 1;
    }

    pub fn solved(&self, tier: Tier) -> u32 {
        match tier {
            Tier::One => self.tier1_solved,
            Tier::Two => self.tier2_solved,
        }
    }

    pub fn expired(&self, tier: Tier) -> u32 {
        match tier {
            Tier::One => self.tier1_expired,
            Tier::Two => self.tier2_expired,
        }
    }
}

/// How a puzzle left play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleStatus {
    Solved,
    Expired,
}

/// One finished puzzle in the session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub grid: Grid,
    pub tier: Tier,
    pub cell_count: usize,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub status: PuzzleStatus,
}

/// A puzzle that was completed by an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub puzzle_id: String,
    pub tier: Tier,
    pub points: u32,
    pub reward: Option<PieceType>,
}

/// Side effects of one tick of the shared clock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnReport {
    /// Ids of puzzles that ran out of turns.
    pub expired: Vec<String>,
    /// Hand pieces whose expiry reached zero.
    pub hand_expired: usize,
    /// Refunds or rewards rejected because the hand was full.
    pub dropped: Vec<PieceType>,
}

/// Result of an accepted placement or move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOutcome {
    pub puzzle_id: String,
    pub anchor: Cell,
    pub completed: Option<Completion>,
    /// `None` when the action did not consume a turn (same-puzzle moves).
    pub turn: Option<TurnReport>,
}

/// Result of an accepted sacrifice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SacrificeOutcome {
    pub consumed_level: u8,
    pub granted: PieceType,
    pub turn: TurnReport,
}

/// The single step of history kept for undo.
#[derive(Debug, Clone)]
struct UndoRecord {
    tier: Tier,
    puzzle_id: String,
    placed: PlacedPiece,
    hand_piece: HandPiece,
}

/// All mutable game state, owned in one place.
#[derive(Debug, Clone)]
pub struct GameSession {
    config: GameConfig,
    generator: PuzzleGenerator,
    tiers: [PuzzleSet; 2],
    hand: Hand,
    points: u64,
    total_turns: u64,
    stats: Stats,
    history: Vec<HistoryEntry>,
    undo: Option<UndoRecord>,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

impl GameSession {
    /// Starts a fresh session with the starting hand and full tiers.
    pub fn new(config: GameConfig, seed: u64) -> Self {
        Self::with_generator(config, PuzzleGenerator::new(seed))
    }

    /// Starts a fresh session seeded from the operating system.
    pub fn with_entropy(config: GameConfig) -> Self {
        Self::with_generator(config, PuzzleGenerator::from_rng(StdRng::from_os_rng()))
    }

    fn with_generator(config: GameConfig, generator: PuzzleGenerator) -> Self {
        let mut hand = Hand::new(config.rules.hand_limit, config.rules.piece_lifetime);
        let dropped = hand.add_all(STARTING_HAND);
        debug_assert!(dropped.is_empty());

        let mut session = Self {
            config,
            generator,
            tiers: [PuzzleSet::new(Tier::One), PuzzleSet::new(Tier::Two)],
            hand,
            points: 0,
            total_turns: 0,
            stats: Stats::default(),
            history: Vec::new(),
            undo: None,
        };
        session.refill();
        session
    }

    /// Reassembles a session from saved parts; tiers are topped up afterwards.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        config: GameConfig,
        generator: PuzzleGenerator,
        hand: Vec<HandPiece>,
        tier1: Vec<Puzzle>,
        tier2: Vec<Puzzle>,
        points: u64,
        total_turns: u64,
        stats: Stats,
        history: Vec<HistoryEntry>,
    ) -> Self {
        let hand = Hand::with_pieces(hand, config.rules.hand_limit, config.rules.piece_lifetime);
        let mut session = Self {
            config,
            generator,
            tiers: [
                PuzzleSet::from_puzzles(Tier::One, tier1),
                PuzzleSet::from_puzzles(Tier::Two, tier2),
            ],
            hand,
            points,
            total_turns,
            stats,
            history,
            undo: None,
        };
        session.refill();
        session
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn generator(&self) -> &PuzzleGenerator {
        &self.generator
    }

    pub fn hand(&self) -> &Hand {
        &self.hand
    }

    pub fn tier(&self, tier: Tier) -> &PuzzleSet {
        &self.tiers[tier.index()]
    }

    pub fn puzzle(&self, target: PuzzleRef) -> Option<&Puzzle> {
        self.tier(target.tier).get(target.index)
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn total_turns(&self) -> u64 {
        self.total_turns
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Finished puzzles, oldest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.undo.is_some()
    }

    /// True if some hand piece fits some active puzzle in some pose.
    pub fn has_legal_move(&self) -> bool {
        self.hand.pieces().iter().any(|held| {
            self.tiers
                .iter()
                .flat_map(PuzzleSet::puzzles)
                .any(|puzzle| fits_anywhere(puzzle, held.piece))
        })
    }

    fn set_mut(&mut self, tier: Tier) -> &mut PuzzleSet {
        &mut self.tiers[tier.index()]
    }

    fn refill(&mut self) {
        let [tier1, tier2] = &mut self.tiers;
        tier1.refill(&mut self.generator, &self.config);
        tier2.refill(&mut self.generator, &self.config);
    }

    fn record_history(&mut self, puzzle: &Puzzle, status: PuzzleStatus) {
        self.stats.record(puzzle.tier, status);
        self.history.push(HistoryEntry {
            id: puzzle.id.clone(),
            grid: puzzle.grid.clone(),
            tier: puzzle.tier,
            cell_count: puzzle.fillable_count(),
            timestamp: now_millis(),
            status,
        });
        let cap = self.config.history_cap;
        if self.history.len() > cap {
            let excess = self.history.len() - cap;
            self.history.drain(..excess);
        }
    }

    /// Scores and removes the puzzle if the last placement completed it.
    ///
    /// Returns the completion and the pieces owed to the hand.
    fn settle(&mut self, target: PuzzleRef) -> Option<(Completion, Vec<PieceType>)> {
        if !self.puzzle(target)?.is_complete() {
            return None;
        }
        let puzzle = self.set_mut(target.tier).remove(target.index)?;
        let points = puzzle.award(&self.config.rules);
        self.points += u64::from(points);
        self.record_history(&puzzle, PuzzleStatus::Solved);
        log::info!("solved {} for {points} points", puzzle.id);

        let mut payout = puzzle.placed_types();
        payout.extend(puzzle.reward_piece_type);
        let completion = Completion {
            puzzle_id: puzzle.id,
            tier: puzzle.tier,
            points,
            reward: puzzle.reward_piece_type,
        };
        Some((completion, payout))
    }

    /// Advances the shared clock one turn and pays `payout` into the hand.
    fn commit_turn(&mut self, mut payout: Vec<PieceType>) -> TurnReport {
        self.total_turns += 1;
        let hand_expired = self.hand.tick();

        let mut expired_ids = Vec::new();
        for tier in Tier::ALL {
            for puzzle in self.set_mut(tier).tick() {
                log::info!("{} expired with {} pieces placed", puzzle.id, puzzle.placed_pieces.len());
                self.record_history(&puzzle, PuzzleStatus::Expired);
                if !self.config.rules.forfeit_on_expiry {
                    payout.extend(puzzle.placed_types());
                }
                expired_ids.push(puzzle.id);
            }
        }

        // the undo target may have just expired
        let stale = self.undo.as_ref().is_some_and(|record| {
            self.tier(record.tier).position(&record.puzzle_id).is_none()
        });
        if stale {
            self.undo = None;
        }

        let dropped = self.hand.add_all(payout);
        if !dropped.is_empty() {
            log::debug!("hand full, dropped {dropped:?}");
        }
        self.refill();

        TurnReport {
            expired: expired_ids,
            hand_expired,
            dropped,
        }
    }

    /// Places hand piece `hand_index` on `target`, snapped to the legal anchor
    /// nearest to `drop`.
    ///
    /// Returns `None` and leaves the session untouched if the piece fits
    /// nowhere on that puzzle.
    pub fn place_from_hand(
        &mut self,
        hand_index: usize,
        target: PuzzleRef,
        orientation: Orientation,
        drop: Cell,
    ) -> Option<PlaceOutcome> {
        let hand_piece = *self.hand.get(hand_index)?;
        let identity = PieceIdentity::new(hand_piece.piece, orientation);
        let fit = {
            let puzzle = self.puzzle(target)?;
            find_nearest_fit(puzzle, &identity.shape(), drop, None, Some(&identity))?
        };

        self.hand.remove(hand_index);
        let placed = identity.at(fit.anchor);
        let puzzle = self.set_mut(target.tier).get_mut(target.index)?;
        puzzle.placed_pieces.push(placed);
        let puzzle_id = puzzle.id.clone();
        self.undo = None;

        let (completed, payout) = match self.settle(target) {
            Some((completion, payout)) => (Some(completion), payout),
            None => (None, Vec::new()),
        };
        if completed.is_none() {
            self.undo = Some(UndoRecord {
                tier: target.tier,
                puzzle_id: puzzle_id.clone(),
                placed,
                hand_piece,
            });
        }
        let turn = self.commit_turn(payout);

        Some(PlaceOutcome {
            puzzle_id,
            anchor: fit.anchor,
            completed,
            turn: Some(turn),
        })
    }

    /// Moves placed piece `placed_index` of `from` onto `to`.
    ///
    /// Moving within one puzzle repositions the piece and costs no turn;
    /// moving to another puzzle is a committed turn. Neither is undoable.
    pub fn move_placed(
        &mut self,
        from: PuzzleRef,
        placed_index: usize,
        to: PuzzleRef,
        orientation: Orientation,
        drop: Cell,
    ) -> Option<PlaceOutcome> {
        let piece = self.puzzle(from)?.placed_pieces.get(placed_index)?.piece;
        let identity = PieceIdentity::new(piece, orientation);
        let same_puzzle = from == to;
        let fit = {
            let puzzle = self.puzzle(to)?;
            let ignore = same_puzzle.then_some(placed_index);
            find_nearest_fit(puzzle, &identity.shape(), drop, ignore, Some(&identity))?
        };

        let placed = identity.at(fit.anchor);
        if same_puzzle {
            let puzzle = self.set_mut(to.tier).get_mut(to.index)?;
            puzzle.placed_pieces[placed_index] = placed;
        } else {
            self.set_mut(from.tier)
                .get_mut(from.index)?
                .placed_pieces
                .remove(placed_index);
            self.set_mut(to.tier)
                .get_mut(to.index)?
                .placed_pieces
                .push(placed);
        }
        let puzzle_id = self.puzzle(to)?.id.clone();
        self.undo = None;

        let (completed, payout) = match self.settle(to) {
            Some((completion, payout)) => (Some(completion), payout),
            None => (None, Vec::new()),
        };
        let turn = if same_puzzle {
            let dropped = self.hand.add_all(payout);
            if !dropped.is_empty() {
                log::debug!("hand full, dropped {dropped:?}");
            }
            self.refill();
            None
        } else {
            Some(self.commit_turn(payout))
        };

        Some(PlaceOutcome {
            puzzle_id,
            anchor: fit.anchor,
            completed,
            turn,
        })
    }

    /// Trades three same-level hand pieces for one piece of the next level.
    ///
    /// An invalid selection is a no-op and returns `None`. A valid one costs
    /// a turn.
    pub fn sacrifice(&mut self, selection: [usize; 3]) -> Option<SacrificeOutcome> {
        let level = self.hand.sacrifice_level(selection)?;
        let granted = draw_upgrade(self.generator.rng(), level)?;
        self.hand.consume_sacrifice(selection)?;
        self.undo = None;
        log::debug!("sacrificed three level-{level} pieces for {granted}");

        let turn = self.commit_turn(vec![granted]);
        Some(SacrificeOutcome {
            consumed_level: level,
            granted,
            turn,
        })
    }

    /// Takes back the last placement from the hand, if it is still undoable.
    ///
    /// With `undo_rewinds_clock`, every active puzzle and hand expiry also
    /// gets its turn back.
    pub fn undo(&mut self) -> bool {
        let Some(record) = self.undo.take() else {
            return false;
        };
        let set = self.set_mut(record.tier);
        let Some(index) = set.position(&record.puzzle_id) else {
            return false;
        };
        let Some(puzzle) = set.get_mut(index) else {
            return false;
        };
        let Some(placed_index) = puzzle
            .placed_pieces
            .iter()
            .rposition(|placed| *placed == record.placed)
        else {
            return false;
        };
        puzzle.placed_pieces.remove(placed_index);

        if self.config.rules.undo_rewinds_clock {
            for set in &mut self.tiers {
                set.rewind();
            }
            self.hand.rewind();
        }
        self.hand.restore(record.hand_piece);
        log::debug!("undid {} on {}", record.placed.piece, record.puzzle_id);
        true
    }
}
