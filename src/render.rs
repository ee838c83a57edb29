//! Plain-text rendering of shapes, puzzles, the hand and whole sessions.
//!
//! Puzzle legend: `#` is outside the board, `.` an empty board cell, `+` an
//! uncovered cell of the required placement, and `A`, `B`, ... the placed
//! pieces in placement order.

use rustc_hash::FxHashMap;

use crate::geometry::Grid;
use crate::hand::Hand;
use crate::puzzle::{Puzzle, Tier};
use crate::session::GameSession;

/// Renders a piece or board shape with `#` for filled cells.
pub fn format_shape(shape: &Grid) -> String {
    let mut output = String::new();
    for r in 0..shape.height() {
        for c in 0..shape.width() {
            output.push(if shape.get(r, c) { '#' } else { '.' });
        }
        output.push('\n');
    }
    output
}

fn piece_label(index: usize) -> char {
    char::from(b'A' + (index % 26) as u8)
}

/// One header line followed by the board.
pub fn format_puzzle(puzzle: &Puzzle) -> String {
    let mut output = String::new();
    output.push_str(&puzzle.id);
    match puzzle.reward_piece_type {
        Some(reward) => output.push_str(&format!("  reward {reward}")),
        None => output.push_str(&format!("  points {}", puzzle.points)),
    }
    output.push_str(&format!("  turns {}/{}", puzzle.turns_left, puzzle.max_turns));
    if let Some(required) = &puzzle.required_piece {
        output.push_str(&format!("  requires {}", required.piece));
    }
    output.push('\n');

    let mut labels: FxHashMap<(i32, i32), char> = FxHashMap::default();
    for (index, placed) in puzzle.placed_pieces.iter().enumerate() {
        for cell in placed.cells() {
            labels.insert(cell, piece_label(index));
        }
    }
    if let Some(required) = &puzzle.required_piece {
        for cell in required.cells() {
            labels.entry(cell).or_insert('+');
        }
    }

    let grid = &puzzle.grid;
    for r in 0..grid.height() {
        for c in 0..grid.width() {
            let symbol = if !grid.get(r, c) {
                '#'
            } else {
                labels.get(&(r as i32, c as i32)).copied().unwrap_or('.')
            };
            output.push(symbol);
        }
        output.push('\n');
    }
    output
}

/// Hand pieces in display order, each with the index actions refer to.
pub fn format_hand(hand: &Hand) -> String {
    let mut output = String::new();
    for index in hand.sorted() {
        let held = hand.pieces()[index];
        output.push_str(&format!("[{index}] {} L{}", held.piece, held.piece.level()));
        if let Some(expiry) = held.expiry {
            output.push_str(&format!(" expires in {expiry}"));
        }
        output.push('\n');
    }
    output
}

pub fn format_session(session: &GameSession) -> String {
    let stats = session.stats();
    let mut output = format!(
        "points {}  turns {}\n",
        session.points(),
        session.total_turns()
    );
    for tier in Tier::ALL {
        output.push_str(&format!(
            "\n== tier {} (solved {}, expired {}) ==\n",
            tier.number(),
            stats.solved(tier),
            stats.expired(tier)
        ));
        for (index, puzzle) in session.tier(tier).puzzles().iter().enumerate() {
            output.push_str(&format!("[{index}] {}", format_puzzle(puzzle)));
        }
    }
    output.push_str("\n== hand ==\n");
    output.push_str(&format_hand(session.hand()));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::pieces::{HandPiece, Orientation, PieceType, PlacedPiece};

    fn puzzle(rows: &[&[u8]], tier: Tier) -> Puzzle {
        Puzzle {
            id: format!("T{}-001-abc123", tier.number()),
            grid: Grid::from_rows(rows),
            tier,
            points: 11,
            reward_piece_type: (tier == Tier::One).then_some(PieceType::TrominoL),
            turns_left: 4,
            max_turns: 12,
            placed_pieces: Vec::new(),
            required_piece: None,
        }
    }

    #[test]
    fn test_format_shape() {
        insta::assert_snapshot!(format_shape(&PieceType::PentoV.base_shape()).trim_end(), @r"
        #..
        #..
        ###
        ");
    }

    #[test]
    fn test_format_tier_one_puzzle() {
        let mut board = puzzle(&[&[1, 1, 1], &[1, 0, 1]], Tier::One);
        board.placed_pieces.push(PlacedPiece::new(
            PieceType::Domino,
            Orientation::IDENTITY,
            0,
            0,
        ));
        insta::assert_snapshot!(format_puzzle(&board).trim_end(), @r"
        T1-001-abc123  reward tromino_l  turns 4/12
        AA.
        .#.
        ");
    }

    #[test]
    fn test_format_required_cells() {
        let mut board = puzzle(&[&[1, 1, 1], &[1, 1, 1]], Tier::Two);
        board.required_piece = Some(PlacedPiece::new(
            PieceType::Domino,
            Orientation::new(1, false),
            0,
            2,
        ));
        board.placed_pieces.push(PlacedPiece::new(
            PieceType::Dot,
            Orientation::IDENTITY,
            0,
            0,
        ));
        board.placed_pieces.push(PlacedPiece::new(
            PieceType::Dot,
            Orientation::IDENTITY,
            1,
            0,
        ));
        insta::assert_snapshot!(format_puzzle(&board).trim_end(), @r"
        T2-001-abc123  points 11  turns 4/12  requires domino
        A.+
        B.+
        ");
    }

    #[test]
    fn test_format_hand_sorted_with_expiry() {
        let hand = Hand::with_pieces(
            vec![
                HandPiece::new(PieceType::TetroT, Some(3)),
                HandPiece::new(PieceType::Dot, None),
                HandPiece::new(PieceType::Domino, Some(14)),
            ],
            None,
            Some(15),
        );
        insta::assert_snapshot!(format_hand(&hand).trim_end(), @r"
        [1] dot L1
        [2] domino L2 expires in 14
        [0] tetro_t L4 expires in 3
        ");
    }

    #[test]
    fn test_format_session_lists_everything() {
        let session = GameSession::new(GameConfig::default(), 1);
        let text = format_session(&session);
        assert!(text.starts_with("points 0  turns 0\n"));
        assert!(text.contains("== tier 1 (solved 0, expired 0) =="));
        assert!(text.contains("== tier 2 (solved 0, expired 0) =="));
        for tier in Tier::ALL {
            for puzzle in session.tier(tier).puzzles() {
                assert!(text.contains(&puzzle.id));
            }
        }
        assert!(text.ends_with("== hand ==\n[0] dot L1\n[1] domino L2\n"));
    }
}
