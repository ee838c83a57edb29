//! The player's hand: an unordered multiset of pieces.
//!
//! Order in the underlying vector is insertion order and carries no game
//! meaning; [`Hand::sorted`] gives the display order (level, then name).

use rand::Rng;

use crate::error::HandFull;
use crate::pieces::{HandPiece, PieceType, MAX_LEVEL};

#[derive(Debug, Clone, Default)]
pub struct Hand {
    pieces: Vec<HandPiece>,
    limit: Option<usize>,
    lifetime: Option<u32>,
}

impl Hand {
    /// An empty hand with an optional size cap and piece lifetime.
    pub fn new(limit: Option<usize>, lifetime: Option<u32>) -> Self {
        Self {
            pieces: Vec::new(),
            limit,
            lifetime,
        }
    }

    /// Restores saved pieces verbatim, ignoring the cap.
    pub fn with_pieces(pieces: Vec<HandPiece>, limit: Option<usize>, lifetime: Option<u32>) -> Self {
        Self {
            pieces,
            limit,
            lifetime,
        }
    }

    pub fn pieces(&self) -> &[HandPiece] {
        &self.pieces
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HandPiece> {
        self.pieces.get(index)
    }

    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.pieces.len() >= limit)
    }

    /// Adds a new piece with a fresh lifetime, unless the hand is full.
    pub fn add(&mut self, piece: PieceType) -> Result<(), HandFull> {
        if let Some(limit) = self.limit {
            if self.pieces.len() >= limit {
                return Err(HandFull { piece, limit });
            }
        }
        self.pieces.push(HandPiece::new(piece, self.lifetime));
        Ok(())
    }

    /// Adds several pieces, returning the ones that did not fit.
    pub fn add_all(&mut self, pieces: impl IntoIterator<Item = PieceType>) -> Vec<PieceType> {
        pieces
            .into_iter()
            .filter_map(|piece| self.add(piece).err().map(|full| full.piece))
            .collect()
    }

    /// Puts back a piece exactly as it was taken out. Bypasses the cap.
    pub fn restore(&mut self, piece: HandPiece) {
        self.pieces.push(piece);
    }

    pub fn remove(&mut self, index: usize) -> Option<HandPiece> {
        (index < self.pieces.len()).then(|| self.pieces.remove(index))
    }

    /// Counts every expiry down by one and drops pieces that reach zero.
    ///
    /// Returns the number of pieces removed.
    pub fn tick(&mut self) -> usize {
        let before = self.pieces.len();
        self.pieces.retain_mut(|piece| match piece.expiry.as_mut() {
            Some(expiry) => {
                *expiry = expiry.saturating_sub(1);
                *expiry > 0
            }
            None => true,
        });
        before - self.pieces.len()
    }

    /// Gives every expiring piece one turn back, capped at the lifetime.
    pub fn rewind(&mut self) {
        for piece in &mut self.pieces {
            if let Some(expiry) = piece.expiry.as_mut() {
                *expiry += 1;
                if let Some(lifetime) = self.lifetime {
                    *expiry = (*expiry).min(lifetime);
                }
            }
        }
    }

    /// Hand indices in display order: by level, then by name.
    pub fn sorted(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.pieces.len()).collect();
        order.sort_by_key(|&index| {
            let piece = self.pieces[index].piece;
            (piece.level(), piece.name())
        });
        order
    }

    /// Level shared by a valid sacrifice selection.
    ///
    /// The selection must name three distinct pieces of one level below the
    /// maximum.
    pub fn sacrifice_level(&self, selection: [usize; 3]) -> Option<u8> {
        let [a, b, c] = selection;
        if a == b || b == c || a == c {
            return None;
        }
        let level = self.get(a)?.piece.level();
        if level >= MAX_LEVEL {
            return None;
        }
        let same = [b, c]
            .iter()
            .all(|&index| self.get(index).is_some_and(|held| held.piece.level() == level));
        same.then_some(level)
    }

    /// Removes the three selected pieces and returns their shared level.
    pub fn consume_sacrifice(&mut self, selection: [usize; 3]) -> Option<u8> {
        let level = self.sacrifice_level(selection)?;
        let mut indices = selection;
        // highest index first so the remaining indices stay valid
        indices.sort_unstable_by(|a, b| b.cmp(a));
        for index in indices {
            self.pieces.remove(index);
        }
        Some(level)
    }
}

/// Draws a piece type uniformly from the level above `level`.
pub fn draw_upgrade<R: Rng>(rng: &mut R, level: u8) -> Option<PieceType> {
    let pool = PieceType::at_level(level + 1);
    if pool.is_empty() {
        return None;
    }
    Some(pool[rng.random_range(0..pool.len())])
}
