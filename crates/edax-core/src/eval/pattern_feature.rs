//! Incrementally maintained pattern indices.
//!
//! Every ply keeps the full index vector for both perspectives; a move
//! updates the child ply from the parent in O(squares touched) instead of
//! rescanning the board. Keeping both perspectives makes passes free: the
//! side to move just selects the other stack entry at the same ply.

use crate::bitboard::Bitboard;
use crate::board::Board;
use crate::constants::MAX_PLY;
use crate::eval::pattern::{self, N_FEATURES, PATTERNS};
use crate::search::side_to_move::SideToMove;
use crate::square::Square;

/// Base-3 index per pattern instance, mover's perspective.
#[derive(Clone, Copy)]
pub struct PatternFeature {
    pub indices: [u16; N_FEATURES],
}

impl PatternFeature {
    fn zero() -> PatternFeature {
        PatternFeature {
            indices: [0; N_FEATURES],
        }
    }

    /// Recomputes all indices from scratch for the given perspective.
    fn from_discs(own: Bitboard, other: Bitboard) -> PatternFeature {
        let mut feature = PatternFeature::zero();
        for (f, pattern) in PATTERNS.iter().enumerate() {
            let mut idx: u32 = 0;
            let mut coef: u32 = 1;
            for &sq in pattern.squares {
                if own.contains(sq) {
                    idx += coef;
                } else if other.contains(sq) {
                    idx += 2 * coef;
                }
                coef *= 3;
            }
            feature.indices[f] = idx as u16;
        }
        feature
    }
}

/// Per-ply feature stacks for both perspectives.
pub struct PatternFeatures {
    pub p_features: [PatternFeature; MAX_PLY],
    pub o_features: [PatternFeature; MAX_PLY],
}

impl PatternFeatures {
    /// Initializes the stacks at `ply` from a board whose `player` is the
    /// p-perspective.
    pub fn new(board: &Board, ply: usize) -> PatternFeatures {
        let mut features = PatternFeatures {
            p_features: [PatternFeature::zero(); MAX_PLY],
            o_features: [PatternFeature::zero(); MAX_PLY],
        };
        features.p_features[ply] = PatternFeature::from_discs(board.player, board.opponent);
        features.o_features[ply] = PatternFeature::from_discs(board.opponent, board.player);
        features
    }

    /// Computes ply+1 from ply after `side` moves at `sq` flipping `flipped`.
    ///
    /// Called with the parent's ply, before the empty list shrinks.
    pub fn update(&mut self, sq: Square, flipped: Bitboard, ply: usize, side: SideToMove) {
        debug_assert!(ply + 1 < MAX_PLY);

        self.p_features[ply + 1] = self.p_features[ply];
        self.o_features[ply + 1] = self.o_features[ply];

        let (mover, waiter) = match side {
            SideToMove::Player => (&mut self.p_features[ply + 1], &mut self.o_features[ply + 1]),
            SideToMove::Opponent => (&mut self.o_features[ply + 1], &mut self.p_features[ply + 1]),
        };

        // Placed disc: empty -> own for the mover, empty -> other for the
        // waiter.
        let placed = pattern::square_updates(sq);
        for &(f, coef) in &placed.updates[..placed.n] {
            mover.indices[f as usize] += coef;
            waiter.indices[f as usize] += 2 * coef;
        }

        // Flipped discs: other -> own for the mover, own -> other for the
        // waiter.
        for fsq in flipped.iter() {
            let upd = pattern::square_updates(fsq);
            for &(f, coef) in &upd.updates[..upd.n] {
                mover.indices[f as usize] -= coef;
                waiter.indices[f as usize] += coef;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flip;

    #[test]
    fn incremental_matches_scratch() {
        pattern::init();

        let mut board = Board::new();
        let mut features = PatternFeatures::new(&board, 0);
        let mut side = SideToMove::Player;
        // Root perspective discs, tracked alongside the (player, opponent)
        // swap so we can rebuild features from scratch.
        let mut ply = 0;

        for _ in 0..12 {
            let moves = board.get_moves();
            let sq = match moves.lsb_square() {
                Some(sq) => sq,
                None => break,
            };
            let flipped = flip::flip(sq, board.player, board.opponent);
            features.update(sq, flipped, ply, side);
            board = board.make_move_with_flipped(flipped, sq);
            side = side.switch();
            ply += 1;

            // After the move, `board.player` belongs to `side`.
            let (p_own, p_other) = match side {
                SideToMove::Player => (board.player, board.opponent),
                SideToMove::Opponent => (board.opponent, board.player),
            };
            let scratch_p = PatternFeature::from_discs(p_own, p_other);
            let scratch_o = PatternFeature::from_discs(p_other, p_own);
            assert_eq!(features.p_features[ply].indices, scratch_p.indices);
            assert_eq!(features.o_features[ply].indices, scratch_o.indices);
        }
    }

    #[test]
    fn opening_features_are_mirror_consistent() {
        pattern::init();
        let board = Board::new();
        let features = PatternFeatures::new(&board, 0);
        // Empty corners: all corner patterns index to zero.
        for f in 0..4 {
            assert_eq!(features.p_features[0].indices[f], 0);
        }
        // The long diagonals see the four central discs.
        assert_ne!(features.p_features[0].indices[20], 0);
        assert_ne!(features.p_features[0].indices[21], 0);
    }
}
