//! Flipped-disc computation for a single move.
//!
//! The kernel walks each of the eight ray directions from the move square
//! through a masked run of opponent discs; the run flips only when a player
//! disc bounds it. Returns the empty bitboard for illegal moves.

use crate::bitboard::Bitboard;
use crate::square::Square;

const HORIZONTAL_EDGE_MASK: u64 = 0x7E7E7E7E7E7E7E7E;
const VERTICAL_EDGE_MASK: u64 = 0x00FFFFFFFFFFFF00;
const DIAGONAL_EDGE_MASK: u64 = 0x007E7E7E7E7E7E00;

/// Expands the run of masked opponent discs above `x` (shift-left rays)
/// and keeps it only when bounded by a player disc.
#[inline(always)]
fn flips_up(x: u64, player: u64, masked_opponent: u64, dir: u32) -> u64 {
    let mut run = (x << dir) & masked_opponent;
    run |= (run << dir) & masked_opponent;
    run |= (run << dir) & masked_opponent;
    run |= (run << dir) & masked_opponent;
    run |= (run << dir) & masked_opponent;
    run |= (run << dir) & masked_opponent;
    if (run << dir) & player != 0 { run } else { 0 }
}

/// Mirror of [`flips_up`] for shift-right rays.
#[inline(always)]
fn flips_down(x: u64, player: u64, masked_opponent: u64, dir: u32) -> u64 {
    let mut run = (x >> dir) & masked_opponent;
    run |= (run >> dir) & masked_opponent;
    run |= (run >> dir) & masked_opponent;
    run |= (run >> dir) & masked_opponent;
    run |= (run >> dir) & masked_opponent;
    run |= (run >> dir) & masked_opponent;
    if (run >> dir) & player != 0 { run } else { 0 }
}

/// Computes the discs flipped by `p` playing at `sq` against `o`.
///
/// The square must be empty; an empty result means the move is illegal.
#[inline(always)]
pub fn flip(sq: Square, p: Bitboard, o: Bitboard) -> Bitboard {
    let x = sq.bitboard().bits();
    let p = p.bits();
    let o = o.bits();

    let o_h = o & HORIZONTAL_EDGE_MASK;
    let o_v = o & VERTICAL_EDGE_MASK;
    let o_d = o & DIAGONAL_EDGE_MASK;

    let mut flipped = flips_up(x, p, o_h, 1) | flips_down(x, p, o_h, 1);
    flipped |= flips_up(x, p, o_v, 8) | flips_down(x, p, o_v, 8);
    flipped |= flips_up(x, p, o_d, 7) | flips_down(x, p, o_d, 7);
    flipped |= flips_up(x, p, o_d, 9) | flips_down(x, p, o_d, 9);

    Bitboard::new(flipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::disc::Disc;

    #[test]
    fn opening_flips() {
        let p = Square::D5.bitboard() | Square::E4.bitboard();
        let o = Square::D4.bitboard() | Square::E5.bitboard();
        assert_eq!(flip(Square::C4, p, o), Square::D4.bitboard());
        assert_eq!(flip(Square::D3, p, o), Square::D4.bitboard());
        assert_eq!(flip(Square::E6, p, o), Square::E5.bitboard());
        assert_eq!(flip(Square::F5, p, o), Square::E5.bitboard());
    }

    #[test]
    fn illegal_move_flips_nothing() {
        let p = Square::D5.bitboard() | Square::E4.bitboard();
        let o = Square::D4.bitboard() | Square::E5.bitboard();
        assert!(flip(Square::A1, p, o).is_empty());
        assert!(flip(Square::C5, p, o).is_empty());
    }

    #[test]
    fn long_diagonal_flip() {
        let board = Board::from_string(
            "XXXXXXXOXOOXXXXOXOXXXOXOXOOXOXXOXOXOOOXOXOOOOOXOXOOOXXXO-X-OXOOO",
            Disc::Black,
        )
        .unwrap();
        let flipped = flip(Square::A8, board.player, board.opponent);
        let expected = Square::B7.bitboard()
            | Square::C6.bitboard()
            | Square::D5.bitboard()
            | Square::E4.bitboard()
            | Square::F3.bitboard();
        assert_eq!(flipped, expected);
    }

    #[test]
    fn flips_exactly_on_legal_squares() {
        let board = Board::from_string(
            "--XXXXX--OOOXX-O-OOOXXOX-OXOXOXXOXXXOXXX--XOXOXX-XXXOOO--OOOOO--",
            Disc::Black,
        )
        .unwrap();

        let legal = board.get_moves();
        for sq in Square::iter() {
            let flipped = flip(sq, board.player, board.opponent);
            if board.get_empty().contains(sq) {
                assert_eq!(legal.contains(sq), !flipped.is_empty(), "square {sq}");
            }
            assert!((flipped & !board.opponent).is_empty());
        }
    }

    #[test]
    fn no_wrap_across_edges() {
        // Opponent run ending at the H file with the bounding disc on the
        // next rank's A file must not flip.
        let p = Square::A2.bitboard();
        let o = Square::G1.bitboard() | Square::H1.bitboard();
        assert!(flip(Square::F1, p, o).is_empty());
    }
}
