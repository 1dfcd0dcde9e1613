//! Board representation: a `(player, opponent)` bitboard pair.
//!
//! The `player` field is always the side to move; applying a move or a pass
//! swaps the two masks. Boards are plain values and are copied at each ply.

use std::cmp::Ordering;
use std::fmt;

use crate::bitboard::Bitboard;
use crate::constants::SCORE_MAX;
use crate::disc::Disc;
use crate::flip;
use crate::square::Square;
use crate::types::{ScaledScore, Score};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    /// Discs of the side to move.
    pub player: Bitboard,
    /// Discs of the side that just moved.
    pub opponent: Bitboard,
}

impl Default for Board {
    /// The standard opening position: D5/E4 for the mover (Black),
    /// D4/E5 for the opponent (White).
    fn default() -> Self {
        Board {
            player: Square::D5.bitboard() | Square::E4.bitboard(),
            opponent: Square::D4.bitboard() | Square::E5.bitboard(),
        }
    }
}

impl Board {
    pub fn new() -> Board {
        Default::default()
    }

    /// Builds a board from raw bitboards.
    ///
    /// Debug builds panic when the masks overlap; release builds produce an
    /// invalid board without panicking.
    pub fn from_bitboards(player: impl Into<Bitboard>, opponent: impl Into<Bitboard>) -> Board {
        let player = player.into();
        let opponent = opponent.into();
        debug_assert!(
            (player & opponent).is_empty(),
            "player and opponent bitboards must not overlap"
        );
        Board { player, opponent }
    }

    /// Parses a 64-character diagram, squares A1..H8, given the side to move.
    ///
    /// `X` is Black, `O` is White, `-` is empty; the mover's discs land in
    /// `player`.
    pub fn from_string(board_string: &str, side_to_move: Disc) -> Result<Board, BoardError> {
        if side_to_move == Disc::Empty {
            return Err(BoardError::InvalidPlayer);
        }

        let chars: Vec<char> = board_string.chars().collect();
        if chars.len() != 64 {
            return Err(BoardError::BadLength {
                expected: 64,
                actual: chars.len(),
            });
        }

        let player_char = side_to_move.to_char();
        let opponent_char = side_to_move.opposite().to_char();

        let mut player = Bitboard::new(0);
        let mut opponent = Bitboard::new(0);

        for (i, &c) in chars.iter().enumerate() {
            let sq = Square::from_usize_unchecked(i);
            if c == player_char {
                player = player.set(sq);
            } else if c == opponent_char {
                opponent = opponent.set(sq);
            } else if c != '-' {
                return Err(BoardError::InvalidChar { char: c, position: i });
            }
        }

        Ok(Board { player, opponent })
    }

    /// Parses a 65-character diagram: 64 squares followed by the
    /// side-to-move character (`X` or `O`).
    pub fn from_string_with_side(diagram: &str) -> Result<(Board, Disc), BoardError> {
        let chars: Vec<char> = diagram.chars().collect();
        if chars.len() != 65 {
            return Err(BoardError::BadLength {
                expected: 65,
                actual: chars.len(),
            });
        }

        let side = match chars[64] {
            'X' | 'x' | '*' => Disc::Black,
            'O' | 'o' => Disc::White,
            c => return Err(BoardError::InvalidChar { char: c, position: 64 }),
        };

        let board_part: String = chars[..64].iter().collect();
        let board = Board::from_string(&board_part, side)?;
        Ok((board, side))
    }

    /// Disc at `sq` as seen from outside, given the mover's color.
    #[inline]
    pub fn get_disc_at(&self, sq: Square, side_to_move: Disc) -> Disc {
        if self.player.contains(sq) {
            side_to_move
        } else if self.opponent.contains(sq) {
            side_to_move.opposite()
        } else {
            Disc::Empty
        }
    }

    /// True when neither side has a legal move.
    #[inline]
    pub fn is_game_over(&self) -> bool {
        if self.has_legal_moves() {
            return false;
        }
        !self.switch_players().has_legal_moves()
    }

    #[inline(always)]
    pub fn get_empty(&self) -> Bitboard {
        !(self.player | self.opponent)
    }

    #[inline(always)]
    pub fn get_player_count(&self) -> u32 {
        self.player.count()
    }

    #[inline(always)]
    pub fn get_opponent_count(&self) -> u32 {
        self.opponent.count()
    }

    #[inline(always)]
    pub fn get_empty_count(&self) -> u32 {
        self.get_empty().count()
    }

    /// Disc difference on a full board, from the mover's view.
    ///
    /// Use [`solve`](Self::solve) when empties may remain.
    #[inline(always)]
    pub fn final_score(&self) -> Score {
        debug_assert!(self.get_empty().is_empty());
        self.get_player_count() as Score * 2 - SCORE_MAX
    }

    #[inline(always)]
    pub fn final_score_scaled(&self) -> ScaledScore {
        ScaledScore::from_disc_diff(self.final_score())
    }

    /// Final score when both sides pass with empties left: the remaining
    /// squares are credited to the leader, so exact scores stay even.
    #[inline(always)]
    pub fn solve(&self, n_empties: u32) -> Score {
        let score = self.get_player_count() as Score * 2 - SCORE_MAX;
        let diff = score + n_empties as Score;

        match diff.cmp(&0) {
            Ordering::Equal => diff,
            Ordering::Greater => diff + n_empties as Score,
            Ordering::Less => score,
        }
    }

    #[inline(always)]
    pub fn solve_scaled(&self, n_empties: u32) -> ScaledScore {
        ScaledScore::from_disc_diff(self.solve(n_empties))
    }

    /// Swaps sides: a pass.
    #[inline(always)]
    pub fn switch_players(&self) -> Board {
        Board {
            player: self.opponent,
            opponent: self.player,
        }
    }

    /// Applies a move if legal; `None` otherwise.
    #[inline]
    pub fn try_make_move(&self, sq: Square) -> Option<Board> {
        if !self.opponent.has_adjacent_bit(sq) {
            return None;
        }

        let flipped = flip::flip(sq, self.player, self.opponent);
        if flipped.is_empty() {
            return None;
        }

        Some(Board {
            player: self.opponent.apply_flip(flipped),
            opponent: self.player.apply_move(flipped, sq),
        })
    }

    /// Applies a move supplied from outside the engine, validating legality.
    pub fn apply_checked(&self, sq: Square) -> Result<Board, IllegalMoveError> {
        if sq == Square::None || !self.get_empty().contains(sq) {
            return Err(IllegalMoveError { sq });
        }
        self.try_make_move(sq).ok_or(IllegalMoveError { sq })
    }

    /// Applies a known-legal move.
    ///
    /// Debug builds panic on an illegal square; release builds silently
    /// produce an invalid board. Use [`try_make_move`](Self::try_make_move)
    /// when legality is uncertain.
    #[inline(always)]
    pub fn make_move(&self, sq: Square) -> Board {
        let flipped = flip::flip(sq, self.player, self.opponent);
        debug_assert!(!flipped.is_empty());
        Board {
            player: self.opponent.apply_flip(flipped),
            opponent: self.player.apply_move(flipped, sq),
        }
    }

    /// Applies a move whose flip set has already been computed.
    #[inline(always)]
    pub fn make_move_with_flipped(&self, flipped: Bitboard, sq: Square) -> Board {
        debug_assert!(!flipped.is_empty());
        debug_assert!(self.get_empty().contains(sq));
        debug_assert!((flipped & !self.opponent).is_empty());
        Board {
            player: self.opponent.apply_flip(flipped),
            opponent: self.player.apply_move(flipped, sq),
        }
    }

    #[inline(always)]
    pub fn get_moves(&self) -> Bitboard {
        self.player.get_moves(self.opponent)
    }

    #[inline(always)]
    pub fn has_legal_moves(&self) -> bool {
        !self.get_moves().is_empty()
    }

    #[inline(always)]
    pub fn is_legal_move(&self, sq: Square) -> bool {
        self.get_moves().contains(sq)
    }

    /// Number of provably unflippable discs for the side to move.
    #[inline]
    pub fn get_stability(&self) -> u32 {
        crate::stability::get_stable_discs(self.player, self.opponent).count()
    }

    #[inline(always)]
    pub fn get_potential_moves(&self) -> Bitboard {
        self.player.get_potential_moves(self.opponent)
    }

    #[inline(always)]
    pub fn get_moves_and_potential(&self) -> (Bitboard, Bitboard) {
        self.player.get_moves_and_potential(self.opponent)
    }

    #[inline]
    pub fn is_square_empty(&self, sq: Square) -> bool {
        self.get_empty().contains(sq)
    }

    /// 64-bit position fingerprint over both bitboards.
    ///
    /// The hash tables keep the high 32 bits as the per-entry lock, so the
    /// fingerprint must stay well distributed in both halves.
    #[inline]
    pub fn hash(&self) -> u64 {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.player.bits().to_le_bytes());
        bytes[8..].copy_from_slice(&self.opponent.bits().to_le_bytes());
        rapidhash::rapidhash(&bytes)
    }

    #[inline]
    pub fn rotate_90_clockwise(&self) -> Board {
        Board {
            player: self.player.rotate_90_clockwise(),
            opponent: self.opponent.rotate_90_clockwise(),
        }
    }

    #[inline]
    pub fn rotate_180_clockwise(&self) -> Board {
        Board {
            player: self.player.rotate_180_clockwise(),
            opponent: self.opponent.rotate_180_clockwise(),
        }
    }

    #[inline]
    pub fn rotate_270_clockwise(&self) -> Board {
        Board {
            player: self.player.rotate_270_clockwise(),
            opponent: self.opponent.rotate_270_clockwise(),
        }
    }

    #[inline]
    pub fn flip_vertical(&self) -> Board {
        Board {
            player: self.player.flip_vertical(),
            opponent: self.opponent.flip_vertical(),
        }
    }

    #[inline]
    pub fn flip_horizontal(&self) -> Board {
        Board {
            player: self.player.flip_horizontal(),
            opponent: self.opponent.flip_horizontal(),
        }
    }

    #[inline]
    pub fn flip_diag_a1h8(&self) -> Board {
        Board {
            player: self.player.flip_diag_a1h8(),
            opponent: self.opponent.flip_diag_a1h8(),
        }
    }

    #[inline]
    pub fn flip_diag_a8h1(&self) -> Board {
        Board {
            player: self.player.flip_diag_a8h1(),
            opponent: self.opponent.flip_diag_a8h1(),
        }
    }

    /// All eight symmetric variants of this board, the identity first.
    pub fn symmetries(&self) -> [Board; 8] {
        [
            *self,
            self.rotate_90_clockwise(),
            self.rotate_180_clockwise(),
            self.rotate_270_clockwise(),
            self.flip_horizontal(),
            self.flip_vertical(),
            self.flip_diag_a1h8(),
            self.flip_diag_a8h1(),
        ]
    }

    /// The lexicographically smallest of the eight symmetric variants.
    #[inline]
    pub fn unique(&self) -> Board {
        let mut result = *self;
        for candidate in self.symmetries().into_iter().skip(1) {
            if (candidate.player.bits(), candidate.opponent.bits())
                < (result.player.bits(), result.opponent.bits())
            {
                result = candidate;
            }
        }
        result
    }

    /// Flat 64-character diagram, A1 first.
    pub fn to_diagram(&self, side_to_move: Disc) -> String {
        let mut s = String::with_capacity(64);
        for sq in Square::iter() {
            s.push(self.get_disc_at(sq, side_to_move).to_char());
        }
        s
    }

    /// 65-character diagram: squares then side-to-move character.
    pub fn to_diagram_with_side(&self, side_to_move: Disc) -> String {
        let mut s = self.to_diagram(side_to_move);
        s.push(side_to_move.to_char());
        s
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let diagram = self.to_diagram(Disc::Black);
        for (i, c) in diagram.chars().enumerate() {
            if i > 0 && i % 8 == 0 {
                writeln!(f)?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Error for malformed board diagrams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// The side to move was `Disc::Empty`.
    InvalidPlayer,
    /// Wrong diagram length.
    BadLength { expected: usize, actual: usize },
    /// A character other than `X`, `O`, `-`.
    InvalidChar { char: char, position: usize },
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::InvalidPlayer => {
                write!(f, "side to move must be Black or White")
            }
            BoardError::BadLength { expected, actual } => {
                write!(f, "board string has {actual} characters, expected {expected}")
            }
            BoardError::InvalidChar { char, position } => {
                write!(
                    f,
                    "invalid character {char:?} at position {position}: must be 'X', 'O' or '-'"
                )
            }
        }
    }
}

impl std::error::Error for BoardError {}

/// Error returned when an externally supplied move is not legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalMoveError {
    pub sq: Square,
}

impl fmt::Display for IllegalMoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal move: {}", self.sq)
    }
}

impl std::error::Error for IllegalMoveError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_bitboards() {
        let board = Board::new();
        assert_eq!(board.player.bits(), 0x0000000810000000);
        assert_eq!(board.opponent.bits(), 0x0000001008000000);
        assert_eq!(board.get_moves().bits(), 0x0000102004080000);
        assert_eq!(board.get_empty_count(), 60);
        assert!((board.player & board.opponent).is_empty());
    }

    #[test]
    fn diagram_round_trip() {
        let board = Board::new();
        let diagram = board.to_diagram(Disc::Black);
        let parsed = Board::from_string(&diagram, Disc::Black).unwrap();
        assert_eq!(parsed, board);

        let with_side = board.to_diagram_with_side(Disc::White);
        let (parsed, side) = Board::from_string_with_side(&with_side).unwrap();
        assert_eq!(parsed, board);
        assert_eq!(side, Disc::White);
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            Board::from_string("XO", Disc::Black),
            Err(BoardError::BadLength {
                expected: 64,
                actual: 2
            })
        );
        assert!(matches!(
            Board::from_string(&"Z".repeat(64), Disc::Black),
            Err(BoardError::InvalidChar { char: 'Z', position: 0 })
        ));
        assert_eq!(
            Board::from_string(&"-".repeat(64), Disc::Empty),
            Err(BoardError::InvalidPlayer)
        );
        assert!(matches!(
            Board::from_string_with_side(&"-".repeat(65)),
            Err(BoardError::InvalidChar { position: 64, .. })
        ));
    }

    #[test]
    fn make_move_swaps_sides() {
        let board = Board::new();
        let next = board.make_move(Square::D3);
        // D4 flipped: the mover of `next` is White holding E5 only.
        assert_eq!(next.player, Square::E5.bitboard());
        assert_eq!(
            next.opponent,
            Square::D3.bitboard()
                | Square::D4.bitboard()
                | Square::D5.bitboard()
                | Square::E4.bitboard()
        );
    }

    #[test]
    fn apply_checked_rejects_illegal() {
        let board = Board::new();
        assert!(board.apply_checked(Square::D3).is_ok());
        assert_eq!(
            board.apply_checked(Square::A1),
            Err(IllegalMoveError { sq: Square::A1 })
        );
        assert_eq!(
            board.apply_checked(Square::D4),
            Err(IllegalMoveError { sq: Square::D4 })
        );
        assert_eq!(
            board.apply_checked(Square::None),
            Err(IllegalMoveError { sq: Square::None })
        );
    }

    #[test]
    fn flipped_subset_invariants() {
        let board = Board::new();
        for sq in board.get_moves().iter() {
            let flipped = flip::flip(sq, board.player, board.opponent);
            assert!((flipped & !board.opponent).is_empty());
            assert!(board.get_empty().contains(sq));
            let next = board.make_move_with_flipped(flipped, sq);
            assert!((next.player & next.opponent).is_empty());
        }
    }

    #[test]
    fn forced_pass_position() {
        // Mover holds only A1, the opponent only B1: the mover has no
        // bounded run anywhere, the opponent answers at C1.
        let board = Board::from_bitboards(Square::B1.bitboard(), Square::A1.bitboard());
        assert!(board.get_moves().is_empty());
        let passed = board.switch_players();
        assert!(passed.has_legal_moves());
        assert!(passed.is_legal_move(Square::C1));
        assert!(!board.is_game_over());
    }

    #[test]
    fn game_over_and_solve() {
        let board = Board::from_bitboards(Square::A1.bitboard(), Square::H8.bitboard());
        assert!(board.is_game_over());
        // 1 vs 1 with 62 empties splits evenly.
        assert_eq!(board.solve(62), 0);

        let board = Board::from_bitboards(
            Square::A1.bitboard() | Square::A2.bitboard(),
            Square::H8.bitboard(),
        );
        // Mover leads 2-1, 61 empties credited to the mover: 2*2-64+61+61.
        assert_eq!(board.solve(61), 2 * 2 - 64 + 61 + 61);
    }

    #[test]
    fn hash_distinguishes_positions_and_sides() {
        let board = Board::new();
        let other = board.make_move(Square::D3);
        assert_ne!(board.hash(), other.hash());
        assert_ne!(board.hash(), board.switch_players().hash());
        assert_eq!(board.hash(), Board::new().hash());
    }

    #[test]
    fn unique_is_symmetry_invariant() {
        let board = Board::new().make_move(Square::D3).make_move(Square::C3);
        let canonical = board.unique();
        for sym in board.symmetries() {
            assert_eq!(sym.unique(), canonical);
        }
    }
}
