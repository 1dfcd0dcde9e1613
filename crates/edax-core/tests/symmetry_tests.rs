//! Dihedral-group invariance of exact search results.

use edax_core::board::Board;
use edax_core::disc::Disc;
use edax_core::level::Level;
use edax_core::probcut::Selectivity;
use edax_core::search::options::{SearchOptions, SearchRunOptions};
use edax_core::search::Search;

fn solve(board: &Board) -> i32 {
    let mut search = Search::new(&SearchOptions::default()).unwrap();
    let options = SearchRunOptions::with_level(Level::perfect(), Selectivity::None);
    search.run(board, &options).score as i32
}

/// The exact score of a position is invariant under the 8 board
/// symmetries.
#[test]
fn exact_solve_is_symmetry_invariant() {
    let board = Board::from_string(
        "XXXXXXXXXXXXXXXXOOOXXXOXXOXXXXOX-OOXXOOX--OOOXXX--OOXXXX----XXXX",
        Disc::Black,
    )
    .unwrap();

    let reference = solve(&board);
    assert_eq!(reference, 50);

    for (i, symmetry) in board.symmetries().into_iter().enumerate().skip(1) {
        assert_eq!(solve(&symmetry), reference, "symmetry {i} diverged");
    }
}

/// Mobility and flip generation commute with the symmetry group.
#[test]
fn move_generation_commutes_with_symmetries() {
    let board = Board::new().make_move(edax_core::square::Square::D3);

    let moves = board.get_moves();
    assert_eq!(
        board.flip_vertical().get_moves(),
        moves.into_iter().fold(
            edax_core::bitboard::Bitboard::new(0),
            |acc, sq| acc | sq.bitboard().flip_vertical()
        )
    );
    assert_eq!(
        board.rotate_180_clockwise().get_moves(),
        edax_core::bitboard::Bitboard::new(moves.bits().reverse_bits())
    );
}
