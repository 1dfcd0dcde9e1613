//! The full search against a plain reference negamax.
//!
//! The reference is deliberately naive: no windows, no tables, no
//! ordering. On small endgames the engine's PVS with all its pruning must
//! reproduce its scores exactly.

use edax_core::board::Board;
use edax_core::disc::Disc;
use edax_core::level::Level;
use edax_core::probcut::Selectivity;
use edax_core::search::options::{SearchOptions, SearchRunOptions};
use edax_core::search::Search;

/// Exhaustive minimax over disc scores.
fn negamax(board: &Board, n_empties: u32) -> i32 {
    let moves = board.get_moves();
    if moves.is_empty() {
        let next = board.switch_players();
        if next.has_legal_moves() {
            return -negamax(&next, n_empties);
        }
        return board.solve(n_empties);
    }

    let mut best = -100;
    for sq in moves.iter() {
        let next = board.make_move(sq);
        best = best.max(-negamax(&next, n_empties - 1));
    }
    best
}

fn engine_solve(board: &Board) -> i32 {
    let mut search = Search::new(&SearchOptions::default()).unwrap();
    let options = SearchRunOptions::with_level(Level::perfect(), Selectivity::None);
    search.run(board, &options).score as i32
}

fn compare(board_str: &str, side: Disc) {
    let board = Board::from_string(board_str, side).unwrap();
    let expected = negamax(&board, board.get_empty_count());
    assert_eq!(engine_solve(&board), expected, "position {board_str}");
}

#[test]
fn engine_matches_reference_on_small_endgames() {
    compare(
        "XXXXXXXXXXXXXXXXXXOOXOXXXXXXOXXXXXXOXOXXXXOXOXOXXOOOOOOX--OOOOOX",
        Disc::Black,
    );
    compare(
        "XXXXXXXXXXXXXXXXXXOOXOXXXXXXOXXXXXXOXOXXXXOXOXOX-OOOOOOX--OOOOOX",
        Disc::Black,
    );
    compare(
        "XOOOOOO-XXOOOOOOXXXOXOOOXXOOOOOOXXXOOOOOXXOOXOOOXO-OOOOOOOO-XXX-",
        Disc::Black,
    );
    compare(
        "-OOOOOO-XXXXXXX---XOXXXOXXXOXXOOXXXXXOXOXXXOOOXOXOOOOXXOXOOOOOOO",
        Disc::White,
    );
}

#[test]
fn engine_matches_reference_on_derived_positions() {
    // Every successor of a 9-empty position must also agree.
    let board = Board::from_string(
        "XXXXXXXXXXXXXXXXOOOXXXOXXOXXXXOX-OOXXOOX--OOOXXX--OOXXXX----XXXX",
        Disc::Black,
    )
    .unwrap();

    for sq in board.get_moves().iter() {
        let next = board.make_move(sq);
        let expected = negamax(&next, next.get_empty_count());
        assert_eq!(engine_solve(&next), expected, "after {sq}");
    }
}
