//! FFO endgame suite positions with known exact scores.

use edax_core::board::Board;
use edax_core::disc::Disc;
use edax_core::level::Level;
use edax_core::probcut::Selectivity;
use edax_core::search::options::{SearchOptions, SearchRunOptions};
use edax_core::search::Search;
use edax_core::square::Square;

struct FfoCase {
    board: &'static str,
    side: Disc,
    score: i32,
    best_moves: &'static [Square],
}

fn run_case(case: &FfoCase) {
    let mut search = Search::new(&SearchOptions::default()).unwrap();
    let board = Board::from_string(case.board, case.side).unwrap();
    let options = SearchRunOptions::with_level(Level::perfect(), Selectivity::None);
    let result = search.run(&board, &options);

    assert_eq!(result.score as i32, case.score);
    let best = result.best_move.expect("a best move must be found");
    assert!(
        case.best_moves.contains(&best),
        "best move {best} not among expected {:?}",
        case.best_moves
    );
}

#[test]
fn ffo_40() {
    run_case(&FfoCase {
        board: "O--OOOOX-OOOOOOXOOXXOOOXOOXOOOXXOOOOOOXX---OOOOX----O--X--------",
        side: Disc::Black,
        score: 38,
        best_moves: &[Square::A2],
    });
}

#[test]
#[ignore = "slow; run with --ignored"]
fn ffo_41() {
    run_case(&FfoCase {
        board: "-OOOOO----OOOOX--OOOOOO-XXXXXOO--XXOOX--OOXOXX----OXXO---OOO--O-",
        side: Disc::Black,
        score: 0,
        best_moves: &[Square::H4],
    });
}

#[test]
#[ignore = "slow; run with --ignored"]
fn ffo_42() {
    run_case(&FfoCase {
        board: "--OOO-------XX-OOOOOOXOO-OOOOXOOX-OOOXXO---OOXOO---OOOXO--OOOO--",
        side: Disc::Black,
        score: 6,
        best_moves: &[Square::G2],
    });
}

#[test]
#[ignore = "slow; run with --ignored"]
fn ffo_44() {
    run_case(&FfoCase {
        board: "--O-X-O---O-XO-O-OOXXXOOOOOOXXXOOOOOXX--XXOOXO----XXXX-----XXX--",
        side: Disc::White,
        score: -14,
        best_moves: &[Square::D2, Square::B8],
    });
}
