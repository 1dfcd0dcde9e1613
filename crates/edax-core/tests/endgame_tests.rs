//! Exact endgame solving regression tests.

use edax_core::board::Board;
use edax_core::disc::Disc;
use edax_core::level::Level;
use edax_core::probcut::Selectivity;
use edax_core::search::options::{SearchOptions, SearchRunOptions};
use edax_core::search::Search;

fn new_search() -> Search {
    Search::new(&SearchOptions::default()).unwrap()
}

fn solve_with(search: &mut Search, board_str: &str, side: Disc) -> i32 {
    let board = Board::from_string(board_str, side).unwrap();
    let options = SearchRunOptions::with_level(Level::perfect(), Selectivity::None);
    let result = search.run(&board, &options);
    result.score as i32
}

fn solve(board_str: &str, side: Disc) -> i32 {
    solve_with(&mut new_search(), board_str, side)
}

#[test]
fn solve_2_empties_case1() {
    assert_eq!(
        solve(
            "XXXXXXXXXXXXXXXXXXOOXOXXXXXXOXXXXXXOXOXXXXOXOXOXXOOOOOOX--OOOOOX",
            Disc::Black,
        ),
        46
    );
}

#[test]
fn solve_2_empties_case2() {
    assert_eq!(
        solve(
            "X-XXXXOXOOOOOOOXOOXXOXOOOOXXXXOOOOOXXOXOOOOOXXXOOOOOOX-OOOOOOOOO",
            Disc::Black,
        ),
        -32
    );
}

#[test]
fn solve_2_empties_case3() {
    assert_eq!(
        solve(
            "-OXOOOX-XXXXOOXXXOXOXXXXXOXXXOOXXOOXXOOXXOXOXXOXXXOOOXXXXXXXXXXX",
            Disc::White,
        ),
        -20
    );
}

#[test]
fn solve_3_empties_case1() {
    assert_eq!(
        solve(
            "XXXXXXXXXXXXXXXXXXOOXOXXXXXXOXXXXXXOXOXXXXOXOXOX-OOOOOOX--OOOOOX",
            Disc::Black,
        ),
        44
    );
}

#[test]
fn solve_3_empties_case2() {
    assert_eq!(
        solve(
            "X-XXXXOXOOOOOOOXOOXXOXOOOOXXXXOOOOOXXOXOOOOOXXXOOOOOOX-OOOOOOO-O",
            Disc::Black,
        ),
        -38
    );
}

#[test]
fn solve_3_empties_case3() {
    assert_eq!(
        solve(
            "-OXOOO--XXXXOOXXXOXOXXXXXOXXXOOXXOOXXOOXXOXOXXOXXXOOOXXXXXXXXXXX",
            Disc::White,
        ),
        -28
    );
}

#[test]
fn solve_4_empties_case1() {
    assert_eq!(
        solve(
            "XOOOOOO-XXOOOOOOXXXOXOOOXXOOOOOOXXXOOOOOXXOOXOOOXO-OOOOOOOO-XXX-",
            Disc::Black,
        ),
        32
    );
}

#[test]
fn solve_4_empties_case2() {
    assert_eq!(
        solve(
            "XXXXXX-OXXXXXXOOXXXOXOOOXXXXOOOOXXXXOOOOXXXOOOOOXXXXOO-XOOOOOO--",
            Disc::Black,
        ),
        20
    );
}

#[test]
fn solve_4_empties_case3() {
    assert_eq!(
        solve(
            "XXXXXXXXXXOXOOXXXXXXXXOXXXXXXXXOXXXXXXX-XXXXXXX-XXXXXX-XXXXXXOO-",
            Disc::White,
        ),
        -52
    );
}

#[test]
fn solve_5_empties_case1() {
    assert_eq!(
        solve(
            "-OOOOOO-XXXXXXX---XOXXXOXXXOXXOOXXXXXOXOXXXOOOXOXOOOOXXOXOOOOOOO",
            Disc::White,
        ),
        32
    );
}

#[test]
fn solve_5_empties_case2() {
    assert_eq!(
        solve(
            "--O--O----OOOOO-XOOOOOOOXXOOXOOOXXXXXOXXXOXXOOXXXXXXOXOXXOOOOOOX",
            Disc::Black,
        ),
        28
    );
}

#[test]
fn solve_9_empties() {
    assert_eq!(
        solve(
            "XXXXXXXXXXXXXXXXOOOXXXOXXOXXXXOX-OOXXOOX--OOOXXX--OOXXXX----XXXX",
            Disc::Black,
        ),
        50
    );
}

#[test]
fn solve_15_empties() {
    assert_eq!(
        solve(
            "--OXXO--XOXXXX--XOOOOXXXXOOOXXXXX-OOOXXX--OOOOXX--XXOOO----XXOO-",
            Disc::Black,
        ),
        8
    );
}

/// Reusing the tables across searches must not change exact results.
#[test]
fn hash_reuse_preserves_exact_scores() {
    let board_str = "XXXXXXXXXXXXXXXXOOOXXXOXXOXXXXOX-OOXXOOX--OOOXXX--OOXXXX----XXXX";

    let mut search = new_search();
    let first = solve_with(&mut search, board_str, Disc::Black);
    // Second run hits a warm table.
    let second = solve_with(&mut search, board_str, Disc::Black);
    // Third run starts from cleared tables.
    search.init();
    let third = solve_with(&mut search, board_str, Disc::Black);

    assert_eq!(first, 50);
    assert_eq!(second, 50);
    assert_eq!(third, 50);
}

/// A parallel search must reach the same exact score as a serial one.
#[test]
fn parallel_equals_serial() {
    let board_str = "--OXXO--XOXXXX--XOOOOXXXXOOOXXXXX-OOOXXX--OOOOXX--XXOOO----XXOO-";

    let serial = solve(board_str, Disc::Black);

    let mut options = SearchOptions::default();
    options.n_threads = 4;
    let mut search = Search::new(&options).unwrap();
    let parallel = solve_with(&mut search, board_str, Disc::Black);

    assert_eq!(serial, 8);
    assert_eq!(parallel, serial);
}

/// Deep enough for actual split points: the 20-empty FFO #40 position
/// crosses the endgame split threshold, so helpers really run.
#[test]
fn parallel_solve_with_splits() {
    let board_str = "O--OOOOX-OOOOOOXOOXXOOOXOOXOOOXXOOOOOOXX---OOOOX----O--X--------";

    let mut options = SearchOptions::default();
    options.n_threads = 4;
    let mut search = Search::new(&options).unwrap();
    let parallel = solve_with(&mut search, board_str, Disc::Black);

    assert_eq!(parallel, 38);
}

/// A mover without a legal move yields a pass result.
#[test]
fn forced_pass_returns_no_move() {
    // Black holds only B1, White only A1: Black must pass, White answers
    // at C1 and wins everything that matters.
    let board = Board::from_bitboards(1u64 << 1, 1u64);
    let mut search = new_search();
    let options =
        SearchRunOptions::with_level(edax_core::level::get_level(1), Selectivity::None);
    let result = search.run(&board, &options);
    assert!(result.best_move.is_none());
}

/// A finished game reports its final score without searching.
#[test]
fn game_over_scores_immediately() {
    let board = Board::from_bitboards(1u64, 1u64 << 63);
    let mut search = new_search();
    let options = SearchRunOptions::with_level(Level::perfect(), Selectivity::None);
    let result = search.run(&board, &options);
    assert!(result.best_move.is_none());
    assert_eq!(result.score as i32, 0);
    assert_eq!(result.n_nodes, 0);
}
