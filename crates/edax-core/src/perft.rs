//! Move-generator validation by node counting.

use crate::board::Board;

/// Counts the leaves of the full game tree to the given depth. Passes
/// consume a ply; a finished game counts as one leaf.
pub fn perft(board: &Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = board.get_moves();
    if moves.is_empty() {
        let next = board.switch_players();
        if next.has_legal_moves() {
            return perft(&next, depth - 1);
        }
        return 1;
    }

    let mut nodes = 0;
    for sq in moves.iter() {
        let next = board.make_move(sq);
        nodes += perft(&next, depth - 1);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Known perft values from the standard opening position.
    #[test]
    fn perft_from_opening() {
        let board = Board::new();
        let expected: [u64; 8] = [1, 4, 12, 56, 244, 1396, 8200, 55092];
        for (depth, &nodes) in expected.iter().enumerate() {
            assert_eq!(perft(&board, depth as u32), nodes, "depth {depth}");
        }
    }

    #[test]
    #[ignore = "slow; run with --ignored"]
    fn perft_deep() {
        let board = Board::new();
        assert_eq!(perft(&board, 8), 390216);
        assert_eq!(perft(&board, 9), 3005288);
    }
}
