//! Othello engine core: bitboard move generation, a PVS/NWS search with
//! ProbCut selectivity and YBWC parallelism, exact endgame solvers, and
//! cooperating transposition tables.

pub mod bitboard;
pub mod board;
pub mod constants;
pub mod count_last_flip;
pub mod disc;
pub mod empty_list;
pub mod eval;
pub mod flip;
pub mod level;
pub mod move_list;
pub mod perft;
pub mod probcut;
pub mod search;
pub mod square;
pub mod stability;
pub mod transposition_table;
pub mod types;
pub mod util;
