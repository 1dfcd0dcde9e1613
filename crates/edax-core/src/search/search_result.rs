//! Search result types.

use crate::probcut::Selectivity;
use crate::search::root_move::{RootMove, RootMoves};
use crate::square::Square;
use crate::types::{Depth, Scoref};

/// Per-move outcome reported alongside the result.
///
/// Moves outside the principal variation were refuted by a null window,
/// so their `score` is the bound that refuted them rather than an exact
/// value.
#[derive(Clone, Debug)]
pub struct MoveBound {
    pub sq: Square,
    pub score: Scoref,
    pub pv_line: Vec<Square>,
}

/// Outcome of one search invocation.
pub struct SearchResult {
    /// Score in discs from the mover's perspective.
    pub score: Scoref,
    /// Best move; `None` when the mover must pass.
    pub best_move: Option<Square>,
    pub n_nodes: u64,
    pub pv_line: Vec<Square>,
    pub depth: Depth,
    pub selectivity: Selectivity,
    /// True when the score came from an endgame (empties-counted) search.
    pub is_endgame: bool,
    /// Wall-clock time of the search.
    pub time_ms: u64,
    /// Bounds for every root move.
    pub bounds_per_move: Vec<MoveBound>,
}

impl SearchResult {
    /// Result for the random opening move played at 60 empties.
    pub fn new_random_move(mv: Square) -> Self {
        Self {
            score: 0.0,
            best_move: Some(mv),
            n_nodes: 0,
            pv_line: vec![mv],
            depth: 0,
            selectivity: Selectivity::None,
            is_endgame: false,
            time_ms: 0,
            bounds_per_move: vec![],
        }
    }

    /// Result for a finished game.
    pub fn game_over(score: Scoref) -> Self {
        Self {
            score,
            best_move: None,
            n_nodes: 0,
            pv_line: vec![],
            depth: 0,
            selectivity: Selectivity::None,
            is_endgame: true,
            time_ms: 0,
            bounds_per_move: vec![],
        }
    }

    /// Assembles a result from the root-move table.
    pub fn from_root_move(
        root_moves: &RootMoves,
        best_move: &RootMove,
        n_nodes: u64,
        depth: Depth,
        selectivity: Selectivity,
        is_endgame: bool,
    ) -> Self {
        let bounds_per_move: Vec<MoveBound> = root_moves.map(|rm| MoveBound {
            sq: rm.sq,
            score: rm.score.to_disc_diff_f32(),
            pv_line: rm.pv.clone(),
        });

        Self {
            score: best_move.score.to_disc_diff_f32(),
            best_move: Some(best_move.sq),
            n_nodes,
            pv_line: best_move.pv.clone(),
            depth,
            selectivity,
            is_endgame,
            time_ms: 0,
            bounds_per_move,
        }
    }

    /// Confidence percentage of the reported score.
    pub fn get_probability(&self) -> i32 {
        self.selectivity.probability()
    }
}
