//! Per-worker search state.

use std::sync::Arc;

use crate::bitboard::Bitboard;
use crate::board::Board;
use crate::constants::MAX_PLY;
use crate::empty_list::EmptyList;
use crate::eval::pattern_feature::{PatternFeature, PatternFeatures};
use crate::eval::Eval;
use crate::probcut::Selectivity;
use crate::search::root_move::RootMoves;
use crate::search::side_to_move::SideToMove;
use crate::search::threading::SplitPoint;
use crate::square::Square;
use crate::transposition_table::SearchTables;
use crate::types::ScaledScore;

/// One stack slot per ply.
#[derive(Clone, Copy)]
pub struct StackRecord {
    /// Principal variation from this ply down.
    pub pv: [Square; MAX_PLY],
}

/// Everything a worker mutates while searching.
///
/// Contexts are cheap to clone logically but never shared: every worker,
/// including split-point helpers, owns its own.
pub struct SearchContext {
    /// Nodes searched by this context.
    pub n_nodes: u64,
    pub side_to_move: SideToMove,
    pub selectivity: Selectivity,
    pub empty_list: EmptyList,
    pub tables: Arc<SearchTables>,
    pub root_moves: RootMoves,
    pub eval: Arc<Eval>,
    pub pattern_features: PatternFeatures,
    stack: [StackRecord; MAX_PLY],
}

impl SearchContext {
    pub fn new(
        board: &Board,
        selectivity: Selectivity,
        tables: Arc<SearchTables>,
        eval: Arc<Eval>,
    ) -> SearchContext {
        let empty_list = EmptyList::new(board);
        let ply = empty_list.ply();
        SearchContext {
            n_nodes: 0,
            side_to_move: SideToMove::Player,
            selectivity,
            empty_list,
            tables,
            root_moves: RootMoves::new(board),
            eval,
            pattern_features: PatternFeatures::new(board, ply),
            stack: [StackRecord {
                pv: [Square::None; MAX_PLY],
            }; MAX_PLY],
        }
    }

    /// Rebuilds a context for a helper joining a split point.
    pub fn from_split_point(sp: &Arc<SplitPoint>) -> SearchContext {
        let task = &sp.task;
        let empty_list = task.empty_list.clone();
        let ply = empty_list.ply();
        // The pattern stacks track the p-perspective; reconstruct them
        // from whichever orientation the split board is in.
        let pattern_features = if task.side_to_move == SideToMove::Player {
            PatternFeatures::new(&sp.board, ply)
        } else {
            PatternFeatures::new(&sp.board.switch_players(), ply)
        };
        SearchContext {
            n_nodes: 0,
            side_to_move: task.side_to_move,
            selectivity: task.selectivity,
            empty_list,
            tables: task.tables.clone(),
            root_moves: task.root_moves.clone(),
            eval: task.eval.clone(),
            pattern_features,
            stack: [StackRecord {
                pv: [Square::None; MAX_PLY],
            }; MAX_PLY],
        }
    }

    #[inline]
    fn switch_players(&mut self) {
        self.side_to_move = self.side_to_move.switch();
    }

    /// Advances the context past a move (midgame: features update too).
    #[inline]
    pub fn update(&mut self, sq: Square, flipped: Bitboard) {
        self.increment_nodes();
        self.pattern_features
            .update(sq, flipped, self.ply(), self.side_to_move);
        self.switch_players();
        self.empty_list.remove(sq);
    }

    #[inline]
    pub fn undo(&mut self, sq: Square) {
        self.empty_list.restore(sq);
        self.switch_players();
    }

    /// Move bookkeeping without feature updates, for the endgame bands
    /// that never evaluate statically.
    #[inline]
    pub fn update_endgame(&mut self, sq: Square) {
        self.increment_nodes();
        self.empty_list.remove(sq);
    }

    #[inline]
    pub fn undo_endgame(&mut self, sq: Square) {
        self.empty_list.restore(sq);
    }

    #[inline]
    pub fn update_pass(&mut self) {
        self.increment_nodes();
        self.switch_players();
    }

    #[inline]
    pub fn undo_pass(&mut self) {
        self.switch_players();
    }

    /// Absolute game ply, derived from the empty count.
    #[inline]
    pub fn ply(&self) -> usize {
        self.empty_list.ply()
    }

    #[inline]
    pub fn increment_nodes(&mut self) {
        self.n_nodes += 1;
    }

    /// Pattern feature of the side to move at the current ply.
    #[inline]
    pub fn get_pattern_feature(&self) -> &PatternFeature {
        let ply = self.ply();
        if self.side_to_move == SideToMove::Player {
            &self.pattern_features.p_features[ply]
        } else {
            &self.pattern_features.o_features[ply]
        }
    }

    /// Publishes a root move's result into the shared table.
    pub fn update_root_move(
        &mut self,
        sq: Square,
        score: ScaledScore,
        move_count: usize,
        alpha: ScaledScore,
    ) {
        let is_pv = move_count == 1 || score > alpha;
        if is_pv {
            self.update_pv(sq);
        }

        let pv = self.stack[self.ply()].pv;
        self.root_moves.update(sq, score, move_count, alpha, &pv);
    }

    pub fn get_best_root_move(&self) -> Option<crate::search::root_move::RootMove> {
        self.root_moves.get_best()
    }

    pub fn save_previous_scores(&self) {
        self.root_moves.save_previous_scores();
    }

    pub fn sort_all_root_moves(&self) {
        self.root_moves.sort_all();
    }

    pub fn root_moves_count(&self) -> usize {
        self.root_moves.count()
    }

    /// Prepends `sq` to the child PV, forming this ply's PV.
    pub fn update_pv(&mut self, sq: Square) {
        let ply = self.ply();
        self.stack[ply].pv[0] = sq;
        if ply + 1 >= MAX_PLY {
            self.stack[ply].pv[1] = Square::None;
            return;
        }
        let child_pv = self.stack[ply + 1].pv;
        let mut idx = 0;
        while idx + 1 < MAX_PLY && child_pv[idx] != Square::None {
            self.stack[ply].pv[idx + 1] = child_pv[idx];
            idx += 1;
        }
        self.stack[ply].pv[idx + 1] = Square::None;
    }

    /// Clears the PV slot at the current ply before a re-search.
    pub fn clear_pv(&mut self) {
        self.stack[self.ply()].pv.fill(Square::None);
    }

    pub fn get_pv(&self) -> &[Square; MAX_PLY] {
        &self.stack[self.ply()].pv
    }

    pub fn set_pv(&mut self, pv: &[Square; MAX_PLY]) {
        self.stack[self.ply()].pv.copy_from_slice(pv);
    }
}
