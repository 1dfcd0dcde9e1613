//! Static position evaluation from pattern weight tables.
//!
//! The board is decomposed into overlapping patterns (corners, edges,
//! rows, diagonals); the score is the sum of per-configuration weights for
//! the current game phase plus a parity term. Weights come from an opaque
//! binary blob validated at load time; without a blob the evaluation is
//! identically zero, which leaves exact endgame solving unaffected.

use std::path::Path;

use eval_cache::EvalCache;

use crate::board::Board;
use crate::search::search_context::SearchContext;
use crate::types::ScaledScore;

pub mod eval_cache;
pub mod pattern;
pub mod pattern_feature;
pub mod weights;

pub use weights::{Weights, WeightsError};

/// Evaluation scores stay strictly inside the solved-score range so a
/// heuristic value can never masquerade as a proven wipeout.
const EVAL_CLAMP: i32 = (crate::constants::SCORE_MAX - 1) << ScaledScore::SCALE_BITS;

/// Pattern-table evaluator with a shared probe cache.
pub struct Eval {
    weights: Weights,
    cache: EvalCache,
}

impl Eval {
    /// Evaluator with all-zero weights.
    pub fn new() -> Eval {
        Eval {
            weights: Weights::zero(),
            cache: EvalCache::new(17),
        }
    }

    /// Evaluator reading weights from `path`; `None` keeps zero weights.
    pub fn with_weight_file(path: Option<&Path>) -> Result<Eval, WeightsError> {
        let weights = match path {
            Some(path) => Weights::from_file(path)?,
            None => Weights::zero(),
        };
        Ok(Eval {
            weights,
            cache: EvalCache::new(17),
        })
    }

    /// Evaluates the current node using the incrementally maintained
    /// pattern features.
    pub fn evaluate(&self, ctx: &SearchContext, board: &Board) -> ScaledScore {
        let key = board.hash();
        if let Some(cached) = self.cache.probe(key) {
            return cached;
        }

        let ply = ctx.ply();
        let raw = self.weights.score(
            ply / 2,
            ctx.get_pattern_feature(),
            ctx.empty_list.count,
        );
        let score = ScaledScore::new(raw.clamp(-EVAL_CLAMP, EVAL_CLAMP));
        self.cache.store(key, score);
        score
    }

    /// Evaluates a bare board, rebuilding features from scratch.
    ///
    /// Slower than [`evaluate`](Self::evaluate); used for quick-move
    /// fallbacks outside a search context.
    pub fn evaluate_simple(&self, board: &Board) -> ScaledScore {
        let n_empties = board.get_empty_count();
        if n_empties == 0 {
            return board.final_score_scaled();
        }

        let ply = 60usize.saturating_sub(n_empties as usize);
        let features = pattern_feature::PatternFeatures::new(board, ply);
        let raw = self
            .weights
            .score(ply / 2, &features.p_features[ply], n_empties);
        ScaledScore::new(raw.clamp(-EVAL_CLAMP, EVAL_CLAMP))
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl Default for Eval {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_weights_evaluate_to_zero() {
        pattern::init();
        let eval = Eval::new();
        assert_eq!(eval.evaluate_simple(&Board::new()), ScaledScore::ZERO);
    }

    #[test]
    fn full_board_scores_exactly() {
        pattern::init();
        let eval = Eval::new();
        let board = Board::from_bitboards(0xFFFFFFFF00000000u64, 0x00000000FFFFFFFFu64);
        assert_eq!(eval.evaluate_simple(&board), ScaledScore::ZERO);
        let board = Board::from_bitboards(u64::MAX & !1, 1u64);
        assert_eq!(
            eval.evaluate_simple(&board),
            ScaledScore::from_disc_diff(62)
        );
    }
}
