//! Phase strategies: midgame versus endgame behavior of the shared
//! search skeleton.
//!
//! The generic search is written once; everything phase-specific (leaf
//! evaluation, the shallow-depth specialization, probcut parameters,
//! split and pruning thresholds) is routed through this trait at compile
//! time.


use crate::board::Board;
use crate::search::search_context::SearchContext;
use crate::search::threading::Thread;
use crate::search::{endgame, midgame};
use crate::types::{Depth, ScaledScore};

pub trait SearchStrategy {
    /// Whether depth counts empty squares (endgame) or plies (midgame).
    const IS_ENDGAME: bool;
    /// At or below this depth, NonPV nodes divert to `shallow_search`.
    const DEPTH_TO_SHALLOW: Depth;
    /// Minimum depth for enhanced transposition cutoffs.
    const MIN_ETC_DEPTH: Depth;
    /// Minimum depth for probcut attempts.
    const MIN_PROBCUT_DEPTH: Depth;
    /// Minimum depth for YBWC split points.
    const MIN_SPLIT_DEPTH: Depth;

    /// Leaf evaluation at depth 0.
    fn evaluate(ctx: &mut SearchContext, board: &Board) -> ScaledScore;

    /// Specialized search for shallow NonPV nodes.
    fn shallow_search(
        ctx: &mut SearchContext,
        board: &Board,
        depth: Depth,
        alpha: ScaledScore,
        beta: ScaledScore,
    ) -> ScaledScore;

    /// Probcut attempt; `Some(score)` prunes the node.
    fn probcut(
        ctx: &mut SearchContext,
        board: &Board,
        depth: Depth,
        beta: ScaledScore,
        thread: &Thread,
    ) -> Option<ScaledScore>;
}

/// Depth counts plies; leaves are evaluated statically.
pub struct MidGameStrategy;

impl SearchStrategy for MidGameStrategy {
    const IS_ENDGAME: bool = false;
    const DEPTH_TO_SHALLOW: Depth = 2;
    const MIN_ETC_DEPTH: Depth = 6;
    const MIN_PROBCUT_DEPTH: Depth = 5;
    const MIN_SPLIT_DEPTH: Depth = 5;

    #[inline]
    fn evaluate(ctx: &mut SearchContext, board: &Board) -> ScaledScore {
        midgame::evaluate(ctx, board)
    }

    #[inline]
    fn shallow_search(
        ctx: &mut SearchContext,
        board: &Board,
        depth: Depth,
        alpha: ScaledScore,
        beta: ScaledScore,
    ) -> ScaledScore {
        match depth {
            0 => midgame::evaluate(ctx, board),
            1 => midgame::evaluate_depth1(ctx, board, alpha, beta),
            _ => midgame::evaluate_depth2(ctx, board, alpha, beta),
        }
    }

    #[inline]
    fn probcut(
        ctx: &mut SearchContext,
        board: &Board,
        depth: Depth,
        beta: ScaledScore,
        thread: &Thread,
    ) -> Option<ScaledScore> {
        midgame::probcut(ctx, board, depth, beta, thread)
    }
}

/// Depth equals the number of empties; leaves are final positions.
pub struct EndGameStrategy;

impl SearchStrategy for EndGameStrategy {
    const IS_ENDGAME: bool = true;
    const DEPTH_TO_SHALLOW: Depth = endgame::DEPTH_TO_NWS;
    const MIN_ETC_DEPTH: Depth = 14;
    const MIN_PROBCUT_DEPTH: Depth = 15;
    const MIN_SPLIT_DEPTH: Depth = 16;

    #[inline]
    fn evaluate(_ctx: &mut SearchContext, board: &Board) -> ScaledScore {
        // Depth 0 in the endgame is a full board.
        board.final_score_scaled()
    }

    #[inline]
    fn shallow_search(
        ctx: &mut SearchContext,
        board: &Board,
        _depth: Depth,
        alpha: ScaledScore,
        _beta: ScaledScore,
    ) -> ScaledScore {
        // NonPV endgame nodes run on integer disc windows from here down.
        let score = endgame::null_window_search(ctx, board, alpha.to_disc_diff());
        ScaledScore::from_disc_diff(score)
    }

    #[inline]
    fn probcut(
        ctx: &mut SearchContext,
        board: &Board,
        depth: Depth,
        beta: ScaledScore,
        thread: &Thread,
    ) -> Option<ScaledScore> {
        endgame::probcut(ctx, board, depth, beta, thread)
    }
}
