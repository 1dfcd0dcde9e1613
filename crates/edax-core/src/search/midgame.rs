//! Midgame root driver and shallow search specializations.


use rand::seq::IteratorRandom;

use crate::board::Board;
use crate::flip;
use crate::move_list::MoveList;
use crate::probcut::{self, Selectivity};
use crate::search::node_type::{NonPV, Root};
use crate::search::search_context::SearchContext;
use crate::search::search_result::SearchResult;
use crate::search::search_strategy::MidGameStrategy;
use crate::search::threading::Thread;
use crate::search::time_control::should_stop_iteration;
use crate::search::{search, SearchProgress, SearchTask};
use crate::square::Square;
use crate::types::{Depth, ScaledScore};

/// Initial half-width of the aspiration window.
const ASPIRATION_DELTA: ScaledScore = ScaledScore::from_disc_diff(3);

/// Iterative deepening with aspiration windows over the midgame.
pub fn search_root(task: SearchTask, thread: &Thread) -> SearchResult {
    let board = task.board;
    let time_manager = task.time_manager.clone();

    let mut ctx = SearchContext::new(
        &board,
        task.selectivity,
        task.tables.clone(),
        task.eval.clone(),
    );
    let n_empties = ctx.empty_list.count;

    // The very first move of a game carries no information; vary it.
    if n_empties == 60 {
        return SearchResult::new_random_move(random_move(&board));
    }

    let org_selectivity = ctx.selectivity;
    let max_depth = task.level.mid_depth.max(1).min(n_empties);
    let mut depth = compute_start_depth(max_depth);
    let mut prev_score: Option<ScaledScore> = None;
    let mut prev_best_move: Option<Square> = None;

    loop {
        // Shallow iterations run more selectively than the target.
        let depth_diff = (max_depth - depth) as u8;
        ctx.selectivity =
            Selectivity::from_u8(org_selectivity.as_u8().saturating_sub(depth_diff));

        ctx.save_previous_scores();

        let (mut alpha, mut beta) = match prev_score {
            Some(score) if depth >= 5 => (
                (score - ASPIRATION_DELTA).max(-ScaledScore::INF),
                (score + ASPIRATION_DELTA).min(ScaledScore::INF),
            ),
            _ => (-ScaledScore::INF, ScaledScore::INF),
        };

        let score = aspiration_search(&mut ctx, &board, depth, &mut alpha, &mut beta, thread);
        ctx.sort_all_root_moves();

        if thread.is_search_aborted() {
            break;
        }
        prev_score = Some(score);

        let best = ctx.get_best_root_move().unwrap();
        if let Some(ref callback) = task.callback {
            callback(SearchProgress {
                depth,
                target_depth: max_depth,
                score: score.to_disc_diff_f32(),
                best_move: best.sq,
                probability: ctx.selectivity.probability(),
                nodes: ctx.n_nodes,
                pv_line: best.pv.clone(),
                is_endgame: false,
            });
        }

        if let Some(ref tm) = time_manager {
            let pv_changed = prev_best_move.is_some_and(|sq| sq != best.sq);
            tm.try_extend_time(best.score.to_disc_diff_f32(), pv_changed, depth);
        }
        prev_best_move = Some(best.sq);

        if depth >= max_depth || should_stop_iteration(&time_manager) {
            break;
        }
        depth = next_iteration_depth(depth, max_depth);
    }

    let best = ctx.get_best_root_move().unwrap();
    SearchResult::from_root_move(
        &ctx.root_moves,
        &best,
        ctx.n_nodes,
        depth.min(n_empties),
        ctx.selectivity,
        false,
    )
}

/// Start depth matching the parity of the target depth.
fn compute_start_depth(max_depth: Depth) -> Depth {
    if max_depth <= 2 {
        max_depth
    } else if max_depth % 2 == 0 {
        2
    } else {
        1
    }
}

/// Deepening step: by two while cheap, by one near the horizon.
fn next_iteration_depth(current_depth: Depth, max_depth: Depth) -> Depth {
    let next = if current_depth <= 10 {
        current_depth + 2
    } else {
        current_depth + 1
    };
    next.min(max_depth)
}

/// Searches one depth, re-searching with widened windows on failure.
fn aspiration_search(
    ctx: &mut SearchContext,
    board: &Board,
    depth: Depth,
    alpha: &mut ScaledScore,
    beta: &mut ScaledScore,
    thread: &Thread,
) -> ScaledScore {
    let mut delta = ASPIRATION_DELTA;

    loop {
        let score = search::<Root, MidGameStrategy>(ctx, board, depth, *alpha, *beta, thread);

        if thread.is_search_aborted() {
            return score;
        }

        if score <= *alpha {
            *beta = *alpha;
            *alpha = (score - delta).max(-ScaledScore::INF);
        } else if score >= *beta {
            *alpha = (*beta - delta).max(*alpha);
            *beta = (score + delta).min(ScaledScore::INF);
        } else {
            return score;
        }

        delta = delta + delta.value() / 2;
    }
}

/// Uniformly random legal move.
fn random_move(board: &Board) -> Square {
    let mut rng = rand::thread_rng();
    board.get_moves().iter().choose(&mut rng).unwrap()
}

/// Midgame ProbCut: a reduced-depth search plus a static pre-screen
/// decide whether the full-depth search can be skipped.
pub fn probcut(
    ctx: &mut SearchContext,
    board: &Board,
    depth: Depth,
    beta: ScaledScore,
    thread: &Thread,
) -> Option<ScaledScore> {
    if !ctx.selectivity.is_enabled() {
        return None;
    }

    let ply = ctx.ply();
    let pc_depth = 2 * (depth as f64 * 0.2).floor() as Depth;
    let mean = probcut::get_mean(ply, pc_depth, depth);
    let sigma = probcut::get_sigma(ply, pc_depth, depth);
    let t = ctx.selectivity.t_value();

    let pc_beta = probcut::compute_probcut_beta(beta, t, mean, sigma);
    if pc_beta >= ScaledScore::MAX {
        return None;
    }

    let eval_score = evaluate(ctx, board);
    let mean0 = probcut::get_mean(ply, 0, depth);
    let sigma0 = probcut::get_sigma(ply, 0, depth);
    let eval_beta = probcut::compute_eval_beta(beta, t, mean, sigma, mean0, sigma0);

    if eval_score >= eval_beta {
        let saved_selectivity = ctx.selectivity;
        ctx.selectivity = Selectivity::None; // no nested probcut
        let score =
            search::<NonPV, MidGameStrategy>(ctx, board, pc_depth, pc_beta - 1, pc_beta, thread);
        ctx.selectivity = saved_selectivity;

        if score >= pc_beta {
            return Some(ScaledScore::new((beta.value() + pc_beta.value()) / 2));
        }
    }

    None
}

/// Depth-2 search specialized for move-ordering probes and leaf work.
pub fn evaluate_depth2(
    ctx: &mut SearchContext,
    board: &Board,
    mut alpha: ScaledScore,
    beta: ScaledScore,
) -> ScaledScore {
    let moves = board.get_moves();
    if moves.is_empty() {
        let next = board.switch_players();
        if next.has_legal_moves() {
            ctx.update_pass();
            let score = -evaluate_depth2(ctx, &next, -beta, -alpha);
            ctx.undo_pass();
            return score;
        } else {
            return board.solve_scaled(ctx.empty_list.count);
        }
    }

    let mut move_list = MoveList::with_moves(board, moves);
    if move_list.wipeout_move().is_some() {
        return ScaledScore::MAX;
    }

    let mut best_score = -ScaledScore::INF;
    if move_list.count() >= 3 {
        move_list.evaluate_moves_fast(ctx, board, Square::None);
        for mv in move_list.into_best_first_iter() {
            let next = board.make_move_with_flipped(mv.flipped, mv.sq);

            ctx.update(mv.sq, mv.flipped);
            let score = -evaluate_depth1(ctx, &next, -beta, -alpha);
            ctx.undo(mv.sq);

            if score > best_score {
                best_score = score;
                if score >= beta {
                    break;
                }
                if score > alpha {
                    alpha = score;
                }
            }
        }
    } else {
        for mv in move_list.iter() {
            let next = board.make_move_with_flipped(mv.flipped, mv.sq);

            ctx.update(mv.sq, mv.flipped);
            let score = -evaluate_depth1(ctx, &next, -beta, -alpha);
            ctx.undo(mv.sq);

            if score > best_score {
                best_score = score;
                if score >= beta {
                    break;
                }
                if score > alpha {
                    alpha = score;
                }
            }
        }
    }

    best_score
}

/// Depth-1 search: corners first, then the rest.
pub fn evaluate_depth1(
    ctx: &mut SearchContext,
    board: &Board,
    alpha: ScaledScore,
    beta: ScaledScore,
) -> ScaledScore {
    let moves = board.get_moves();
    if moves.is_empty() {
        let next = board.switch_players();
        if next.has_legal_moves() {
            ctx.update_pass();
            let score = -evaluate_depth1(ctx, &next, -beta, -alpha);
            ctx.undo_pass();
            return score;
        } else {
            return board.solve_scaled(ctx.empty_list.count);
        }
    }

    let mut best_score = -ScaledScore::INF;

    for sq in moves.corners().iter() {
        if let Some(score) = depth1_move(ctx, board, sq, beta, &mut best_score) {
            return score;
        }
    }
    for sq in moves.non_corners().iter() {
        if let Some(score) = depth1_move(ctx, board, sq, beta, &mut best_score) {
            return score;
        }
    }

    best_score
}

/// Plays one depth-1 move; `Some` on a beta cutoff or wipeout.
#[inline(always)]
fn depth1_move(
    ctx: &mut SearchContext,
    board: &Board,
    sq: Square,
    beta: ScaledScore,
    best_score: &mut ScaledScore,
) -> Option<ScaledScore> {
    let flipped = flip::flip(sq, board.player, board.opponent);
    if flipped == board.opponent {
        return Some(ScaledScore::MAX);
    }
    let next = board.make_move_with_flipped(flipped, sq);

    ctx.update(sq, flipped);
    let score = -evaluate(ctx, &next);
    ctx.undo(sq);

    if score > *best_score {
        *best_score = score;
        if score >= beta {
            return Some(score);
        }
    }
    None
}

/// Static evaluation, short-circuiting finished games.
#[inline(always)]
pub fn evaluate(ctx: &SearchContext, board: &Board) -> ScaledScore {
    if ctx.ply() == 60 {
        return board.final_score_scaled();
    }
    ctx.eval.evaluate(ctx, board)
}
