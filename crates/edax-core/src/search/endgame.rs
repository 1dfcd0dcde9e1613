//! Endgame root driver, the null-window solving chain and the last-empties
//! solvers.
//!
//! Below the generic search the endgame runs on integer disc scores
//! through a chain of bands: a hash-backed null-window search, a
//! shallow-table band, a parity-ordered shallow search, and dedicated
//! solvers for the last four empties.


use crate::bitboard::Bitboard;
use crate::board::Board;
use crate::constants::{SCORE_INF, SCORE_MAX};
use crate::count_last_flip::count_last_flip;
use crate::flip;
use crate::move_list::MoveList;
use crate::probcut::{self, Selectivity};
use crate::search::node_type::{NonPV, PV, Root};
use crate::search::search_context::SearchContext;
use crate::search::search_result::SearchResult;
use crate::search::search_strategy::{EndGameStrategy, MidGameStrategy};
use crate::search::threading::Thread;
use crate::search::time_control::should_stop_iteration;
use crate::search::{cost_of, midgame, search, SearchProgress, SearchTask};
use crate::square::Square;
use crate::stability::{self, stability_cutoff};
use crate::types::{Depth, ScaledScore, Score};

/// Quadrant masks indexed by the parity nibble.
#[rustfmt::skip]
const QUADRANT_MASK: [u64; 16] = [
    0x0000000000000000, 0x000000000F0F0F0F, 0x00000000F0F0F0F0, 0x00000000FFFFFFFF,
    0x0F0F0F0F00000000, 0x0F0F0F0F0F0F0F0F, 0x0F0F0F0FF0F0F0F0, 0x0F0F0F0FFFFFFFFF,
    0xF0F0F0F000000000, 0xF0F0F0F00F0F0F0F, 0xF0F0F0F0F0F0F0F0, 0xF0F0F0F0FFFFFFFF,
    0xFFFFFFFF00000000, 0xFFFFFFFF0F0F0F0F, 0xFFFFFFFFF0F0F0F0, 0xFFFFFFFFFFFFFFFF,
];

/// Empties at or below which NonPV nodes leave the generic search.
pub const DEPTH_TO_NWS: Depth = 13;

/// Empties at or below which the shallow table takes over from the main
/// table.
const DEPTH_TO_SHALLOW_TT: Depth = 11;

/// Empties at or below which no table is consulted at all.
const DEPTH_TO_SHALLOW_SEARCH: Depth = 7;

/// Largest empty count at which the hash key canonicalizes solid discs.
const SOLID_CANONICAL_MAX_EMPTIES: u32 = 24;

/// Endgame root: solve at increasing confidence, exact last.
pub fn search_root(task: SearchTask, thread: &Thread) -> SearchResult {
    let board = task.board;
    let time_manager = task.time_manager.clone();
    let use_time_control = time_manager.is_some();

    let mut ctx = SearchContext::new(
        &board,
        task.selectivity,
        task.tables.clone(),
        task.eval.clone(),
    );

    if let Some(ref tm) = time_manager {
        tm.set_endgame_mode(true);
    }

    let n_empties = ctx.empty_list.count;
    let base_score = estimate_aspiration_base_score(&mut ctx, &board, n_empties, thread);

    let mut alpha = (base_score - ScaledScore::from_disc_diff(3)).max(-ScaledScore::INF);
    let mut beta = (base_score + ScaledScore::from_disc_diff(3)).min(ScaledScore::INF);

    for s in task.selectivity.as_u8()..=Selectivity::None.as_u8() {
        let selectivity = Selectivity::from_u8(s);
        if !use_time_control && task.level.get_end_depth(selectivity) < n_empties {
            break;
        }

        ctx.selectivity = selectivity;
        ctx.save_previous_scores();
        let score = aspiration_search(&mut ctx, &board, &mut alpha, &mut beta, thread);

        // Re-center for the next, less selective lap.
        let delta = ScaledScore::from_disc_diff(2);
        alpha = (score - delta).max(-ScaledScore::INF);
        beta = (score + delta).min(ScaledScore::INF);

        if thread.is_search_aborted() {
            break;
        }
        ctx.sort_all_root_moves();

        if let Some(ref callback) = task.callback {
            if let Some(best) = ctx.get_best_root_move() {
                callback(SearchProgress {
                    depth: n_empties,
                    target_depth: n_empties,
                    score: score.to_disc_diff_f32(),
                    best_move: best.sq,
                    probability: ctx.selectivity.probability(),
                    nodes: ctx.n_nodes,
                    pv_line: best.pv.clone(),
                    is_endgame: true,
                });
            }
        }

        if should_stop_iteration(&time_manager) {
            break;
        }
    }

    ctx.sort_all_root_moves();
    let best = ctx.get_best_root_move().unwrap();
    SearchResult::from_root_move(
        &ctx.root_moves,
        &best,
        ctx.n_nodes,
        n_empties,
        ctx.selectivity,
        true,
    )
}

/// Full-depth aspiration loop at the current selectivity.
fn aspiration_search(
    ctx: &mut SearchContext,
    board: &Board,
    alpha: &mut ScaledScore,
    beta: &mut ScaledScore,
    thread: &Thread,
) -> ScaledScore {
    let mut delta = ScaledScore::from_disc_diff(2);
    let n_empties = ctx.empty_list.count;

    loop {
        let score = search::<Root, EndGameStrategy>(ctx, board, n_empties, *alpha, *beta, thread);

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

        delta = delta + delta.value();
    }
}

/// Centers the first endgame aspiration window on a cheap estimate: a
/// hash hit, a quarter-depth midgame search, or a static probe.
fn estimate_aspiration_base_score(
    ctx: &mut SearchContext,
    board: &Board,
    n_empties: u32,
    thread: &Thread,
) -> ScaledScore {
    let saved_selectivity = ctx.selectivity;
    ctx.selectivity = Selectivity::Level0;
    let midgame_depth = n_empties / 4;

    let tt_probe = ctx.tables.main.probe(board.hash());
    if let Some(data) = tt_probe.data() {
        if data.is_exact() && data.depth >= midgame_depth {
            ctx.selectivity = saved_selectivity;
            return data.lower;
        }
    }

    let estimate = if n_empties >= 24 {
        search::<PV, MidGameStrategy>(
            ctx,
            board,
            midgame_depth,
            -ScaledScore::INF,
            ScaledScore::INF,
            thread,
        )
    } else if n_empties >= 12 {
        midgame::evaluate_depth2(ctx, board, -ScaledScore::INF, ScaledScore::INF)
    } else {
        midgame::evaluate(ctx, board)
    };

    ctx.selectivity = saved_selectivity;
    estimate
}

/// Endgame ProbCut: a shallow midgame search predicts the exact solve.
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

    let pc_depth = (2.0 * ((depth as f64).sqrt() * 0.30).floor()) as Depth;
    let mean = probcut::get_mean_end(pc_depth, depth);
    let sigma = probcut::get_sigma_end(pc_depth, depth);
    let t = ctx.selectivity.t_value();

    let pc_beta = probcut::compute_probcut_beta(beta, t, mean, sigma);
    if pc_beta >= ScaledScore::MAX {
        return None;
    }

    let eval_score = midgame::evaluate(ctx, board);
    let mean0 = probcut::get_mean_end(0, depth);
    let sigma0 = probcut::get_sigma_end(0, depth);
    let eval_beta = probcut::compute_eval_beta(beta, t, mean, sigma, mean0, sigma0);

    if eval_score >= eval_beta {
        let saved_selectivity = ctx.selectivity;
        ctx.selectivity = Selectivity::None;
        let score =
            search::<NonPV, MidGameStrategy>(ctx, board, pc_depth, pc_beta - 1, pc_beta, thread);
        ctx.selectivity = saved_selectivity;

        if score >= pc_beta {
            return Some(ScaledScore::new((beta.value() + pc_beta.value()) / 2));
        }
    }

    None
}

/// Hash key for the deep endgame bands.
///
/// Near the end, opponent discs on fully occupied lines are cosmetic:
/// positions reached by different move orders often differ only in which
/// of those squares hold them. They are removed from the key and their
/// value folded into the stored score, so such positions share entries.
fn endgame_hash_key(board: &Board, n_empties: u32) -> (u64, Score) {
    if n_empties > SOLID_CANONICAL_MAX_EMPTIES {
        return (board.hash(), 0);
    }
    let solid = stability::solid_opponent_discs(board.player, board.opponent);
    // Offsets must stay well inside the score field of a hash entry.
    if solid.is_empty() || solid.count() > 24 {
        (board.hash(), 0)
    } else {
        let canonical = Board {
            player: board.player,
            opponent: board.opponent ^ solid,
        };
        (canonical.hash(), 2 * solid.count() as Score)
    }
}

/// Null-window endgame solve; dispatches to the right band.
#[inline(always)]
pub fn null_window_search(ctx: &mut SearchContext, board: &Board, alpha: Score) -> Score {
    let n_empties = ctx.empty_list.count;

    if n_empties > DEPTH_TO_SHALLOW_TT {
        return null_window_search_with_tt(ctx, board, alpha);
    }
    if n_empties > DEPTH_TO_SHALLOW_SEARCH {
        return null_window_search_with_shallow_tt(ctx, board, alpha);
    }

    match n_empties {
        0 => board.final_score(),
        1 => {
            let sq = ctx.empty_list.first();
            solve1(ctx, board.player, alpha, sq)
        }
        2 => {
            let sq1 = ctx.empty_list.first();
            let sq2 = ctx.empty_list.next(sq1);
            solve2(ctx, board, alpha, sq1, sq2)
        }
        3 => {
            let sq1 = ctx.empty_list.first();
            let sq2 = ctx.empty_list.next(sq1);
            let sq3 = ctx.empty_list.next(sq2);
            solve3(ctx, board, alpha, sq1, sq2, sq3)
        }
        4 => {
            let (sq1, sq2, sq3, sq4) = sort_last4(ctx);
            solve4(ctx, board, alpha, sq1, sq2, sq3, sq4)
        }
        _ => shallow_search(ctx, board, alpha),
    }
}

/// NWS band backed by the main table with canonical keys.
pub fn null_window_search_with_tt(ctx: &mut SearchContext, board: &Board, alpha: Score) -> Score {
    let n_empties = ctx.empty_list.count;
    let beta = alpha + 1;

    if let Some(score) = stability_cutoff(board, n_empties, alpha) {
        return score;
    }

    let (tt_key, solid_offset) = endgame_hash_key(board, n_empties);
    let offset = ScaledScore::from_disc_diff(solid_offset);
    ctx.tables.main.prefetch(tt_key);

    let moves = board.get_moves();
    if moves.is_empty() {
        let next = board.switch_players();
        if next.has_legal_moves() {
            ctx.update_pass();
            let score = -null_window_search_with_tt(ctx, &next, -beta);
            ctx.undo_pass();
            return score;
        } else {
            return board.solve(n_empties);
        }
    }

    let alpha_scaled = ScaledScore::from_disc_diff(alpha);
    let beta_scaled = ScaledScore::from_disc_diff(beta);

    let tt_probe = ctx.tables.main.probe(tt_key);
    let tt_move = tt_probe.best_move();
    if let Some(data) = tt_probe.data() {
        if data.is_endgame && data.depth == n_empties {
            let lower = data.lower - offset;
            let upper = data.upper - offset;
            if lower >= beta_scaled {
                return lower.to_disc_diff();
            }
            if upper <= alpha_scaled {
                return upper.to_disc_diff();
            }
        }
    }

    let mut move_list = MoveList::with_moves(board, moves);
    if move_list.wipeout_move().is_some() {
        return SCORE_MAX;
    }

    let nodes_at_entry = ctx.n_nodes;
    let mut best_score = -SCORE_INF;
    let mut best_move = tt_move;

    let search_child = |ctx: &mut SearchContext, next: &Board, sq: Square| -> Score {
        ctx.update_endgame(sq);
        let score = if ctx.empty_list.count <= DEPTH_TO_SHALLOW_TT {
            -null_window_search_with_shallow_tt(ctx, next, -beta)
        } else {
            -null_window_search_with_tt(ctx, next, -beta)
        };
        ctx.undo_endgame(sq);
        score
    };

    if move_list.count() >= 2 {
        move_list.evaluate_moves_fast(ctx, board, tt_move);
        for mv in move_list.into_best_first_iter() {
            let next = board.make_move_with_flipped(mv.flipped, mv.sq);
            let score = search_child(ctx, &next, mv.sq);

            if score > best_score {
                best_score = score;
                if score >= beta {
                    best_move = mv.sq;
                    break;
                }
            }
        }
    } else if let Some(mv) = move_list.first() {
        let next = board.make_move_with_flipped(mv.flipped, mv.sq);
        best_score = search_child(ctx, &next, mv.sq);
        best_move = mv.sq;
    }

    ctx.tables.main.store(
        tt_key,
        ScaledScore::from_disc_diff(best_score) + offset,
        alpha_scaled + offset,
        beta_scaled + offset,
        n_empties,
        Selectivity::None,
        cost_of(ctx.n_nodes - nodes_at_entry),
        best_move,
        true,
    );

    best_score
}

/// NWS band backed by the shallow table.
fn null_window_search_with_shallow_tt(
    ctx: &mut SearchContext,
    board: &Board,
    alpha: Score,
) -> Score {
    let n_empties = ctx.empty_list.count;
    let beta = alpha + 1;

    if let Some(score) = stability_cutoff(board, n_empties, alpha) {
        return score;
    }

    let mut moves = board.get_moves();
    if moves.is_empty() {
        let next = board.switch_players();
        if next.has_legal_moves() {
            return -null_window_search_with_shallow_tt(ctx, &next, -beta);
        } else {
            return board.solve(n_empties);
        }
    }

    let alpha_scaled = ScaledScore::from_disc_diff(alpha);
    let beta_scaled = ScaledScore::from_disc_diff(beta);

    let key = board.hash();
    let probe = ctx.tables.shallow.probe(key);
    let mut tt_move = Square::None;
    if let Some(data) = probe.data() {
        if data.depth == n_empties {
            if data.lower >= beta_scaled {
                return data.lower.to_disc_diff();
            }
            if data.upper <= alpha_scaled {
                return data.upper.to_disc_diff();
            }
        }
        tt_move = data.best_moves[0];
    }

    let nodes_at_entry = ctx.n_nodes;
    let mut best_score = -SCORE_INF;
    let mut best_move = tt_move;

    let search_child = |ctx: &mut SearchContext, next: &Board, sq: Square| -> Score {
        ctx.update_endgame(sq);
        let score = if ctx.empty_list.count <= DEPTH_TO_SHALLOW_SEARCH {
            -shallow_search(ctx, next, -beta)
        } else {
            -null_window_search_with_shallow_tt(ctx, next, -beta)
        };
        ctx.undo_endgame(sq);
        score
    };

    // The table move first, outside the ordering pass.
    if tt_move != Square::None && moves.contains(tt_move) {
        let next = board.make_move(tt_move);
        let score = search_child(ctx, &next, tt_move);

        moves = moves.remove(tt_move);
        if score >= beta || moves.is_empty() {
            store_shallow(ctx, key, n_empties, score, alpha, beta, tt_move, nodes_at_entry);
            return score;
        }
        best_score = score;
    }

    let move_list = MoveList::with_moves(board, moves);
    if move_list.wipeout_move().is_some() {
        return SCORE_MAX;
    }

    let mut move_list = move_list;
    if move_list.count() >= 2 {
        move_list.evaluate_moves_fast(ctx, board, Square::None);
        for mv in move_list.into_best_first_iter() {
            let next = board.make_move_with_flipped(mv.flipped, mv.sq);
            let score = search_child(ctx, &next, mv.sq);

            if score > best_score {
                best_score = score;
                if score >= beta {
                    best_move = mv.sq;
                    break;
                }
            }
        }
    } else if let Some(mv) = move_list.first() {
        let next = board.make_move_with_flipped(mv.flipped, mv.sq);
        let score = search_child(ctx, &next, mv.sq);
        if score > best_score {
            best_score = score;
            best_move = mv.sq;
        }
    }

    store_shallow(ctx, key, n_empties, best_score, alpha, beta, best_move, nodes_at_entry);
    best_score
}

#[allow(clippy::too_many_arguments)]
#[inline]
fn store_shallow(
    ctx: &mut SearchContext,
    key: u64,
    n_empties: u32,
    score: Score,
    alpha: Score,
    beta: Score,
    best_move: Square,
    nodes_at_entry: u64,
) {
    ctx.tables.shallow.store(
        key,
        ScaledScore::from_disc_diff(score),
        ScaledScore::from_disc_diff(alpha),
        ScaledScore::from_disc_diff(beta),
        n_empties,
        Selectivity::None,
        cost_of(ctx.n_nodes - nodes_at_entry),
        best_move,
        true,
    );
}

/// Table-free band: stability cutoff and parity-first move ordering.
pub fn shallow_search(ctx: &mut SearchContext, board: &Board, alpha: Score) -> Score {
    let n_empties = ctx.empty_list.count;
    let beta = alpha + 1;

    if let Some(score) = stability_cutoff(board, n_empties, alpha) {
        return score;
    }

    let moves = board.get_moves();
    if moves.is_empty() {
        let next = board.switch_players();
        if next.has_legal_moves() {
            return -shallow_search(ctx, &next, -beta);
        } else {
            return board.solve(n_empties);
        }
    }

    let mut best_score = -SCORE_INF;

    // Odd-parity quadrants first, corners before the rest inside each
    // group.
    let quadrant_mask = Bitboard::new(QUADRANT_MASK[ctx.empty_list.parity as usize]);
    let priority_moves = moves & quadrant_mask;
    let remaining_moves = moves & !quadrant_mask;

    for group in [
        priority_moves.corners(),
        priority_moves.non_corners(),
        remaining_moves.corners(),
        remaining_moves.non_corners(),
    ] {
        for sq in group.iter() {
            let score = shallow_search_move(ctx, board, sq, beta);
            if score > best_score {
                if score >= beta {
                    return score;
                }
                best_score = score;
            }
        }
    }

    best_score
}

/// One move of the shallow band; descends into solve4 at the boundary.
#[inline(always)]
fn shallow_search_move(ctx: &mut SearchContext, board: &Board, sq: Square, beta: Score) -> Score {
    let next = board.make_move(sq);
    ctx.update_endgame(sq);
    let score = if ctx.empty_list.count == 4 {
        if let Some(score) = stability_cutoff(&next, 4, -beta) {
            -score
        } else {
            let (sq1, sq2, sq3, sq4) = sort_last4(ctx);
            -solve4(ctx, &next, -beta, sq1, sq2, sq3, sq4)
        }
    } else {
        -shallow_search(ctx, &next, -beta)
    };
    ctx.undo_endgame(sq);
    score
}

/// Orders the last four empties so squares in odd-parity quadrants come
/// first.
#[inline(always)]
fn sort_last4(ctx: &mut SearchContext) -> (Square, Square, Square, Square) {
    let (sq1, quad_id1) = ctx.empty_list.first_and_quad_id();
    let (sq2, quad_id2) = ctx.empty_list.next_and_quad_id(sq1);
    let (sq3, quad_id3) = ctx.empty_list.next_and_quad_id(sq2);
    let sq4 = ctx.empty_list.next(sq3);
    let parity = ctx.empty_list.parity;

    if parity & quad_id1 == 0 {
        if parity & quad_id2 != 0 {
            if parity & quad_id3 != 0 {
                (sq2, sq3, sq1, sq4)
            } else {
                (sq2, sq4, sq1, sq3)
            }
        } else if parity & quad_id3 != 0 {
            (sq3, sq4, sq1, sq2)
        } else {
            (sq1, sq2, sq3, sq4)
        }
    } else if parity & quad_id2 == 0 {
        if parity & quad_id3 != 0 {
            (sq1, sq3, sq2, sq4)
        } else {
            (sq1, sq4, sq2, sq3)
        }
    } else {
        (sq1, sq2, sq3, sq4)
    }
}

/// Exact solver, 4 empties.
fn solve4(
    ctx: &mut SearchContext,
    board: &Board,
    alpha: Score,
    sq1: Square,
    sq2: Square,
    sq3: Square,
    sq4: Square,
) -> Score {
    let beta = alpha + 1;
    let mut best_score = -SCORE_INF;

    if let Some(next) = board.try_make_move(sq1) {
        best_score = -solve3(ctx, &next, -beta, sq2, sq3, sq4);
        if best_score >= beta {
            return best_score;
        }
    }

    if let Some(next) = board.try_make_move(sq2) {
        let score = -solve3(ctx, &next, -beta, sq1, sq3, sq4);
        if score >= beta {
            return score;
        }
        best_score = score.max(best_score);
    }

    if let Some(next) = board.try_make_move(sq3) {
        let score = -solve3(ctx, &next, -beta, sq1, sq2, sq4);
        if score >= beta {
            return score;
        }
        best_score = score.max(best_score);
    }

    if let Some(next) = board.try_make_move(sq4) {
        let score = -solve3(ctx, &next, -beta, sq1, sq2, sq3);
        return score.max(best_score);
    }

    if best_score == -SCORE_INF {
        let pass = board.switch_players();
        if pass.has_legal_moves() {
            best_score = -solve4(ctx, &pass, -beta, sq1, sq2, sq3, sq4);
        } else {
            best_score = board.solve(4);
        }
    }

    best_score
}

/// Exact solver, 3 empties: the mover's moves first, then the opponent's
/// if the mover must pass.
fn solve3(
    ctx: &mut SearchContext,
    board: &Board,
    alpha: Score,
    sq1: Square,
    sq2: Square,
    sq3: Square,
) -> Score {
    ctx.increment_nodes();
    let beta = alpha + 1;
    let mut best_score = -SCORE_INF;

    if let Some(next) = board.try_make_move(sq1) {
        best_score = -solve2(ctx, &next, -beta, sq2, sq3);
        if best_score >= beta {
            return best_score;
        }
    }

    if let Some(next) = board.try_make_move(sq2) {
        let score = -solve2(ctx, &next, -beta, sq1, sq3);
        if score >= beta {
            return score;
        }
        best_score = score.max(best_score);
    }

    if let Some(next) = board.try_make_move(sq3) {
        let score = -solve2(ctx, &next, -beta, sq1, sq2);
        return score.max(best_score);
    }

    if best_score != -SCORE_INF {
        return best_score;
    }

    // Mover passes; minimize over the opponent's replies.
    ctx.increment_nodes();
    best_score = SCORE_INF;
    let pass = board.switch_players();

    if let Some(next) = pass.try_make_move(sq1) {
        best_score = solve2(ctx, &next, alpha, sq2, sq3);
        if best_score <= alpha {
            return best_score;
        }
    }

    if let Some(next) = pass.try_make_move(sq2) {
        let score = solve2(ctx, &next, alpha, sq1, sq3);
        if score <= alpha {
            return score;
        }
        best_score = score.min(best_score);
    }

    if let Some(next) = pass.try_make_move(sq3) {
        let score = solve2(ctx, &next, alpha, sq1, sq2);
        return score.min(best_score);
    }

    if best_score != SCORE_INF {
        return best_score;
    }

    board.solve(3)
}

/// Exact solver, 2 empties, with the adjacency prefilter before any flip
/// computation.
fn solve2(ctx: &mut SearchContext, board: &Board, alpha: Score, sq1: Square, sq2: Square) -> Score {
    ctx.increment_nodes();
    let player = board.player;
    let opponent = board.opponent;
    let beta = alpha + 1;
    let mut flipped: Bitboard;
    let best_score: Score;

    if opponent.has_adjacent_bit(sq1) {
        flipped = flip::flip(sq1, player, opponent);
        if !flipped.is_empty() {
            let next_player = opponent.apply_flip(flipped);
            best_score = -solve1(ctx, next_player, -beta, sq2);
            if best_score >= beta {
                return best_score;
            }

            if opponent.has_adjacent_bit(sq2) {
                flipped = flip::flip(sq2, player, opponent);
                if !flipped.is_empty() {
                    let next_player = opponent.apply_flip(flipped);
                    let score = -solve1(ctx, next_player, -beta, sq1);
                    return score.max(best_score);
                }
            }
            return best_score;
        }
    }

    if opponent.has_adjacent_bit(sq2) {
        flipped = flip::flip(sq2, player, opponent);
        if !flipped.is_empty() {
            let next_player = opponent.apply_flip(flipped);
            return -solve1(ctx, next_player, -beta, sq1);
        }
    }

    // Mover passes.
    ctx.increment_nodes();
    if player.has_adjacent_bit(sq1) {
        flipped = flip::flip(sq1, opponent, player);
        if !flipped.is_empty() {
            let next_player = player.apply_flip(flipped);
            best_score = solve1(ctx, next_player, alpha, sq2);
            if best_score <= alpha {
                return best_score;
            }

            if player.has_adjacent_bit(sq2) {
                flipped = flip::flip(sq2, opponent, player);
                if !flipped.is_empty() {
                    let next_player = player.apply_flip(flipped);
                    let score = solve1(ctx, next_player, alpha, sq1);
                    return score.min(best_score);
                }
            }
            return best_score;
        }
    }

    if player.has_adjacent_bit(sq2) {
        flipped = flip::flip(sq2, opponent, player);
        if !flipped.is_empty() {
            let next_player = player.apply_flip(flipped);
            return solve1(ctx, next_player, alpha, sq1);
        }
    }

    // Neither side can use the empties.
    board.solve(2)
}

/// Exact solver, 1 empty, with the lazy opponent-flip path: the
/// opponent's flips are only counted when they can still affect the
/// alpha decision.
#[inline(always)]
fn solve1(ctx: &mut SearchContext, player: Bitboard, alpha: Score, sq: Square) -> Score {
    ctx.increment_nodes();
    let mut n_flipped = count_last_flip(player, sq);
    let mut score = 2 * player.count() as Score - SCORE_MAX + 2 + n_flipped;

    if n_flipped == 0 {
        // Mover cannot play the square; the opponent may.
        if score <= 0 {
            score -= 2;
            if score > alpha {
                n_flipped = count_last_flip(!player, sq);
                score -= n_flipped;
            }
        } else if score > alpha {
            n_flipped = count_last_flip(!player, sq);
            if n_flipped != 0 {
                score -= n_flipped + 2;
            }
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrant_masks_partition_the_board() {
        assert_eq!(QUADRANT_MASK[0], 0);
        assert_eq!(QUADRANT_MASK[15], u64::MAX);
        assert_eq!(
            QUADRANT_MASK[1] | QUADRANT_MASK[2] | QUADRANT_MASK[4] | QUADRANT_MASK[8],
            u64::MAX
        );
        assert_eq!(QUADRANT_MASK[1] & QUADRANT_MASK[2], 0);
        assert_eq!(QUADRANT_MASK[3], QUADRANT_MASK[1] | QUADRANT_MASK[2]);
    }

    #[test]
    fn solid_discs_drop_out_of_the_key() {
        crate::stability::init();
        // Rank 1 is full and the opponent's A1/B1 discs sit on it: the
        // key collapses onto the board with those discs removed, and the
        // stored scores carry their value as an offset.
        let with_solid =
            Board::from_bitboards(0x00000000000000FCu64 | (1 << 20), 0x0000000000000003u64);
        let stripped = Board::from_bitboards(0x00000000000000FCu64 | (1 << 20), 0u64);

        let (key_a, off_a) = endgame_hash_key(&with_solid, with_solid.get_empty_count());
        let (key_b, off_b) = endgame_hash_key(&stripped, stripped.get_empty_count());
        assert_eq!(off_a, 4);
        assert_eq!(off_b, 0);
        assert_eq!(key_a, key_b);
        assert_ne!(with_solid.hash(), stripped.hash());

        // Deep positions keep the plain key.
        assert_eq!(
            endgame_hash_key(&with_solid, 40),
            (with_solid.hash(), 0)
        );
    }
}
