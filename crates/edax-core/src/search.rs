//! Game-tree search engine.

pub mod endgame;
pub mod midgame;
pub mod node_type;
pub mod options;
pub mod root_move;
pub mod search_context;
pub mod search_result;
pub mod search_strategy;
pub mod side_to_move;
pub mod threading;
pub mod time_control;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::board::Board;
use crate::eval::{Eval, WeightsError};
use crate::flip;
use crate::level::Level;
use crate::move_list::{ConcurrentMoveIterator, MoveList};
use crate::probcut::{self, Selectivity};
use crate::search::node_type::{NodeType, NonPV, Root, PV};
use crate::search::options::{OptionsError, SearchConstraint, SearchOptions, SearchRunOptions};
use crate::search::search_context::SearchContext;
use crate::search::search_result::SearchResult;
use crate::search::search_strategy::{EndGameStrategy, MidGameStrategy, SearchStrategy};
use crate::search::threading::{SplitPoint, Thread, ThreadPool};
use crate::search::time_control::TimeManager;
use crate::square::Square;
use crate::stability::{self, stability_cutoff};
use crate::transposition_table::SearchTables;
use crate::types::{Depth, ScaledScore, Scoref};

/// The search engine: hash tables, worker pool and evaluator.
pub struct Search {
    tables: Arc<SearchTables>,
    threads: Arc<ThreadPool>,
    eval: Arc<Eval>,
}

/// Everything a root search needs, cloneable across workers.
#[derive(Clone)]
pub struct SearchTask {
    pub board: Board,
    pub selectivity: Selectivity,
    pub tables: Arc<SearchTables>,
    pub pool: Arc<ThreadPool>,
    pub eval: Arc<Eval>,
    pub level: Level,
    pub callback: Option<Arc<SearchProgressCallback>>,
    pub time_manager: Option<Arc<TimeManager>>,
}

/// Progress snapshot passed to the observer callback.
pub struct SearchProgress {
    pub depth: Depth,
    pub target_depth: Depth,
    pub score: Scoref,
    pub best_move: Square,
    pub probability: i32,
    pub nodes: u64,
    pub pv_line: Vec<Square>,
    pub is_endgame: bool,
}

pub type SearchProgressCallback = dyn Fn(SearchProgress) + Send + Sync + 'static;

/// Construction failure: bad configuration or bad weights.
#[derive(Debug)]
pub enum SearchInitError {
    Config(OptionsError),
    Weights(WeightsError),
}

impl fmt::Display for SearchInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchInitError::Config(err) => write!(f, "{err}"),
            SearchInitError::Weights(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SearchInitError {}

impl From<OptionsError> for SearchInitError {
    fn from(err: OptionsError) -> Self {
        SearchInitError::Config(err)
    }
}

impl From<WeightsError> for SearchInitError {
    fn from(err: WeightsError) -> Self {
        SearchInitError::Weights(err)
    }
}

impl Search {
    /// Builds an engine: validates the configuration, loads weights,
    /// sizes the tables and spawns the worker pool.
    pub fn new(options: &SearchOptions) -> Result<Search, SearchInitError> {
        options.validate()?;

        let n_threads = if options.n_threads == 0 {
            num_cpus::get()
        } else {
            options.n_threads
        };

        let eval = Eval::with_weight_file(options.eval_path.as_deref())?;

        // One-time global tables.
        probcut::init();
        stability::init();
        crate::eval::pattern::init();

        Ok(Search {
            tables: Arc::new(SearchTables::new(
                options.log2_main,
                options.log2_pv,
                options.log2_shallow,
            )),
            threads: ThreadPool::new(n_threads),
            eval: Arc::new(eval),
        })
    }

    /// Forgets everything learned so far (new game).
    pub fn init(&mut self) {
        self.tables.clear();
        self.tables.reset_generation();
        self.eval.clear_cache();
    }

    /// Runs a search and blocks until it finishes or is aborted.
    pub fn run(&mut self, board: &Board, options: &SearchRunOptions) -> SearchResult {
        let start = Instant::now();

        if board.is_game_over() {
            let mut result =
                SearchResult::game_over(board.solve(board.get_empty_count()) as Scoref);
            result.time_ms = start.elapsed().as_millis() as u64;
            return result;
        }

        // A position without legal moves is searched from the other side;
        // the mover's answer is a pass.
        if !board.has_legal_moves() {
            let mut result = self.run(&board.switch_players(), options);
            result.score = -result.score;
            result.best_move = None;
            result.pv_line.clear();
            result.bounds_per_move.clear();
            result.time_ms = start.elapsed().as_millis() as u64;
            return result;
        }

        let (time_manager, level) = match &options.constraint {
            SearchConstraint::Level(level) => (None, *level),
            SearchConstraint::Time(mode) => {
                let tm = Arc::new(TimeManager::new(
                    *mode,
                    self.threads.abort_flag(),
                    board.get_empty_count(),
                ));
                (Some(tm), Level::unlimited())
            }
        };

        // Ponder searches stay in the current generation so their results
        // age like the real search's own.
        if !options.ponder {
            self.tables.increment_generation();
        }

        let task = SearchTask {
            board: *board,
            selectivity: options.selectivity,
            tables: self.tables.clone(),
            pool: self.threads.clone(),
            eval: self.eval.clone(),
            level,
            callback: options.callback.clone(),
            time_manager: time_manager.clone(),
        };

        if let Some(ref tm) = time_manager {
            if tm.deadline().is_some() {
                self.threads.start_timer(tm.clone());
            }
        }

        let result_receiver = self.threads.start_thinking(task);
        let mut result = result_receiver.recv().unwrap();
        self.threads.stop_timer();

        // An abort before the first iteration completes leaves no usable
        // score; fall back to a one-ply evaluation.
        if result.score <= -(crate::constants::SCORE_INF as Scoref) + 1.0 {
            let fallback = self.quick_move(board);
            result.score = fallback.score;
            if result.best_move.is_none() {
                result.best_move = fallback.best_move;
                result.pv_line = fallback.pv_line;
            }
        }

        extend_pv(&self.tables, &self.eval, board, &mut result.pv_line);
        result.time_ms = start.elapsed().as_millis() as u64;

        if let Some(ref callback) = options.callback {
            callback(SearchProgress {
                depth: result.depth,
                target_depth: result.depth,
                score: result.score,
                best_move: result.best_move.unwrap_or(Square::None),
                probability: result.get_probability(),
                nodes: result.n_nodes,
                pv_line: result.pv_line.clone(),
                is_endgame: result.is_endgame,
            });
        }

        result
    }

    /// Stops the current search.
    pub fn abort(&self) {
        self.threads.stop_timer();
        self.threads.abort_search();
    }

    /// Stops a ponder search. Distinct from [`abort`](Self::abort) so the
    /// caller can tell the two apart; the accumulated hash state stays
    /// valid either way.
    pub fn abort_ponder(&self) {
        self.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.threads.is_aborted()
    }

    pub fn get_thread_pool(&self) -> Arc<ThreadPool> {
        self.threads.clone()
    }

    /// One-ply fallback for time trouble: evaluate every reply statically.
    pub fn quick_move(&self, board: &Board) -> SearchResult {
        let moves = board.get_moves();
        if moves.is_empty() {
            return SearchResult {
                score: 0.0,
                best_move: None,
                n_nodes: 0,
                pv_line: vec![],
                depth: 0,
                selectivity: Selectivity::None,
                is_endgame: false,
                time_ms: 0,
                bounds_per_move: vec![],
            };
        }

        let mut best_move = Square::None;
        let mut best_score = -ScaledScore::INF;

        for sq in moves.iter() {
            let flipped = flip::flip(sq, board.player, board.opponent);
            let next = board.make_move_with_flipped(flipped, sq);
            let score = -self.eval.evaluate_simple(&next);

            if score > best_score {
                best_score = score;
                best_move = sq;
            }
        }

        SearchResult {
            score: best_score.to_disc_diff_f32(),
            best_move: Some(best_move),
            n_nodes: moves.count() as u64,
            pv_line: vec![best_move],
            depth: 1,
            selectivity: Selectivity::None,
            is_endgame: false,
            time_ms: 0,
            bounds_per_move: vec![],
        }
    }
}

/// Picks the root driver: endgame once the level can solve the remaining
/// empties, midgame otherwise.
pub fn search_root(task: SearchTask, thread: &Thread) -> SearchResult {
    let deepest_end_depth = task.level.get_end_depth(Selectivity::Level0);
    let n_empties = task.board.get_empty_count();

    if deepest_end_depth >= n_empties {
        return endgame::search_root(task, thread);
    }

    midgame::search_root(task, thread)
}

/// log2-ish cost of a subtree, for the hash replacement policy.
#[inline]
pub(crate) fn cost_of(nodes: u64) -> u8 {
    (64 - nodes.leading_zeros()) as u8
}

/// Probes every child for a hash entry that already refutes the window.
fn enhanced_transposition_cutoff<SS: SearchStrategy>(
    ctx: &mut SearchContext,
    board: &Board,
    move_list: &MoveList,
    depth: Depth,
    alpha: ScaledScore,
    beta: ScaledScore,
    tt_key: u64,
) -> Option<ScaledScore> {
    let etc_depth = depth - 1;
    for mv in move_list.iter() {
        let next = board.make_move_with_flipped(mv.flipped, mv.sq);
        ctx.increment_nodes();

        let probe = ctx.tables.main.probe(next.hash());
        if let Some(data) = probe.data() {
            if (!SS::IS_ENDGAME || data.is_endgame)
                && data.depth >= etc_depth
                && data.selectivity >= ctx.selectivity
            {
                // The child's upper bound is the parent's lower bound.
                let score = -data.upper;
                if score >= beta {
                    ctx.tables.main.store(
                        tt_key,
                        score,
                        alpha,
                        beta,
                        depth,
                        ctx.selectivity,
                        0,
                        mv.sq,
                        SS::IS_ENDGAME,
                    );
                    return Some(score);
                }
            }
        }
    }
    None
}

/// The shared PVS/NWS node for both phases.
///
/// Returns a fail-soft score: at most `alpha` for a fail-low, at least
/// `beta` for a fail-high, exact within the window (up to the configured
/// selectivity).
pub fn search<NT: NodeType, SS: SearchStrategy>(
    ctx: &mut SearchContext,
    board: &Board,
    depth: Depth,
    mut alpha: ScaledScore,
    beta: ScaledScore,
    thread: &Thread,
) -> ScaledScore {
    let org_alpha = alpha;

    if NT::PV_NODE {
        if depth == 0 {
            return SS::evaluate(ctx, board);
        }
    } else {
        if depth <= SS::DEPTH_TO_SHALLOW {
            return SS::shallow_search(ctx, board, depth, alpha, beta);
        }

        if let Some(score) = stability_cutoff(board, ctx.empty_list.count, alpha.to_disc_diff()) {
            return ScaledScore::from_disc_diff(score);
        }
    }

    let nodes_at_entry = ctx.n_nodes;
    let tt_key = board.hash();
    ctx.tables.main.prefetch(tt_key);

    let mut move_list = MoveList::new(board);
    if move_list.count() == 0 {
        let next = board.switch_players();
        if next.has_legal_moves() {
            ctx.update_pass();
            let score = -search::<NT, SS>(ctx, &next, depth, -beta, -alpha, thread);
            ctx.undo_pass();
            return score;
        } else {
            return board.solve_scaled(ctx.empty_list.count);
        }
    } else if let Some(sq) = move_list.wipeout_move() {
        if NT::ROOT_NODE {
            ctx.update_root_move(sq, ScaledScore::MAX, 1, alpha);
        } else if NT::PV_NODE {
            ctx.update_pv(sq);
        }
        return ScaledScore::MAX;
    }

    let tt_probe = ctx.tables.main.probe(tt_key);
    let mut tt_move = tt_probe.best_move();
    if NT::PV_NODE && tt_move == Square::None {
        tt_move = ctx.tables.pv.probe(tt_key).best_move();
    }

    if !NT::PV_NODE {
        if let Some(data) = tt_probe.data() {
            if (!SS::IS_ENDGAME || data.is_endgame)
                && data.depth >= depth
                && data.selectivity >= ctx.selectivity
            {
                if data.cuts_above(beta) {
                    return data.lower;
                }
                if data.cuts_below(alpha) {
                    return data.upper;
                }
            }
        }

        if depth >= SS::MIN_ETC_DEPTH {
            if let Some(score) = enhanced_transposition_cutoff::<SS>(
                ctx, board, &move_list, depth, alpha, beta, tt_key,
            ) {
                return score;
            }
        }

        if depth >= SS::MIN_PROBCUT_DEPTH {
            if let Some(score) = SS::probcut(ctx, board, depth, beta, thread) {
                return score;
            }
        }
    }

    if move_list.count() > 1 {
        move_list.evaluate_moves::<SS>(ctx, board, depth, tt_move);
        move_list.sort();
    }

    let move_iter = Arc::new(ConcurrentMoveIterator::new(move_list));
    let mut best_move = Square::None;
    let mut best_score = -ScaledScore::INF;

    while let Some((mv, move_count)) = move_iter.next() {
        let next = board.make_move_with_flipped(mv.flipped, mv.sq);
        ctx.update(mv.sq, mv.flipped);

        let mut score = -ScaledScore::INF;
        if !NT::PV_NODE || move_count > 1 {
            score = -search::<NonPV, SS>(ctx, &next, depth - 1, -(alpha + 1), -alpha, thread);
        }

        // The first move, and any move beating alpha, gets the full
        // window.
        if NT::PV_NODE && (move_count == 1 || score > alpha) {
            ctx.clear_pv();
            score = -search::<PV, SS>(ctx, &next, depth - 1, -beta, -alpha, thread);
        }

        ctx.undo(mv.sq);

        if thread.is_search_aborted() || thread.cutoff_occurred() {
            return ScaledScore::ZERO;
        }

        if NT::ROOT_NODE {
            ctx.update_root_move(mv.sq, score, move_count, alpha);
        }

        if score > best_score {
            best_score = score;

            if score > alpha {
                best_move = mv.sq;

                if NT::PV_NODE && !NT::ROOT_NODE {
                    ctx.update_pv(mv.sq);
                }

                if NT::PV_NODE && score < beta {
                    alpha = score;
                } else {
                    break; // beta cutoff
                }
            }
        }

        // Young brothers wait: only after the first move is in can the
        // remaining ones be farmed out.
        if depth >= SS::MIN_SPLIT_DEPTH && move_iter.remaining() >= 2 && thread.can_split() {
            let (split_score, split_move, helper_nodes) = thread.split(
                ctx,
                board,
                alpha,
                beta,
                best_score,
                best_move,
                depth,
                &move_iter,
                NT::TYPE_ID,
                SS::IS_ENDGAME,
            );
            best_score = split_score;
            if split_move != Square::None {
                best_move = split_move;
            }
            ctx.n_nodes += helper_nodes;

            if thread.is_search_aborted() || thread.cutoff_occurred() {
                return ScaledScore::ZERO;
            }

            break; // the split consumed the remaining moves
        }
    }

    let cost = cost_of(ctx.n_nodes - nodes_at_entry);
    ctx.tables.main.store(
        tt_key,
        best_score,
        org_alpha,
        beta,
        depth,
        ctx.selectivity,
        cost,
        best_move,
        SS::IS_ENDGAME,
    );
    // Proven-exact PV results feed the PV table for extraction and
    // ordering.
    if NT::PV_NODE && best_score > org_alpha && best_score < beta {
        ctx.tables.pv.store(
            tt_key,
            best_score,
            org_alpha,
            beta,
            depth,
            ctx.selectivity,
            cost,
            best_move,
            SS::IS_ENDGAME,
        );
    }

    best_score
}

/// The helper side of a split point: claim moves, search them with the
/// shared window, publish improvements.
pub fn search_split_point<NT: NodeType, SS: SearchStrategy>(
    ctx: &mut SearchContext,
    thread: &Thread,
    sp: &Arc<SplitPoint>,
) {
    let board = sp.board;
    let beta = sp.beta;
    let depth = sp.depth;

    while let Some((mv, move_count)) = sp.move_iter.next() {
        if thread.is_search_aborted() || thread.cutoff_occurred() {
            return;
        }
        let alpha = sp.alpha();

        let next = board.make_move_with_flipped(mv.flipped, mv.sq);
        ctx.update(mv.sq, mv.flipped);

        let mut score = -ScaledScore::INF;
        if !NT::PV_NODE || move_count > 1 {
            score = -search::<NonPV, SS>(ctx, &next, depth - 1, -(alpha + 1), -alpha, thread);
        }

        if NT::PV_NODE && (move_count == 1 || score > alpha) {
            ctx.clear_pv();
            let alpha = sp.alpha();
            score = -search::<PV, SS>(ctx, &next, depth - 1, -beta, -alpha, thread);
        }

        ctx.undo(mv.sq);

        if thread.is_search_aborted() || thread.cutoff_occurred() {
            return;
        }

        if NT::ROOT_NODE {
            let alpha = sp.alpha();
            ctx.update_root_move(mv.sq, score, move_count, alpha);
        }

        let mut state = sp.state();
        if score > state.best_score {
            state.best_score = score;

            if score > state.alpha {
                state.best_move = mv.sq;

                if NT::PV_NODE && !NT::ROOT_NODE {
                    ctx.update_pv(mv.sq);
                    state.pv = *ctx.get_pv();
                    state.pv_set = true;
                }

                if NT::PV_NODE && score < beta {
                    state.alpha = score;
                } else {
                    drop(state);
                    sp.set_cutoff();
                    return;
                }
            }
        }
    }
}

/// Re-enters the typed search from a split point's runtime tags.
pub(crate) fn dispatch_split_search(
    ctx: &mut SearchContext,
    thread: &Thread,
    sp: &Arc<SplitPoint>,
) {
    debug_assert_eq!(NonPV::TYPE_ID, 1);
    debug_assert_eq!(PV::TYPE_ID, 2);
    debug_assert_eq!(Root::TYPE_ID, 3);
    match (sp.node_type_id, sp.is_endgame) {
        (1, false) => search_split_point::<NonPV, MidGameStrategy>(ctx, thread, sp),
        (2, false) => search_split_point::<PV, MidGameStrategy>(ctx, thread, sp),
        (3, false) => search_split_point::<Root, MidGameStrategy>(ctx, thread, sp),
        (1, true) => search_split_point::<NonPV, EndGameStrategy>(ctx, thread, sp),
        (2, true) => search_split_point::<PV, EndGameStrategy>(ctx, thread, sp),
        (3, true) => search_split_point::<Root, EndGameStrategy>(ctx, thread, sp),
        _ => unreachable!("unknown split node type"),
    }
}

/// Extends a principal variation through the PV and main tables, guessing
/// statically where both are silent.
fn extend_pv(tables: &SearchTables, eval: &Eval, board: &Board, pv: &mut Vec<Square>) {
    let mut board = *board;

    // Replay the known prefix, dropping anything illegal (stale hints).
    let mut valid = 0;
    for &sq in pv.iter() {
        if !board.has_legal_moves() && board.switch_players().has_legal_moves() {
            board = board.switch_players();
        }
        match board.try_make_move(sq) {
            Some(next) => {
                board = next;
                valid += 1;
            }
            None => break,
        }
    }
    pv.truncate(valid);

    while pv.len() < 60 {
        if board.is_game_over() {
            break;
        }
        if !board.has_legal_moves() {
            board = board.switch_players();
            continue;
        }

        let key = board.hash();
        let mut hint = tables.pv.probe(key).best_move();
        if hint == Square::None || !board.is_legal_move(hint) {
            hint = tables.main.probe(key).best_move();
        }
        if hint == Square::None || !board.is_legal_move(hint) {
            // Table break: guess with a one-ply static search.
            let mut best = Square::None;
            let mut best_score = -ScaledScore::INF;
            for sq in board.get_moves().iter() {
                let next = board.make_move(sq);
                let score = -eval.evaluate_simple(&next);
                if score > best_score {
                    best_score = score;
                    best = sq;
                }
            }
            hint = best;
            if hint == Square::None {
                break;
            }
            // Static guesses are weak; stop after the first one.
            pv.push(hint);
            break;
        }

        board = board.make_move(hint);
        pv.push(hint);
    }
}
