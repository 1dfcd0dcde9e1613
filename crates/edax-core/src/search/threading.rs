//! Worker pool and YBWC split points.
//!
//! A fixed pool of workers is spawned at engine construction. Worker 0
//! runs the root driver; the others idle until a searching thread opens a
//! split point, then claim moves from its shared iterator as null-window
//! helpers. The master searches alongside them and waits on the join
//! condvar once the move list runs dry. Beta cutoffs and external aborts
//! propagate through flags that every participant polls at its move
//! loops; aborted recursions return junk scores that callers discard.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, OnceLock, Weak};
use std::thread::JoinHandle;
use std::time::Instant;

use crate::board::Board;
use crate::constants::{MAX_PLY, MAX_THREADS};
use crate::empty_list::EmptyList;
use crate::eval::Eval;
use crate::move_list::ConcurrentMoveIterator;
use crate::probcut::Selectivity;
use crate::search::root_move::RootMoves;
use crate::search::search_context::SearchContext;
use crate::search::search_result::SearchResult;
use crate::search::side_to_move::SideToMove;
use crate::search::time_control::TimeManager;
use crate::search::{dispatch_split_search, search_root, SearchTask};
use crate::square::Square;
use crate::transposition_table::SearchTables;
use crate::types::{Depth, ScaledScore};
use crate::util::spinlock::SpinLock;

/// Split points one thread may own at once.
const MAX_SPLIT_POINTS_PER_THREAD: usize = 4;

/// Context seed a helper needs to reconstruct the master's state.
pub struct SplitTask {
    pub empty_list: EmptyList,
    pub side_to_move: SideToMove,
    pub selectivity: Selectivity,
    pub tables: Arc<SearchTables>,
    pub eval: Arc<Eval>,
    pub root_moves: RootMoves,
}

/// Mutable state of a split point, guarded by its spinlock.
pub struct SplitPointState {
    pub alpha: ScaledScore,
    pub best_score: ScaledScore,
    pub best_move: Square,
    /// Nodes contributed by helpers (the master counts its own).
    pub n_nodes: u64,
    pub pv: [Square; MAX_PLY],
    pub pv_set: bool,
}

/// A published search node whose remaining moves are up for grabs.
pub struct SplitPoint {
    pub board: Board,
    pub beta: ScaledScore,
    pub depth: Depth,
    pub node_type_id: u32,
    pub is_endgame: bool,
    pub move_iter: Arc<ConcurrentMoveIterator>,
    pub task: SplitTask,
    parent: Option<Arc<SplitPoint>>,
    state: SpinLock<SplitPointState>,
    cutoff: AtomicBool,
    /// Helpers still inside; the master joins on zero.
    helpers: Mutex<usize>,
    join_cv: Condvar,
}

impl SplitPoint {
    /// Locks and returns the mutable state.
    #[inline]
    pub fn state(&self) -> lock_api::MutexGuard<'_, crate::util::spinlock::RawSpinLock, SplitPointState> {
        self.state.lock()
    }

    /// Current shared alpha.
    #[inline]
    pub fn alpha(&self) -> ScaledScore {
        self.state.lock().alpha
    }

    /// Raises the node's cutoff flag; helpers abandon their moves.
    pub fn set_cutoff(&self) {
        self.cutoff.store(true, Ordering::Relaxed);
    }

    /// True when this node or any enclosing split point cut off.
    fn cutoff_in_chain(&self) -> bool {
        if self.cutoff.load(Ordering::Relaxed) {
            return true;
        }
        match &self.parent {
            Some(parent) => parent.cutoff_in_chain(),
            None => false,
        }
    }

    fn register_helper(&self) {
        *self.helpers.lock().unwrap() += 1;
    }

    fn helper_done(&self) {
        let mut helpers = self.helpers.lock().unwrap();
        *helpers -= 1;
        if *helpers == 0 {
            self.join_cv.notify_all();
        }
    }

    fn wait_for_helpers(&self) {
        let mut helpers = self.helpers.lock().unwrap();
        while *helpers > 0 {
            helpers = self.join_cv.wait(helpers).unwrap();
        }
    }
}

/// What an idle worker wakes up to.
enum Assignment {
    Idle,
    Root(SearchTask, Sender<SearchResult>),
    Split(Arc<SplitPoint>),
    Exit,
}

/// One pool worker.
pub struct Thread {
    pub id: usize,
    shared: Weak<PoolShared>,
    assignment: Mutex<Assignment>,
    wake_cv: Condvar,
    searching: AtomicBool,
    n_split_points: AtomicUsize,
    current_split_point: Mutex<Option<Arc<SplitPoint>>>,
}

impl Thread {
    fn new(id: usize, shared: Weak<PoolShared>) -> Thread {
        Thread {
            id,
            shared,
            assignment: Mutex::new(Assignment::Idle),
            wake_cv: Condvar::new(),
            searching: AtomicBool::new(false),
            n_split_points: AtomicUsize::new(0),
            current_split_point: Mutex::new(None),
        }
    }

    fn shared(&self) -> Arc<PoolShared> {
        self.shared.upgrade().expect("thread pool dropped while searching")
    }

    /// True when the global abort flag is raised.
    #[inline]
    pub fn is_search_aborted(&self) -> bool {
        self.shared().abort.load(Ordering::Relaxed)
    }

    /// True when a split point this thread works under has cut off.
    #[inline]
    pub fn cutoff_occurred(&self) -> bool {
        let current = self.current_split_point.lock().unwrap();
        current.as_ref().is_some_and(|sp| sp.cutoff_in_chain())
    }

    /// Cheap test whether opening a split point can help right now.
    pub fn can_split(&self) -> bool {
        if self.n_split_points.load(Ordering::Relaxed) >= MAX_SPLIT_POINTS_PER_THREAD {
            return false;
        }
        let shared = self.shared();
        shared
            .threads()
            .iter()
            .any(|t| t.id != self.id && !t.searching.load(Ordering::Relaxed))
    }

    /// Hands `sp` to this worker if it is idle. Returns true on success.
    fn try_assign_split(&self, sp: &Arc<SplitPoint>) -> bool {
        let mut assignment = self.assignment.lock().unwrap();
        if self.searching.load(Ordering::Relaxed) {
            return false;
        }
        if !matches!(*assignment, Assignment::Idle) {
            return false;
        }
        sp.register_helper();
        self.searching.store(true, Ordering::Relaxed);
        *assignment = Assignment::Split(sp.clone());
        self.wake_cv.notify_one();
        true
    }

    /// Opens a split point over the remaining moves of the current node,
    /// recruits idle workers, searches alongside them and joins.
    ///
    /// Returns the final `(best_score, best_move, helper_nodes)`.
    #[allow(clippy::too_many_arguments)]
    pub fn split(
        &self,
        ctx: &mut SearchContext,
        board: &Board,
        alpha: ScaledScore,
        beta: ScaledScore,
        best_score: ScaledScore,
        best_move: Square,
        depth: Depth,
        move_iter: &Arc<ConcurrentMoveIterator>,
        node_type_id: u32,
        is_endgame: bool,
    ) -> (ScaledScore, Square, u64) {
        let shared = self.shared();
        let parent = self.current_split_point.lock().unwrap().clone();

        let sp = Arc::new(SplitPoint {
            board: *board,
            beta,
            depth,
            node_type_id,
            is_endgame,
            move_iter: move_iter.clone(),
            task: SplitTask {
                empty_list: ctx.empty_list.clone(),
                side_to_move: ctx.side_to_move,
                selectivity: ctx.selectivity,
                tables: ctx.tables.clone(),
                eval: ctx.eval.clone(),
                root_moves: ctx.root_moves.clone(),
            },
            parent,
            state: SpinLock::new(SplitPointState {
                alpha,
                best_score,
                best_move,
                n_nodes: 0,
                pv: [Square::None; MAX_PLY],
                pv_set: false,
            }),
            cutoff: AtomicBool::new(false),
            helpers: Mutex::new(0),
            join_cv: Condvar::new(),
        });

        self.n_split_points.fetch_add(1, Ordering::Relaxed);

        for t in shared.threads() {
            if t.id != self.id {
                t.try_assign_split(&sp);
            }
        }

        // The master searches its share under the split point so nested
        // cutoffs propagate to it as well.
        let previous = {
            let mut current = self.current_split_point.lock().unwrap();
            std::mem::replace(&mut *current, Some(sp.clone()))
        };
        dispatch_split_search(ctx, self, &sp);
        *self.current_split_point.lock().unwrap() = previous;

        sp.wait_for_helpers();
        self.n_split_points.fetch_sub(1, Ordering::Relaxed);

        let state = sp.state.lock();
        if state.pv_set {
            ctx.set_pv(&state.pv);
        }
        (state.best_score, state.best_move, state.n_nodes)
    }

    /// Worker main loop.
    fn idle_loop(&self) {
        loop {
            let assignment = {
                let mut guard = self.assignment.lock().unwrap();
                loop {
                    match std::mem::replace(&mut *guard, Assignment::Idle) {
                        Assignment::Idle => {
                            guard = self.wake_cv.wait(guard).unwrap();
                        }
                        other => break other,
                    }
                }
            };

            match assignment {
                Assignment::Idle => unreachable!(),
                Assignment::Exit => return,
                Assignment::Root(task, result_tx) => {
                    self.searching.store(true, Ordering::Relaxed);
                    let result = search_root(task, self);
                    self.searching.store(false, Ordering::Relaxed);
                    // The receiver may have given up on an aborted search.
                    let _ = result_tx.send(result);
                }
                Assignment::Split(sp) => {
                    let mut ctx = SearchContext::from_split_point(&sp);
                    {
                        let mut current = self.current_split_point.lock().unwrap();
                        *current = Some(sp.clone());
                    }
                    dispatch_split_search(&mut ctx, self, &sp);
                    *self.current_split_point.lock().unwrap() = None;

                    sp.state.lock().n_nodes += ctx.n_nodes;
                    self.searching.store(false, Ordering::Relaxed);
                    sp.helper_done();
                }
            }
        }
    }
}

struct TimerControl {
    cancel: Arc<(Mutex<bool>, Condvar)>,
    handle: JoinHandle<()>,
}

struct PoolShared {
    threads: OnceLock<Vec<Arc<Thread>>>,
    abort: Arc<AtomicBool>,
}

impl PoolShared {
    fn threads(&self) -> &[Arc<Thread>] {
        self.threads.get().expect("thread pool not initialized")
    }
}

/// Fixed pool of search workers plus the deadline timer.
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    timer: Mutex<Option<TimerControl>>,
}

impl ThreadPool {
    /// Spawns `n_threads` workers (clamped to the supported range).
    pub fn new(n_threads: usize) -> Arc<ThreadPool> {
        let n_threads = n_threads.clamp(1, MAX_THREADS);

        let shared = Arc::new(PoolShared {
            threads: OnceLock::new(),
            abort: Arc::new(AtomicBool::new(false)),
        });

        let threads: Vec<Arc<Thread>> = (0..n_threads)
            .map(|id| Arc::new(Thread::new(id, Arc::downgrade(&shared))))
            .collect();
        shared.threads.set(threads).ok().expect("pool initialized twice");

        let mut handles = Vec::with_capacity(n_threads);
        for thread in shared.threads() {
            let thread = thread.clone();
            handles.push(std::thread::spawn(move || thread.idle_loop()));
        }

        Arc::new(ThreadPool {
            shared,
            handles: Mutex::new(handles),
            timer: Mutex::new(None),
        })
    }

    pub fn n_threads(&self) -> usize {
        self.shared.threads().len()
    }

    /// Launches a root search on worker 0 and returns the result channel.
    pub fn start_thinking(&self, task: SearchTask) -> Receiver<SearchResult> {
        self.shared.abort.store(false, Ordering::Relaxed);
        let (tx, rx) = channel();
        let root = &self.shared.threads()[0];
        let mut assignment = root.assignment.lock().unwrap();
        debug_assert!(matches!(*assignment, Assignment::Idle));
        *assignment = Assignment::Root(task, tx);
        root.wake_cv.notify_one();
        rx
    }

    /// Requests every worker to unwind as soon as possible.
    pub fn abort_search(&self) {
        self.shared.abort.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.shared.abort.load(Ordering::Relaxed)
    }

    /// Shared abort flag, armed externally by the deadline timer.
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        self.shared.abort.clone()
    }

    /// Arms a timer thread that aborts the search at the deadline.
    pub fn start_timer(&self, time_manager: Arc<TimeManager>) {
        self.stop_timer();

        let deadline = match time_manager.deadline() {
            Some(deadline) => deadline,
            None => return,
        };
        let cancel = Arc::new((Mutex::new(false), Condvar::new()));
        let abort = self.shared.abort.clone();
        let cancel_for_timer = cancel.clone();

        let handle = std::thread::spawn(move || {
            let (lock, cv) = &*cancel_for_timer;
            let mut canceled = lock.lock().unwrap();
            loop {
                if *canceled {
                    return;
                }
                let now = Instant::now();
                if now >= deadline {
                    abort.store(true, Ordering::Relaxed);
                    return;
                }
                let (guard, _) = cv.wait_timeout(canceled, deadline - now).unwrap();
                canceled = guard;
            }
        });

        *self.timer.lock().unwrap() = Some(TimerControl { cancel, handle });
    }

    /// Cancels the deadline timer if one is armed.
    pub fn stop_timer(&self) {
        if let Some(control) = self.timer.lock().unwrap().take() {
            let (lock, cv) = &*control.cancel;
            *lock.lock().unwrap() = true;
            cv.notify_all();
            let _ = control.handle.join();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop_timer();
        self.abort_search();
        for thread in self.shared.threads() {
            let mut assignment = thread.assignment.lock().unwrap();
            *assignment = Assignment::Exit;
            thread.wake_cv.notify_one();
        }
        for handle in self.handles.lock().unwrap().drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_spawns_and_drops() {
        let pool = ThreadPool::new(4);
        assert_eq!(pool.n_threads(), 4);
        drop(pool);
    }

    #[test]
    fn abort_flag_round_trip() {
        let pool = ThreadPool::new(1);
        assert!(!pool.is_aborted());
        pool.abort_search();
        assert!(pool.is_aborted());
        let flag = pool.abort_flag();
        flag.store(false, Ordering::Relaxed);
        assert!(!pool.is_aborted());
    }

    #[test]
    fn timer_fires_after_deadline() {
        use crate::search::time_control::{TimeMode, TimeManager};
        use std::time::Duration;

        let pool = ThreadPool::new(1);
        let tm = Arc::new(TimeManager::new(
            TimeMode::MoveTime(Duration::from_millis(20)),
            pool.abort_flag(),
            30,
        ));
        pool.start_timer(tm);
        std::thread::sleep(Duration::from_millis(80));
        assert!(pool.is_aborted());
        pool.stop_timer();
    }

    #[test]
    fn timer_can_be_canceled() {
        use crate::search::time_control::{TimeMode, TimeManager};
        use std::time::Duration;

        let pool = ThreadPool::new(1);
        let tm = Arc::new(TimeManager::new(
            TimeMode::MoveTime(Duration::from_secs(60)),
            pool.abort_flag(),
            30,
        ));
        pool.start_timer(tm);
        pool.stop_timer();
        assert!(!pool.is_aborted());
    }
}
