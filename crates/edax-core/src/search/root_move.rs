//! Root move bookkeeping shared across search workers.

use std::sync::{Arc, Mutex};

use crate::board::Board;
use crate::constants::MAX_PLY;
use crate::move_list::MoveList;
use crate::square::Square;
use crate::types::ScaledScore;

/// One root move with its running search results.
#[derive(Clone, Debug)]
pub struct RootMove {
    pub sq: Square,
    /// Best score found for this move in the current iteration.
    pub score: ScaledScore,
    /// Score from the previous iteration, feeding the aspiration window.
    pub previous_score: ScaledScore,
    /// Running average across iterations.
    pub average_score: ScaledScore,
    /// Principal variation starting with this move.
    pub pv: Vec<Square>,
}

impl RootMove {
    pub fn new(sq: Square) -> Self {
        Self {
            sq,
            score: -ScaledScore::INF,
            previous_score: -ScaledScore::INF,
            average_score: -ScaledScore::INF,
            pv: Vec::new(),
        }
    }
}

/// Shared, sorted container of root moves.
///
/// Clones share the same underlying list, so split-point helpers report
/// into the same state as the master.
#[derive(Clone)]
pub struct RootMoves {
    moves: Arc<Mutex<Vec<RootMove>>>,
}

impl RootMoves {
    pub fn new(board: &Board) -> Self {
        let move_list = MoveList::new(board);
        let moves = move_list.iter().map(|m| RootMove::new(m.sq)).collect();
        Self {
            moves: Arc::new(Mutex::new(moves)),
        }
    }

    /// Records a search result for one root move.
    ///
    /// A move that failed low against the shared alpha keeps no score: it
    /// sorts behind every move with a real one.
    pub fn update(
        &self,
        sq: Square,
        score: ScaledScore,
        move_count: usize,
        alpha: ScaledScore,
        pv: &[Square; MAX_PLY],
    ) {
        let is_pv = move_count == 1 || score > alpha;

        let mut moves = self.moves.lock().unwrap();
        let rm = match moves.iter_mut().find(|rm| rm.sq == sq) {
            Some(rm) => rm,
            None => return,
        };
        rm.average_score = if rm.average_score == -ScaledScore::INF {
            score
        } else {
            ScaledScore::new((rm.average_score.value() + score.value()) / 2)
        };

        if is_pv {
            rm.score = score;
            rm.pv.clear();
            for sq in pv.iter() {
                if *sq == Square::None {
                    break;
                }
                rm.pv.push(*sq);
            }
        } else {
            rm.score = -ScaledScore::INF;
        }
    }

    /// Best root move after sorting.
    pub fn get_best(&self) -> Option<RootMove> {
        self.moves.lock().unwrap().first().cloned()
    }

    /// Snapshots the scores into `previous_score` before a new iteration.
    pub fn save_previous_scores(&self) {
        let mut moves = self.moves.lock().unwrap();
        for rm in moves.iter_mut() {
            rm.previous_score = rm.score;
        }
    }

    /// Sorts descending by score, stably.
    pub fn sort_all(&self) {
        let mut moves = self.moves.lock().unwrap();
        moves.sort_by(|a, b| b.score.cmp(&a.score));
    }

    pub fn count(&self) -> usize {
        self.moves.lock().unwrap().len()
    }

    /// Maps over all root moves under the lock.
    pub fn map<T, F>(&self, f: F) -> Vec<T>
    where
        F: FnMut(&RootMove) -> T,
    {
        self.moves.lock().unwrap().iter().map(f).collect()
    }
}
