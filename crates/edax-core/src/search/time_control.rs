//! Time budgeting for clocked searches.
//!
//! Each move works against two budgets: `mini`, the share the move should
//! normally consume (a new iteration only starts while under it), and
//! `maxi`, the hard cap enforced by the timer thread through the abort
//! flag. Unstable iterations may grow `mini` toward `maxi`.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::types::{Depth, Scoref};

/// External time constraint for one search.
#[derive(Clone, Copy, Debug)]
pub enum TimeMode {
    /// Spend exactly this long on the move.
    MoveTime(Duration),
    /// Budget from the remaining game clock.
    GameTime {
        remaining: Duration,
        increment: Duration,
    },
}

/// Largest number of `mini` extensions one move may receive.
const MAX_EXTENSIONS: u32 = 3;

pub struct TimeManager {
    start: Instant,
    mini: Duration,
    maxi: Duration,
    abort: Arc<AtomicBool>,
    endgame_mode: AtomicBool,
    extensions: AtomicU32,
    last_score: Mutex<Option<Scoref>>,
}

impl TimeManager {
    pub fn new(mode: TimeMode, abort: Arc<AtomicBool>, n_empties: u32) -> TimeManager {
        let (mini, maxi) = match mode {
            TimeMode::MoveTime(d) => (d, d),
            TimeMode::GameTime {
                remaining,
                increment,
            } => {
                // Half the empties are ours to fill; keep a floor so the
                // final moves still get a budget.
                let moves_left = (n_empties / 2).max(6) as u32;
                let mini = remaining / (moves_left * 2) + increment / 2;
                let maxi = (remaining / 4).max(mini).min(remaining) + increment / 2;
                (mini, maxi)
            }
        };
        TimeManager {
            start: Instant::now(),
            mini,
            maxi,
            abort,
            endgame_mode: AtomicBool::new(false),
            extensions: AtomicU32::new(0),
            last_score: Mutex::new(None),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Instant at which the timer thread must arm the abort flag.
    pub fn deadline(&self) -> Option<Instant> {
        Some(self.start + self.maxi)
    }

    /// Effective soft budget, including granted extensions.
    fn effective_mini(&self) -> Duration {
        let extensions = self.extensions.load(Ordering::Relaxed);
        let extended = self.mini + self.mini * extensions / 2;
        extended.min(self.maxi)
    }

    /// True once the hard cap has passed; also arms the abort flag.
    pub fn check_time(&self) -> bool {
        if self.elapsed() >= self.maxi {
            self.abort.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// Grants more soft time when the iteration looks unstable: the best
    /// move changed, or the score swung by more than a disc.
    pub fn try_extend_time(&self, score: Scoref, pv_changed: bool, _depth: Depth) {
        let mut last = self.last_score.lock().unwrap();
        let swing = last.map(|s| (s - score).abs() >= 2.0).unwrap_or(false);
        *last = Some(score);

        if (pv_changed || swing) && self.extensions.load(Ordering::Relaxed) < MAX_EXTENSIONS {
            self.extensions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Endgame solves get the full hard budget: an exact result mid-
    /// iteration is worth more than a deeper heuristic one.
    pub fn set_endgame_mode(&self, enabled: bool) {
        self.endgame_mode.store(enabled, Ordering::Relaxed);
    }

    /// True when no further iteration should start.
    pub fn should_stop(&self) -> bool {
        if self.endgame_mode.load(Ordering::Relaxed) {
            return self.elapsed() >= self.maxi;
        }
        self.elapsed() >= self.effective_mini()
    }
}

/// Iteration gate for an optional time manager.
pub fn should_stop_iteration(time_manager: &Option<Arc<TimeManager>>) -> bool {
    time_manager.as_ref().is_some_and(|tm| tm.should_stop())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_time_budgets() {
        let abort = Arc::new(AtomicBool::new(false));
        let tm = TimeManager::new(TimeMode::MoveTime(Duration::from_secs(1)), abort, 30);
        assert_eq!(tm.deadline().unwrap(), tm.start + Duration::from_secs(1));
        assert!(!tm.check_time());
        assert!(!tm.should_stop());
    }

    #[test]
    fn game_time_budgets_are_sane() {
        let abort = Arc::new(AtomicBool::new(false));
        let tm = TimeManager::new(
            TimeMode::GameTime {
                remaining: Duration::from_secs(60),
                increment: Duration::ZERO,
            },
            abort,
            40,
        );
        assert!(tm.mini <= tm.maxi);
        assert!(tm.maxi <= Duration::from_secs(60));
    }

    #[test]
    fn expired_budget_sets_abort() {
        let abort = Arc::new(AtomicBool::new(false));
        let tm = TimeManager::new(TimeMode::MoveTime(Duration::ZERO), abort.clone(), 30);
        assert!(tm.check_time());
        assert!(abort.load(Ordering::Relaxed));
        assert!(tm.should_stop());
    }

    #[test]
    fn extensions_grow_soft_budget() {
        let abort = Arc::new(AtomicBool::new(false));
        let tm = TimeManager::new(
            TimeMode::GameTime {
                remaining: Duration::from_secs(100),
                increment: Duration::ZERO,
            },
            abort,
            40,
        );
        let before = tm.effective_mini();
        tm.try_extend_time(0.0, true, 10);
        assert!(tm.effective_mini() >= before);
    }
}
