//! Search configuration.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::constants::MAX_THREADS;
use crate::level::Level;
use crate::probcut::Selectivity;
use crate::search::time_control::TimeMode;
use crate::search::SearchProgressCallback;
use crate::transposition_table::{MAX_LOG2_SIZE, MIN_LOG2_SIZE};

/// Engine-wide configuration, fixed at construction.
#[derive(Clone, Debug)]
pub struct SearchOptions {
    /// log2 bucket count of the main table.
    pub log2_main: u32,
    /// log2 bucket count of the PV table.
    pub log2_pv: u32,
    /// log2 bucket count of the shallow table.
    pub log2_shallow: u32,
    /// Worker count; 0 picks the hardware thread count.
    pub n_threads: usize,
    /// Evaluation weight file; `None` runs with zero weights.
    pub eval_path: Option<PathBuf>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            log2_main: 19,
            log2_pv: 15,
            log2_shallow: 17,
            n_threads: 1,
            eval_path: None,
        }
    }
}

impl SearchOptions {
    /// Checks sizes and worker count against the supported ranges.
    pub fn validate(&self) -> Result<(), OptionsError> {
        for (name, log2) in [
            ("main", self.log2_main),
            ("pv", self.log2_pv),
            ("shallow", self.log2_shallow),
        ] {
            if !(MIN_LOG2_SIZE..=MAX_LOG2_SIZE).contains(&log2) {
                return Err(OptionsError::HashSizeOutOfRange { table: name, log2 });
            }
        }
        if self.n_threads > MAX_THREADS {
            return Err(OptionsError::ThreadCountOutOfRange {
                n_threads: self.n_threads,
            });
        }
        Ok(())
    }
}

/// Configuration outside the supported range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    HashSizeOutOfRange {
        table: &'static str,
        log2: u32,
    },
    ThreadCountOutOfRange {
        n_threads: usize,
    },
}

impl fmt::Display for OptionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionsError::HashSizeOutOfRange { table, log2 } => write!(
                f,
                "{table} hash table size 2^{log2} outside supported range 2^{MIN_LOG2_SIZE}..=2^{MAX_LOG2_SIZE}"
            ),
            OptionsError::ThreadCountOutOfRange { n_threads } => {
                write!(f, "thread count {n_threads} exceeds maximum {MAX_THREADS}")
            }
        }
    }
}

impl std::error::Error for OptionsError {}

/// What bounds one search invocation.
#[derive(Clone)]
pub enum SearchConstraint {
    /// Fixed depth/selectivity targets from the level table.
    Level(Level),
    /// Wall-clock budgets.
    Time(TimeMode),
}

/// Per-invocation options.
#[derive(Clone, Default)]
pub struct SearchRunOptions {
    pub constraint: SearchConstraint,
    pub selectivity: Selectivity,
    pub callback: Option<Arc<SearchProgressCallback>>,
    /// Ponder searches keep the current hash generation so their results
    /// stay first-class when the expected move arrives.
    pub ponder: bool,
}

impl Default for SearchConstraint {
    fn default() -> Self {
        SearchConstraint::Level(crate::level::get_level(21))
    }
}

impl SearchRunOptions {
    pub fn with_level(level: Level, selectivity: Selectivity) -> Self {
        SearchRunOptions {
            constraint: SearchConstraint::Level(level),
            selectivity,
            callback: None,
            ponder: false,
        }
    }

    pub fn with_time(mode: TimeMode) -> Self {
        SearchRunOptions {
            constraint: SearchConstraint::Time(mode),
            selectivity: Selectivity::Level0,
            callback: None,
            ponder: false,
        }
    }

    pub fn pondering(mut self) -> Self {
        self.ponder = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        assert!(SearchOptions::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_sizes() {
        let mut options = SearchOptions::default();
        options.log2_main = 40;
        assert!(matches!(
            options.validate(),
            Err(OptionsError::HashSizeOutOfRange { table: "main", .. })
        ));

        let mut options = SearchOptions::default();
        options.log2_shallow = 1;
        assert!(matches!(
            options.validate(),
            Err(OptionsError::HashSizeOutOfRange { table: "shallow", .. })
        ));
    }

    #[test]
    fn rejects_absurd_thread_count() {
        let mut options = SearchOptions::default();
        options.n_threads = 100000;
        assert!(matches!(
            options.validate(),
            Err(OptionsError::ThreadCountOutOfRange { .. })
        ));
    }
}
