//! ProbCut selectivity: statistical forward pruning.
//!
//! A shallow search predicts the deep score with an error that is close to
//! gaussian; when the prediction clears the window by enough standard
//! deviations, the deep search is cut. Mean and sigma of the predictor are
//! precomputed per (ply, shallow depth, deep depth).

use std::sync::OnceLock;

use crate::types::{Depth, ScaledScore};

/// Selectivity level indexing the ProbCut confidence (spec levels 0-5).
///
/// Lower levels prune harder; `None` disables ProbCut, making searches
/// mathematically exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Selectivity {
    /// 73% confidence (t = 1.1); most aggressive.
    #[default]
    Level0 = 0,
    /// 87% confidence (t = 1.5).
    Level1 = 1,
    /// 95% confidence (t = 2.0).
    Level2 = 2,
    /// 98% confidence (t = 2.6).
    Level3 = 3,
    /// 99% confidence (t = 3.3).
    Level4 = 4,
    /// ProbCut disabled; exact search.
    None = 5,
}

impl Selectivity {
    /// `(t multiplier, confidence percent)` per level.
    const CONFIG: [(f64, i32); 6] = [
        (1.1, 73),
        (1.5, 87),
        (2.0, 95),
        (2.6, 98),
        (3.3, 99),
        (999.0, 100),
    ];

    /// One-tailed gaussian multiplier for this confidence level.
    #[inline]
    pub fn t_value(self) -> f64 {
        Self::CONFIG[self as usize].0
    }

    /// Confidence percentage reported to the user.
    #[inline]
    pub fn probability(self) -> i32 {
        Self::CONFIG[self as usize].1
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn from_u8(value: u8) -> Self {
        // Values 0-5 are the full enum range.
        unsafe { std::mem::transmute(value.min(5)) }
    }

    /// Next more conservative level, saturating at `None`.
    #[inline]
    pub fn next(self) -> Self {
        Self::from_u8(self.as_u8() + 1)
    }

    #[inline]
    pub fn is_enabled(self) -> bool {
        self != Selectivity::None
    }
}

const MAX_PLY: usize = 61;
const MAX_DEPTH: usize = 61;

type Table3 = [[[f64; MAX_DEPTH]; MAX_DEPTH]; MAX_PLY];
type Table2 = [[f64; MAX_DEPTH]; MAX_DEPTH];

static MEAN_TABLE: OnceLock<Box<Table3>> = OnceLock::new();
static SIGMA_TABLE: OnceLock<Box<Table3>> = OnceLock::new();
static MEAN_TABLE_END: OnceLock<Box<Table2>> = OnceLock::new();
static SIGMA_TABLE_END: OnceLock<Box<Table2>> = OnceLock::new();

const SCORE_SCALE_F64: f64 = ScaledScore::SCALE as f64;

/// Predictor drift between a depth-`shallow` and a depth-`deep` midgame
/// search, in discs.
fn midgame_mean(_ply: usize, shallow: f64, deep: f64) -> f64 {
    0.02 * (deep - shallow)
}

/// Predictor standard deviation for midgame searches, in discs.
///
/// Error shrinks with the shallow depth, grows with the deep depth, and
/// peaks in the middlegame where evaluations are least settled.
fn midgame_sigma(ply: usize, shallow: f64, deep: f64) -> f64 {
    let base = (0.60 - 0.055 * shallow + 0.022 * deep).exp();
    let ply_centered = (ply as f64 - 30.0) / 30.0;
    let phase = 1.0 + 0.3 * (1.0 - ply_centered * ply_centered);
    base * phase
}

/// Predictor drift for the endgame probcut (shallow midgame search
/// predicting an exact solve).
fn endgame_mean(shallow: f64, deep: f64) -> f64 {
    -0.15 + 0.016 * shallow - 0.0016 * deep
}

/// Predictor standard deviation for the endgame probcut, in discs.
fn endgame_sigma(shallow: f64, deep: f64) -> f64 {
    (0.59 - 0.060 * shallow + 0.043 * deep).exp()
}

fn alloc_table3() -> Box<Table3> {
    let flat = vec![0.0f64; MAX_PLY * MAX_DEPTH * MAX_DEPTH].into_boxed_slice();
    unsafe { Box::from_raw(Box::into_raw(flat) as *mut Table3) }
}

fn alloc_table2() -> Box<Table2> {
    let flat = vec![0.0f64; MAX_DEPTH * MAX_DEPTH].into_boxed_slice();
    unsafe { Box::from_raw(Box::into_raw(flat) as *mut Table2) }
}

fn build_table3(f: impl Fn(usize, f64, f64) -> f64) -> Box<Table3> {
    let mut tbl = alloc_table3();
    for ply in 0..MAX_PLY {
        for shallow in 0..MAX_DEPTH {
            for deep in shallow..MAX_DEPTH {
                let v = f(ply, shallow as f64, deep as f64) * SCORE_SCALE_F64;
                tbl[ply][shallow][deep] = v;
                tbl[ply][deep][shallow] = v;
            }
        }
    }
    tbl
}

fn build_table2(f: impl Fn(f64, f64) -> f64) -> Box<Table2> {
    let mut tbl = alloc_table2();
    for shallow in 0..MAX_DEPTH {
        for deep in shallow..MAX_DEPTH {
            let v = f(shallow as f64, deep as f64) * SCORE_SCALE_F64;
            tbl[shallow][deep] = v;
            tbl[deep][shallow] = v;
        }
    }
    tbl
}

/// Builds the probcut tables. Called once from `Search::new`.
pub fn init() {
    MEAN_TABLE.set(build_table3(midgame_mean)).ok();
    SIGMA_TABLE.set(build_table3(midgame_sigma)).ok();
    MEAN_TABLE_END.set(build_table2(endgame_mean)).ok();
    SIGMA_TABLE_END.set(build_table2(endgame_sigma)).ok();
}

/// Precomputed midgame mean, in scaled-score units.
#[inline]
pub fn get_mean(ply: usize, shallow: Depth, deep: Depth) -> f64 {
    let tbl = MEAN_TABLE.get().expect("probcut not initialized");
    tbl[ply.min(MAX_PLY - 1)][shallow as usize][deep as usize]
}

/// Precomputed midgame sigma, in scaled-score units.
#[inline]
pub fn get_sigma(ply: usize, shallow: Depth, deep: Depth) -> f64 {
    let tbl = SIGMA_TABLE.get().expect("probcut not initialized");
    tbl[ply.min(MAX_PLY - 1)][shallow as usize][deep as usize]
}

/// Precomputed endgame mean, in scaled-score units.
#[inline]
pub fn get_mean_end(shallow: Depth, deep: Depth) -> f64 {
    let tbl = MEAN_TABLE_END.get().expect("probcut not initialized");
    tbl[shallow as usize][deep as usize]
}

/// Precomputed endgame sigma, in scaled-score units.
#[inline]
pub fn get_sigma_end(shallow: Depth, deep: Depth) -> f64 {
    let tbl = SIGMA_TABLE_END.get().expect("probcut not initialized");
    tbl[shallow as usize][deep as usize]
}

/// Null-window threshold for the probcut verification search.
#[inline]
pub fn compute_probcut_beta(beta: ScaledScore, t: f64, mean: f64, sigma: f64) -> ScaledScore {
    ScaledScore::new((beta.value() as f64 + t * sigma - mean).ceil() as i32)
}

/// Static-evaluation threshold used to pre-screen probcut attempts.
#[inline]
pub fn compute_eval_beta(
    beta: ScaledScore,
    t: f64,
    mean: f64,
    sigma: f64,
    mean0: f64,
    sigma0: f64,
) -> ScaledScore {
    let eval_mean = 0.5 * mean0 + mean;
    let eval_sigma = t * 0.5 * sigma0 + sigma;
    ScaledScore::new((beta.value() as f64 - eval_sigma - eval_mean).floor() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectivity_levels() {
        assert_eq!(Selectivity::Level0.probability(), 73);
        assert_eq!(Selectivity::None.probability(), 100);
        assert!(Selectivity::Level0.t_value() < Selectivity::Level4.t_value());
        assert!(Selectivity::Level0.is_enabled());
        assert!(!Selectivity::None.is_enabled());
        assert_eq!(Selectivity::from_u8(3), Selectivity::Level3);
        assert_eq!(Selectivity::from_u8(200), Selectivity::None);
        assert_eq!(Selectivity::Level4.next(), Selectivity::None);
        assert_eq!(Selectivity::None.next(), Selectivity::None);
    }

    #[test]
    fn sigma_behaves() {
        init();
        // Deeper shallow searches predict better.
        assert!(get_sigma(30, 4, 12) < get_sigma(30, 2, 12));
        // Deeper targets are harder to predict.
        assert!(get_sigma(30, 2, 16) > get_sigma(30, 2, 10));
        // Symmetric in (shallow, deep).
        assert_eq!(get_sigma(30, 2, 10), get_sigma(30, 10, 2));
        assert!(get_sigma_end(2, 20) > 0.0);
    }

    #[test]
    fn probcut_beta_scales_with_t() {
        init();
        let beta = ScaledScore::from_disc_diff(4);
        let sigma = get_sigma(30, 2, 12);
        let mean = get_mean(30, 2, 12);
        let loose = compute_probcut_beta(beta, Selectivity::Level0.t_value(), mean, sigma);
        let tight = compute_probcut_beta(beta, Selectivity::Level4.t_value(), mean, sigma);
        assert!(tight > loose);
        assert!(loose > beta);
    }
}
