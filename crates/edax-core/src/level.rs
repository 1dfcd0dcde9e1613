//! Playing levels: a single external strength knob mapping to search
//! depth and selectivity targets.

use crate::probcut::Selectivity;
use crate::types::Depth;

/// Highest playing level.
pub const MAX_LEVEL: usize = 60;

/// Depth configuration for one playing level.
///
/// `end_depth` is indexed by selectivity: entry 0 is the most selective
/// (deepest reachable) endgame solve, entry 5 the exact one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Level {
    /// Midgame search depth.
    pub mid_depth: Depth,
    /// Endgame solve depth per selectivity level.
    pub end_depth: [Depth; 6],
}

impl Level {
    /// No depth restriction; used with time-controlled search.
    pub const fn unlimited() -> Self {
        Level {
            mid_depth: 60,
            end_depth: [14; 6],
        }
    }

    /// Full-board exact solving at every selectivity.
    pub const fn perfect() -> Self {
        Level {
            mid_depth: 60,
            end_depth: [60; 6],
        }
    }

    /// Endgame solve depth for the given selectivity.
    pub fn get_end_depth(&self, selectivity: Selectivity) -> Depth {
        self.end_depth[selectivity.as_u8() as usize]
    }
}

/// Maps a level (0..=60) to its depth configuration.
///
/// Low levels search the whole game shallowly; from the teens on, the
/// exact-solve horizon trails the midgame depth and the selective solve
/// horizons run a few plies deeper, so shallower levels lean on
/// selectivity rather than brute force. Out-of-range input is clamped.
pub fn get_level(lv: usize) -> Level {
    let lv = lv.min(MAX_LEVEL) as Depth;
    let mid_depth = lv.max(1);

    let exact: Depth = match lv {
        0..=9 => (2 * lv).max(1),
        10..=20 => lv + 8,
        21..=32 => lv + 10,
        33..=44 => lv + 14,
        _ => 60,
    }
    .min(60);

    let mut end_depth = [0; 6];
    for (s, slot) in end_depth.iter_mut().enumerate() {
        let bonus = if lv < 10 { 0 } else { 2 * (5 - s) as Depth };
        *slot = (exact + bonus).min(60);
    }

    Level { mid_depth, end_depth }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_monotonic() {
        for lv in 0..MAX_LEVEL {
            let cur = get_level(lv);
            let next = get_level(lv + 1);
            assert!(next.mid_depth >= cur.mid_depth);
            for s in 0..6 {
                assert!(next.end_depth[s] >= cur.end_depth[s]);
            }
        }
    }

    #[test]
    fn selective_depths_dominate_exact() {
        for lv in 0..=MAX_LEVEL {
            let level = get_level(lv);
            for s in 0..5 {
                assert!(level.end_depth[s] >= level.end_depth[s + 1]);
            }
        }
    }

    #[test]
    fn end_depth_lookup() {
        let level = Level {
            mid_depth: 10,
            end_depth: [30, 28, 26, 24, 22, 20],
        };
        assert_eq!(level.get_end_depth(Selectivity::Level0), 30);
        assert_eq!(level.get_end_depth(Selectivity::None), 20);
    }

    #[test]
    fn extremes() {
        assert_eq!(get_level(0).mid_depth, 1);
        assert_eq!(get_level(60).end_depth, [60; 6]);
        assert_eq!(get_level(999), get_level(60));
        assert_eq!(get_level(60), get_level(MAX_LEVEL));
    }
}
