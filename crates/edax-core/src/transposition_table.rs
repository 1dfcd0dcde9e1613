//! Shared hash tables for search results.
//!
//! Three tables of identical shape cooperate: `main` holds interior search
//! results, `pv` keeps proven-exact principal-variation scores, and
//! `shallow` backs the mid-empties endgame band and move-ordering seeds.
//!
//! Buckets hold four packed entries behind a sequence lock: a writer flips
//! the counter odd, rewrites entries, and flips it back even; readers
//! retry whenever the counter changed or was odd. Entry fields live in two
//! `AtomicU64` words so torn reads are impossible at the language level and
//! detected at the protocol level.

use std::sync::atomic::{fence, AtomicU32, AtomicU64, AtomicU8, Ordering};

use crate::probcut::Selectivity;
use crate::square::Square;
use crate::types::{Depth, ScaledScore};

/// Entries per bucket.
const BUCKET_SIZE: usize = 4;

/// Smallest and largest accepted table sizes, in log2 buckets.
pub const MIN_LOG2_SIZE: u32 = 10;
pub const MAX_LOG2_SIZE: u32 = 25;

/// Flag bits stored alongside the selectivity nibble.
const FLAG_OCCUPIED: u64 = 0x10;
const FLAG_ENDGAME: u64 = 0x20;

/// Decoded view of one hash entry.
#[derive(Clone, Copy, Debug)]
pub struct HashData {
    /// Proven lower bound on the score.
    pub lower: ScaledScore,
    /// Proven upper bound on the score.
    pub upper: ScaledScore,
    pub depth: Depth,
    pub selectivity: Selectivity,
    /// log2-ish of the subtree size that produced the entry.
    pub cost: u8,
    /// Entry was written by an endgame (empties-counted) search.
    pub is_endgame: bool,
    /// Best move, and the previous best as a secondary hint.
    pub best_moves: [Square; 2],
}

impl HashData {
    /// True when this entry alone refutes a null window above `beta`.
    #[inline]
    pub fn cuts_above(&self, beta: ScaledScore) -> bool {
        self.lower >= beta
    }

    /// True when this entry alone refutes a null window below `alpha`.
    #[inline]
    pub fn cuts_below(&self, alpha: ScaledScore) -> bool {
        self.upper <= alpha
    }

    #[inline]
    pub fn is_exact(&self) -> bool {
        self.lower == self.upper
    }
}

/// Result of probing one position.
pub struct ProbeResult {
    data: Option<HashData>,
}

impl ProbeResult {
    #[inline]
    pub fn data(&self) -> Option<&HashData> {
        self.data.as_ref()
    }

    /// Best-move hint, `Square::None` when the position is unknown.
    #[inline]
    pub fn best_move(&self) -> Square {
        self.data
            .as_ref()
            .map(|d| d.best_moves[0])
            .unwrap_or(Square::None)
    }
}

/// One packed entry: two atomic words.
///
/// word0: lock(32) | move0(8) | move1(8) | depth(8) | selectivity+flags(8)
/// word1: lower(i16) | upper(i16) | cost(8) | date(8) | unused(16)
#[derive(Default)]
struct PackedEntry {
    word0: AtomicU64,
    word1: AtomicU64,
}

#[derive(Clone, Copy, Default)]
struct Entry {
    word0: u64,
    word1: u64,
}

impl Entry {
    #[inline]
    fn pack(
        lock: u32,
        moves: [Square; 2],
        depth: Depth,
        selectivity: Selectivity,
        is_endgame: bool,
        lower: ScaledScore,
        upper: ScaledScore,
        cost: u8,
        date: u8,
    ) -> Entry {
        let mut flags = FLAG_OCCUPIED | selectivity.as_u8() as u64;
        if is_endgame {
            flags |= FLAG_ENDGAME;
        }
        let word0 = lock as u64
            | (moves[0].index() as u64) << 32
            | (moves[1].index() as u64) << 40
            | (depth as u64 & 0xFF) << 48
            | flags << 56;
        let word1 = (lower.value() as i16 as u16 as u64)
            | (upper.value() as i16 as u16 as u64) << 16
            | (cost as u64) << 32
            | (date as u64) << 40;
        Entry { word0, word1 }
    }

    #[inline]
    fn lock(&self) -> u32 {
        self.word0 as u32
    }

    #[inline]
    fn occupied(&self) -> bool {
        (self.word0 >> 56) & FLAG_OCCUPIED != 0
    }

    #[inline]
    fn moves(&self) -> [Square; 2] {
        [
            Square::from_usize_unchecked((self.word0 >> 32) as usize & 0x7F),
            Square::from_usize_unchecked((self.word0 >> 40) as usize & 0x7F),
        ]
    }

    #[inline]
    fn depth(&self) -> Depth {
        ((self.word0 >> 48) & 0xFF) as Depth
    }

    #[inline]
    fn selectivity(&self) -> Selectivity {
        Selectivity::from_u8((self.word0 >> 56) as u8 & 0x0F)
    }

    #[inline]
    fn is_endgame(&self) -> bool {
        (self.word0 >> 56) & FLAG_ENDGAME != 0
    }

    #[inline]
    fn lower(&self) -> ScaledScore {
        ScaledScore::new(self.word1 as u16 as i16 as i32)
    }

    #[inline]
    fn upper(&self) -> ScaledScore {
        ScaledScore::new((self.word1 >> 16) as u16 as i16 as i32)
    }

    #[inline]
    fn cost(&self) -> u8 {
        (self.word1 >> 32) as u8
    }

    #[inline]
    fn date(&self) -> u8 {
        (self.word1 >> 40) as u8
    }

    fn decode(&self) -> HashData {
        HashData {
            lower: self.lower(),
            upper: self.upper(),
            depth: self.depth(),
            selectivity: self.selectivity(),
            cost: self.cost(),
            is_endgame: self.is_endgame(),
            best_moves: self.moves(),
        }
    }

    /// Replacement preference: smaller sorts as "worse". Stale entries go
    /// first, then shallower, less selective, cheaper ones.
    fn retention_key(&self, current_date: u8) -> (bool, Depth, u8, u8) {
        (
            self.occupied() && self.date() == current_date,
            self.depth(),
            self.selectivity().as_u8(),
            self.cost(),
        )
    }
}

#[repr(align(64))]
struct Bucket {
    seq: AtomicU32,
    entries: [PackedEntry; BUCKET_SIZE],
}

impl Bucket {
    fn new() -> Bucket {
        Bucket {
            seq: AtomicU32::new(0),
            entries: Default::default(),
        }
    }

    /// Takes a consistent snapshot of the bucket through the seqlock.
    fn snapshot(&self) -> [Entry; BUCKET_SIZE] {
        loop {
            let s1 = self.seq.load(Ordering::Acquire);
            if s1 & 1 != 0 {
                std::hint::spin_loop();
                continue;
            }

            let mut entries = [Entry::default(); BUCKET_SIZE];
            for (i, e) in self.entries.iter().enumerate() {
                entries[i] = Entry {
                    word0: e.word0.load(Ordering::Relaxed),
                    word1: e.word1.load(Ordering::Relaxed),
                };
            }

            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == s1 {
                return entries;
            }
        }
    }

    /// Serializes writers on this bucket by parking the sequence odd.
    fn write_lock(&self) -> u32 {
        loop {
            let s = self.seq.load(Ordering::Relaxed);
            if s & 1 == 0
                && self
                    .seq
                    .compare_exchange_weak(s, s + 1, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return s;
            }
            std::hint::spin_loop();
        }
    }

    fn write_unlock(&self, s: u32) {
        self.seq.store(s.wrapping_add(2), Ordering::Release);
    }

    fn entry(&self, i: usize) -> Entry {
        Entry {
            word0: self.entries[i].word0.load(Ordering::Relaxed),
            word1: self.entries[i].word1.load(Ordering::Relaxed),
        }
    }

    fn set_entry(&self, i: usize, e: Entry) {
        self.entries[i].word0.store(e.word0, Ordering::Relaxed);
        self.entries[i].word1.store(e.word1, Ordering::Relaxed);
    }
}

/// One fixed-size bucketed hash table.
pub struct TranspositionTable {
    buckets: Box<[Bucket]>,
    mask: u64,
    date: AtomicU8,
}

impl TranspositionTable {
    /// Creates a table with `2^log2_size` buckets.
    pub fn new(log2_size: u32) -> TranspositionTable {
        debug_assert!((MIN_LOG2_SIZE..=MAX_LOG2_SIZE).contains(&log2_size));
        let size = 1usize << log2_size;
        let mut buckets = Vec::with_capacity(size);
        buckets.resize_with(size, Bucket::new);
        TranspositionTable {
            buckets: buckets.into_boxed_slice(),
            mask: size as u64 - 1,
            date: AtomicU8::new(1),
        }
    }

    #[inline]
    fn bucket(&self, key: u64) -> &Bucket {
        // Low bits pick the bucket, high bits form the lock; rapidhash
        // spreads both halves well.
        crate::uget!(self.buckets; (key & self.mask) as usize)
    }

    #[inline]
    fn lock_of(key: u64) -> u32 {
        (key >> 32) as u32
    }

    /// Hints the CPU to pull the bucket into cache ahead of the probe.
    #[inline]
    pub fn prefetch(&self, key: u64) {
        #[cfg(target_arch = "x86_64")]
        unsafe {
            use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
            let bucket = self.bucket(key) as *const Bucket as *const i8;
            _mm_prefetch(bucket, _MM_HINT_T0);
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            let _ = key;
        }
    }

    /// Looks the position up; lock-free.
    pub fn probe(&self, key: u64) -> ProbeResult {
        let bucket = self.bucket(key);
        let lock = Self::lock_of(key);

        for entry in bucket.snapshot() {
            if entry.occupied() && entry.lock() == lock {
                let data = entry.decode();
                // A torn or nonsense pair is treated as absent.
                if data.lower <= data.upper {
                    return ProbeResult { data: Some(data) };
                }
                return ProbeResult { data: None };
            }
        }
        ProbeResult { data: None }
    }

    /// Records a search result.
    ///
    /// `score` is interpreted against the `(alpha, beta)` window it was
    /// obtained in: a fail-high stores a lower bound, a fail-low an upper
    /// bound, anything inside the window an exact value.
    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &self,
        key: u64,
        score: ScaledScore,
        alpha: ScaledScore,
        beta: ScaledScore,
        depth: Depth,
        selectivity: Selectivity,
        cost: u8,
        best_move: Square,
        is_endgame: bool,
    ) {
        let (lower, upper) = if score >= beta {
            (score, ScaledScore::MAX)
        } else if score <= alpha {
            (ScaledScore::MIN, score)
        } else {
            (score, score)
        };

        let bucket = self.bucket(key);
        let lock = Self::lock_of(key);
        let date = self.date.load(Ordering::Relaxed);

        let seq = bucket.write_lock();

        let mut target = None;
        for i in 0..BUCKET_SIZE {
            let entry = bucket.entry(i);
            if entry.occupied() && entry.lock() == lock {
                target = Some((i, entry));
                break;
            }
        }

        let new_entry = match target {
            Some((i, old)) => {
                let updated = Self::merge(old, lock, lower, upper, depth, selectivity, cost, best_move, is_endgame, date);
                bucket.set_entry(i, updated);
                None
            }
            None => {
                let mut worst = 0;
                let mut worst_key = bucket.entry(0).retention_key(date);
                for i in 1..BUCKET_SIZE {
                    let k = bucket.entry(i).retention_key(date);
                    if k < worst_key {
                        worst = i;
                        worst_key = k;
                    }
                }
                Some((
                    worst,
                    Entry::pack(
                        lock,
                        [best_move, Square::None],
                        depth,
                        selectivity,
                        is_endgame,
                        lower,
                        upper,
                        cost,
                        date,
                    ),
                ))
            }
        };

        if let Some((i, e)) = new_entry {
            bucket.set_entry(i, e);
        }

        bucket.write_unlock(seq);
    }

    /// Combines a new result with the entry already stored for the same
    /// position.
    ///
    /// Bounds merge only at equal (depth, selectivity); a deeper or more
    /// selective result replaces the entry wholesale, a weaker one only
    /// refreshes the move hints and the date.
    #[allow(clippy::too_many_arguments)]
    fn merge(
        old: Entry,
        lock: u32,
        lower: ScaledScore,
        upper: ScaledScore,
        depth: Depth,
        selectivity: Selectivity,
        cost: u8,
        best_move: Square,
        is_endgame: bool,
        date: u8,
    ) -> Entry {
        let moves = if best_move != Square::None && best_move != old.moves()[0] {
            [best_move, old.moves()[0]]
        } else {
            old.moves()
        };

        let same_draft = depth == old.depth()
            && selectivity == old.selectivity()
            && is_endgame == old.is_endgame();
        let dominates = (depth, selectivity.as_u8()) > (old.depth(), old.selectivity().as_u8());

        if same_draft {
            let mut merged_lower = lower.max(old.lower());
            let mut merged_upper = upper.min(old.upper());
            if merged_lower > merged_upper {
                // Contradictory selective results; trust the newer one.
                merged_lower = lower;
                merged_upper = upper;
            }
            Entry::pack(
                lock,
                moves,
                depth,
                selectivity,
                is_endgame,
                merged_lower,
                merged_upper,
                cost.max(old.cost()),
                date,
            )
        } else if dominates {
            Entry::pack(lock, moves, depth, selectivity, is_endgame, lower, upper, cost, date)
        } else {
            Entry::pack(
                lock,
                moves,
                old.depth(),
                old.selectivity(),
                old.is_endgame(),
                old.lower(),
                old.upper(),
                old.cost(),
                date,
            )
        }
    }

    /// Drops every entry.
    pub fn clear(&self) {
        for bucket in self.buckets.iter() {
            let seq = bucket.write_lock();
            for i in 0..BUCKET_SIZE {
                bucket.set_entry(i, Entry::default());
            }
            bucket.write_unlock(seq);
        }
    }

    /// Starts a new search generation; stale entries become replacement
    /// fodder without being erased.
    pub fn increment_generation(&self) {
        let mut date = self.date.load(Ordering::Relaxed).wrapping_add(1);
        if date == 0 {
            date = 1;
        }
        self.date.store(date, Ordering::Relaxed);
    }

    /// Rewinds the generation counter to its initial value.
    pub fn reset_generation(&self) {
        self.date.store(1, Ordering::Relaxed);
    }
}

/// The three cooperating tables used by a search.
pub struct SearchTables {
    pub main: TranspositionTable,
    pub pv: TranspositionTable,
    pub shallow: TranspositionTable,
}

impl SearchTables {
    pub fn new(log2_main: u32, log2_pv: u32, log2_shallow: u32) -> SearchTables {
        SearchTables {
            main: TranspositionTable::new(log2_main),
            pv: TranspositionTable::new(log2_pv),
            shallow: TranspositionTable::new(log2_shallow),
        }
    }

    pub fn clear(&self) {
        self.main.clear();
        self.pv.clear();
        self.shallow.clear();
    }

    pub fn increment_generation(&self) {
        self.main.increment_generation();
        self.pv.increment_generation();
        self.shallow.increment_generation();
    }

    pub fn reset_generation(&self) {
        self.main.reset_generation();
        self.pv.reset_generation();
        self.shallow.reset_generation();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(tt: &TranspositionTable, key: u64, score: i32, depth: Depth) {
        tt.store(
            key,
            ScaledScore::from_disc_diff(score),
            -ScaledScore::INF,
            ScaledScore::INF,
            depth,
            Selectivity::None,
            1,
            Square::A1,
            false,
        );
    }

    /// Keys sharing low bits land in one bucket but carry distinct locks.
    fn colliding_key(i: u64) -> u64 {
        (i + 1) << 32 | 0x123
    }

    #[test]
    fn store_then_probe() {
        let tt = TranspositionTable::new(MIN_LOG2_SIZE);
        let key = 0xDEADBEEF12345678;
        exact(&tt, key, 12, 8);

        let probe = tt.probe(key);
        let data = probe.data().unwrap();
        assert_eq!(data.lower, ScaledScore::from_disc_diff(12));
        assert_eq!(data.upper, ScaledScore::from_disc_diff(12));
        assert!(data.is_exact());
        assert_eq!(data.depth, 8);
        assert_eq!(probe.best_move(), Square::A1);
    }

    #[test]
    fn probe_missing() {
        let tt = TranspositionTable::new(MIN_LOG2_SIZE);
        assert!(tt.probe(0x1234).data().is_none());
        assert_eq!(tt.probe(0x1234).best_move(), Square::None);
    }

    #[test]
    fn bound_classification() {
        let tt = TranspositionTable::new(MIN_LOG2_SIZE);
        let alpha = ScaledScore::from_disc_diff(0);
        let beta = ScaledScore::from_disc_diff(4);

        // Fail high: lower bound only.
        tt.store(1 << 32, ScaledScore::from_disc_diff(10), alpha, beta, 6, Selectivity::None, 1, Square::B2, false);
        let d = tt.probe(1 << 32);
        let d = d.data().unwrap();
        assert_eq!(d.lower, ScaledScore::from_disc_diff(10));
        assert_eq!(d.upper, ScaledScore::MAX);
        assert!(d.cuts_above(beta));
        assert!(!d.cuts_below(alpha));

        // Fail low: upper bound only.
        tt.store(2 << 32, ScaledScore::from_disc_diff(-6), alpha, beta, 6, Selectivity::None, 1, Square::B2, false);
        let d = tt.probe(2 << 32);
        let d = d.data().unwrap();
        assert_eq!(d.lower, ScaledScore::MIN);
        assert_eq!(d.upper, ScaledScore::from_disc_diff(-6));
        assert!(d.cuts_below(alpha));
    }

    #[test]
    fn bounds_merge_at_same_draft() {
        let tt = TranspositionTable::new(MIN_LOG2_SIZE);
        let key = 7 << 32;
        let alpha = ScaledScore::from_disc_diff(0);
        let beta = ScaledScore::from_disc_diff(4);

        tt.store(key, ScaledScore::from_disc_diff(10), alpha, beta, 6, Selectivity::None, 1, Square::B2, false);
        tt.store(key, ScaledScore::from_disc_diff(12), alpha, beta, 6, Selectivity::None, 1, Square::C3, false);

        let d = tt.probe(key);
        let d = d.data().unwrap();
        assert_eq!(d.lower, ScaledScore::from_disc_diff(12));
        assert_eq!(d.upper, ScaledScore::MAX);
        assert_eq!(d.best_moves[0], Square::C3);
        assert_eq!(d.best_moves[1], Square::B2);
    }

    #[test]
    fn deeper_search_replaces_entry() {
        let tt = TranspositionTable::new(MIN_LOG2_SIZE);
        let key = 9 << 32;
        exact(&tt, key, 2, 4);
        exact(&tt, key, 6, 10);

        let d = tt.probe(key);
        let d = d.data().unwrap();
        assert_eq!(d.depth, 10);
        assert_eq!(d.lower, ScaledScore::from_disc_diff(6));

        // A shallower result must not downgrade the entry.
        exact(&tt, key, -20, 2);
        let d = tt.probe(key);
        let d = d.data().unwrap();
        assert_eq!(d.depth, 10);
        assert_eq!(d.lower, ScaledScore::from_disc_diff(6));
    }

    #[test]
    fn stale_entries_are_replaced_first() {
        let tt = TranspositionTable::new(MIN_LOG2_SIZE);

        // Fill one bucket with four dated entries.
        for i in 0..4 {
            exact(&tt, colliding_key(i), i as i32 * 2, 10 + i as Depth);
        }
        for i in 0..4 {
            assert!(tt.probe(colliding_key(i)).data().is_some());
        }

        tt.increment_generation();
        let newcomer = colliding_key(4);
        exact(&tt, newcomer, 8, 2);

        // The newcomer landed despite its shallow depth, and exactly one
        // of the old keys is gone.
        assert!(tt.probe(newcomer).data().is_some());
        let survivors = (0..4)
            .filter(|&i| tt.probe(colliding_key(i)).data().is_some())
            .count();
        assert_eq!(survivors, 3);
    }

    #[test]
    fn clear_empties_table() {
        let tt = TranspositionTable::new(MIN_LOG2_SIZE);
        exact(&tt, 5 << 32, 4, 6);
        tt.clear();
        assert!(tt.probe(5 << 32).data().is_none());
    }

    #[test]
    fn generation_wraps_past_zero() {
        let tt = TranspositionTable::new(MIN_LOG2_SIZE);
        for _ in 0..300 {
            tt.increment_generation();
        }
        // Date 0 marks empty entries and is never a live generation.
        assert_ne!(tt.date.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn concurrent_probe_store() {
        use std::sync::Arc;

        let tt = Arc::new(TranspositionTable::new(MIN_LOG2_SIZE));
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let tt = tt.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..5000u64 {
                    let key = (t * 5000 + i).wrapping_mul(0x9E3779B97F4A7C15);
                    exact(&tt, key, (i % 64) as i32 - 32, (i % 20) as Depth);
                    if let Some(d) = tt.probe(key).data() {
                        assert!(d.lower <= d.upper);
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}
