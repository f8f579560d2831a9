//! Constrained random sampler
//!
//! All randomness in a generation run flows through one `Sampler`, so a fixed
//! seed reproduces the same graph.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};

/// Attempts made by bounded-retry draws before giving up
pub const MAX_ATTEMPTS: usize = 10;

/// Seeded random source with the draws the generator needs
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded when a seed is given, entropy otherwise
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// True with probability `p`
    pub fn chance(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.rng.gen::<f64>() < p
    }

    /// Uniform integer in `low..=high`; `low` when the range is empty
    pub fn range(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    /// Uniform index into a collection of `len` items
    pub fn index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.rng.gen_range(0..len))
        }
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        self.index(items.len()).map(|i| &items[i])
    }

    /// Cumulative-weight categorical draw
    ///
    /// Walks the table in declaration order and returns the first entry whose
    /// running sum reaches the draw. Rounding slack falls to the last entry.
    pub fn weighted<T: Copy, const N: usize>(&mut self, table: &[(T, f64); N]) -> T {
        let total: f64 = table.iter().map(|(_, w)| w).sum();
        let r = self.rng.gen::<f64>() * total;
        let mut running = 0.0;
        for (value, weight) in table {
            running += weight;
            if running >= r {
                return *value;
            }
        }
        table[N - 1].0
    }

    /// Bounded-retry draw of an index other than `exclude` that `accept` allows
    ///
    /// Gives up after `MAX_ATTEMPTS` draws and returns `None`; callers count
    /// that as a skip rather than an error.
    pub fn distinct_partner<F>(&mut self, len: usize, exclude: usize, mut accept: F) -> Option<usize>
    where
        F: FnMut(usize) -> bool,
    {
        if len == 0 {
            return None;
        }
        for _ in 0..MAX_ATTEMPTS {
            let candidate = self.rng.gen_range(0..len);
            if candidate != exclude && accept(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Up to `amount` distinct indices below `len`, never `exclude`
    pub fn sample_distinct(&mut self, len: usize, amount: usize, exclude: Option<usize>) -> Vec<usize> {
        let pool = match exclude {
            Some(e) if e < len => len - 1,
            _ => len,
        };
        let amount = amount.min(pool);
        if amount == 0 {
            return Vec::new();
        }
        index::sample(&mut self.rng, pool, amount)
            .into_iter()
            .map(|i| match exclude {
                Some(e) if e < len && i >= e => i + 1,
                _ => i,
            })
            .collect()
    }

    /// Uniform instant in `[start, end]`; `start` when the window is empty
    pub fn datetime_between(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> DateTime<Utc> {
        let span = (end - start).num_milliseconds();
        if span <= 0 {
            return start;
        }
        start + Duration::milliseconds(self.rng.gen_range(0..=span))
    }
}
