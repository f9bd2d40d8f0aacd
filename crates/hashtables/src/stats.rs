use crate::{key::Key, metrics::Metrics};

/// Bookkeeping for one bucket (chaining) or slot (open addressing)
///
/// Rebuilt from scratch whenever the table resizes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotStats {
    pub length: usize,
    pub min_key: Option<Key>,
    pub max_key: Option<Key>,
    pub metrics: Metrics,
}

impl SlotStats {
    pub(crate) fn fresh(capacity: usize) -> Vec<SlotStats> {
        (0..capacity).map(|_| SlotStats::default()).collect()
    }

    pub(crate) fn added(&mut self, key: &Key) {
        self.length += 1;
        if self.min_key.as_ref().is_none_or(|min| key < min) {
            self.min_key = Some(key.clone());
        }
        if self.max_key.as_ref().is_none_or(|max| key > max) {
            self.max_key = Some(key.clone());
        }
    }

    /// Accounts for `key` having left the slot, `remaining` are the keys
    /// still there and are only scanned when `key` was an extreme
    pub(crate) fn removed<'a, I>(&mut self, key: &Key, remaining: I)
    where
        I: IntoIterator<Item = &'a Key>,
    {
        self.length -= 1;
        if self.length == 0 {
            self.min_key = None;
            self.max_key = None;
            return;
        }

        let was_min = self.min_key.as_ref() == Some(key);
        let was_max = self.max_key.as_ref() == Some(key);
        if !was_min && !was_max {
            return;
        }

        let mut min: Option<&Key> = None;
        let mut max: Option<&Key> = None;
        for k in remaining {
            if min.is_none_or(|m| k < m) {
                min = Some(k);
            }
            if max.is_none_or(|m| k > m) {
                max = Some(k);
            }
        }
        if was_min {
            self.min_key = min.cloned();
        }
        if was_max {
            self.max_key = max.cloned();
        }
    }
}

/// Shape of the table at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralReport {
    pub capacity: usize,
    pub size: usize,
    pub load_factor: f64,
    /// Shortest bucket, empty ones included
    pub min_length: usize,
    pub max_length: usize,
    /// Equals the load factor
    pub avg_length: f64,
    /// Population variance of the bucket lengths
    pub variance: f64,
    pub stdev: f64,
    pub count_filled: usize,
    pub count_empty: usize,
    /// Shortest non-empty bucket, 0 when the table is empty
    pub min_filled: usize,
    /// Mean length over non-empty buckets only
    pub avg_filled: f64,
    pub min_key: Option<Key>,
    pub max_key: Option<Key>,
}

impl StructuralReport {
    /// Builds the report from per-bucket lengths
    ///
    /// Tombstones must already be reported as length 0.
    pub(crate) fn from_stats(stats: &[SlotStats], size: usize) -> Self {
        let capacity = stats.len();
        let avg_length = if capacity > 0 {
            size as f64 / capacity as f64
        } else {
            0.0
        };

        let mut min_length = usize::MAX;
        let mut max_length = 0;
        let mut min_filled = usize::MAX;
        let mut count_filled = 0;
        let mut ss = 0f64;
        let mut min_key: Option<&Key> = None;
        let mut max_key: Option<&Key> = None;

        for s in stats {
            min_length = min_length.min(s.length);
            max_length = max_length.max(s.length);
            if s.length > 0 {
                count_filled += 1;
                min_filled = min_filled.min(s.length);
            }
            let d = s.length as f64 - avg_length;
            ss += d * d;

            if let Some(k) = s.min_key.as_ref() {
                if min_key.is_none_or(|m| k < m) {
                    min_key = Some(k);
                }
            }
            if let Some(k) = s.max_key.as_ref() {
                if max_key.is_none_or(|m| k > m) {
                    max_key = Some(k);
                }
            }
        }

        let variance = if capacity > 0 { ss / capacity as f64 } else { 0.0 };

        Self {
            capacity,
            size,
            load_factor: avg_length,
            min_length: if capacity > 0 { min_length } else { 0 },
            max_length,
            avg_length,
            variance,
            stdev: variance.sqrt(),
            count_filled,
            count_empty: capacity - count_filled,
            min_filled: if count_filled > 0 { min_filled } else { 0 },
            avg_filled: if count_filled > 0 {
                size as f64 / count_filled as f64
            } else {
                0.0
            },
            min_key: min_key.cloned(),
            max_key: max_key.cloned(),
        }
    }

    /// Variance with `dof` degrees of freedom removed, `dof = 1` gives the
    /// sample variance
    pub fn variance_with_dof(&self, dof: usize) -> f64 {
        if self.capacity < 1 + dof {
            return 0.0;
        }
        self.variance * self.capacity as f64 / (self.capacity - dof) as f64
    }
}
