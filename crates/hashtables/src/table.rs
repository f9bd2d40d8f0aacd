//! The contract shared by every collision strategy, and the state and
//! resize policy they have in common.

use log::trace;

use crate::{
    config::{self, TableConfig},
    error::{ConfigError, TableError},
    hashing::Hashed,
    instrument::{Meter, Sample},
    key::Key,
    metrics::{Metrics, Operation, Summary, Variable},
    prime,
    stats::{SlotStats, StructuralReport},
};

/// Largest capacity a table grows to, bounded by the per-slot bookkeeping
pub const MAX_CAPACITY: usize = isize::MAX as usize / std::mem::size_of::<SlotStats>();

/// What a strategy-specific operation hands back to the metering wrapper
#[derive(Debug)]
pub(crate) struct Outcome<T> {
    /// Bucket or slot the operation settled on, if any
    pub(crate) slot: Option<usize>,
    pub(crate) steps: u64,
    pub(crate) result: T,
}

/// State every table carries regardless of its storage layout
#[derive(Debug)]
pub struct TableCore {
    pub(crate) config: TableConfig,
    pub(crate) size: usize,
    pub(crate) stats: Vec<SlotStats>,
    pub(crate) metrics: Metrics,
    pub(crate) meter: Meter,
}

impl TableCore {
    pub(crate) fn new(config: TableConfig, capacity: usize) -> Self {
        Self {
            config,
            size: 0,
            stats: SlotStats::fresh(capacity),
            metrics: Metrics::new(),
            meter: Meter::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.stats.len()
    }

    pub fn load_factor(&self) -> f64 {
        if self.capacity() == 0 {
            0.0
        } else {
            self.size as f64 / self.capacity() as f64
        }
    }

    /// Normalizes `key` and maps it with the configured hash function
    pub(crate) fn hash(&self, key: &Key) -> Hashed {
        let nk = self.config.key_hashing.normalize(key);
        let h = self.config.hash_function.index(
            nk.value,
            self.capacity(),
            self.config.folding_block,
        );

        Hashed {
            index: h.index,
            steps: nk.steps + h.steps,
        }
    }

    /// Rounds a requested capacity up to a prime when primes are required
    pub(crate) fn fit_capacity(&self, requested: usize, force_prime: bool) -> usize {
        let requested = requested.max(1);
        if force_prime || self.config.use_prime_capacity {
            prime::prime_at_or_above(requested)
        } else {
            requested
        }
    }

    pub(crate) fn needs_grow(&self) -> bool {
        self.load_factor() >= self.config.max_load_factor
    }

    pub(crate) fn needs_shrink(&self) -> bool {
        self.config.auto_shrinking
            && self.capacity() > 1
            && self.load_factor() < self.config.min_load_factor
    }

    /// Grown capacity, before any prime rounding
    pub(crate) fn grow_target(&self) -> Result<usize, TableError> {
        let target = (self.capacity() as f64 * self.config.growth_factor).ceil();
        // written so that NaN fails too
        if target <= MAX_CAPACITY as f64 {
            Ok(target as usize)
        } else {
            Err(TableError::CapacityOverflow {
                capacity: self.capacity(),
            })
        }
    }

    /// Shrunk capacity, before any prime rounding
    ///
    /// Never below 1, and never so small that the current entries would
    /// exceed `max_load_factor` afterwards.
    pub(crate) fn shrink_target(&self) -> usize {
        let shrunk = (self.capacity() as f64 * self.config.shrink_factor).ceil() as usize;
        let fits = (self.size as f64 / self.config.max_load_factor).ceil() as usize;
        shrunk.max(fits).max(1)
    }

    /// Drops all per-slot bookkeeping ahead of a rehash
    pub(crate) fn reset_storage(&mut self, capacity: usize) {
        self.stats = SlotStats::fresh(capacity);
        self.size = 0;
    }

    /// Closes `sample` and files the observation globally and,
    /// when one was touched, under the slot
    pub(crate) fn record(&mut self, op: Operation, sample: Sample, slot: Option<usize>, steps: u64) {
        let obs = self.meter.finish(sample, steps);
        self.metrics.record(op, obs);
        if let Some(stats) = slot.and_then(|i| self.stats.get_mut(i)) {
            stats.metrics.record(op, obs);
        }
    }
}

/// A snapshot of a table's configuration, shape and metric summaries
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub kind: &'static str,
    pub config: TableConfig,
    pub report: StructuralReport,
    pub slot_lengths: Vec<usize>,
    pub slot_min_keys: Vec<Option<Key>>,
    pub slot_max_keys: Vec<Option<Key>>,
    pub metrics: Vec<(Operation, Variable, Summary)>,
}

/// Operations every collision strategy provides
///
/// Every metered operation (`insert`, `search`, `remove`, `resize`)
/// appends one observation to [`HashTable::metrics`] and, when it
/// touched a bucket or slot, to that slot's own metrics.
pub trait HashTable<V> {
    /// Short name of the strategy, e.g. `"chaining"`
    fn kind(&self) -> &'static str;

    /// Shared state backing the provided methods
    fn core(&self) -> &TableCore;

    fn core_mut(&mut self) -> &mut TableCore;

    /// Inserts or updates `key`, returning the previous value
    ///
    /// Grows the table first when the load factor has reached its maximum.
    fn try_insert(&mut self, key: Key, value: V) -> Result<Option<V>, TableError>;

    fn search(&mut self, key: &Key) -> Option<&V>;

    /// Returns whether `key` was present
    ///
    /// May shrink the table afterwards when auto-shrinking is on.
    fn remove(&mut self, key: &Key) -> bool;

    /// Rehashes every entry into `new_capacity` slots, rounded as configured
    fn resize(&mut self, new_capacity: usize);

    /// Every present pair, in storage order
    fn iter(&self) -> Box<dyn Iterator<Item = (&Key, &V)> + '_>;

    /// Like [`HashTable::try_insert`]
    ///
    /// # Panics
    ///
    /// Panics if the table ran out of slots, which growing before every
    /// insert prevents as long as `max_load_factor <= 1.0` holds, or if
    /// the growth factor asks for more slots than can be allocated
    fn insert(&mut self, key: Key, value: V) -> Option<V> {
        match self.try_insert(key, value) {
            Ok(old) => old,
            Err(e) => panic!("{e}"),
        }
    }

    fn contains_key(&mut self, key: &Key) -> bool {
        self.search(key).is_some()
    }

    /// Resizes down to `ceil(len / max_load_factor)` if that is smaller
    fn shrink_to_fit(&mut self) {
        let core = self.core();
        let ideal = if core.size == 0 {
            1
        } else {
            (core.size as f64 / core.config.max_load_factor).ceil() as usize
        };

        if ideal < core.capacity() {
            trace!(target: "resize", "shrink to fit: {} -> {ideal}", core.capacity());
            self.resize(ideal);
        }
    }

    fn len(&self) -> usize {
        self.core().size
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize {
        self.core().capacity()
    }

    fn load_factor(&self) -> f64 {
        self.core().load_factor()
    }

    fn config(&self) -> &TableConfig {
        &self.core().config
    }

    fn metrics(&self) -> &Metrics {
        &self.core().metrics
    }

    /// Forgets every global observation, slot metrics are kept
    fn reset_metrics(&mut self) {
        self.core_mut().metrics.clear();
    }

    fn slot_stats(&self) -> &[SlotStats] {
        &self.core().stats
    }

    fn structural_report(&self) -> StructuralReport {
        let core = self.core();
        StructuralReport::from_stats(&core.stats, core.size)
    }

    fn info(&self) -> TableInfo {
        let stats = self.slot_stats();
        TableInfo {
            kind: self.kind(),
            config: self.config().clone(),
            report: self.structural_report(),
            slot_lengths: stats.iter().map(|s| s.length).collect(),
            slot_min_keys: stats.iter().map(|s| s.min_key.clone()).collect(),
            slot_max_keys: stats.iter().map(|s| s.max_key.clone()).collect(),
            metrics: self.metrics().summaries(),
        }
    }

    fn set_max_load_factor(&mut self, value: f64) -> Result<(), ConfigError> {
        let config = &mut self.core_mut().config;
        config::check_load_factors(config.min_load_factor, value)?;
        config.max_load_factor = value;
        Ok(())
    }

    fn set_min_load_factor(&mut self, value: f64) -> Result<(), ConfigError> {
        let config = &mut self.core_mut().config;
        config::check_load_factors(value, config.max_load_factor)?;
        config.min_load_factor = value;
        Ok(())
    }

    fn set_growth_factor(&mut self, value: f64) -> Result<(), ConfigError> {
        config::check_growth_factor(value)?;
        self.core_mut().config.growth_factor = value;
        Ok(())
    }

    fn set_shrink_factor(&mut self, value: f64) -> Result<(), ConfigError> {
        config::check_shrink_factor(value)?;
        self.core_mut().config.shrink_factor = value;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn targets() {
        let core = TableCore::new(TableConfig::default(), 10);
        assert_eq!(core.grow_target(), Ok(15));
        assert_eq!(core.shrink_target(), 5);

        let tiny = TableCore::new(TableConfig::default().with_shrink_factor(0.1), 1);
        assert_eq!(tiny.shrink_target(), 1);
    }

    #[test]
    fn shrink_target_keeps_entries_under_max_load() {
        let config = TableConfig::default()
            .with_load_factors(0.9, 1.0)
            .with_shrink_factor(0.1);
        let mut core = TableCore::new(config, 100);
        core.size = 89;
        assert_eq!(core.shrink_target(), 89);

        core.size = 5;
        assert_eq!(core.shrink_target(), 10);
    }

    #[test]
    fn huge_growth_factor_overflows() {
        let config = TableConfig::default().with_growth_factor(1e300);
        let core = TableCore::new(config, 4);
        assert_eq!(
            core.grow_target(),
            Err(TableError::CapacityOverflow { capacity: 4 })
        );
    }

    #[test]
    fn prime_fitting() {
        let plain = TableCore::new(TableConfig::default(), 10);
        assert_eq!(plain.fit_capacity(10, false), 10);
        assert_eq!(plain.fit_capacity(0, false), 1);
        assert_eq!(plain.fit_capacity(10, true), 11);

        let primed = TableCore::new(TableConfig::default().with_prime_capacity(true), 11);
        assert_eq!(primed.fit_capacity(15, false), 17);
        // shrinking rounds up as well
        assert_eq!(primed.fit_capacity(6, false), 7);
    }

    #[test]
    fn thresholds() {
        let mut core = TableCore::new(TableConfig::default().with_auto_shrinking(true), 4);
        assert!(!core.needs_grow());
        assert!(core.needs_shrink());

        core.size = 3;
        assert!(core.needs_grow());
        assert!(!core.needs_shrink());
    }
}
