//! Separate chaining: every bucket is a vector of pairs.

use std::mem;

use log::{debug, trace};

use crate::{
    config::{BucketStrategy, TableConfig},
    error::{ConfigError, TableError},
    key::Key,
    metrics::Operation,
    table::{HashTable, Outcome, TableCore},
};

/// Where a key is, or would go, inside its bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Location {
    bucket: usize,
    /// `Ok(position)` when present, otherwise `Err(insertion point)`
    position: Result<usize, usize>,
    steps: u64,
}

#[derive(Debug)]
pub struct ChainedTable<V> {
    core: TableCore,
    buckets: Vec<Vec<(Key, V)>>,
}

impl<V> ChainedTable<V> {
    /// Creates a table with `capacity` buckets, rounded up to a prime
    /// when the config asks for prime capacities
    pub fn new(capacity: usize, config: TableConfig) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        config.validate()?;

        let mut core = TableCore::new(config, 0);
        let capacity = core.fit_capacity(capacity, false);
        core.reset_storage(capacity);

        Ok(Self {
            core,
            buckets: empty_buckets(capacity),
        })
    }

    /// Shorthand for `Self::new(capacity, TableConfig::default())`
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        Self::new(capacity, TableConfig::default())
    }

    pub fn buckets(&self) -> &[Vec<(Key, V)>] {
        &self.buckets
    }

    // [private]

    fn locate(&self, key: &Key) -> Location {
        let hashed = self.core.hash(key);
        let bucket = &self.buckets[hashed.index];

        let (position, search_steps) = match self.core.config.bucket_strategy {
            BucketStrategy::Sorted => binary_search(bucket, key),
            BucketStrategy::Append => linear_search(bucket, key),
        };

        Location {
            bucket: hashed.index,
            position,
            steps: hashed.steps + search_steps,
        }
    }

    /// Inserts without metering or resizing, used by inserts and rehashes
    fn place(&mut self, key: Key, value: V) -> Outcome<Option<V>> {
        let loc = self.locate(&key);
        let bucket = &mut self.buckets[loc.bucket];

        let point = match loc.position {
            Ok(pos) => {
                let old = mem::replace(&mut bucket[pos].1, value);
                return Outcome {
                    slot: Some(loc.bucket),
                    steps: loc.steps + 1,
                    result: Some(old),
                };
            }
            Err(point) => point,
        };

        self.core.stats[loc.bucket].added(&key);
        let insert_steps = match self.core.config.bucket_strategy {
            BucketStrategy::Sorted => {
                bucket.insert(point, (key, value));
                // every pair after the insertion point moved
                (bucket.len() - point) as u64
            }
            BucketStrategy::Append => {
                bucket.push((key, value));
                1
            }
        };
        self.core.size += 1;

        Outcome {
            slot: Some(loc.bucket),
            steps: loc.steps + insert_steps,
            result: None,
        }
    }

    fn rehash(&mut self, new_capacity: usize) -> u64 {
        let old_capacity = self.core.capacity();
        let target = self.core.fit_capacity(new_capacity, false);

        let old = mem::replace(&mut self.buckets, empty_buckets(target));
        self.core.reset_storage(target);

        // allocating buckets and stats
        let mut steps = 2 * target as u64;
        for bucket in old {
            steps += 1;
            for (key, value) in bucket {
                steps += self.place(key, value).steps;
            }
        }

        debug!(
            target: "resize",
            "chaining: {old_capacity} -> {target} buckets, {} entries, {steps} steps",
            self.core.size
        );
        steps
    }

    /// Metered resize, returns the steps it took
    fn resize_recorded(&mut self, new_capacity: usize) -> u64 {
        let sample = self.core.meter.start();
        let steps = self.rehash(new_capacity);
        self.core.record(Operation::Resize, sample, None, steps);
        steps
    }
}

impl<V> HashTable<V> for ChainedTable<V> {
    fn kind(&self) -> &'static str {
        "chaining"
    }

    fn core(&self) -> &TableCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TableCore {
        &mut self.core
    }

    fn try_insert(&mut self, key: Key, value: V) -> Result<Option<V>, TableError> {
        let sample = self.core.meter.start();

        let mut steps = 0;
        if self.core.needs_grow() {
            steps += self.resize_recorded(self.core.grow_target()?);
        }

        let out = self.place(key, value);
        self.core
            .record(Operation::Insert, sample, out.slot, steps + out.steps);
        Ok(out.result)
    }

    fn search(&mut self, key: &Key) -> Option<&V> {
        let sample = self.core.meter.start();
        let loc = self.locate(key);
        self.core
            .record(Operation::Search, sample, Some(loc.bucket), loc.steps);

        let pos = loc.position.ok()?;
        Some(&self.buckets[loc.bucket][pos].1)
    }

    fn remove(&mut self, key: &Key) -> bool {
        let sample = self.core.meter.start();
        let loc = self.locate(key);

        let Ok(pos) = loc.position else {
            self.core
                .record(Operation::Remove, sample, Some(loc.bucket), loc.steps);
            return false;
        };

        let bucket = &mut self.buckets[loc.bucket];
        let len_before = bucket.len();
        let (removed, _) = bucket.remove(pos);
        // every pair after the removed one moved back
        let mut steps = loc.steps + (len_before - 1 - pos) as u64;
        self.core.size -= 1;
        self.core.stats[loc.bucket].removed(&removed, bucket.iter().map(|(k, _)| k));

        let mut slot = Some(loc.bucket);
        if self.core.needs_shrink() {
            let target = self.core.fit_capacity(self.core.shrink_target(), false);
            if target < self.core.capacity() {
                steps += self.resize_recorded(target);
                // the old bucket index means nothing after a rehash
                let hashed = self.core.hash(&removed);
                steps += hashed.steps;
                slot = Some(hashed.index);
            } else {
                trace!(target: "resize", "shrink target {target} is not smaller, skipping");
            }
        }

        self.core.record(Operation::Remove, sample, slot, steps);
        true
    }

    fn resize(&mut self, new_capacity: usize) {
        self.resize_recorded(new_capacity);
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&Key, &V)> + '_> {
        Box::new(
            self.buckets
                .iter()
                .flat_map(|bucket| bucket.iter().map(|(k, v)| (k, v))),
        )
    }
}

fn empty_buckets<V>(capacity: usize) -> Vec<Vec<(Key, V)>> {
    (0..capacity).map(|_| Vec::new()).collect()
}

/// One step per probed pair
fn binary_search<V>(bucket: &[(Key, V)], key: &Key) -> (Result<usize, usize>, u64) {
    let mut steps = 0;
    let (mut low, mut high) = (0, bucket.len());

    while low < high {
        steps += 1;
        let mid = low + (high - low) / 2;
        match bucket[mid].0.cmp(key) {
            std::cmp::Ordering::Equal => return (Ok(mid), steps),
            std::cmp::Ordering::Less => low = mid + 1,
            std::cmp::Ordering::Greater => high = mid,
        }
    }

    (Err(low), steps)
}

/// One step per compared pair
fn linear_search<V>(bucket: &[(Key, V)], key: &Key) -> (Result<usize, usize>, u64) {
    match bucket.iter().position(|(k, _)| k == key) {
        Some(i) => (Ok(i), i as u64 + 1),
        None => (Err(bucket.len()), bucket.len() as u64),
    }
}
