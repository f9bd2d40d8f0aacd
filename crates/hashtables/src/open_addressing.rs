//! Open addressing: one flat array of slots, deletions leave tombstones.

use std::mem;

use log::{debug, trace, warn};

use crate::{
    config::{Probing, TableConfig},
    error::{ConfigError, TableError},
    key::Key,
    metrics::Operation,
    prime,
    table::{HashTable, Outcome, TableCore},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Slot<V> {
    Empty,
    /// Was occupied, probe sequences continue past it
    Tombstone,
    Occupied(Key, V),
}

/// The probe sequence of one key
#[derive(Debug, Clone, Copy)]
struct ProbeSeq {
    start: usize,
    stride: usize,
    capacity: usize,
    /// Steps charged for every attempt
    cost: u64,
}

impl ProbeSeq {
    fn at(&self, attempt: usize) -> usize {
        let offset = attempt as u128 * self.stride as u128;
        ((self.start as u128 + offset) % self.capacity as u128) as usize
    }
}

/// Where a probe for a key stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Found(usize),
    /// Hit an empty slot, the key is absent
    Vacant(usize),
    /// Went through every slot
    Exhausted,
}

#[derive(Debug)]
pub struct OpenAddressingTable<V> {
    core: TableCore,
    slots: Vec<Slot<V>>,
    /// Largest prime below the capacity, bounds the double hashing stride
    secondary_prime: Option<usize>,
}

impl<V> OpenAddressingTable<V> {
    /// Creates a table with `capacity` slots
    ///
    /// Double hashing always rounds the capacity up to a prime so every
    /// stride visits every slot, linear probing only does when configured to.
    pub fn new(capacity: usize, config: TableConfig) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        config.validate()?;

        let mut table = Self {
            core: TableCore::new(config, 0),
            slots: Vec::new(),
            secondary_prime: None,
        };
        let capacity = table.fit_capacity(capacity);
        table.core.reset_storage(capacity);
        table.slots = empty_slots(capacity);
        table.secondary_prime = prime::previous_prime(capacity);

        Ok(table)
    }

    /// Linear probing with the default config
    pub fn linear(capacity: usize) -> Result<Self, ConfigError> {
        Self::new(capacity, TableConfig::default().with_probing(Probing::Linear))
    }

    /// Double hashing with the default config
    pub fn double_hashing(capacity: usize) -> Result<Self, ConfigError> {
        Self::new(capacity, TableConfig::default().with_probing(Probing::DoubleHash))
    }

    pub fn slots(&self) -> &[Slot<V>] {
        &self.slots
    }

    pub fn tombstones(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Tombstone))
            .count()
    }

    // [private]

    fn fit_capacity(&self, requested: usize) -> usize {
        let force_prime = self.core.config.probing == Probing::DoubleHash;
        self.core.fit_capacity(requested, force_prime)
    }

    fn probe_seq(&self, key: &Key) -> ProbeSeq {
        let primary = self.core.hash(key);
        let capacity = self.core.capacity();

        match self.core.config.probing {
            Probing::Linear => ProbeSeq {
                start: primary.index,
                stride: 1,
                capacity,
                // add, mod
                cost: primary.steps + 2,
            },
            Probing::DoubleHash => {
                let nk = self.core.config.key_hashing.normalize(key);
                let stride = match self.secondary_prime {
                    Some(p) => 1 + (nk.value % p as u64) as usize,
                    None => 1,
                };
                ProbeSeq {
                    start: primary.index,
                    stride,
                    capacity,
                    // secondary: mod, add; then multiply, add, mod
                    cost: primary.steps + nk.steps + 2 + 3,
                }
            }
        }
    }

    /// Follows the probe sequence of `key` until it is found,
    /// an empty slot proves it absent, or every slot was seen
    fn find(&self, key: &Key) -> (Probe, u64) {
        let seq = self.probe_seq(key);
        let mut steps = 0;

        for attempt in 0..seq.capacity {
            let i = seq.at(attempt);
            steps += seq.cost;
            match &self.slots[i] {
                Slot::Empty => return (Probe::Vacant(i), steps),
                Slot::Occupied(k, _) if k == key => return (Probe::Found(i), steps),
                Slot::Occupied(..) | Slot::Tombstone => {}
            }
        }

        (Probe::Exhausted, steps)
    }

    /// Inserts without metering or resizing
    ///
    /// A match anywhere along the probe path is updated in place; only
    /// once the key is known to be absent does the first tombstone seen
    /// get reused.
    fn place(&mut self, key: Key, value: V) -> Result<Outcome<Option<V>>, TableError> {
        let seq = self.probe_seq(&key);
        let mut steps = 0;
        let mut first_tombstone = None;
        let mut vacant = None;

        for attempt in 0..seq.capacity {
            let i = seq.at(attempt);
            steps += seq.cost;
            match &mut self.slots[i] {
                Slot::Occupied(k, v) if *k == key => {
                    let old = mem::replace(v, value);
                    return Ok(Outcome {
                        slot: Some(i),
                        steps,
                        result: Some(old),
                    });
                }
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(i);
                    }
                }
                Slot::Empty => {
                    vacant = Some(i);
                    break;
                }
                Slot::Occupied(..) => {}
            }
        }

        let Some(i) = first_tombstone.or(vacant) else {
            trace!(target: "probe", "no room for {key} in {} slots", seq.capacity);
            return Err(TableError::Full {
                capacity: seq.capacity,
            });
        };

        self.core.stats[i].added(&key);
        self.slots[i] = Slot::Occupied(key, value);
        self.core.size += 1;

        Ok(Outcome {
            slot: Some(i),
            steps,
            result: None,
        })
    }

    fn rehash(&mut self, new_capacity: usize) -> u64 {
        let old_capacity = self.core.capacity();
        let mut requested = new_capacity;
        if requested < self.core.size {
            warn!(
                "resize to {requested} slots cannot hold {} entries, using {} instead",
                self.core.size, self.core.size
            );
            requested = self.core.size;
        }
        let target = self.fit_capacity(requested);

        let old = mem::replace(&mut self.slots, empty_slots(target));
        self.core.reset_storage(target);
        self.secondary_prime = prime::previous_prime(target);

        // allocating slots and stats
        let mut steps = 2 * target as u64;
        for slot in old {
            if let Slot::Occupied(key, value) = slot {
                match self.place(key, value) {
                    Ok(out) => steps += out.steps,
                    // every stride is coprime with a prime capacity,
                    // and the capacity is at least the entry count
                    Err(e) => unreachable!("rehash into {target} slots failed: {e}"),
                }
            }
        }

        debug!(
            target: "resize",
            "{}: {old_capacity} -> {target} slots, {} entries, {steps} steps",
            self.kind(),
            self.core.size
        );
        steps
    }

    fn resize_recorded(&mut self, new_capacity: usize) -> u64 {
        let sample = self.core.meter.start();
        let steps = self.rehash(new_capacity);
        self.core.record(Operation::Resize, sample, None, steps);
        steps
    }
}

impl<V> HashTable<V> for OpenAddressingTable<V> {
    fn kind(&self) -> &'static str {
        match self.core.config.probing {
            Probing::Linear => "linear_probing",
            Probing::DoubleHash => "double_hashing",
        }
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

        match self.place(key, value) {
            Ok(out) => {
                self.core
                    .record(Operation::Insert, sample, out.slot, steps + out.steps);
                Ok(out.result)
            }
            Err(e) => {
                self.core.record(Operation::Insert, sample, None, steps);
                Err(e)
            }
        }
    }

    fn search(&mut self, key: &Key) -> Option<&V> {
        let sample = self.core.meter.start();
        let (probe, steps) = self.find(key);

        let slot = match probe {
            Probe::Found(i) | Probe::Vacant(i) => Some(i),
            Probe::Exhausted => None,
        };
        self.core.record(Operation::Search, sample, slot, steps);

        let Probe::Found(i) = probe else {
            return None;
        };
        match &self.slots[i] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        }
    }

    fn remove(&mut self, key: &Key) -> bool {
        let sample = self.core.meter.start();
        let (probe, mut steps) = self.find(key);

        let i = match probe {
            Probe::Found(i) => i,
            Probe::Vacant(i) => {
                self.core.record(Operation::Remove, sample, Some(i), steps);
                return false;
            }
            Probe::Exhausted => {
                self.core.record(Operation::Remove, sample, None, steps);
                return false;
            }
        };

        let removed = match mem::replace(&mut self.slots[i], Slot::Tombstone) {
            Slot::Occupied(k, _) => k,
            _ => unreachable!("probe reported slot {i} as occupied"),
        };
        self.core.size -= 1;
        self.core.stats[i].removed(&removed, std::iter::empty::<&Key>());

        let mut slot = Some(i);
        if self.core.needs_shrink() {
            let target = self.fit_capacity(self.core.shrink_target());
            if target < self.core.capacity() {
                steps += self.resize_recorded(target);
                let seq = self.probe_seq(&removed);
                steps += seq.cost;
                slot = Some(seq.at(0));
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
        Box::new(self.slots.iter().filter_map(|slot| match slot {
            Slot::Occupied(k, v) => Some((k, v)),
            _ => None,
        }))
    }
}

fn empty_slots<V>(capacity: usize) -> Vec<Slot<V>> {
    (0..capacity).map(|_| Slot::Empty).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::key::KeyHashing;

    fn identity(probing: Probing) -> TableConfig {
        TableConfig::default()
            .with_key_hashing(KeyHashing::Identity)
            .with_probing(probing)
    }

    fn last_steps<V>(t: &OpenAddressingTable<V>, op: Operation) -> u64 {
        t.metrics().last(op).map(|o| o.steps).unwrap()
    }

    fn occupant<V>(t: &OpenAddressingTable<V>, i: usize) -> Option<&Key> {
        match &t.slots()[i] {
            Slot::Occupied(k, _) => Some(k),
            _ => None,
        }
    }

    #[test]
    fn linear_probing_clusters_collisions() {
        let mut t = OpenAddressingTable::new(7, identity(Probing::Linear)).unwrap();
        for k in [0, 7, 14, 21] {
            t.insert(k.into(), k);
        }

        for (slot, key) in [0, 7, 14, 21].into_iter().enumerate() {
            assert_eq!(occupant(&t, slot), Some(&Key::Int(key)));
        }

        // three occupants passed before the match, each probe costs mod + 2
        assert_eq!(t.search(&21.into()), Some(&21));
        assert_eq!(last_steps(&t, Operation::Search), 4 * 3);
    }

    #[test]
    fn double_hashing_spreads_collisions() {
        let mut t = OpenAddressingTable::new(11, identity(Probing::DoubleHash)).unwrap();
        assert_eq!(t.capacity(), 11);
        for k in [3, 14, 25] {
            t.insert(k.into(), ());
        }

        // h1 = 3 for all, h2 = 1 + k % 7 gives strides 4, 1, 5
        assert_eq!(occupant(&t, 3), Some(&Key::Int(3)));
        assert_eq!(occupant(&t, 4), Some(&Key::Int(14)));
        assert_eq!(occupant(&t, 8), Some(&Key::Int(25)));
        assert_eq!(t.structural_report().count_filled, 3);
    }

    #[test]
    fn double_hashing_forces_prime_capacity() {
        let t = OpenAddressingTable::<()>::double_hashing(10).unwrap();
        assert_eq!(t.capacity(), 11);

        let t = OpenAddressingTable::<()>::linear(10).unwrap();
        assert_eq!(t.capacity(), 10);
    }

    #[test]
    fn empty_search_is_one_probe() {
        let mut t = OpenAddressingTable::<()>::linear(16).unwrap();
        assert_eq!(t.search(&"abc".into()), None);
        // 3 characters + mod + 2
        assert_eq!(last_steps(&t, Operation::Search), 3 + 1 + 2);
    }

    #[test]
    fn remove_leaves_a_tombstone() {
        let mut t = OpenAddressingTable::new(7, identity(Probing::Linear)).unwrap();
        for k in [0, 7, 14] {
            t.insert(k.into(), k);
        }

        assert!(t.remove(&7.into()));
        assert_eq!(t.slots()[1], Slot::Tombstone);
        assert_eq!(t.tombstones(), 1);
        assert_eq!(t.len(), 2);

        // the tombstone does not cut the chain
        assert_eq!(t.search(&14.into()), Some(&14));
        assert_eq!(t.search(&7.into()), None);
        assert!(!t.remove(&7.into()));

        let r = t.structural_report();
        assert_eq!(r.count_filled, 2);
        assert_eq!(r.count_empty, 5);
    }

    #[test]
    fn tombstone_is_reused_for_new_keys() {
        let mut t = OpenAddressingTable::new(7, identity(Probing::Linear)).unwrap();
        for k in [0, 7, 14] {
            t.insert(k.into(), k);
        }
        t.remove(&7.into());

        t.insert(21.into(), 21);
        assert_eq!(occupant(&t, 1), Some(&Key::Int(21)));
        assert_eq!(t.tombstones(), 0);
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn match_past_a_tombstone_is_updated() {
        let mut t = OpenAddressingTable::new(7, identity(Probing::Linear)).unwrap();
        for k in [0, 7, 14] {
            t.insert(k.into(), k);
        }
        t.remove(&7.into());

        let old = t.insert(14.into(), 140);
        assert_eq!(old, Some(14));
        assert_eq!(t.len(), 2);
        // 14 was updated where it was, the tombstone stays
        assert_eq!(t.slots()[1], Slot::Tombstone);
        assert_eq!(t.search(&14.into()), Some(&140));
    }

    #[test]
    fn full_table_is_reported() {
        let config = identity(Probing::Linear).with_load_factors(0.25, 1.0);
        let mut t = OpenAddressingTable::new(3, config).unwrap();
        for k in 0..3 {
            t.insert(k.into(), k);
        }
        // the table is full now, the next insert grows first
        assert_eq!(t.try_insert(3.into(), 3), Ok(None));
        assert_eq!(t.capacity(), 5);

        // bypassing the grow check finds no room
        let mut full = OpenAddressingTable::new(2, identity(Probing::Linear)).unwrap();
        full.slots = vec![Slot::Occupied(0.into(), 0), Slot::Occupied(1.into(), 1)];
        full.core.size = 2;
        full.core.config.max_load_factor = f64::INFINITY;
        assert_eq!(
            full.try_insert(2.into(), 2),
            Err(TableError::Full { capacity: 2 })
        );
    }

    #[test]
    fn resize_keeps_everything() {
        let mut t = OpenAddressingTable::linear(8).unwrap();
        for i in 0..5i64 {
            t.insert(i.into(), i * 10);
        }
        t.remove(&2.into());

        t.resize(29);
        assert_eq!(t.capacity(), 29);
        assert_eq!(t.tombstones(), 0);
        assert_eq!(t.len(), 4);
        for i in [0i64, 1, 3, 4] {
            assert_eq!(t.search(&i.into()), Some(&(i * 10)));
        }

        // cannot go below the entry count
        t.resize(1);
        assert_eq!(t.capacity(), 4);
        assert_eq!(t.iter().count(), 4);
    }

    #[test]
    fn shrink_is_skipped_when_the_prime_is_not_smaller() {
        let config = identity(Probing::DoubleHash).with_auto_shrinking(true);
        let mut t = OpenAddressingTable::new(2, config).unwrap();
        t.insert(1.into(), ());
        assert!(t.remove(&1.into()));

        assert_eq!(t.capacity(), 2);
        assert_eq!(t.tombstones(), 1);
        assert_eq!(t.metrics().count(Operation::Resize), 0);
    }

    #[test]
    fn auto_shrink_never_overfills() {
        let config = identity(Probing::Linear)
            .with_auto_shrinking(true)
            .with_load_factors(0.9, 1.0)
            .with_shrink_factor(0.1);
        let mut t = OpenAddressingTable::new(100, config).unwrap();
        for i in 0..100i64 {
            t.insert(i.into(), i);
        }
        for i in 0..11i64 {
            assert!(t.remove(&i.into()));
        }

        assert_eq!(t.capacity(), 89);
        assert_eq!(t.tombstones(), 0);
        for i in 11..100i64 {
            assert_eq!(t.search(&i.into()), Some(&i));
        }
    }

    #[test]
    fn oversized_growth_is_an_error() {
        let config = identity(Probing::Linear).with_growth_factor(f64::MAX);
        let mut t = OpenAddressingTable::new(4, config).unwrap();
        for i in 0..3i64 {
            t.insert(i.into(), i);
        }
        assert_eq!(
            t.try_insert(3.into(), 3),
            Err(TableError::CapacityOverflow { capacity: 4 })
        );
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn grows_and_shrinks() {
        let config = TableConfig::default()
            .with_probing(Probing::DoubleHash)
            .with_auto_shrinking(true);
        let mut t = OpenAddressingTable::new(5, config).unwrap();
        for i in 0..100i64 {
            t.insert(format!("k{i}").into(), i);
        }
        assert!(t.capacity() > 100);
        assert!(prime::is_prime(t.capacity()));
        let peak = t.capacity();

        for i in 0..90i64 {
            assert!(t.remove(&format!("k{i}").into()));
        }
        assert!(t.capacity() < peak);
        for i in 90..100i64 {
            assert_eq!(t.search(&format!("k{i}").into()), Some(&i));
        }
    }
}
