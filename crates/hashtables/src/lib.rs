//! Instrumented hash tables with interchangeable collision strategies.
//!
//! Two storage layouts share the [`HashTable`] contract:
//! - [`ChainedTable`]: separate chaining, buckets either appended to
//!   (linear search) or kept sorted (binary search).
//! - [`OpenAddressingTable`]: one slot array with tombstones, probed
//!   linearly or by double hashing.
//!
//! Both map keys through a [`KeyHashing`] normalization and a
//! [`HashFunction`] (modulo, digit folding, or a multiplicative constant),
//! grow and optionally shrink by a shared policy, and meter every
//! operation: algorithmic steps, wall and CPU time, heap and resident
//! memory end up in [`Metrics`], globally and per slot.
//!
//! Tables are single-threaded; wrap one in a `Mutex` to share it.

pub mod chaining;
pub mod config;
pub mod error;
pub mod hashing;
pub mod instrument;
pub mod key;
pub mod metrics;
pub mod open_addressing;
pub mod prime;
pub mod stats;
pub mod table;

pub use chaining::ChainedTable;
pub use config::{BucketStrategy, Probing, TableConfig};
pub use error::{ConfigError, TableError};
pub use hashing::{FoldingBlock, HashFunction, Multiplier};
pub use key::{Key, KeyHashing};
pub use metrics::{Metrics, Observation, Operation, Summary, Variable};
pub use open_addressing::OpenAddressingTable;
pub use stats::{SlotStats, StructuralReport};
pub use table::{HashTable, TableInfo};

/// Which storage layout to build with [`build`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    Chaining,
    Open,
}

impl std::str::FromStr for Collision {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chaining" | "separate_chaining" => Ok(Self::Chaining),
            "open" | "open_addressing" => Ok(Self::Open),
            other => Err(ConfigError::UnknownStrategy {
                kind: "collision",
                name: other.into(),
            }),
        }
    }
}

/// Builds a table behind the shared trait, picking the layout at runtime
pub fn build<V: 'static>(
    collision: Collision,
    capacity: usize,
    config: TableConfig,
) -> Result<Box<dyn HashTable<V>>, ConfigError> {
    Ok(match collision {
        Collision::Chaining => Box::new(ChainedTable::new(capacity, config)?),
        Collision::Open => Box::new(OpenAddressingTable::new(capacity, config)?),
    })
}
