use std::str::FromStr;

use crate::{
    error::ConfigError,
    hashing::{FoldingBlock, HashFunction},
    key::KeyHashing,
};

pub const DEFAULT_GROWTH_FACTOR: f64 = 1.5;
pub const DEFAULT_SHRINK_FACTOR: f64 = 0.5;
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;
pub const DEFAULT_MIN_LOAD_FACTOR: f64 = 0.25;

/// How a chaining bucket keeps its pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BucketStrategy {
    /// Pairs are appended, lookups scan linearly
    #[default]
    Append,
    /// Pairs are kept key-ordered, lookups binary search
    Sorted,
}

impl FromStr for BucketStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "append" => Ok(Self::Append),
            "sorted" => Ok(Self::Sorted),
            other => Err(ConfigError::UnknownStrategy {
                kind: "bucket",
                name: other.into(),
            }),
        }
    }
}

/// Probe sequence of an open addressing table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Probing {
    /// `(h(k) + i) mod m`
    #[default]
    Linear,
    /// `(h1(k) + i * h2(k)) mod m`
    DoubleHash,
}

impl FromStr for Probing {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "double" | "double_hash" => Ok(Self::DoubleHash),
            other => Err(ConfigError::UnknownStrategy {
                kind: "probing",
                name: other.into(),
            }),
        }
    }
}

/// Everything a table is configured with
///
/// Strategies are fixed once a table is built, the resize thresholds
/// and factors can be changed later through the table's setters,
/// which run the same checks as [`TableConfig::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct TableConfig {
    pub use_prime_capacity: bool,
    pub key_hashing: KeyHashing,
    pub hash_function: HashFunction,
    pub bucket_strategy: BucketStrategy,
    pub probing: Probing,
    pub auto_shrinking: bool,
    pub folding_block: FoldingBlock,
    pub growth_factor: f64,
    pub shrink_factor: f64,
    pub max_load_factor: f64,
    pub min_load_factor: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            use_prime_capacity: false,
            key_hashing: KeyHashing::SimpleSum,
            hash_function: HashFunction::Modulo,
            bucket_strategy: BucketStrategy::Append,
            probing: Probing::Linear,
            auto_shrinking: false,
            folding_block: FoldingBlock::Fixed,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            shrink_factor: DEFAULT_SHRINK_FACTOR,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            min_load_factor: DEFAULT_MIN_LOAD_FACTOR,
        }
    }
}

impl TableConfig {
    /// The tuned preset: prime capacities, positional keys,
    /// sorted buckets and capacity-derived folding
    pub fn optimized() -> Self {
        Self {
            use_prime_capacity: true,
            key_hashing: KeyHashing::Positional,
            bucket_strategy: BucketStrategy::Sorted,
            folding_block: FoldingBlock::Dynamic,
            ..Self::default()
        }
    }

    pub fn with_prime_capacity(mut self, yes: bool) -> Self {
        self.use_prime_capacity = yes;
        self
    }

    pub fn with_key_hashing(mut self, key_hashing: KeyHashing) -> Self {
        self.key_hashing = key_hashing;
        self
    }

    pub fn with_hash_function(mut self, hash_function: HashFunction) -> Self {
        self.hash_function = hash_function;
        self
    }

    pub fn with_bucket_strategy(mut self, bucket_strategy: BucketStrategy) -> Self {
        self.bucket_strategy = bucket_strategy;
        self
    }

    pub fn with_probing(mut self, probing: Probing) -> Self {
        self.probing = probing;
        self
    }

    pub fn with_auto_shrinking(mut self, yes: bool) -> Self {
        self.auto_shrinking = yes;
        self
    }

    pub fn with_folding_block(mut self, folding_block: FoldingBlock) -> Self {
        self.folding_block = folding_block;
        self
    }

    pub fn with_growth_factor(mut self, factor: f64) -> Self {
        self.growth_factor = factor;
        self
    }

    pub fn with_shrink_factor(mut self, factor: f64) -> Self {
        self.shrink_factor = factor;
        self
    }

    pub fn with_load_factors(mut self, min: f64, max: f64) -> Self {
        self.min_load_factor = min;
        self.max_load_factor = max;
        self
    }

    /// Checks the numeric invariants, never clamps
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_load_factors(self.min_load_factor, self.max_load_factor)?;
        check_growth_factor(self.growth_factor)?;
        check_shrink_factor(self.shrink_factor)
    }
}

pub(crate) fn check_load_factors(min: f64, max: f64) -> Result<(), ConfigError> {
    // written so that NaN fails too
    if min >= 0.0 && min < max && max <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidLoadFactors { min, max })
    }
}

pub(crate) fn check_growth_factor(factor: f64) -> Result<(), ConfigError> {
    if factor >= 1.5 && factor.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidGrowthFactor(factor))
    }
}

pub(crate) fn check_shrink_factor(factor: f64) -> Result<(), ConfigError> {
    if factor > 0.0 && factor <= 0.5 {
        Ok(())
    } else {
        Err(ConfigError::InvalidShrinkFactor(factor))
    }
}
