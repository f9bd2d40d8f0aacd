use thiserror::Error;

/// Rejected table configuration, reported at construction or by a setter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Capacity must be at least 1")]
    ZeroCapacity,

    /// `min_load_factor < max_load_factor <= 1.0` and `min_load_factor >= 0.0` must hold
    #[error("Invalid load factor bounds, got min: {min} max: {max}, expected 0.0 <= min < max <= 1.0")]
    InvalidLoadFactors { min: f64, max: f64 },

    #[error("Growth factor must be at least 1.5, got: {0}")]
    InvalidGrowthFactor(f64),

    #[error("Shrink factor must be in (0, 0.5], got: {0}")]
    InvalidShrinkFactor(f64),

    /// A strategy was named by a string that matches none of its variants
    #[error("Unknown {kind} strategy: {name:?}")]
    UnknownStrategy { kind: &'static str, name: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A full probe cycle found neither the key, an empty slot nor a tombstone
    #[error("Table is full, probed all {capacity} slots without finding room")]
    Full { capacity: usize },

    /// Growing would need more slots than can be allocated
    #[error("Cannot grow past {capacity} slots, the growth factor is too large")]
    CapacityOverflow { capacity: usize },
}
