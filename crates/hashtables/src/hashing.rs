//! Hash functions mapping a numeric key onto `[0, capacity)`.
//!
//! Every function is pure and reports the abstract steps it took,
//! not counting the steps spent normalizing the key.

use std::{f64::consts, str::FromStr};

use crate::error::ConfigError;

/// Fractional constants for the multiplicative method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplier {
    /// `φ - 1`, Fibonacci hashing
    GoldenRatio,
    /// `e - 2`
    Euler,
    /// `π - 3`
    Pi,
}

impl Multiplier {
    pub fn constant(self) -> f64 {
        match self {
            Self::GoldenRatio => (1.0 + 5f64.sqrt()) / 2.0 - 1.0,
            Self::Euler => consts::E - 2.0,
            Self::Pi => consts::PI - 3.0,
        }
    }
}

/// How the folding hash picks its chunk width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FoldingBlock {
    /// Always 3 digits
    #[default]
    Fixed,
    /// As many digits as the capacity has
    Dynamic,
}

impl FoldingBlock {
    pub const FIXED_WIDTH: usize = 3;

    pub fn width(self, capacity: usize) -> usize {
        match self {
            Self::Fixed => Self::FIXED_WIDTH,
            Self::Dynamic => decimal_digits(capacity as u64),
        }
    }
}

impl FromStr for FoldingBlock {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "dynamic" => Ok(Self::Dynamic),
            other => Err(ConfigError::UnknownStrategy {
                kind: "folding block",
                name: other.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFunction {
    /// `key mod capacity`
    #[default]
    Modulo,
    /// Sum of the key's decimal digit chunks, `mod capacity`
    Folding,
    /// `floor(capacity * frac(key * A))`
    Multiplicative(Multiplier),
}

impl FromStr for HashFunction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "modulo" => Ok(Self::Modulo),
            "folding" => Ok(Self::Folding),
            "golden" | "golden_ratio" | "fibonacci" => {
                Ok(Self::Multiplicative(Multiplier::GoldenRatio))
            }
            "euler" => Ok(Self::Multiplicative(Multiplier::Euler)),
            "pi" => Ok(Self::Multiplicative(Multiplier::Pi)),
            other => Err(ConfigError::UnknownStrategy {
                kind: "hash function",
                name: other.into(),
            }),
        }
    }
}

/// A bucket index together with what it cost to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hashed {
    pub index: usize,
    pub steps: u64,
}

impl HashFunction {
    /// Maps `key` onto `[0, capacity)`
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0, tables never have zero slots
    pub fn index(self, key: u64, capacity: usize, block: FoldingBlock) -> Hashed {
        assert!(capacity > 0, "hashing into a table without slots");

        match self {
            Self::Modulo => modulo(key, capacity),
            Self::Folding => fold(key, capacity, block.width(capacity)),
            Self::Multiplicative(m) => multiply(key, capacity, m.constant()),
        }
    }
}

fn modulo(key: u64, capacity: usize) -> Hashed {
    Hashed {
        index: (key % capacity as u64) as usize,
        steps: 1,
    }
}

fn fold(key: u64, capacity: usize, width: usize) -> Hashed {
    let digits = key.to_string();
    if digits.len() < width {
        return modulo(key, capacity);
    }

    // stringify
    let mut steps = 1;
    let mut sum = 0u64;
    for chunk in digits.as_bytes().chunks(width) {
        let part = chunk
            .iter()
            .fold(0u64, |acc, d| acc * 10 + u64::from(d - b'0'));
        sum = sum.wrapping_add(part);
        steps += 2;
    }

    Hashed {
        index: (sum % capacity as u64) as usize,
        steps: steps + 1,
    }
}

fn multiply(key: u64, capacity: usize, a: f64) -> Hashed {
    let fractional = (key as f64 * a).fract();
    let scaled = (capacity as f64 * fractional).floor() as usize;

    Hashed {
        index: scaled.min(capacity - 1),
        steps: 4,
    }
}

fn decimal_digits(mut n: u64) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn modulo_index() {
        let h = HashFunction::Modulo.index(23, 7, FoldingBlock::Fixed);
        assert_eq!(h, Hashed { index: 2, steps: 1 });
    }

    #[test]
    fn folding_fixed() {
        // 123456 -> 123 + 456 = 579, 579 % 100 = 79
        let h = HashFunction::Folding.index(123_456, 100, FoldingBlock::Fixed);
        assert_eq!(h.index, 79);
        // stringify + 2 chunks * 2 + mod
        assert_eq!(h.steps, 1 + 4 + 1);

        // uneven tail: 1234567 -> 123 + 456 + 7 = 586
        let h = HashFunction::Folding.index(1_234_567, 1000, FoldingBlock::Fixed);
        assert_eq!(h.index, 586);
        assert_eq!(h.steps, 1 + 6 + 1);
    }

    #[test]
    fn folding_dynamic_width() {
        assert_eq!(FoldingBlock::Dynamic.width(7), 1);
        assert_eq!(FoldingBlock::Dynamic.width(97), 2);
        assert_eq!(FoldingBlock::Dynamic.width(1000), 4);

        // width 2: 12 + 34 + 5 = 51
        let h = HashFunction::Folding.index(12_345, 97, FoldingBlock::Dynamic);
        assert_eq!(h.index, 51);
    }

    #[test]
    fn folding_short_key_is_modulo() {
        let folded = HashFunction::Folding.index(42, 10, FoldingBlock::Fixed);
        let plain = HashFunction::Modulo.index(42, 10, FoldingBlock::Fixed);
        assert_eq!(folded, plain);
    }

    #[test]
    fn multiplicative() {
        let a = Multiplier::GoldenRatio.constant();
        assert!((a - 0.618_033_988_7).abs() < 1e-9);
        assert!((Multiplier::Euler.constant() - 0.718_281_828_5).abs() < 1e-9);
        assert!((Multiplier::Pi.constant() - 0.141_592_653_6).abs() < 1e-9);

        // frac(10 * 0.618..) = 0.18.., * 100 = 18
        let h = HashFunction::Multiplicative(Multiplier::GoldenRatio).index(
            10,
            100,
            FoldingBlock::Fixed,
        );
        assert_eq!(h, Hashed { index: 18, steps: 4 });
    }

    #[test]
    fn indexes_stay_in_range() {
        let functions = [
            HashFunction::Modulo,
            HashFunction::Folding,
            HashFunction::Multiplicative(Multiplier::GoldenRatio),
            HashFunction::Multiplicative(Multiplier::Euler),
            HashFunction::Multiplicative(Multiplier::Pi),
        ];
        for f in functions {
            for cap in [1usize, 2, 7, 10, 101] {
                for key in (0..5000u64).step_by(37).chain([u64::MAX]) {
                    let h = f.index(key, cap, FoldingBlock::Dynamic);
                    assert!(h.index < cap, "{f:?} key {key} cap {cap} -> {}", h.index);
                }
            }
        }
    }

    #[test]
    fn golden_ratio_spreads_sequential_keys() {
        let cap = 64;
        let f = HashFunction::Multiplicative(Multiplier::GoldenRatio);
        let mut hit = vec![false; cap];
        for key in 0..cap as u64 {
            hit[f.index(key, cap, FoldingBlock::Fixed).index] = true;
        }
        let used = hit.iter().filter(|&&h| h).count();
        assert!(used > cap / 2, "only {used} of {cap} buckets used");
    }

    #[test]
    fn parse() {
        assert_eq!("folding".parse::<HashFunction>(), Ok(HashFunction::Folding));
        assert_eq!(
            "pi".parse::<HashFunction>(),
            Ok(HashFunction::Multiplicative(Multiplier::Pi))
        );
        assert!("sha256".parse::<HashFunction>().is_err());
    }
}
