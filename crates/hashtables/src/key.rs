//! Keys and their normalization into non-negative integers.

use std::{borrow::Cow, fmt, str::FromStr};

use crate::error::ConfigError;

/// A table key, either an integer or a string
///
/// Keys are totally ordered: every `Int` sorts before every `Str`,
/// integers compare numerically and strings lexicographically.
/// `sorted` buckets rely on this order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{n}"),
            Key::Str(s) => f.write_str(s),
        }
    }
}

macro_rules! key_from_int {
    ( $($t: ty),* ) => {
        $(
            impl From<$t> for Key {
                fn from(n: $t) -> Self {
                    Key::Int(n.into())
                }
            }
        )*
    };
}

key_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.into())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Str(s.clone())
    }
}

impl From<&Key> for Key {
    fn from(k: &Key) -> Self {
        k.clone()
    }
}

/// How a [`Key`] is turned into a numeric key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyHashing {
    /// Sum of character codes, 1 step per character
    #[default]
    SimpleSum,
    /// Sum of `code * (position + 1)`, 2 steps per character
    Positional,
    /// Non-negative integers are used as-is for free,
    /// everything else falls back to [`KeyHashing::SimpleSum`]
    Identity,
}

impl FromStr for KeyHashing {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple_sum" => Ok(Self::SimpleSum),
            "positional" => Ok(Self::Positional),
            "identity" => Ok(Self::Identity),
            other => Err(ConfigError::UnknownStrategy {
                kind: "key hashing",
                name: other.into(),
            }),
        }
    }
}

/// Result of normalizing a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericKey {
    pub value: u64,
    pub steps: u64,
}

impl KeyHashing {
    /// Converts `key` into a non-negative integer,
    /// counting one step for stringifying a non-string key
    pub fn normalize(self, key: &Key) -> NumericKey {
        if let (Self::Identity, Key::Int(n)) = (self, key) {
            if *n >= 0 {
                return NumericKey {
                    value: *n as u64,
                    steps: 0,
                };
            }
        }

        let (text, mut steps): (Cow<'_, str>, u64) = match key {
            Key::Str(s) => (Cow::Borrowed(s.as_str()), 0),
            Key::Int(n) => (Cow::Owned(n.to_string()), 1),
        };

        let mut value = 0u64;
        match self {
            Self::Positional => {
                for (i, c) in text.chars().enumerate() {
                    value = value.wrapping_add((c as u64).wrapping_mul(i as u64 + 1));
                    steps += 2;
                }
            }
            Self::SimpleSum | Self::Identity => {
                for c in text.chars() {
                    value = value.wrapping_add(c as u64);
                    steps += 1;
                }
            }
        }

        NumericKey { value, steps }
    }
}
