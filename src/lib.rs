use hashtables::{ConfigError, TableError};
use thiserror::Error;

pub mod workload;

#[derive(Debug, Error)]
pub enum Error {
    /// A table was built or reconfigured with invalid settings
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// An open addressing table ran out of slots
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// The key count argument was not a number
    #[error("Invalid key count {0:?}, expected a positive integer")]
    InvalidKeyCount(String),
}
