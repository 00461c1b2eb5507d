//! Error type shared across the crate.

use thiserror::Error;

/// Convenience alias used by every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, LifelogError>;

#[derive(Debug, Error)]
pub enum LifelogError {
    #[error("table full: at most {limit} entries fit")]
    CapacityExceeded { limit: usize },

    #[error("string contains an embedded NUL byte")]
    EmbeddedNul,

    #[error("no value stored under key {key}")]
    MissingKey { key: u32 },

    #[error("short read under key {key}: {actual}/{expected} bytes")]
    ShortRead {
        key: u32,
        expected: usize,
        actual: usize,
    },

    #[error("short write under key {key}: {actual}/{expected} bytes")]
    ShortWrite {
        key: u32,
        expected: usize,
        actual: usize,
    },

    #[error("corrupt table data under key {key}: {reason}")]
    CorruptTable { key: u32, reason: &'static str },

    #[error("store: {0}")]
    Store(String),
}
