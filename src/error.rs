//! Error types for ringshift

use crate::datatype::DatatypeTag;
use thiserror::Error;

/// Result type for ringshift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for process-group and shift operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The process group cannot be built with this many ranks
    #[error("Invalid process group size: {0}")]
    InvalidGroupSize(i32),

    /// Invalid rank specified
    #[error("Invalid rank: {0}")]
    InvalidRank(i32),

    /// Invalid message tag (negative tags are reserved)
    #[error("Invalid tag: {0}")]
    InvalidTag(i32),

    /// Receive buffer length does not match the message
    #[error("Count mismatch: buffer holds {expected} elements, message carries {found}")]
    CountMismatch {
        /// Length of the receive buffer
        expected: usize,
        /// Number of elements in the matched message
        found: usize,
    },

    /// Message payload is of another element type
    #[error("Datatype mismatch: expected {expected:?}, found {found:?}")]
    DatatypeMismatch {
        /// Datatype requested by the receiver
        expected: DatatypeTag,
        /// Datatype carried by the message
        found: DatatypeTag,
    },

    /// Local blocks must hold at least one element
    #[error("Invalid block length: {0}")]
    InvalidBlockLength(usize),

    /// Global array length is not a multiple of the process count
    #[error("Global array of {len} elements cannot be split evenly across {size} ranks")]
    UnevenPartition {
        /// Length of the global array
        len: usize,
        /// Number of ranks
        size: i32,
    },

    /// Input could not be produced or parsed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The process group was aborted by one of its ranks
    #[error("Process group aborted (code {0})")]
    Aborted(i32),

    /// A rank thread panicked
    #[error("Rank {0} panicked")]
    RankPanicked(i32),

    /// A peer's mailbox is gone
    #[error("Rank {0} is no longer reachable")]
    Disconnected(i32),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Exit code reported for this error when it ends the process group.
    pub fn code(&self) -> i32 {
        match self {
            Error::Aborted(code) => *code,
            Error::InvalidInput(_) | Error::InvalidBlockLength(_) => 2,
            _ => 1,
        }
    }

    /// Whether this error only echoes an abort raised by another rank.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Aborted(_))
    }
}
