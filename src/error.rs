//! Error types for ferrosort

use thiserror::Error;

/// Result type for sort-run operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sort-run operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid run configuration (process count, array length, arguments)
    #[error("configuration error: {0}")]
    Config(String),

    /// The input file could not be opened or read
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The input file ended before the declared element count was read
    #[error("truncated input: expected {expected} elements, file holds {got}")]
    Truncated {
        /// Element count declared in the file header
        expected: usize,
        /// Elements actually present
        got: usize,
    },

    /// The element buffer could not be allocated
    #[error("failed to allocate a buffer of {0} elements")]
    Allocation(usize),

    /// A collective was called with mismatched buffer lengths
    #[error("invalid buffer: {0}")]
    InvalidBuffer(String),

    /// A peer of the current group disappeared mid-collective
    #[error("peer process lost during a collective operation")]
    PeerLost,

    /// The coordinator aborted the run before the first scatter
    ///
    /// Peers receive this through the settings broadcast; the coordinator
    /// has already reported the underlying cause, so holders of this
    /// variant exit nonzero without printing.
    #[error("run aborted by the coordinator")]
    Aborted,

    /// The transport has already been initialized in this process
    #[error("communication transport already initialized")]
    AlreadyInitialized,

    /// Transport-level failure
    #[error("transport error: {0}")]
    Transport(String),
}
