//! # ferrosort
//!
//! Distributed bitonic sort for fixed-width integers over collective
//! operations.
//!
//! A fixed group of P workers (P a power of two, 1–8) cooperatively sorts
//! one array of `i32`: the coordinator scatters equal chunks to the active
//! group, every member runs the local bitonic network (full sort on the
//! first round, merge afterwards), results are gathered back, and the group
//! halves — until the coordinator alone holds the fully ordered array.
//!
//! All coordination goes through the [`Communicator`] trait, so the engine
//! is transport-independent:
//! - [`LocalComm`] — an in-process channel mesh; powers single-process runs
//!   and the multi-worker test harness
//! - `MpiComm` — real MPI processes via the `mpi` crate (feature `mpi`)
//!
//! ## Quick Start
//!
//! ```
//! use ferrosort::{engine, local, Communicator, Direction, Settings};
//!
//! let sorted = local::spawn_group(4, |comm| {
//!     let settings = Settings::new(Direction::Ascending, 8);
//!     let buffer = (comm.rank() == 0).then(|| vec![5, 3, 8, 1, 9, 2, 7, 6]);
//!     engine::run(comm, settings, buffer).unwrap()
//! })
//! .into_iter()
//! .flatten()
//! .next()
//! .unwrap();
//!
//! assert_eq!(sorted, vec![1, 2, 3, 5, 6, 7, 8, 9]);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `mpi`   | MPI transport via the `mpi` crate (needs a system MPI) | off |
//!
//! ## Guarantees and limits
//!
//! - Every collective is a synchronization barrier for the current group;
//!   there are no timeouts and no fault tolerance against a hung peer.
//! - Equal elements may be reordered: the comparator network uses strict
//!   inequalities and makes no stability guarantee.
//! - The array length must be a power of two no smaller than the process
//!   count; this is validated up front, before any data moves.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod comm;
pub mod engine;
mod error;
pub mod local;
#[cfg(feature = "mpi")]
pub mod mpi;
pub mod reader;
pub mod sort;
pub mod timer;

pub use comm::Communicator;
pub use error::{Error, Result};
pub use local::LocalComm;
#[cfg(feature = "mpi")]
pub use mpi::MpiComm;

/// Sort direction for a run.
///
/// Chosen once on the command line, broadcast to every process as part of
/// [`Settings`], and never changed for the lifetime of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest element first.
    Ascending,
    /// Largest element first.
    Descending,
}

impl Direction {
    /// The opposite direction.
    ///
    /// During a run, odd-ranked members sort their chunk against the
    /// requested direction so that gathered neighbour chunks always form a
    /// bitonic sequence for the next merge round.
    pub fn reversed(self) -> Self {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }

    /// Parse the command-line flag value: `0` = ascending, `1` = descending.
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            0 => Some(Direction::Ascending),
            1 => Some(Direction::Descending),
            _ => None,
        }
    }

    /// The wire encoding used in the settings broadcast.
    pub fn as_flag(self) -> i64 {
        match self {
            Direction::Ascending => 0,
            Direction::Descending => 1,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Ascending => write!(f, "ascending"),
            Direction::Descending => write!(f, "descending"),
        }
    }
}

/// Immutable per-run settings.
///
/// Built once by the coordinator from the command line and the input file,
/// then broadcast to every process before any data movement. See
/// [`engine::exchange_settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Requested sort direction.
    pub direction: Direction,
    /// Number of elements in the global array.
    pub len: usize,
}

impl Settings {
    /// Create settings for a run over `len` elements.
    pub fn new(direction: Direction, len: usize) -> Self {
        Settings { direction, len }
    }

    /// Check that `len` can be partitioned evenly at every halving step of
    /// a group of `processes` members.
    ///
    /// Requires `len` to be a power of two no smaller than `processes`;
    /// together with a power-of-two process count this guarantees every
    /// chunk at every round has power-of-two length, the precondition of
    /// the comparator network.
    pub fn validate(&self, processes: usize) -> Result<()> {
        if !self.len.is_power_of_two() {
            return Err(Error::Config(format!(
                "array length must be a power of two, got {}",
                self.len
            )));
        }
        if self.len < processes {
            return Err(Error::Config(format!(
                "array length {} is smaller than the process count {}",
                self.len, processes
            )));
        }
        Ok(())
    }
}
