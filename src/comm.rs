//! The collective-communication seam between the sort engine and its
//! transport.
//!
//! A [`Communicator`] value is the scope of one process group: every
//! operation on it is *collective* — all members of the group must call it,
//! in the same relative order, and it completes for no one until it has
//! completed for everyone. There is no timeout; a member that stops calling
//! leaves the others blocked. This is the accepted model (fault tolerance
//! is out of scope), so the engine is written such that every collective is
//! either reached by all members or attempted by none.
//!
//! Two transports implement the trait:
//! - [`LocalComm`](crate::local::LocalComm) — worker threads joined by a
//!   channel mesh, used for single-process runs and the test harness
//! - `MpiComm` (feature `mpi`) — real MPI processes via the `mpi` crate

use crate::error::Result;

/// Rank of the coordinator within every group.
///
/// The active group is always a contiguous prefix of ranks, so the
/// lowest-ranked member — the coordinator — survives every halving and
/// ends the run holding the fully merged array.
pub const ROOT: usize = 0;

/// A communication scope bound to one process group.
///
/// Implementations carry the member's rank and the group size, and provide
/// the collective operations the engine is built from. Dropping a
/// communicator retires the scope; a halved group gets a fresh scope via
/// [`split`](Communicator::split).
///
/// # Example
///
/// ```
/// use ferrosort::{local, Communicator};
///
/// let sums = local::spawn_group(4, |comm| {
///     // Coordinator picks a value, everyone learns it.
///     let mut value = [0i64];
///     if comm.rank() == 0 {
///         value[0] = 42;
///     }
///     comm.broadcast_i64(&mut value, 0).unwrap();
///     value[0]
/// });
/// assert_eq!(sums, vec![42, 42, 42, 42]);
/// ```
pub trait Communicator: Sized {
    /// Rank of the calling member in this group, `0..size()`.
    fn rank(&self) -> usize;

    /// Number of members in this group.
    fn size(&self) -> usize;

    // ========================================================================
    // Collectives
    // ========================================================================

    /// Broadcast a slice of `i64` values from `root` to every member.
    ///
    /// `data` is the source at `root` and the destination everywhere else;
    /// its length must match across all members.
    fn broadcast_i64(&self, data: &mut [i64], root: usize) -> Result<()>;

    /// Scatter contiguous equal-size blocks of `send` from `root`.
    ///
    /// `root` partitions `send` into `size()` blocks of `recv.len()`
    /// elements and delivers block k to member k (its own block by copy).
    /// `send` is only significant at `root` — other members pass an empty
    /// slice. Precondition at `root`: `send.len() == recv.len() * size()`.
    fn scatter_i32(&self, send: &[i32], recv: &mut [i32], root: usize) -> Result<()>;

    /// Gather every member's `send` block into `recv` at `root`, in rank
    /// order.
    ///
    /// Inverse of [`scatter_i32`](Communicator::scatter_i32): `recv` is
    /// only significant at `root`, where its length must be
    /// `send.len() * size()`. Other members pass an empty buffer.
    fn gather_i32(&self, send: &[i32], recv: &mut [i32], root: usize) -> Result<()>;

    /// Block until every member of the group has entered the barrier.
    fn barrier(&self) -> Result<()>;

    // ========================================================================
    // Group derivation
    // ========================================================================

    /// Derive a sub-group scope from this one.
    ///
    /// Members calling with the same non-negative `color` form one new
    /// group, ranked among themselves by `key` (ties broken by the old
    /// rank). A negative `color` marks the caller a non-member: it gets
    /// `Ok(None)` and must not touch the derived scope — for this crate's
    /// engine that member's run is over.
    ///
    /// Collective: every member of the current group must call `split`,
    /// including the ones bowing out.
    fn split(&self, color: i32, key: i32) -> Result<Option<Self>>;
}
