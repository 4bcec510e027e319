//! The iteration driver and coordinator orchestration.
//!
//! One run is a sequence of rounds over a halving process group. Every
//! round: the coordinator scatters the working buffer in equal chunks to
//! the active group, each member runs the local kernel (full bitonic sort
//! on round 0, bitonic merge afterwards), the chunks are gathered back in
//! rank order, and the group halves. After the terminal round the
//! coordinator alone holds the fully ordered array.
//!
//! Members that fall outside the halved prefix learn it from a local rank
//! comparison inside [`Group::shrink`] and stop participating in
//! collectives at once — divergent group membership would deadlock the
//! survivors.

use std::path::Path;

use crate::comm::{Communicator, ROOT};
use crate::error::{Error, Result};
use crate::{Direction, Settings, reader, sort};

/// Highest supported process count.
pub const MAX_PROCESSES: usize = 8;

/// Wire layout of the settings broadcast: `[flag, direction, length]`.
const FLAG_OK: i64 = 0;
const FLAG_ABORT: i64 = 1;

/// Check the launch topology: the process count must be a power of two in
/// `[1, MAX_PROCESSES]`.
///
/// Purely local — callable by every process before any collective, so a
/// bad topology never leaves anyone blocked.
pub fn check_topology(processes: usize) -> Result<()> {
    if !processes.is_power_of_two() || processes > MAX_PROCESSES {
        return Err(Error::Config(format!(
            "number of processes must be a power of two in [1, {MAX_PROCESSES}], got {processes}"
        )));
    }
    Ok(())
}

/// Load the input on the coordinator and broadcast the run settings.
///
/// The coordinator (`path` is `Some` there, `None` elsewhere) reads the
/// array, validates the settings against the group size, and broadcasts
/// `[flag, direction, length]`. On a load or validation failure it still
/// issues the broadcast — carrying an abort flag — before returning its
/// own error, so peers waiting on the collective are never stranded; they
/// observe the flag and fail with [`Error::Aborted`] instead.
///
/// Returns the settings everywhere, plus the loaded array on the
/// coordinator.
pub fn exchange_settings<C: Communicator>(
    ctx: &C,
    direction: Direction,
    path: Option<&Path>,
) -> Result<(Settings, Option<Vec<i32>>)> {
    let mut frame = [FLAG_ABORT, 0, 0];

    if ctx.rank() == ROOT {
        let loaded = match path {
            Some(p) => reader::load(p).and_then(|data| {
                let settings = Settings::new(direction, data.len());
                settings.validate(ctx.size())?;
                Ok((settings, data))
            }),
            None => Err(Error::Config("coordinator has no input path".into())),
        };
        match loaded {
            Ok((settings, data)) => {
                frame = [FLAG_OK, settings.direction.as_flag(), settings.len as i64];
                ctx.broadcast_i64(&mut frame, ROOT)?;
                Ok((settings, Some(data)))
            }
            Err(e) => {
                ctx.broadcast_i64(&mut frame, ROOT)?;
                Err(e)
            }
        }
    } else {
        ctx.broadcast_i64(&mut frame, ROOT)?;
        match frame {
            [FLAG_OK, dir, len] if len >= 0 => {
                let direction = Direction::from_flag(dir).ok_or_else(|| {
                    Error::Transport("bad direction flag in settings broadcast".into())
                })?;
                Ok((Settings::new(direction, len as usize), None))
            }
            _ => Err(Error::Aborted),
        }
    }
}

/// The currently active participant set and its collective scope.
///
/// Always a contiguous rank prefix of power-of-two size. Holding the scope
/// and the size in one value keeps every code path looking at a consistent
/// view of the membership.
struct Group<C: Communicator> {
    ctx: C,
    size: usize,
}

impl<C: Communicator> Group<C> {
    fn initial(ctx: C) -> Self {
        let size = ctx.size();
        Group { ctx, size }
    }

    /// Derive the halved group, retiring this scope.
    ///
    /// Collective over the current group. Members in the surviving prefix
    /// get the fresh scope; the rest get `None` and must not communicate
    /// again.
    fn shrink(self) -> Result<Option<Self>> {
        let size = self.size / 2;
        let rank = self.ctx.rank();
        let color = if rank < size { 0 } else { -1 };
        let sub = self.ctx.split(color, rank as i32)?;
        Ok(sub.map(|ctx| Group { ctx, size }))
    }
}

/// Execute one full sort run over the given scope.
///
/// Collective: every process of `ctx`'s group calls `run` with the same
/// `settings`; `buffer` carries the global array on the coordinator and is
/// `None` elsewhere. Returns the sorted array on the coordinator and
/// `None` on every other member (including members halved away before the
/// terminal round).
///
/// Validation runs first on every member, from local data only, so an
/// invalid configuration fails everywhere before anyone enters a
/// collective.
pub fn run<C: Communicator>(
    ctx: C,
    settings: Settings,
    buffer: Option<Vec<i32>>,
) -> Result<Option<Vec<i32>>> {
    check_topology(ctx.size())?;
    settings.validate(ctx.size())?;
    if ctx.rank() == ROOT {
        let held = buffer.as_ref().map_or(0, Vec::len);
        if held != settings.len {
            return Err(Error::InvalidBuffer(format!(
                "coordinator holds {held} elements, settings declare {}",
                settings.len
            )));
        }
    }

    let mut buffer = buffer;
    let mut group = Group::initial(ctx);
    let mut round = 0;

    loop {
        let chunk_len = settings.len / group.size;
        let mut chunk = vec![0i32; chunk_len];
        group
            .ctx
            .scatter_i32(buffer.as_deref().unwrap_or(&[]), &mut chunk, ROOT)?;

        // Odd ranks work against the requested direction, so the two
        // chunks that land side by side in the gathered buffer form a
        // bitonic sequence for the next round's merge.
        let direction = if group.ctx.rank() % 2 == 0 {
            settings.direction
        } else {
            settings.direction.reversed()
        };
        let cmp = sort::out_of_order::<i32>(direction);
        if round == 0 {
            sort::bitonic_sort(&mut chunk, cmp);
        } else {
            sort::bitonic_merge(&mut chunk, cmp);
        }

        let mut gathered = if group.ctx.rank() == ROOT {
            vec![0i32; settings.len]
        } else {
            Vec::new()
        };
        group.ctx.gather_i32(&chunk, &mut gathered, ROOT)?;
        if group.ctx.rank() == ROOT {
            buffer = Some(gathered);
        }

        if group.size == 1 {
            return Ok(buffer);
        }
        group = match group.shrink()? {
            Some(g) => g,
            None => return Ok(None),
        };
        round += 1;
    }
}
