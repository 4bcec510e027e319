//! MPI transport over the `mpi` crate (rsmpi).
//!
//! Enabled with the `mpi` feature; requires a system MPI library at build
//! time. The binary built this way is launched under `mpiexec`, and the
//! world size is the process count the run was started with.

use std::sync::Arc;

use mpi::environment::Universe;
use mpi::topology::{Color, SimpleCommunicator};
use mpi::traits::{Communicator as _, CommunicatorCollectives as _, Root as _};

use crate::comm::Communicator;
use crate::error::{Error, Result};

/// A scope over a group of MPI processes.
///
/// The world scope comes from [`MpiComm::init`]; halved scopes are derived
/// through [`Communicator::split`]. Every derived scope shares the
/// environment handle, so MPI stays alive until the last scope is dropped
/// and is finalized afterwards.
pub struct MpiComm {
    env: Arc<Universe>,
    comm: SimpleCommunicator,
}

impl MpiComm {
    /// Initialize MPI and return the world scope.
    ///
    /// Fails if MPI was already initialized in this process.
    pub fn init() -> Result<Self> {
        let universe = mpi::initialize().ok_or(Error::AlreadyInitialized)?;
        let comm = universe.world();
        Ok(MpiComm {
            env: Arc::new(universe),
            comm,
        })
    }
}

impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        self.comm.rank() as usize
    }

    fn size(&self) -> usize {
        self.comm.size() as usize
    }

    fn broadcast_i64(&self, data: &mut [i64], root: usize) -> Result<()> {
        self.comm.process_at_rank(root as i32).broadcast_into(data);
        Ok(())
    }

    fn scatter_i32(&self, send: &[i32], recv: &mut [i32], root: usize) -> Result<()> {
        let root_proc = self.comm.process_at_rank(root as i32);
        if self.rank() == root {
            if send.len() != recv.len() * self.size() {
                return Err(Error::InvalidBuffer(format!(
                    "scatter of {} elements over {} blocks of {}",
                    send.len(),
                    self.size(),
                    recv.len()
                )));
            }
            root_proc.scatter_into_root(send, recv);
        } else {
            root_proc.scatter_into(recv);
        }
        Ok(())
    }

    fn gather_i32(&self, send: &[i32], recv: &mut [i32], root: usize) -> Result<()> {
        let root_proc = self.comm.process_at_rank(root as i32);
        if self.rank() == root {
            if recv.len() != send.len() * self.size() {
                return Err(Error::InvalidBuffer(format!(
                    "gather of {} blocks of {} into a buffer of {}",
                    self.size(),
                    send.len(),
                    recv.len()
                )));
            }
            root_proc.gather_into_root(send, recv);
        } else {
            root_proc.gather_into(send);
        }
        Ok(())
    }

    fn barrier(&self) -> Result<()> {
        self.comm.barrier();
        Ok(())
    }

    fn split(&self, color: i32, key: i32) -> Result<Option<Self>> {
        let color = if color < 0 {
            Color::undefined()
        } else {
            Color::with_value(color)
        };
        Ok(self
            .comm
            .split_by_color_with_key(color, key)
            .map(|comm| MpiComm {
                env: Arc::clone(&self.env),
                comm,
            }))
    }
}
