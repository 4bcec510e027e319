//! In-process transport: a group of worker threads joined by a full mesh
//! of `std::sync::mpsc` channels.
//!
//! Every ordered pair of members owns a dedicated channel, so each
//! collective reduces to a fixed point-to-point pattern: channels are FIFO
//! per pair and every member issues its collectives in program order, which
//! makes the patterns race-free without any sequencing metadata. No buffer
//! is ever shared — data crosses between members by value, mirroring the
//! no-shared-memory discipline of a multi-process deployment.
//!
//! [`LocalComm::solo`] is the world of the plain (non-MPI) binary;
//! [`spawn_group`] runs a closure on `p` connected worker threads and is
//! the harness the multi-member tests are built on.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use crate::comm::Communicator;
use crate::error::{Error, Result};

/// Rendezvous member for barrier and split bookkeeping.
const HUB: usize = 0;

/// One message on a mesh channel.
enum Frame {
    I32(Vec<i32>),
    I64(Vec<i64>),
    /// Barrier arrival/release marker.
    Token,
    /// A member's endpoints in a freshly derived sub-mesh.
    Links(Box<SubLinks>),
    /// Split verdict for a caller with a negative color.
    NotMember,
}

/// Endpoints handed to one member of a derived sub-group.
struct SubLinks {
    rank: usize,
    size: usize,
    tx: Vec<Sender<Frame>>,
    rx: Vec<Receiver<Frame>>,
}

/// Build the channel mesh for a group of `size` members.
///
/// Returns one `(senders, receivers)` pair per rank: `senders[dst]` is the
/// rank's channel *to* `dst`, `receivers[src]` its channel *from* `src`.
#[allow(clippy::type_complexity)]
fn mesh(size: usize) -> Vec<(Vec<Sender<Frame>>, Vec<Receiver<Frame>>)> {
    let mut tx_grid: Vec<Vec<Sender<Frame>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
    let mut rx_grid: Vec<Vec<Receiver<Frame>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
    for src in 0..size {
        for dst in 0..size {
            let (tx, rx) = mpsc::channel();
            tx_grid[src].push(tx);
            rx_grid[dst].push(rx);
        }
    }
    tx_grid.into_iter().zip(rx_grid).collect()
}

/// One member's endpoint in an in-process group.
///
/// Implements [`Communicator`]; see the trait for the collective-call
/// discipline every member must follow.
pub struct LocalComm {
    rank: usize,
    size: usize,
    tx: Vec<Sender<Frame>>,
    rx: Vec<Receiver<Frame>>,
}

impl LocalComm {
    /// Create a fully connected world of `size` members.
    ///
    /// The returned endpoints are meant to be moved onto one worker thread
    /// each; [`spawn_group`] does exactly that.
    pub fn universe(size: usize) -> Vec<LocalComm> {
        mesh(size)
            .into_iter()
            .enumerate()
            .map(|(rank, (tx, rx))| LocalComm { rank, size, tx, rx })
            .collect()
    }

    /// A world of one: the coordinator with no peers.
    ///
    /// Collectives degenerate to local copies. This is the world the
    /// binary runs in when built without the `mpi` feature.
    pub fn solo() -> LocalComm {
        let mut world = Self::universe(1);
        world.pop().expect("universe(1) has exactly one member")
    }

    fn send(&self, dst: usize, frame: Frame) -> Result<()> {
        self.tx[dst].send(frame).map_err(|_| Error::PeerLost)
    }

    fn recv(&self, src: usize) -> Result<Frame> {
        self.rx[src].recv().map_err(|_| Error::PeerLost)
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast_i64(&self, data: &mut [i64], root: usize) -> Result<()> {
        if self.rank == root {
            for dst in 0..self.size {
                if dst != root {
                    self.send(dst, Frame::I64(data.to_vec()))?;
                }
            }
            Ok(())
        } else {
            match self.recv(root)? {
                Frame::I64(v) if v.len() == data.len() => {
                    data.copy_from_slice(&v);
                    Ok(())
                }
                Frame::I64(v) => Err(Error::InvalidBuffer(format!(
                    "broadcast of {} elements into a buffer of {}",
                    v.len(),
                    data.len()
                ))),
                _ => Err(Error::Transport("unexpected frame in broadcast".into())),
            }
        }
    }

    fn scatter_i32(&self, send: &[i32], recv: &mut [i32], root: usize) -> Result<()> {
        let block = recv.len();
        if self.rank == root {
            if send.len() != block * self.size {
                return Err(Error::InvalidBuffer(format!(
                    "scatter of {} elements over {} blocks of {}",
                    send.len(),
                    self.size,
                    block
                )));
            }
            for dst in 0..self.size {
                let chunk = &send[dst * block..(dst + 1) * block];
                if dst == root {
                    recv.copy_from_slice(chunk);
                } else {
                    self.send(dst, Frame::I32(chunk.to_vec()))?;
                }
            }
            Ok(())
        } else {
            match self.recv(root)? {
                Frame::I32(v) if v.len() == block => {
                    recv.copy_from_slice(&v);
                    Ok(())
                }
                Frame::I32(v) => Err(Error::InvalidBuffer(format!(
                    "scatter block of {} elements into a buffer of {block}",
                    v.len()
                ))),
                _ => Err(Error::Transport("unexpected frame in scatter".into())),
            }
        }
    }

    fn gather_i32(&self, send: &[i32], recv: &mut [i32], root: usize) -> Result<()> {
        let block = send.len();
        if self.rank == root {
            if recv.len() != block * self.size {
                return Err(Error::InvalidBuffer(format!(
                    "gather of {} blocks of {block} into a buffer of {}",
                    self.size,
                    recv.len()
                )));
            }
            for src in 0..self.size {
                let slot = &mut recv[src * block..(src + 1) * block];
                if src == root {
                    slot.copy_from_slice(send);
                } else {
                    match self.recv(src)? {
                        Frame::I32(v) if v.len() == block => slot.copy_from_slice(&v),
                        Frame::I32(v) => {
                            return Err(Error::InvalidBuffer(format!(
                                "gather block of {} elements from rank {src}, expected {block}",
                                v.len()
                            )));
                        }
                        _ => return Err(Error::Transport("unexpected frame in gather".into())),
                    }
                }
            }
            Ok(())
        } else {
            self.send(root, Frame::I32(send.to_vec()))
        }
    }

    fn barrier(&self) -> Result<()> {
        if self.rank == HUB {
            for src in 1..self.size {
                match self.recv(src)? {
                    Frame::Token => {}
                    _ => return Err(Error::Transport("unexpected frame in barrier".into())),
                }
            }
            for dst in 1..self.size {
                self.send(dst, Frame::Token)?;
            }
            Ok(())
        } else {
            self.send(HUB, Frame::Token)?;
            match self.recv(HUB)? {
                Frame::Token => Ok(()),
                _ => Err(Error::Transport("unexpected frame in barrier".into())),
            }
        }
    }

    fn split(&self, color: i32, key: i32) -> Result<Option<Self>> {
        if self.rank == HUB {
            // (old rank, color, key) for every member, hub included.
            let mut entries = vec![(HUB, color, key)];
            for src in 1..self.size {
                match self.recv(src)? {
                    Frame::I64(v) if v.len() == 2 => entries.push((src, v[0] as i32, v[1] as i32)),
                    _ => return Err(Error::Transport("unexpected frame in split".into())),
                }
            }

            let mut colors: Vec<i32> = entries.iter().map(|e| e.1).filter(|&c| c >= 0).collect();
            colors.sort_unstable();
            colors.dedup();

            let mut own = None;
            for c in colors {
                let mut members: Vec<(usize, i32)> = entries
                    .iter()
                    .filter(|e| e.1 == c)
                    .map(|e| (e.0, e.2))
                    .collect();
                // New ranks are assigned by key, old rank breaking ties.
                members.sort_by_key(|&(old, k)| (k, old));

                let group = members.len();
                for (new_rank, ((tx, rx), &(old_rank, _))) in
                    mesh(group).into_iter().zip(&members).enumerate()
                {
                    let links = SubLinks {
                        rank: new_rank,
                        size: group,
                        tx,
                        rx,
                    };
                    if old_rank == HUB {
                        own = Some(links);
                    } else {
                        self.send(old_rank, Frame::Links(Box::new(links)))?;
                    }
                }
            }

            for &(old_rank, c, _) in &entries {
                if c < 0 && old_rank != HUB {
                    self.send(old_rank, Frame::NotMember)?;
                }
            }

            Ok(own.map(|l| LocalComm {
                rank: l.rank,
                size: l.size,
                tx: l.tx,
                rx: l.rx,
            }))
        } else {
            self.send(HUB, Frame::I64(vec![i64::from(color), i64::from(key)]))?;
            match self.recv(HUB)? {
                Frame::Links(l) => Ok(Some(LocalComm {
                    rank: l.rank,
                    size: l.size,
                    tx: l.tx,
                    rx: l.rx,
                })),
                Frame::NotMember => Ok(None),
                _ => Err(Error::Transport("unexpected frame in split".into())),
            }
        }
    }
}

/// Run `f` on `size` connected worker threads and collect the results in
/// rank order.
///
/// Joins every worker before returning; a panicking worker propagates its
/// panic to the caller.
pub fn spawn_group<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(LocalComm) -> T + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let workers: Vec<_> = LocalComm::universe(size)
        .into_iter()
        .map(|comm| {
            let f = Arc::clone(&f);
            thread::spawn(move || f(comm))
        })
        .collect();
    workers
        .into_iter()
        .map(|w| w.join().expect("group worker panicked"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solo_collectives_degenerate() {
        let comm = LocalComm::solo();
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.size(), 1);

        let mut settings = [7i64, 8, 9];
        comm.broadcast_i64(&mut settings, 0).unwrap();
        assert_eq!(settings, [7, 8, 9]);

        let send = [1i32, 2, 3, 4];
        let mut recv = [0i32; 4];
        comm.scatter_i32(&send, &mut recv, 0).unwrap();
        assert_eq!(recv, send);

        let mut back = [0i32; 4];
        comm.gather_i32(&recv, &mut back, 0).unwrap();
        assert_eq!(back, send);

        comm.barrier().unwrap();
    }

    #[test]
    fn broadcast_reaches_every_member() {
        let values = spawn_group(4, |comm| {
            let mut data = [0i64; 3];
            if comm.rank() == 0 {
                data = [10, 20, 30];
            }
            comm.broadcast_i64(&mut data, 0).unwrap();
            data
        });
        for v in values {
            assert_eq!(v, [10, 20, 30]);
        }
    }

    #[test]
    fn scatter_delivers_blocks_in_rank_order() {
        let chunks = spawn_group(4, |comm| {
            let send: Vec<i32> = if comm.rank() == 0 { (0..8).collect() } else { Vec::new() };
            let mut recv = [0i32; 2];
            comm.scatter_i32(&send, &mut recv, 0).unwrap();
            recv
        });
        assert_eq!(chunks, vec![[0, 1], [2, 3], [4, 5], [6, 7]]);
    }

    #[test]
    fn gather_reassembles_in_rank_order() {
        let results = spawn_group(4, |comm| {
            let rank = comm.rank() as i32;
            let send = [rank * 10, rank * 10 + 1];
            let mut recv = if comm.rank() == 0 { vec![0i32; 8] } else { Vec::new() };
            comm.gather_i32(&send, &mut recv, 0).unwrap();
            recv
        });
        assert_eq!(results[0], vec![0, 1, 10, 11, 20, 21, 30, 31]);
        for other in &results[1..] {
            assert!(other.is_empty());
        }
    }

    #[test]
    fn scatter_then_gather_round_trips() {
        let results = spawn_group(8, |comm| {
            let send: Vec<i32> = if comm.rank() == 0 { (0..64).rev().collect() } else { Vec::new() };
            let mut chunk = vec![0i32; 8];
            comm.scatter_i32(&send, &mut chunk, 0).unwrap();
            let mut back = if comm.rank() == 0 { vec![0i32; 64] } else { Vec::new() };
            comm.gather_i32(&chunk, &mut back, 0).unwrap();
            back
        });
        assert_eq!(results[0], (0..64).rev().collect::<Vec<i32>>());
    }

    #[test]
    fn split_by_parity_forms_two_groups() {
        // Mirrors the even/odd communicator-split shape: each subgroup then
        // broadcasts independently from its own rank 0.
        let results = spawn_group(4, |comm| {
            let color = (comm.rank() % 2) as i32;
            let sub = comm
                .split(color, comm.rank() as i32)
                .unwrap()
                .expect("non-negative color joins a group");
            let mut data = [0i64];
            if sub.rank() == 0 {
                data[0] = i64::from(color) + 100;
            }
            sub.broadcast_i64(&mut data, 0).unwrap();
            (sub.rank(), sub.size(), data[0])
        });
        assert_eq!(results[0], (0, 2, 100)); // even group
        assert_eq!(results[1], (0, 2, 101)); // odd group
        assert_eq!(results[2], (1, 2, 100));
        assert_eq!(results[3], (1, 2, 101));
    }

    #[test]
    fn split_drops_negative_color_members() {
        let results = spawn_group(4, |comm| {
            let color = if comm.rank() < 2 { 0 } else { -1 };
            let sub = comm.split(color, comm.rank() as i32).unwrap();
            sub.map(|s| (s.rank(), s.size()))
        });
        assert_eq!(results, vec![Some((0, 2)), Some((1, 2)), None, None]);
    }

    #[test]
    fn barrier_completes_for_all() {
        let results = spawn_group(8, |comm| comm.barrier().is_ok());
        assert!(results.into_iter().all(|ok| ok));
    }

    #[test]
    fn scatter_rejects_mismatched_root_buffer() {
        let comm = LocalComm::solo();
        let send = [1i32, 2, 3];
        let mut recv = [0i32; 2];
        assert!(matches!(
            comm.scatter_i32(&send, &mut recv, 0),
            Err(Error::InvalidBuffer(_))
        ));
    }

    #[test]
    fn gather_rejects_mismatched_root_buffer() {
        let comm = LocalComm::solo();
        let send = [1i32, 2];
        let mut recv = [0i32; 3];
        assert!(matches!(
            comm.gather_i32(&send, &mut recv, 0),
            Err(Error::InvalidBuffer(_))
        ));
    }
}
