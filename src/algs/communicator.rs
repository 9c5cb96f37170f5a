//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte buffers* sized by the sender (no zero-copy
//! guarantees). All handles are **waitable**: posting a receive never blocks,
//! `.wait()` does. In-process sends are buffered; MPI sends complete when
//! posted and their handles are already ready. Per `(source, destination, tag)`
//! delivery is FIFO, and messages under different tags never match each other.

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors raised by a transport backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommError {
    /// The peer rank is not a member of the group.
    #[error("peer {peer} is outside the group of size {size}")]
    PeerOutOfRange { peer: usize, size: usize },
    /// A receive gave up after the configured timeout.
    #[error("timed out after {waited:?} waiting for tag {tag:#06x} from rank {peer}")]
    Timeout {
        peer: usize,
        tag: u16,
        waited: Duration,
    },
    /// The backend completed the receive without delivering any data.
    #[error("no message from rank {peer} with tag {tag:#06x}")]
    NoData { peer: usize, tag: u16 },
    /// Backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Typed message tag identifying one collective operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommTag(pub u16);

impl CommTag {
    pub const fn new(tag: u16) -> Self {
        CommTag(tag)
    }
    pub const fn as_u16(self) -> u16 {
        self.0
    }
    /// Derive a related tag, wrapping on overflow.
    pub const fn offset(self, k: u16) -> Self {
        CommTag(self.0.wrapping_add(k))
    }
}

/// Point-to-point communication interface (minimal by design).
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16) -> Self::RecvHandle;

    /// This endpoint's rank in `0..size()`.
    fn rank(&self) -> usize;
    /// Number of ranks in the group.
    fn size(&self) -> usize;

    fn is_no_comm(&self) -> bool {
        false
    }

    /// Blocking send.
    fn send(&self, peer: usize, tag: u16, buf: &[u8]) -> Result<(), CommError> {
        self.isend(peer, tag, buf).wait().map(|_| ())
    }

    /// Blocking receive of one whole message.
    fn recv(&self, peer: usize, tag: u16) -> Result<Vec<u8>, CommError> {
        self.irecv(peer, tag)
            .wait()?
            .ok_or(CommError::NoData { peer, tag })
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Result<Option<Vec<u8>>, CommError>;
}

impl Wait for () {
    fn wait(self) -> Result<Option<Vec<u8>>, CommError> {
        Ok(None)
    }
}

/// Handle for an operation that completed (or failed) when it was posted.
#[derive(Debug)]
pub struct Ready(Result<(), CommError>);

impl Ready {
    pub fn new(res: Result<(), CommError>) -> Self {
        Ready(res)
    }
}

impl Wait for Ready {
    fn wait(self) -> Result<Option<Vec<u8>>, CommError> {
        self.0.map(|()| None)
    }
}

/// Compile-time no-op comm: a single-rank group for pure serial unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16) {}

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn is_no_comm(&self) -> bool {
        true
    }
}

// --- ThreadComm: intra-process / one thread per rank ---
type Key = (usize, usize, u16); // (src, dst, tag)

#[derive(Debug, Default)]
struct Slot {
    queue: Mutex<VecDeque<Bytes>>,
    ready: Condvar,
}

#[derive(Debug, Default)]
struct Mailbox {
    slots: DashMap<Key, Arc<Slot>>,
}

impl Mailbox {
    fn slot(&self, key: Key) -> Arc<Slot> {
        self.slots.entry(key).or_default().value().clone()
    }

    fn pending(&self) -> usize {
        self.slots
            .iter()
            .map(|entry| entry.value().queue.lock().len())
            .sum()
    }
}

/// Receive handle of a [`ThreadComm`]; blocks in `wait` until a message arrives.
#[derive(Debug)]
pub struct LocalRecv {
    slot: Result<Arc<Slot>, CommError>,
    peer: usize,
    tag: u16,
    timeout: Option<Duration>,
}

impl Wait for LocalRecv {
    fn wait(self) -> Result<Option<Vec<u8>>, CommError> {
        let slot = self.slot?;
        let mut queue = slot.queue.lock();
        let deadline = self.timeout.map(|t| Instant::now() + t);
        loop {
            if let Some(bytes) = queue.pop_front() {
                return Ok(Some(bytes.to_vec()));
            }
            match deadline {
                None => slot.ready.wait(&mut queue),
                Some(deadline) => {
                    if slot.ready.wait_until(&mut queue, deadline).timed_out() {
                        return match queue.pop_front() {
                            Some(bytes) => Ok(Some(bytes.to_vec())),
                            None => Err(CommError::Timeout {
                                peer: self.peer,
                                tag: self.tag,
                                waited: self.timeout.unwrap_or_default(),
                            }),
                        };
                    }
                }
            }
        }
    }
}

/// One endpoint of an in-process group. Clones share the same mailbox.
#[derive(Clone, Debug)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
    timeout: Option<Duration>,
}

impl ThreadComm {
    /// Build `size` connected endpoints, ranks `0..size` in order.
    pub fn group(size: usize) -> Vec<Self> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| Self {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
                timeout: None,
            })
            .collect()
    }

    /// Make every receive on this endpoint fail after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Messages posted to the group but not yet received by anyone.
    pub fn pending(&self) -> usize {
        self.mailbox.pending()
    }

    /// Run `f` once per endpoint, each on its own scoped thread, and collect
    /// the results in rank order. A panic on any rank is re-raised here.
    pub fn run_group<R, F>(comms: Vec<ThreadComm>, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(ThreadComm) -> R + Sync,
    {
        std::thread::scope(|s| {
            let f = &f;
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| s.spawn(move || f(comm)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|p| std::panic::resume_unwind(p)))
                .collect()
        })
    }

    fn check_peer(&self, peer: usize) -> Result<(), CommError> {
        if peer < self.size {
            Ok(())
        } else {
            Err(CommError::PeerOutOfRange {
                peer,
                size: self.size,
            })
        }
    }
}

impl Communicator for ThreadComm {
    type SendHandle = Ready;
    type RecvHandle = LocalRecv;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Ready {
        if let Err(e) = self.check_peer(peer) {
            return Ready(Err(e));
        }
        let slot = self.mailbox.slot((self.rank, peer, tag));
        slot.queue.lock().push_back(Bytes::copy_from_slice(buf));
        slot.ready.notify_all();
        log::trace!("rank {} -> {peer} tag {tag:#06x}: {} bytes", self.rank, buf.len());
        Ready(Ok(()))
    }

    fn irecv(&self, peer: usize, tag: u16) -> LocalRecv {
        let slot = self
            .check_peer(peer)
            .map(|()| self.mailbox.slot((peer, self.rank, tag)));
        LocalRecv {
            slot,
            peer,
            tag,
            timeout: self.timeout,
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::environment::Universe;
    use mpi::traits::{Communicator as _, Destination as _, Source as _};

    /// One MPI process of `MPI_COMM_WORLD`. Finalizes MPI when the last clone drops.
    #[derive(Clone)]
    pub struct MpiComm {
        universe: Arc<Universe>,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        pub fn new() -> Result<Self, CommError> {
            let universe = mpi::initialize()
                .ok_or_else(|| CommError::Backend("MPI is already initialized".into()))?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                universe: Arc::new(universe),
                rank,
                size,
            })
        }

        fn check_peer(&self, peer: usize) -> Result<(), CommError> {
            if peer < self.size {
                Ok(())
            } else {
                Err(CommError::PeerOutOfRange {
                    peer,
                    size: self.size,
                })
            }
        }
    }

    /// Deferred matched-probe receive; the message size is learned on `wait`.
    pub struct MpiRecv {
        universe: Arc<Universe>,
        peer: Result<usize, CommError>,
        tag: u16,
    }

    impl Wait for MpiRecv {
        fn wait(self) -> Result<Option<Vec<u8>>, CommError> {
            let peer = self.peer?;
            let world = self.universe.world();
            let (data, _status) = world
                .process_at_rank(peer as mpi::Rank)
                .receive_vec_with_tag::<u8>(self.tag as mpi::Tag);
            Ok(Some(data))
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = Ready;
        type RecvHandle = MpiRecv;

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Ready {
            if let Err(e) = self.check_peer(peer) {
                return Ready(Err(e));
            }
            self.universe
                .world()
                .process_at_rank(peer as mpi::Rank)
                .send_with_tag(buf, tag as mpi::Tag);
            Ready(Ok(()))
        }

        fn irecv(&self, peer: usize, tag: u16) -> MpiRecv {
            MpiRecv {
                universe: Arc::clone(&self.universe),
                peer: self.check_peer(peer).map(|()| peer),
                tag,
            }
        }

        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.size
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (ThreadComm, ThreadComm) {
        let mut comms = ThreadComm::group(2);
        let c1 = comms.pop().unwrap();
        let c0 = comms.pop().unwrap();
        (c0, c1)
    }

    #[test]
    fn thread_roundtrip_two_ranks() {
        let (comm0, comm1) = pair();

        // Post the receive on "rank 1" before anything is sent.
        let recv_handle = comm1.irecv(0, 7);
        let send_handle = comm0.isend(1, 7, &[1, 2, 3, 4]);
        assert_eq!(send_handle.wait().unwrap(), None);

        let data = recv_handle
            .wait()
            .unwrap()
            .expect("Expected to receive data from rank 0");
        assert_eq!(data, vec![1, 2, 3, 4]);
        assert_eq!(comm0.pending(), 0);
    }

    #[test]
    fn receive_blocks_until_send() {
        let (comm0, comm1) = pair();
        let out = ThreadComm::run_group(vec![comm0, comm1], |c| {
            if c.rank() == 0 {
                std::thread::sleep(Duration::from_millis(20));
                c.send(1, 3, b"late").unwrap();
                Vec::new()
            } else {
                c.recv(0, 3).unwrap()
            }
        });
        assert_eq!(out[1], b"late".to_vec());
    }

    #[test]
    fn timeout_surfaces_as_error() {
        let (_comm0, comm1) = pair();
        let comm1 = comm1.with_timeout(Duration::from_millis(10));
        let err = comm1.recv(0, 1).unwrap_err();
        assert!(matches!(err, CommError::Timeout { peer: 0, tag: 1, .. }));
    }

    #[test]
    fn peer_out_of_range() {
        let (comm0, _comm1) = pair();
        assert_eq!(
            comm0.send(5, 1, &[0]).unwrap_err(),
            CommError::PeerOutOfRange { peer: 5, size: 2 }
        );
        assert_eq!(
            comm0.recv(2, 1).unwrap_err(),
            CommError::PeerOutOfRange { peer: 2, size: 2 }
        );
    }

    #[test]
    fn no_comm_is_single_rank() {
        let comm = NoComm;
        assert!(comm.is_no_comm());
        assert_eq!((comm.rank(), comm.size()), (0, 1));
        assert_eq!(comm.irecv(0, 1).wait().unwrap(), None);
        assert_eq!(
            comm.recv(0, 1).unwrap_err(),
            CommError::NoData { peer: 0, tag: 1 }
        );
    }

    #[test]
    fn tag_offset_wraps() {
        assert_eq!(CommTag::new(0xFFFF).offset(2), CommTag(1));
        assert_eq!(CommTag::new(0x10).offset(1).as_u16(), 0x11);
    }

    #[cfg(feature = "mpi-support")]
    #[test]
    fn mpi_roundtrip() {
        let comm = MpiComm::new().expect("MPI initialization failed");
        let size = comm.size();
        let nbr = (comm.rank() + 1) % size;
        let from = (comm.rank() + size - 1) % size;
        let r = comm.irecv(from, 9);
        comm.send(nbr, 9, &[42]).unwrap();
        assert_eq!(r.wait().unwrap(), Some(vec![42]));
    }
}
