#![allow(dead_code)]
use rank_scatter::algs::communicator::{CommError, Communicator, LocalRecv, Ready, ThreadComm};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Build an `n`-rank group and run `f` on every rank, collecting results in rank order.
pub fn run<R, F>(n: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(ThreadComm) -> R + Sync,
{
    ThreadComm::run_group(ThreadComm::group(n), f)
}

/// Transport double that counts every posted send and receive.
#[derive(Clone, Debug)]
pub struct CountingComm {
    inner: ThreadComm,
    sends: Arc<AtomicUsize>,
    recvs: Arc<AtomicUsize>,
}

impl CountingComm {
    pub fn new(inner: ThreadComm) -> Self {
        Self {
            inner,
            sends: Arc::new(AtomicUsize::new(0)),
            recvs: Arc::new(AtomicUsize::new(0)),
        }
    }
    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
    pub fn recvs(&self) -> usize {
        self.recvs.load(Ordering::SeqCst)
    }
}

impl Communicator for CountingComm {
    type SendHandle = Ready;
    type RecvHandle = LocalRecv;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Ready {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.inner.isend(peer, tag, buf)
    }
    fn irecv(&self, peer: usize, tag: u16) -> LocalRecv {
        self.recvs.fetch_add(1, Ordering::SeqCst);
        self.inner.irecv(peer, tag)
    }
    fn rank(&self) -> usize {
        self.inner.rank()
    }
    fn size(&self) -> usize {
        self.inner.size()
    }
}

/// Transport double whose sends to `broken` always fail.
#[derive(Clone, Debug)]
pub struct FlakyComm {
    pub inner: ThreadComm,
    pub broken: usize,
}

impl Communicator for FlakyComm {
    type SendHandle = Ready;
    type RecvHandle = LocalRecv;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Ready {
        if peer == self.broken {
            return Ready::new(Err(CommError::Backend(format!("link to {peer} is down"))));
        }
        self.inner.isend(peer, tag, buf)
    }
    fn irecv(&self, peer: usize, tag: u16) -> LocalRecv {
        self.inner.irecv(peer, tag)
    }
    fn rank(&self) -> usize {
        self.inner.rank()
    }
    fn size(&self) -> usize {
        self.inner.size()
    }
}
