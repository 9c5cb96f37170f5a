//! Group membership for collective operations.
//!
//! A [`Group`] is the caller's position `(rank, size)` in a fixed set of
//! contiguous, zero-based ranks. It is validated once and then used to check
//! root ranks before any message is exchanged.

use crate::algs::communicator::Communicator;
use crate::scatter_error::ScatterError;
use std::ops::Range;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Group {
    rank: usize,
    size: usize,
}

impl Group {
    /// Validate `size >= 1` and `rank < size`.
    pub fn new(rank: usize, size: usize) -> Result<Self, ScatterError> {
        if size == 0 {
            return Err(ScatterError::InvalidGroup { size });
        }
        if rank >= size {
            return Err(ScatterError::InvalidRank { rank, size });
        }
        Ok(Self { rank, size })
    }

    /// The group seen by a transport endpoint.
    pub fn of<C: Communicator + ?Sized>(comm: &C) -> Result<Self, ScatterError> {
        Self::new(comm.rank(), comm.size())
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn ranks(&self) -> Range<usize> {
        0..self.size
    }

    pub fn is_root(&self, root: usize) -> bool {
        self.rank == root
    }

    /// Fails with `InvalidRank` unless `root` is a member.
    pub fn check_root(&self, root: usize) -> Result<(), ScatterError> {
        if root < self.size {
            Ok(())
        } else {
            Err(ScatterError::InvalidRank {
                rank: root,
                size: self.size,
            })
        }
    }

    /// Every rank except `root`, ascending.
    pub fn peers_of(&self, root: usize) -> impl Iterator<Item = usize> + use<> {
        (0..self.size).filter(move |&r| r != root)
    }
}
