//! ScatterError: Unified error type for rank-scatter public APIs
//!
//! Every collective returns this error to the calling rank; there is no
//! partial-success state. Transport errors are wrapped with the peer rank
//! they were observed on.

use std::time::Duration;
use thiserror::Error;

use crate::algs::communicator::CommError;
use crate::algs::wire::WireError;

/// Unified error type for collective operations.
#[derive(Debug, Error)]
pub enum ScatterError {
    /// A group must contain at least one rank.
    #[error("Invalid group: size must be at least 1 (got {size})")]
    InvalidGroup { size: usize },
    /// A rank (root or own) lies outside `0..size`.
    #[error("Invalid rank {rank} for group of size {size}")]
    InvalidRank { rank: usize, size: usize },
    /// The root payload does not hold exactly one value per rank.
    #[error("Shape mismatch: root payload has {found} values, group has {expected} ranks")]
    ShapeMismatch { expected: usize, found: usize },
    /// The root was called without a payload.
    #[error("Root rank {root} called without a payload")]
    MissingRootPayload { root: usize },
    /// A non-root rank supplied a payload under the strict policy.
    #[error("Non-root rank {rank} supplied a payload")]
    UnexpectedPayload { rank: usize },
    /// The transport failed to send to or receive from `peer`.
    #[error("Transport failure with rank {peer}: {source}")]
    TransportFailure {
        peer: usize,
        #[source]
        source: CommError,
    },
    /// The transport gave up waiting on `peer`.
    #[error("Transport timeout waiting on rank {peer} after {waited:?}")]
    TransportTimeout { peer: usize, waited: Duration },
    /// A frame exchanged with `peer` was malformed or could not be framed.
    #[error("Malformed message exchanged with rank {peer}: {source}")]
    Wire {
        peer: usize,
        #[source]
        source: WireError,
    },
    /// A value could not be encoded at the sender.
    #[error("Failed to encode value: {0}")]
    Encode(#[source] bincode::Error),
    /// A value received from `peer` could not be decoded.
    #[error("Failed to decode value from rank {peer}: {source}")]
    Decode {
        peer: usize,
        #[source]
        source: bincode::Error,
    },
}

impl ScatterError {
    /// Attach a peer rank to a transport error, splitting out timeouts.
    pub fn from_comm(peer: usize, err: CommError) -> Self {
        match err {
            CommError::Timeout { waited, .. } => ScatterError::TransportTimeout { peer, waited },
            source => ScatterError::TransportFailure { peer, source },
        }
    }

    /// True for errors caused by the caller's arguments rather than the transport.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ScatterError::InvalidGroup { .. }
                | ScatterError::InvalidRank { .. }
                | ScatterError::ShapeMismatch { .. }
                | ScatterError::MissingRootPayload { .. }
                | ScatterError::UnexpectedPayload { .. }
                | ScatterError::Encode(_)
        )
    }
}
