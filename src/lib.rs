#![cfg_attr(docsrs, feature(doc_cfg))]
//! # rank-scatter
//!
//! rank-scatter provides collective data-distribution primitives (scatter, block scatter and gather) over a group of cooperating ranks that communicate through a pluggable point-to-point transport.
//!
//! ## Features
//! - `scatter` / `scatter_pod`: the root hands value `i` of its payload to rank `i`
//! - `scatter_blocks`: a sequence of any length split into contiguous, near-equal blocks
//! - `gather`: the inverse; the root collects one value per rank in rank order
//! - Pluggable transports: serial (`NoComm`), in-process threads (`ThreadComm`), MPI (`MpiComm`)
//! - Versioned little-endian wire frames, `bytemuck` records or `serde` values
//!
//! ## Usage
//! Add `rank-scatter` as a dependency in your `Cargo.toml` and enable features as needed:
//!
//! ```toml
//! [dependencies]
//! rank-scatter = "0.1"
//! # Optional features:
//! # features = ["mpi-support"]
//! ```
//!
//! ```
//! use rank_scatter::prelude::*;
//!
//! let results = ThreadComm::run_group(ThreadComm::group(4), |comm| {
//!     let input = if comm.rank() == 0 {
//!         RootInput::Payload((1..=4u64).map(|i| i * i).collect())
//!     } else {
//!         RootInput::NonRoot
//!     };
//!     scatter::<_, u64>(&comm, 0, input, &ScatterConfig::default())
//! });
//! let got: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
//! assert_eq!(got, vec![1, 4, 9, 16]);
//! ```
//!
//! ## Matching
//! Messages of one call are matched by a [`CommTag`](algs::communicator::CommTag) and
//! are FIFO per `(source, destination, tag)`. Back-to-back calls on the same tag are
//! safe; calls that may overlap need distinct tags.

pub mod algs;
pub mod scatter_error;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{CommError, CommTag, Communicator, NoComm, ThreadComm, Wait};
    pub use crate::algs::gather::{DEFAULT_GATHER_TAG, gather};
    pub use crate::algs::partition::block_ranges;
    pub use crate::algs::scatter::{
        Block, DEFAULT_SCATTER_TAG, NonRootPayload, RootInput, ScatterConfig, scatter,
        scatter_blocks, scatter_pod,
    };
    pub use crate::scatter_error::ScatterError;
    pub use crate::topology::group::Group;
}
