//! Re-export public algorithms.

pub mod communicator;
pub mod gather;
pub mod partition;
pub mod scatter;
pub mod wire;

pub use gather::gather;
pub use scatter::{scatter, scatter_blocks, scatter_pod};
