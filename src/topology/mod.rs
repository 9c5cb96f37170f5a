//! Group topology for collective operations.
//!
//! Ranks are contiguous and zero-based; a [`Group`] records the caller's
//! position in that set.

pub mod group;

pub use group::Group;
