//! Partitioner abstraction for the ring.
//!
//! Partitioners turn keys and vnode labels into [`HashId`](crate::HashId)
//! positions on the ring.

pub mod blake3;
pub mod traits;

pub use self::blake3::Blake3Partitioner;
pub use traits::Partitioner;
