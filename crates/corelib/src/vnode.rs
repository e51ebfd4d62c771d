//! Virtual node abstractions.
//!
//! # Virtual Nodes (VNodes) Concept
//!
//! Each physical host owns several positions on the ring. Every position is a
//! [`Vnode`]: a ring identity plus the address of the host serving it. Replica
//! sets are made of vnodes, and every transport call targets exactly one.
//!
//! The coordinator never mutates a vnode. It only compares ids (to recognise
//! the source of a relayed write) and hands the descriptor to a transport.

use crate::hash::HashId;
use crate::partitioner::Partitioner;
use serde::{Deserialize, Serialize};

/// A virtual node on the hash ring.
///
/// # Invariants
///
/// - The `id` is the vnode's ring position; no two vnodes share one
/// - Every `Vnode` belongs to exactly one host
///
/// # Example
///
/// ```rust
/// use corelib::{Blake3Partitioner, Vnode};
///
/// let vn = Vnode::from_index(&Blake3Partitioner, "10.0.0.1:4624", 0);
/// assert_eq!(vn.host, "10.0.0.1:4624");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vnode {
    /// Ring position and identity of this vnode.
    pub id: HashId,

    /// Address of the host that serves this vnode.
    ///
    /// Several vnodes share one host; replica placement deduplicates on it.
    pub host: String,
}

impl Vnode {
    /// Create a vnode from an explicit id.
    #[inline]
    pub fn new(id: HashId, host: impl Into<String>) -> Self {
        Self {
            id,
            host: host.into(),
        }
    }

    /// Create a vnode from a host and vnode index.
    ///
    /// # Algorithm
    ///
    /// 1. Format string: "host/vnode_index"
    /// 2. Hash it through the ring's partitioner
    ///
    /// The same host and index always land on the same position, so a host
    /// that rejoins reclaims its old vnodes.
    pub fn from_index<P: Partitioner + ?Sized>(partitioner: &P, host: &str, vnode_index: usize) -> Self {
        let label = format!("{}/{}", host, vnode_index);
        Self::new(partitioner.partition(label.as_bytes()), host)
    }

    /// Short printable form, `host/abcdef012345`.
    pub fn short(&self) -> String {
        format!("{}/{}", self.host, self.id.short())
    }
}

impl std::fmt::Display for Vnode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Vnode(id={}, host={})", self.id.short(), self.host)
    }
}
