//! Hash ring data structure.
//!
//! Holds `BTreeMap<HashId, Vnode>` and the successor walk.
//!
//! # Algorithm
//!
//! 1. Find the first vnode at or after the hash (wrapping past the end)
//! 2. Continue clockwise, skipping vnodes whose host is already in the set
//! 3. Stop after `n` distinct hosts
//!
//! # Performance
//!
//! - **Lookup**: O(log v + w) where v = vnodes, w = vnodes walked
//! - **Membership change**: O(k log v) where k = vnodes of the host

use crate::error::{Error, Result};
use crate::hash::HashId;
use crate::locator::{Locator, Lookup};
use crate::partitioner::{Blake3Partitioner, Partitioner};
use crate::vnode::Vnode;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Vnodes per host when the builder is not told otherwise.
pub const DEFAULT_VNODES: usize = 32;

/// In-memory consistent hash ring.
///
/// # Thread Safety
///
/// The vnode table sits behind a `parking_lot::RwLock`. Lookups take the read
/// lock for the duration of one walk and never hold it across an `.await`.
pub struct HashRing {
    partitioner: Arc<dyn Partitioner>,
    vnodes: RwLock<BTreeMap<HashId, Vnode>>,
}

impl HashRing {
    /// Empty ring using the blake3 partitioner.
    pub fn new() -> Self {
        Self::with_partitioner(Blake3Partitioner)
    }

    pub fn with_partitioner(partitioner: impl Partitioner) -> Self {
        Self {
            partitioner: Arc::new(partitioner),
            vnodes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Place `count` vnodes for `host` on the ring.
    ///
    /// Vnode ids derive from host and index, so adding a host twice leaves the
    /// ring unchanged. Returns the host's vnodes.
    pub fn add_host(&self, host: &str, count: usize) -> Vec<Vnode> {
        let added: Vec<Vnode> = (0..count)
            .map(|idx| Vnode::from_index(self.partitioner.as_ref(), host, idx))
            .collect();

        let mut table = self.vnodes.write();
        for vn in &added {
            table.insert(vn.id, vn.clone());
        }
        added
    }

    /// Remove every vnode of `host`. Returns false if the host was not a member.
    pub fn remove_host(&self, host: &str) -> bool {
        let mut table = self.vnodes.write();
        let before = table.len();
        table.retain(|_, vn| vn.host != host);
        table.len() != before
    }

    /// Vnodes of one host, in ring order.
    pub fn vnodes_of(&self, host: &str) -> Result<Vec<Vnode>> {
        let owned: Vec<Vnode> = self
            .vnodes
            .read()
            .values()
            .filter(|vn| vn.host == host)
            .cloned()
            .collect();
        if owned.is_empty() {
            return Err(Error::UnknownHost(host.to_string()));
        }
        Ok(owned)
    }

    /// All vnodes in ring order.
    pub fn vnodes(&self) -> Vec<Vnode> {
        self.vnodes.read().values().cloned().collect()
    }

    /// Distinct hosts, sorted.
    pub fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .vnodes
            .read()
            .values()
            .map(|vn| vn.host.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        hosts.sort();
        hosts
    }

    pub fn host_count(&self) -> usize {
        self.hosts().len()
    }

    pub fn vnode_count(&self) -> usize {
        self.vnodes.read().len()
    }

    pub fn partitioner_name(&self) -> &'static str {
        self.partitioner.name()
    }

    /// Predecessor and `n` host-distinct successors of `hash`.
    fn resolve(&self, hash: HashId, n: usize) -> Result<Lookup> {
        let n = n.max(1);
        let table = self.vnodes.read();

        let Some(primary) = table
            .range(..hash)
            .next_back()
            .or_else(|| table.iter().next_back())
            .map(|(_, vn)| vn.clone())
        else {
            return Err(Error::EmptyRing);
        };

        let mut seen = HashSet::new();
        let mut successors = Vec::with_capacity(n);
        for (_, vn) in table.range(hash..).chain(table.range(..hash)) {
            if !seen.insert(vn.host.as_str()) {
                continue;
            }
            successors.push(vn.clone());
            if successors.len() == n {
                break;
            }
        }

        if successors.len() < n {
            return Err(Error::InsufficientVnodes {
                requested: n,
                available: successors.len(),
            });
        }

        Ok(Lookup {
            hash,
            primary,
            successors,
        })
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Locator for HashRing {
    async fn lookup_key(&self, key: &[u8], n: usize) -> Result<Lookup> {
        let hash = self.partitioner.partition(key);
        self.resolve(hash, n)
    }

    async fn lookup_hash(&self, hash: &HashId, n: usize) -> Result<Lookup> {
        self.resolve(*hash, n)
    }
}

/// Builder for [`HashRing`].
pub struct RingBuilder {
    partitioner: Option<Box<dyn FnOnce() -> HashRing>>,
    vnodes: usize,
    hosts: Vec<(String, Option<usize>)>,
}

impl RingBuilder {
    pub fn new() -> Self {
        Self {
            partitioner: None,
            vnodes: DEFAULT_VNODES,
            hosts: Vec::new(),
        }
    }

    /// Default vnode count for hosts added without an explicit one.
    pub fn with_vnodes(mut self, vnodes: usize) -> Self {
        self.vnodes = vnodes;
        self
    }

    pub fn with_partitioner<P: Partitioner>(mut self, partitioner: P) -> Self {
        self.partitioner = Some(Box::new(move || HashRing::with_partitioner(partitioner)));
        self
    }

    pub fn add_host(mut self, host: impl Into<String>) -> Self {
        self.hosts.push((host.into(), None));
        self
    }

    pub fn add_host_with_vnodes(mut self, host: impl Into<String>, vnodes: usize) -> Self {
        self.hosts.push((host.into(), Some(vnodes)));
        self
    }

    pub fn build(self) -> HashRing {
        let ring = match self.partitioner {
            Some(make) => make(),
            None => HashRing::new(),
        };
        for (host, vnodes) in &self.hosts {
            ring.add_host(host, vnodes.unwrap_or(self.vnodes));
        }
        ring
    }
}

impl Default for RingBuilder {
    fn default() -> Self {
        Self::new()
    }
}
