//! In-process transport.
//!
//! [`LocalCluster`] keeps one store per vnode in memory and implements every
//! transport trait against it. Block and entry-log calls are routed by
//! `Location.vnode.id`; a vnode marked down fails every call with
//! [`TransportError::Unavailable`].
//!
//! The transaction log is kept per host and shared by all of its vnodes, so a
//! transaction proposed on a host through the vnode replicating its key can be
//! read back through whichever vnode of that host the id routes to.
//!
//! # Log semantics
//!
//! - `new_*` hands out the next entry chained on the last committed id
//! - `propose_*` rejects an entry whose `previous` is not the current head
//! - `commit_*` rejects entries that were never proposed, then advances the
//!   head; committing the current head again is accepted
//!
//! Committed log entries are also stored as blocks so they can be read back
//! by id.

use crate::error::TransportError;
use crate::transport::{BlockTransport, EntryLogTransport, TransportResult, TxLogTransport};
use async_trait::async_trait;
use corelib::{Block, HashId, Location, LogBlock, LogEntryBlock, Meta, RequestOptions, Tx, TxOptions, TypedBlock};
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tracing::trace;

#[derive(Default)]
struct HostTxLog {
    /// Proposed transactions by id.
    txs: DashMap<HashId, Tx>,
    /// Committed head per tx log key.
    heads: DashMap<Vec<u8>, Meta>,
}

impl HostTxLog {
    fn head(&self, key: &[u8]) -> Meta {
        self.heads
            .get(key)
            .map(|m| m.clone())
            .unwrap_or_else(|| Meta::new(key))
    }
}

#[derive(Default)]
struct VnodeStore {
    blocks: DashMap<HashId, Block>,
    /// Proposed entries by id.
    entries: DashMap<HashId, LogEntryBlock>,
    logs: DashMap<Vec<u8>, LogBlock>,
}

impl VnodeStore {
    fn log(&self, key: &[u8]) -> LogBlock {
        self.logs
            .get(key)
            .map(|l| l.clone())
            .unwrap_or_else(|| LogBlock::new(key))
    }
}

/// Every vnode of a ring, served from this process.
#[derive(Default)]
pub struct LocalCluster {
    stores: DashMap<HashId, Arc<VnodeStore>>,
    tx_logs: DashMap<String, Arc<HostTxLog>>,
    down: DashSet<HashId>,
}

impl LocalCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a vnode unreachable (or reachable again).
    pub fn set_down(&self, vnode: &HashId, down: bool) {
        if down {
            self.down.insert(*vnode);
        } else {
            self.down.remove(vnode);
        }
    }

    pub fn is_down(&self, vnode: &HashId) -> bool {
        self.down.contains(vnode)
    }

    /// Whether `vnode` holds block `id`, regardless of its up/down state.
    pub fn holds_block(&self, vnode: &HashId, id: &HashId) -> bool {
        self.stores
            .get(vnode)
            .map(|s| s.blocks.contains_key(id))
            .unwrap_or(false)
    }

    /// Number of blocks held by `vnode`.
    pub fn block_count(&self, vnode: &HashId) -> usize {
        self.stores.get(vnode).map(|s| s.blocks.len()).unwrap_or(0)
    }

    fn store(&self, loc: &Location) -> TransportResult<Arc<VnodeStore>> {
        if self.down.contains(&loc.vnode.id) {
            return Err(TransportError::Unavailable(loc.vnode.short()));
        }
        let store = self.stores.entry(loc.vnode.id).or_default();
        Ok(Arc::clone(store.value()))
    }

    fn tx_log(&self, loc: &Location) -> TransportResult<Arc<HostTxLog>> {
        if self.down.contains(&loc.vnode.id) {
            return Err(TransportError::Unavailable(loc.vnode.short()));
        }
        let log = self.tx_logs.entry(loc.vnode.host.clone()).or_default();
        Ok(Arc::clone(log.value()))
    }
}

fn reject(loc: &Location, reason: impl Into<String>) -> TransportError {
    TransportError::Rejected {
        vnode: loc.vnode.short(),
        reason: reason.into(),
    }
}

fn entry_block(loc: &Location, entry: &LogEntryBlock) -> TransportResult<Block> {
    entry.to_block().map_err(|e| reject(loc, e.to_string()))
}

#[async_trait]
impl TxLogTransport for LocalCluster {
    async fn new_tx(&self, loc: &Location, key: &[u8], _opts: &TxOptions) -> TransportResult<(Tx, Meta)> {
        let head = self.tx_log(loc)?.head(key);
        Ok((head.next_tx(), head))
    }

    async fn propose_tx(&self, loc: &Location, tx: &Tx, opts: &TxOptions) -> TransportResult<Meta> {
        let log = self.tx_log(loc)?;
        let head = log.head(&tx.key);
        if tx.previous != head.last_tx {
            return Err(reject(loc, "tx does not extend the current head"));
        }
        trace!(tx = %tx.id().short(), dst = %loc.vnode.short(), src = ?opts.source, "Tx proposed");
        log.txs.insert(tx.id(), tx.clone());
        Ok(head)
    }

    async fn commit_tx(&self, loc: &Location, tx: &Tx, _opts: &TxOptions) -> TransportResult<Meta> {
        let log = self.tx_log(loc)?;
        let id = tx.id();
        let head = log.head(&tx.key);
        if head.last_tx == id {
            return Ok(head);
        }
        if !log.txs.contains_key(&id) {
            return Err(reject(loc, "tx was not proposed"));
        }
        if tx.previous != head.last_tx {
            return Err(reject(loc, "tx does not extend the current head"));
        }

        let next = Meta {
            key: tx.key.clone(),
            last_tx: id,
            height: tx.height,
        };
        log.heads.insert(tx.key.clone(), next.clone());
        Ok(next)
    }

    async fn get_tx(&self, loc: &Location, id: &HashId, _opts: &TxOptions) -> TransportResult<Option<(Tx, Meta)>> {
        let log = self.tx_log(loc)?;
        let Some(tx) = log.txs.get(id).map(|t| t.clone()) else {
            return Ok(None);
        };
        let head = log.head(&tx.key);
        Ok(Some((tx, head)))
    }
}

#[async_trait]
impl EntryLogTransport for LocalCluster {
    async fn new_entry(
        &self,
        loc: &Location,
        key: &[u8],
        _opts: &RequestOptions,
    ) -> TransportResult<(LogEntryBlock, Location)> {
        let log = self.store(loc)?.log(key);
        let entry = LogEntryBlock {
            key: key.to_vec(),
            previous: log.last_entry(),
            height: log.height + 1,
            data: Vec::new(),
        };
        Ok((entry, loc.clone()))
    }

    async fn propose_entry(
        &self,
        loc: &Location,
        entry: &LogEntryBlock,
        _opts: &RequestOptions,
    ) -> TransportResult<Location> {
        let store = self.store(loc)?;
        if entry.previous != store.log(&entry.key).last_entry() {
            return Err(reject(loc, "entry does not extend the current head"));
        }
        let id = entry_block(loc, entry)?.id();
        store.entries.insert(id, entry.clone());
        Ok(loc.clone())
    }

    async fn commit_entry(
        &self,
        loc: &Location,
        entry: &LogEntryBlock,
        _opts: &RequestOptions,
    ) -> TransportResult<Location> {
        let store = self.store(loc)?;
        let block = entry_block(loc, entry)?;
        let id = block.id();

        let mut log = store.log(&entry.key);
        if log.last_entry() == id {
            return Ok(loc.clone());
        }
        if !store.entries.contains_key(&id) {
            return Err(reject(loc, "entry was not proposed"));
        }
        if entry.previous != log.last_entry() {
            return Err(reject(loc, "entry does not extend the current head"));
        }

        log.entries.push(id);
        log.height = entry.height;
        store.logs.insert(entry.key.clone(), log);
        store.blocks.insert(id, block);
        Ok(loc.clone())
    }

    async fn get_log_block(
        &self,
        loc: &Location,
        key: &[u8],
        _opts: &RequestOptions,
    ) -> TransportResult<Option<(LogBlock, Location)>> {
        let store = self.store(loc)?;
        let found = store.logs.get(key).map(|l| l.clone());
        Ok(found.map(|log| (log, loc.clone())))
    }
}

#[async_trait]
impl BlockTransport for LocalCluster {
    async fn get_block(&self, loc: &Location, id: &HashId) -> TransportResult<Option<Block>> {
        let store = self.store(loc)?;
        let found = store.blocks.get(id).map(|b| b.clone());
        Ok(found)
    }

    async fn set_block(&self, loc: &Location, block: &Block) -> TransportResult<()> {
        self.store(loc)?.blocks.insert(block.id(), block.clone());
        Ok(())
    }

    async fn transfer_block(&self, loc: &Location, id: &HashId) -> TransportResult<()> {
        let target = self.store(loc)?;
        let found = self
            .stores
            .iter()
            .find_map(|s| s.value().blocks.get(id).map(|b| b.clone()));
        match found {
            Some(block) => {
                target.blocks.insert(*id, block);
                Ok(())
            }
            None => Err(TransportError::BlockMissing(id.short())),
        }
    }

    async fn release_block(&self, loc: &Location, id: &HashId) -> TransportResult<()> {
        match self.store(loc)?.blocks.remove(id) {
            Some(_) => Ok(()),
            None => Err(TransportError::BlockMissing(id.short())),
        }
    }
}
