//! Test doubles for the coordinator.
//!
//! `StaticLocator` returns a fixed replica set in a fixed order so tests can
//! name replicas r1, r2, r3. `MockTransport` implements every transport trait,
//! records each call, and can be told to fail or answer per vnode.

#![allow(dead_code)]

use async_trait::async_trait;
use corelib::{
    Block, HashId, Location, Locator, LogBlock, LogEntryBlock, Lookup, Meta, RequestOptions, Tx, TxOptions, Vnode,
};
use parking_lot::Mutex;
use replication::{BlockTransport, EntryLogTransport, TransportError, TransportResult, TxLogTransport};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;

/// Replica `i` (1-based): id `[i; 32]`, host `r{i}`.
pub fn replica(i: u8) -> Vnode {
    Vnode::new(replica_id(i), format!("r{}", i))
}

pub fn replica_id(i: u8) -> HashId {
    HashId([i; 32])
}

/// Always resolves to the same ordered vnodes.
pub struct StaticLocator {
    vnodes: Vec<Vnode>,
}

impl StaticLocator {
    pub fn with_replicas(n: u8) -> Self {
        Self {
            vnodes: (1..=n).map(replica).collect(),
        }
    }

    pub fn shared(n: u8) -> Arc<dyn Locator> {
        Arc::new(Self::with_replicas(n))
    }
}

#[async_trait]
impl Locator for StaticLocator {
    async fn lookup_key(&self, key: &[u8], n: usize) -> corelib::Result<Lookup> {
        self.lookup_hash(&HashId::digest(key), n).await
    }

    async fn lookup_hash(&self, hash: &HashId, n: usize) -> corelib::Result<Lookup> {
        if self.vnodes.is_empty() {
            return Err(corelib::Error::EmptyRing);
        }
        if n > self.vnodes.len() {
            return Err(corelib::Error::InsufficientVnodes {
                requested: n,
                available: self.vnodes.len(),
            });
        }
        Ok(Lookup {
            hash: *hash,
            primary: self.vnodes[self.vnodes.len() - 1].clone(),
            successors: self.vnodes[..n].to_vec(),
        })
    }
}

/// One recorded transport call.
#[derive(Debug, Clone)]
pub struct Call {
    pub op: &'static str,
    pub vnode: HashId,
    pub opts: Option<RequestOptions>,
}

#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<HashId, TransportError>>,
    blocks: Mutex<HashMap<HashId, Block>>,
    logs: Mutex<HashMap<HashId, LogBlock>>,
    txs: Mutex<HashMap<HashId, (Tx, Meta)>>,
    barrier: Mutex<Option<Arc<Barrier>>>,
    hangs: Mutex<HashSet<HashId>>,
    abandoned: Arc<AtomicUsize>,
}

/// Bumps the shared counter when a hung call is dropped.
struct Abandon(Arc<AtomicUsize>);

impl Drop for Abandon {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every call to `vnode` fails with `err`.
    pub fn fail_on(&self, vnode: HashId, err: TransportError) {
        self.failures.lock().insert(vnode, err);
    }

    pub fn hold_block(&self, vnode: HashId, block: Block) {
        self.blocks.lock().insert(vnode, block);
    }

    pub fn hold_log(&self, vnode: HashId, log: LogBlock) {
        self.logs.lock().insert(vnode, log);
    }

    pub fn hold_tx(&self, vnode: HashId, tx: Tx, meta: Meta) {
        self.txs.lock().insert(vnode, (tx, meta));
    }

    /// Propose calls wait on `barrier` before answering.
    pub fn gate_proposals(&self, barrier: Arc<Barrier>) {
        *self.barrier.lock() = Some(barrier);
    }

    /// Propose calls to `vnode` never answer.
    pub fn hang_on(&self, vnode: HashId) {
        self.hangs.lock().insert(vnode);
    }

    /// Hung calls that were dropped by the caller.
    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, op: &str) -> Vec<Call> {
        self.calls.lock().iter().filter(|c| c.op == op).cloned().collect()
    }

    /// Vnodes contacted by `op`, in call order.
    pub fn contacted(&self, op: &str) -> Vec<HashId> {
        self.calls_for(op).into_iter().map(|c| c.vnode).collect()
    }

    fn record(&self, op: &'static str, loc: &Location, opts: Option<&RequestOptions>) -> TransportResult<()> {
        self.calls.lock().push(Call {
            op,
            vnode: loc.vnode.id,
            opts: opts.cloned(),
        });
        match self.failures.lock().get(&loc.vnode.id) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn maybe_hang(&self, loc: &Location) {
        let hangs = self.hangs.lock().contains(&loc.vnode.id);
        if hangs {
            let _guard = Abandon(Arc::clone(&self.abandoned));
            std::future::pending::<()>().await;
        }
    }

    async fn wait_gate(&self) {
        let barrier = self.barrier.lock().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
    }
}

#[async_trait]
impl TxLogTransport for MockTransport {
    async fn new_tx(&self, loc: &Location, key: &[u8], opts: &TxOptions) -> TransportResult<(Tx, Meta)> {
        self.record("new_tx", loc, Some(opts))?;
        let meta = Meta::new(key);
        Ok((meta.next_tx(), meta))
    }

    async fn propose_tx(&self, loc: &Location, tx: &Tx, opts: &TxOptions) -> TransportResult<Meta> {
        self.wait_gate().await;
        self.record("propose_tx", loc, Some(opts))?;
        self.maybe_hang(loc).await;
        Ok(Meta::new(tx.key.clone()))
    }

    async fn commit_tx(&self, loc: &Location, tx: &Tx, opts: &TxOptions) -> TransportResult<Meta> {
        self.record("commit_tx", loc, Some(opts))?;
        Ok(Meta {
            key: tx.key.clone(),
            last_tx: tx.id(),
            height: tx.height,
        })
    }

    async fn get_tx(&self, loc: &Location, _id: &HashId, opts: &TxOptions) -> TransportResult<Option<(Tx, Meta)>> {
        self.record("get_tx", loc, Some(opts))?;
        Ok(self.txs.lock().get(&loc.vnode.id).cloned())
    }
}

#[async_trait]
impl EntryLogTransport for MockTransport {
    async fn new_entry(
        &self,
        loc: &Location,
        key: &[u8],
        opts: &RequestOptions,
    ) -> TransportResult<(LogEntryBlock, Location)> {
        self.record("new_entry", loc, Some(opts))?;
        let entry = LogEntryBlock {
            key: key.to_vec(),
            height: 1,
            ..Default::default()
        };
        Ok((entry, loc.clone()))
    }

    async fn propose_entry(
        &self,
        loc: &Location,
        _entry: &LogEntryBlock,
        opts: &RequestOptions,
    ) -> TransportResult<Location> {
        self.wait_gate().await;
        self.record("propose_entry", loc, Some(opts))?;
        self.maybe_hang(loc).await;
        Ok(loc.clone())
    }

    async fn commit_entry(
        &self,
        loc: &Location,
        _entry: &LogEntryBlock,
        opts: &RequestOptions,
    ) -> TransportResult<Location> {
        self.record("commit_entry", loc, Some(opts))?;
        Ok(loc.clone())
    }

    async fn get_log_block(
        &self,
        loc: &Location,
        _key: &[u8],
        opts: &RequestOptions,
    ) -> TransportResult<Option<(LogBlock, Location)>> {
        self.record("get_log_block", loc, Some(opts))?;
        Ok(self.logs.lock().get(&loc.vnode.id).cloned().map(|log| (log, loc.clone())))
    }
}

#[async_trait]
impl BlockTransport for MockTransport {
    async fn get_block(&self, loc: &Location, _id: &HashId) -> TransportResult<Option<Block>> {
        self.record("get_block", loc, None)?;
        Ok(self.blocks.lock().get(&loc.vnode.id).cloned())
    }

    async fn set_block(&self, loc: &Location, block: &Block) -> TransportResult<()> {
        self.record("set_block", loc, None)?;
        self.blocks.lock().insert(loc.vnode.id, block.clone());
        Ok(())
    }

    async fn transfer_block(&self, loc: &Location, _id: &HashId) -> TransportResult<()> {
        self.record("transfer_block", loc, None)
    }

    async fn release_block(&self, loc: &Location, _id: &HashId) -> TransportResult<()> {
        self.record("release_block", loc, None)
    }
}
