//! Coordinator for the block store and its block-backed log.
//!
//! Block reads walk the replica set and stop at the first replica holding
//! the block. Block writes go to the primary only; spreading a block to the
//! rest of its replica set is left to propose/commit or to background repair.
//! Log entries follow the same propose/commit rules as [`LogRing`](crate::LogRing).

use crate::error::{Result, RingError};
use crate::fanout;
use crate::proximity::{ProximityShift, RelocationHint};
use crate::router::{LocatorRouter, RouteOutcome};
use crate::transport::{BlockTransport, EntryLogTransport};
use corelib::{Block, HashId, Location, Locator, LogBlock, LogEntryBlock, RequestOptions, RootBlock, TypedBlock};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Routes block and log-entry operations around the ring.
pub struct BlockRing {
    router: LocatorRouter,
    blocks: Arc<dyn BlockTransport>,
    log: Arc<dyn EntryLogTransport>,
    shift: ProximityShift,
    defaults: RequestOptions,
}

impl BlockRing {
    /// If `outlet` is present, proximity shifting starts enabled.
    pub fn new(
        locator: Arc<dyn Locator>,
        blocks: Arc<dyn BlockTransport>,
        log: Arc<dyn EntryLogTransport>,
        outlet: Option<mpsc::Sender<RelocationHint>>,
    ) -> Self {
        Self {
            router: LocatorRouter::new(locator),
            blocks,
            log,
            shift: ProximityShift::new(outlet),
            defaults: RequestOptions::default(),
        }
    }

    /// Options applied when a block call passes `None`.
    pub fn with_defaults(mut self, defaults: RequestOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &RequestOptions {
        &self.defaults
    }

    pub fn router(&self) -> &LocatorRouter {
        &self.router
    }

    /// Write `block` to the primary replica of its id.
    ///
    /// The replica set is resolved at the requested width, so a ring too small
    /// for it fails the write, but only the first-ranked replica is written.
    pub async fn set_block(&self, block: &Block, opts: Option<&RequestOptions>) -> Result<Location> {
        let opts = opts.unwrap_or(&self.defaults);
        let id = block.id();
        let loc = self
            .router
            .primary_for_hash(&id, opts.effective_peer_set_size())
            .await?;
        debug!(action = "set_block", block = %id.short(), dst = %loc.vnode.short(), "Writing block");
        self.blocks.set_block(&loc, block).await?;
        Ok(loc)
    }

    /// Read a block from the first replica that holds it.
    pub async fn get_block(&self, id: &HashId, opts: Option<&RequestOptions>) -> Result<(Location, Block)> {
        let opts = opts.unwrap_or(&self.defaults);
        let route = self.router.route_hash(id, opts.effective_peer_set_size()).await?;

        let blocks = &self.blocks;
        let outcome = route
            .first_found("get_block", move |loc| async move { blocks.get_block(&loc, id).await })
            .await;

        match outcome {
            RouteOutcome::Found { location, value } => Ok((location, value)),
            RouteOutcome::Exhausted { tried } => Err(RingError::NotFound { what: "block", tried }),
        }
    }

    /// Read a block and decode it as a [`RootBlock`].
    pub async fn get_root_block(&self, id: &HashId, opts: Option<&RequestOptions>) -> Result<(Location, RootBlock)> {
        let (loc, block) = self.get_block(id, opts).await?;
        Ok((loc, RootBlock::decode_block(&block)?))
    }

    /// Read the committed log for `key` from the first replica that has it.
    pub async fn get_log_block(&self, key: &[u8], opts: Option<&RequestOptions>) -> Result<(Location, LogBlock)> {
        let opts = opts.unwrap_or(&self.defaults);
        let route = self.router.route_key(key, opts.effective_peer_set_size()).await?;

        let log = &self.log;
        let outcome = route
            .first_found("get_log_block", move |loc| async move {
                let found = log.get_log_block(&loc, key, opts).await;
                found.map(|hit| hit.map(|(block, _ack)| block))
            })
            .await;

        match outcome {
            RouteOutcome::Found { location, value } => Ok((location, value)),
            RouteOutcome::Exhausted { tried } => Err(RingError::NotFound { what: "log block", tried }),
        }
    }

    /// Read a committed entry by id.
    pub async fn get_entry(&self, id: &HashId, opts: &RequestOptions) -> Result<(Location, LogEntryBlock)> {
        let (loc, block) = self.get_block(id, Some(opts)).await?;
        Ok((loc, LogEntryBlock::decode_block(&block)?))
    }

    /// Allocate a new entry for `key`.
    ///
    /// Tries the replica set in ring order and returns the first replica that
    /// hands out an entry, together with that replica's location. If every
    /// replica fails, the last failure is returned.
    pub async fn new_entry(&self, key: &[u8], opts: &RequestOptions) -> Result<(LogEntryBlock, Location)> {
        let locs = self
            .router
            .locate_replicated_key(key, opts.effective_peer_set_size())
            .await?;

        let mut last_err = None;
        for loc in locs {
            match self.log.new_entry(&loc, key, opts).await {
                Ok((entry, _ack)) => return Ok((entry, loc)),
                Err(e) => {
                    warn!(action = "new_entry", dst = %loc.vnode.short(), error = %e, "Replica failed, trying next");
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) => e.into(),
            None => RingError::NotFound { what: "replica", tried: 0 },
        })
    }

    /// Broadcast an entry to its whole replica set concurrently.
    pub async fn propose_entry(&self, entry: &LogEntryBlock, opts: &RequestOptions) -> Result<Option<Location>> {
        let locs = self
            .router
            .locate_replicated_key(&entry.key, opts.effective_peer_set_size())
            .await?;
        let plan = fanout::plan(locs, opts);

        let log = Arc::clone(&self.log);
        let entry = Arc::new(entry.clone());
        fanout::broadcast("propose_entry", plan, move |d| {
            let log = Arc::clone(&log);
            let entry = Arc::clone(&entry);
            async move { log.propose_entry(&d.location, &entry, &d.opts).await }
        })
        .await
    }

    /// Commit an entry replica by replica, halting at the first failure.
    // TODO: parallelize once replicas can roll back a partial commit.
    pub async fn commit_entry(&self, entry: &LogEntryBlock, opts: &RequestOptions) -> Result<Option<Location>> {
        let locs = self
            .router
            .locate_replicated_key(&entry.key, opts.effective_peer_set_size())
            .await?;
        let plan = fanout::plan(locs, opts);

        let log = &self.log;
        fanout::sequential("commit_entry", plan, move |d| async move {
            log.commit_entry(&d.location, entry, &d.opts).await
        })
        .await
    }

    /// Enable or disable proximity shifting. Enabling is a no-op when no
    /// outlet was supplied at construction.
    pub fn enable_proximity_shifting(&self, enable: bool) {
        self.shift.set_enabled(enable);
    }

    pub fn proximity_shifting_enabled(&self) -> bool {
        self.shift.is_enabled()
    }

    /// Ask the migration worker to move `block` toward `target`.
    ///
    /// Returns false when shifting is disabled or the outlet cannot take the
    /// hint right now.
    pub fn request_shift(&self, block: Block, target: Location) -> bool {
        self.shift.forward(RelocationHint { block, target })
    }
}
