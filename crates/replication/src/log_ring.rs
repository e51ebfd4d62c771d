//! Coordinator for the pure transaction log.

use crate::error::{Result, RingError};
use crate::fanout;
use crate::proximity::{ProximityShift, RelocationHint};
use crate::router::{LocatorRouter, RouteOutcome};
use crate::transport::TxLogTransport;
use corelib::{HashId, Locator, Meta, Tx, TxOptions};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Routes transaction-log operations around the ring.
pub struct LogRing {
    router: LocatorRouter,
    transport: Arc<dyn TxLogTransport>,
    shift: ProximityShift,
}

impl LogRing {
    /// If `outlet` is present, proximity shifting starts enabled.
    pub fn new(
        locator: Arc<dyn Locator>,
        transport: Arc<dyn TxLogTransport>,
        outlet: Option<mpsc::Sender<RelocationHint>>,
    ) -> Self {
        Self {
            router: LocatorRouter::new(locator),
            transport,
            shift: ProximityShift::new(outlet),
        }
    }

    pub fn router(&self) -> &LocatorRouter {
        &self.router
    }

    /// Allocate a new transaction for `key` at its primary replica.
    ///
    /// The coordinator is the single writer here, so only the first-ranked
    /// replica is consulted.
    pub async fn new_tx(&self, key: &[u8], opts: &TxOptions) -> Result<(Tx, Meta)> {
        let loc = self.router.primary_for_key(key, 1).await?;
        debug!(action = "new_tx", dst = %loc.vnode.short(), "Allocating transaction");
        Ok(self.transport.new_tx(&loc, key, opts).await?)
    }

    /// Broadcast a transaction to its whole replica set concurrently.
    ///
    /// Returns on the first replica failure; otherwise once every replica
    /// acknowledged. The acknowledgment of the first-ranked contacted replica
    /// (lowest `priority` value) is passed back.
    pub async fn propose_tx(&self, tx: &Tx, opts: &TxOptions) -> Result<Option<Meta>> {
        let locs = self
            .router
            .locate_replicated_key(&tx.key, opts.effective_peer_set_size())
            .await?;
        let plan = fanout::plan(locs, opts);

        let transport = Arc::clone(&self.transport);
        let tx = Arc::new(tx.clone());
        fanout::broadcast("propose_tx", plan, move |d| {
            let transport = Arc::clone(&transport);
            let tx = Arc::clone(&tx);
            async move { transport.propose_tx(&d.location, &tx, &d.opts).await }
        })
        .await
    }

    /// Commit a transaction replica by replica, in ring order.
    ///
    /// Stops at the first failing replica. Earlier replicas stay committed,
    /// later ones are not contacted.
    // TODO: parallelize once replicas can roll back a partial commit.
    pub async fn commit_tx(&self, tx: &Tx, opts: &TxOptions) -> Result<Option<Meta>> {
        let locs = self
            .router
            .locate_replicated_key(&tx.key, opts.effective_peer_set_size())
            .await?;
        let plan = fanout::plan(locs, opts);

        let transport = &self.transport;
        fanout::sequential("commit_tx", plan, move |d| async move {
            transport.commit_tx(&d.location, tx, &d.opts).await
        })
        .await
    }

    /// Fetch a transaction by id from the first replica that has it.
    pub async fn get_tx(&self, id: &HashId, opts: &TxOptions) -> Result<(Tx, Meta)> {
        let route = self.router.route_hash(id, opts.effective_peer_set_size()).await?;

        let transport = &self.transport;
        let outcome = route
            .first_found("get_tx", move |loc| async move { transport.get_tx(&loc, id, opts).await })
            .await;

        match outcome {
            RouteOutcome::Found { value, .. } => Ok(value),
            RouteOutcome::Exhausted { tried } => Err(RingError::NotFound { what: "tx", tried }),
        }
    }

    /// Enable or disable proximity shifting. Enabling is a no-op when no
    /// outlet was supplied at construction.
    pub fn enable_proximity_shifting(&self, enable: bool) {
        self.shift.set_enabled(enable);
    }

    pub fn proximity_shifting_enabled(&self) -> bool {
        self.shift.is_enabled()
    }
}
