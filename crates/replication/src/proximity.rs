//! Proximity shifting.
//!
//! When an outlet is supplied at construction, the coordinator may emit
//! [`RelocationHint`]s asking a migration worker to move a block closer to a
//! requesting vnode. The hook is a gate plus a send-only channel; it has no
//! opinion on when a hint should be emitted.

use crate::metrics;
use crate::transport::BlockTransport;
use corelib::{Block, Location};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Instruction to relocate `block` toward `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationHint {
    pub block: Block,
    pub target: Location,
}

/// Optional outlet for relocation hints, with an on/off gate.
#[derive(Debug)]
pub struct ProximityShift {
    outlet: Option<mpsc::Sender<RelocationHint>>,
    enabled: AtomicBool,
}

impl ProximityShift {
    /// Enabled iff `outlet` is present.
    pub fn new(outlet: Option<mpsc::Sender<RelocationHint>>) -> Self {
        let enabled = outlet.is_some();
        Self {
            outlet,
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Turn forwarding on or off. Turning it on without an outlet does nothing.
    pub fn set_enabled(&self, enable: bool) {
        let enable = enable && self.outlet.is_some();
        self.enabled.store(enable, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn has_outlet(&self) -> bool {
        self.outlet.is_some()
    }

    /// Queue a hint if the gate is open. Never blocks: a full or closed
    /// outlet drops the hint. Returns whether it was queued.
    pub fn forward(&self, hint: RelocationHint) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let Some(outlet) = &self.outlet else {
            return false;
        };

        let target = hint.target.vnode.short();
        let queued = match outlet.try_send(hint) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(dst = %target, "Proximity outlet full, dropping hint");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(dst = %target, "Proximity outlet closed, dropping hint");
                false
            }
        };
        metrics::record_proximity_hint(queued);
        queued
    }
}

impl Default for ProximityShift {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Drain relocation hints and ask the target vnode to take a copy of each
/// block. Runs until every sender is dropped.
///
/// Returns the number of hints applied.
pub async fn run_shift_worker(mut hints: mpsc::Receiver<RelocationHint>, transport: Arc<dyn BlockTransport>) -> usize {
    info!("Starting proximity shift worker");
    let mut applied = 0;

    while let Some(hint) = hints.recv().await {
        let id = hint.block.id();
        match transport.transfer_block(&hint.target, &id).await {
            Ok(()) => {
                applied += 1;
                debug!(block = %id.short(), dst = %hint.target.vnode.short(), "Block shifted");
            }
            Err(e) => {
                warn!(block = %id.short(), dst = %hint.target.vnode.short(), error = %e, "Block shift failed");
            }
        }
    }

    info!(applied, "Proximity shift worker stopped");
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::{HashId, Vnode};

    fn hint() -> RelocationHint {
        RelocationHint {
            block: Block::data(&b"data"[..]),
            target: Location::new(HashId::ZERO, Vnode::new(HashId([1; 32]), "h1"), 0),
        }
    }

    #[test]
    fn test_without_outlet_stays_disabled() {
        let hook = ProximityShift::disabled();
        assert!(!hook.is_enabled());
        hook.set_enabled(true);
        assert!(!hook.is_enabled());
        assert!(!hook.forward(hint()));
    }

    #[test]
    fn test_with_outlet_starts_enabled() {
        let (tx, mut rx) = mpsc::channel(4);
        let hook = ProximityShift::new(Some(tx));
        assert!(hook.is_enabled());
        assert!(hook.forward(hint()));
        assert_eq!(rx.try_recv().unwrap(), hint());
    }

    #[test]
    fn test_disable_then_enable() {
        let (tx, mut rx) = mpsc::channel(4);
        let hook = ProximityShift::new(Some(tx));
        hook.set_enabled(false);
        assert!(!hook.forward(hint()));
        assert!(rx.try_recv().is_err());

        hook.set_enabled(true);
        assert!(hook.forward(hint()));
    }

    #[test]
    fn test_full_outlet_drops() {
        let (tx, _rx) = mpsc::channel(1);
        let hook = ProximityShift::new(Some(tx));
        assert!(hook.forward(hint()));
        assert!(!hook.forward(hint()));
    }
}
