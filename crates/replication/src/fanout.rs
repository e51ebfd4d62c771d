//! Replica fan-out shared by propose and commit.
//!
//! [`plan`] derives the per-replica messages from a replica set and the
//! caller's options. [`broadcast`] sends them concurrently with fail-fast
//! semantics; [`sequential`] walks them one by one and halts at the first
//! failure.
//!
//! # Cancellation
//!
//! Broadcast tasks share a `watch` flag that the first failure raises. A task
//! that has not started its transport call yet skips it; a task whose call is
//! still in flight drops the call. Both are logged and counted as abandoned.
//! The coordinator returns the failure without waiting for either, so
//! cancellation is best effort: a remote side may still apply a dropped call.

use crate::error::{RingError, Result};
use crate::metrics;
use crate::transport::TransportResult;
use corelib::{HashId, Location, RequestOptions};
use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// One outgoing message: the replica it targets and the options it carries.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub location: Location,
    pub opts: RequestOptions,
}

/// Build the messages for a replica set.
///
/// A relayed request (`opts.source` set) skips the replica named as source
/// and propagates the source unchanged. An originating request reaches every
/// replica with `source == destination == replica id`.
pub fn plan(locs: Vec<Location>, opts: &RequestOptions) -> Vec<Dispatch> {
    locs.into_iter()
        .filter(|loc| opts.source != Some(loc.vnode.id))
        .map(|loc| {
            let opts = opts.for_destination(loc.vnode.id, loc.id);
            Dispatch { location: loc, opts }
        })
        .collect()
}

enum Delivery<T> {
    Acked { priority: u32, ack: T },
    Failed { target: String, error: crate::TransportError },
    Abandoned,
}

/// Send every dispatch concurrently, one task each.
///
/// Resolves once all tasks finished successfully, or as soon as one failure
/// is observed. Only that first failure is reported; which task wins when
/// several fail at once is not deterministic. On success the acknowledgment of
/// the first-ranked contacted replica (lowest `priority` value) is returned,
/// `None` if the plan was empty.
pub async fn broadcast<T, F, Fut>(op: &'static str, plan: Vec<Dispatch>, call: F) -> Result<Option<T>>
where
    F: Fn(Dispatch) -> Fut,
    Fut: Future<Output = TransportResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let contacted = plan.len();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();

    for dispatch in plan {
        log_dispatch(op, &dispatch);
        let mut cancelled = cancel_rx.clone();
        let priority = dispatch.location.priority;
        let target = dispatch.location.vnode.short();
        let send = call(dispatch);

        tasks.spawn(async move {
            let bail = *cancelled.borrow_and_update();
            if bail {
                debug!(action = op, dst = %target, "Fan-out already failed, skipping replica");
                metrics::record_fanout_abandoned(op);
                return Delivery::Abandoned;
            }
            tokio::select! {
                sent = send => match sent {
                    Ok(ack) => Delivery::Acked { priority, ack },
                    Err(error) => Delivery::Failed { target, error },
                },
                _ = cancelled.changed() => {
                    debug!(action = op, dst = %target, "Fan-out failed, dropping in-flight call");
                    metrics::record_fanout_abandoned(op);
                    Delivery::Abandoned
                }
            }
        });
    }

    let mut first: Option<(u32, T)> = None;
    while let Some(joined) = tasks.join_next().await {
        let err = match joined {
            Ok(Delivery::Acked { priority, ack }) => {
                if first.as_ref().map_or(true, |(p, _)| priority < *p) {
                    first = Some((priority, ack));
                }
                continue;
            }
            // Abandoned tasks are detached before they finish and never joined.
            Ok(Delivery::Abandoned) => continue,
            Ok(Delivery::Failed { target, error }) => {
                warn!(action = op, dst = %target, error = %error, "Replica failed");
                RingError::Transport(error)
            }
            Err(e) => {
                warn!(action = op, error = %e, "Replica task failed");
                RingError::Task(e.to_string())
            }
        };

        cancel_tx.send_replace(true);
        tasks.detach_all();
        metrics::record_fanout(op, contacted, false);
        return Err(err);
    }

    metrics::record_fanout(op, contacted, true);
    Ok(first.map(|(_, ack)| ack))
}

/// Send dispatches one at a time in plan order, stopping at the first failure.
///
/// Replicas before the failure keep what they applied; replicas after it are
/// never contacted. Returns the first acknowledgment on success.
pub async fn sequential<T, F, Fut>(op: &'static str, plan: Vec<Dispatch>, mut call: F) -> Result<Option<T>>
where
    F: FnMut(Dispatch) -> Fut,
    Fut: Future<Output = TransportResult<T>>,
{
    let mut first = None;
    let mut contacted = 0;

    for dispatch in plan {
        log_dispatch(op, &dispatch);
        contacted += 1;
        let target = dispatch.location.vnode.short();

        match call(dispatch).await {
            Ok(ack) => {
                if first.is_none() {
                    first = Some(ack);
                }
            }
            Err(error) => {
                warn!(action = op, dst = %target, error = %error, "Replica failed, halting");
                metrics::record_fanout(op, contacted, false);
                return Err(error.into());
            }
        }
    }

    metrics::record_fanout(op, contacted, true);
    Ok(first)
}

fn log_dispatch(op: &'static str, dispatch: &Dispatch) {
    debug!(
        action = op,
        src = %short(dispatch.opts.source),
        dst = %dispatch.location.vnode.short(),
        "Dispatching"
    );
}

fn short(id: Option<HashId>) -> String {
    id.map(|id| id.short()).unwrap_or_default()
}
