//! Metrics for the coordination layer.
//!
//! All metrics are prefixed with `blockring_`; counters end in `_total`.
//! Recording is a no-op until the embedding process installs a recorder.

use metrics::{counter, histogram};

/// Record the outcome of a propose or commit fan-out.
///
/// `contacted` is the number of replicas a call was dispatched to.
pub fn record_fanout(op: &'static str, contacted: usize, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("blockring_fanout_total", "op" => op, "status" => status).increment(1);
    histogram!("blockring_fanout_replicas", "op" => op).record(contacted as f64);
}

/// Record a broadcast call skipped or dropped after its fan-out failed.
pub fn record_fanout_abandoned(op: &'static str) {
    counter!("blockring_fanout_abandoned_total", "op" => op).increment(1);
}

/// Record a fallback read over a route.
pub fn record_route(op: &'static str, tried: usize, found: bool) {
    let status = if found { "found" } else { "exhausted" };
    counter!("blockring_route_total", "op" => op, "status" => status).increment(1);
    histogram!("blockring_route_candidates_tried", "op" => op).record(tried as f64);
}

/// Record a proximity-shift hint offered to the outlet.
pub fn record_proximity_hint(queued: bool) {
    let status = if queued { "queued" } else { "dropped" };
    counter!("blockring_proximity_hints_total", "status" => status).increment(1);
}
