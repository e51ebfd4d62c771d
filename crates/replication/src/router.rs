//! Locator routing.
//!
//! [`LocatorRouter`] wraps a [`Locator`] and turns its raw lookups into
//! replica sets of [`Location`]s. The same ordered set is used three ways:
//!
//! - propose fans out to all of it concurrently
//! - commit walks it sequentially
//! - reads walk it as a [`Route`] and stop at the first replica that answers
//!
//! # Ordering
//!
//! Locations come back in ring-successor order with `priority` equal to their
//! index, so priority 0 is always the primary.

use crate::error::{Result, TransportError};
use crate::metrics;
use corelib::{HashId, Location, Locator, Lookup};
use std::future::Future;
use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::debug;

/// Adapter over a [`Locator`] shared by the ring coordinators.
#[derive(Clone)]
pub struct LocatorRouter {
    locator: Arc<dyn Locator>,
}

impl LocatorRouter {
    pub fn new(locator: Arc<dyn Locator>) -> Self {
        Self { locator }
    }

    /// The wrapped locator.
    pub fn locator(&self) -> &Arc<dyn Locator> {
        &self.locator
    }

    /// Resolve `key` to its hash, the answering vnode and `n` successors.
    ///
    /// Fails if the locator errors or returns fewer than `n` successors. Extra
    /// successors are dropped.
    pub async fn lookup_key(&self, key: &[u8], n: usize) -> Result<Lookup> {
        let n = n.max(1);
        let lookup = self.locator.lookup_key(key, n).await?;
        Self::check_width(lookup, n)
    }

    /// Hash-addressed equivalent of [`lookup_key`](Self::lookup_key).
    pub async fn lookup_hash(&self, hash: &HashId, n: usize) -> Result<Lookup> {
        let n = n.max(1);
        let lookup = self.locator.lookup_hash(hash, n).await?;
        Self::check_width(lookup, n)
    }

    /// The canonical replica set for `key`: `n` locations in ring order.
    pub async fn locate_replicated_key(&self, key: &[u8], n: usize) -> Result<Vec<Location>> {
        Ok(Self::locations(self.lookup_key(key, n).await?))
    }

    /// The canonical replica set for `hash`.
    pub async fn locate_replicated_hash(&self, hash: &HashId, n: usize) -> Result<Vec<Location>> {
        Ok(Self::locations(self.lookup_hash(hash, n).await?))
    }

    /// The first-ranked replica of `key`, resolved at width `n`.
    pub async fn primary_for_key(&self, key: &[u8], n: usize) -> Result<Location> {
        Self::first(self.locate_replicated_key(key, n).await?)
    }

    /// The first-ranked replica of `hash`, resolved at width `n`.
    pub async fn primary_for_hash(&self, hash: &HashId, n: usize) -> Result<Location> {
        Self::first(self.locate_replicated_hash(hash, n).await?)
    }

    /// Ordered fallback candidates for reading `key`.
    pub async fn route_key(&self, key: &[u8], n: usize) -> Result<Route> {
        let locs = self.locate_replicated_key(key, n).await?;
        Ok(Route::new(locs))
    }

    /// Ordered fallback candidates for reading `hash`.
    pub async fn route_hash(&self, hash: &HashId, n: usize) -> Result<Route> {
        let locs = self.locate_replicated_hash(hash, n).await?;
        Ok(Route::new(locs))
    }

    fn check_width(mut lookup: Lookup, n: usize) -> Result<Lookup> {
        if lookup.successors.len() < n {
            return Err(corelib::Error::InsufficientVnodes {
                requested: n,
                available: lookup.successors.len(),
            }
            .into());
        }
        lookup.successors.truncate(n);
        Ok(lookup)
    }

    fn first(locs: Vec<Location>) -> Result<Location> {
        locs.into_iter().next().ok_or_else(|| {
            corelib::Error::InsufficientVnodes {
                requested: 1,
                available: 0,
            }
            .into()
        })
    }

    fn locations(lookup: Lookup) -> Vec<Location> {
        let hash = lookup.hash;
        lookup
            .successors
            .into_iter()
            .enumerate()
            .map(|(idx, vnode)| Location::new(hash, vnode, idx as u32))
            .collect()
    }
}

/// Terminal outcome of walking a [`Route`].
#[derive(Debug)]
pub enum RouteOutcome<T> {
    /// A candidate produced a value; later candidates were not touched.
    Found { location: Location, value: T },
    /// Every candidate failed or came back empty.
    Exhausted { tried: usize },
}

impl<T> RouteOutcome<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, RouteOutcome::Found { .. })
    }
}

/// Lazy, finite, non-restartable walk over ordered replica candidates.
///
/// Iterating yields each candidate once. Once consumed, a route cannot be
/// rewound; ask the router for a fresh one.
#[derive(Debug)]
pub struct Route {
    candidates: std::vec::IntoIter<Location>,
    len: usize,
    tried: usize,
}

impl Route {
    pub fn new(candidates: Vec<Location>) -> Self {
        Self {
            len: candidates.len(),
            candidates: candidates.into_iter(),
            tried: 0,
        }
    }

    /// Number of candidates the route started with.
    pub fn width(&self) -> usize {
        self.len
    }

    /// Candidates handed out so far.
    pub fn tried(&self) -> usize {
        self.tried
    }

    /// Try candidates in order until one returns a value.
    ///
    /// A visit that errors or returns `Ok(None)` moves the walk on to the next
    /// candidate. The error itself is logged and dropped.
    pub async fn first_found<T, F, Fut>(mut self, op: &'static str, mut visit: F) -> RouteOutcome<T>
    where
        F: FnMut(Location) -> Fut,
        Fut: Future<Output = std::result::Result<Option<T>, TransportError>>,
    {
        while let Some(location) = self.next() {
            match visit(location.clone()).await {
                Ok(Some(value)) => {
                    metrics::record_route(op, self.tried, true);
                    return RouteOutcome::Found { location, value };
                }
                Ok(None) => {
                    debug!(op, loc = %location, "Candidate returned nothing");
                }
                Err(e) => {
                    debug!(op, loc = %location, error = %e, "Candidate failed");
                }
            }
        }
        metrics::record_route(op, self.tried, false);
        RouteOutcome::Exhausted { tried: self.tried }
    }
}

impl Iterator for Route {
    type Item = Location;

    fn next(&mut self) -> Option<Location> {
        let next = self.candidates.next()?;
        self.tried += 1;
        Some(next)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.candidates.size_hint()
    }
}

impl ExactSizeIterator for Route {}

impl FusedIterator for Route {}
