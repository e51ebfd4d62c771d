//! In-memory consistent hash ring.
//!
//! [`HashRing`] is a self-contained [`Locator`](crate::Locator): it keeps the
//! vnode table locally and answers lookups without any network hops. It backs
//! single-process deployments, the simulation CLI and the test suites.

pub mod ring;

pub use ring::{HashRing, RingBuilder, DEFAULT_VNODES};
