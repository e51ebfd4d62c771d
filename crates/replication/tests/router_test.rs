//! Ordering invariants of `LocatorRouter` over a real ring.

use corelib::{HashId, RingBuilder};
use proptest::prelude::*;
use replication::LocatorRouter;
use std::collections::HashSet;
use std::sync::Arc;

fn router() -> LocatorRouter {
    let ring = RingBuilder::new()
        .with_vnodes(16)
        .add_host("host-a")
        .add_host("host-b")
        .add_host("host-c")
        .add_host("host-d")
        .build();
    LocatorRouter::new(Arc::new(ring))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

#[tokio::test]
async fn test_route_matches_replica_set() {
    let router = router();
    let locs = router.locate_replicated_key(b"key", 3).await.unwrap();
    let route: Vec<_> = router.route_key(b"key", 3).await.unwrap().collect();
    assert_eq!(route, locs);
}

#[tokio::test]
async fn test_primary_is_first_replica() {
    let router = router();
    let locs = router.locate_replicated_hash(&HashId([7; 32]), 4).await.unwrap();
    let primary = router.primary_for_hash(&HashId([7; 32]), 4).await.unwrap();
    assert_eq!(primary, locs[0]);
}

#[tokio::test]
async fn test_zero_width_is_one() {
    let router = router();
    let locs = router.locate_replicated_key(b"key", 0).await.unwrap();
    assert_eq!(locs.len(), 1);
}

proptest! {
    #[test]
    fn prop_replica_set_order(key in proptest::collection::vec(any::<u8>(), 0..64), n in 1usize..=4) {
        let rt = runtime();
        let router = router();
        let (narrow, wide) = rt.block_on(async {
            let narrow = router.locate_replicated_key(&key, n).await.unwrap();
            let wide = router.locate_replicated_key(&key, 4).await.unwrap();
            (narrow, wide)
        });

        prop_assert_eq!(narrow.len(), n);
        for (idx, loc) in narrow.iter().enumerate() {
            prop_assert_eq!(loc.priority, idx as u32);
            prop_assert_eq!(loc.id, HashId::digest(&key));
        }

        let hosts: HashSet<_> = narrow.iter().map(|l| l.vnode.host.clone()).collect();
        prop_assert_eq!(hosts.len(), n);
        prop_assert_eq!(&narrow[..], &wide[..n]);
    }
}
