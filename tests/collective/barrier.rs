use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use topocoll::TopologyKind;

use super::helpers::{SHAPES, run_collective};

#[tokio::test]
async fn test_barrier_every_topology() {
    for &(kind, world) in SHAPES {
        run_collective(world, kind, |comm| async move {
            for _ in 0..3 {
                comm.barrier().await.unwrap();
            }
        })
        .await;
    }
}

#[tokio::test]
async fn test_barrier_waits_for_everyone() {
    let arrived = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&arrived);
    run_collective(6, TopologyKind::Star, move |comm| {
        let counter = Arc::clone(&counter);
        async move {
            if comm.rank() == 5 {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            counter.fetch_add(1, Ordering::SeqCst);
            comm.barrier().await.unwrap();
            assert_eq!(
                counter.load(Ordering::SeqCst),
                6,
                "rank {} left the barrier early",
                comm.rank()
            );
        }
    })
    .await;
    assert_eq!(arrived.load(Ordering::SeqCst), 6);
}
