use rand::Rng;
use std::sync::Arc;
use topocoll::{FnOp, ReduceOp, TopologyKind};

use super::helpers::{SHAPES, run_collective};

#[tokio::test]
async fn test_reduce_max_and_sum_match_sequential_fold() {
    for &(kind, world) in SHAPES {
        let mut rng = rand::thread_rng();
        let values: Arc<Vec<i64>> =
            Arc::new((0..world).map(|_| rng.gen_range(-1000..1000)).collect());
        let max = *values.iter().max().unwrap();
        let sum: i64 = values.iter().sum();

        for root in [0, world - 1] {
            let values = Arc::clone(&values);
            run_collective(world, kind, move |comm| {
                let values = Arc::clone(&values);
                async move {
                    let rank = comm.rank();
                    let own = values[rank as usize];

                    let got = comm.reduce(root, own, &ReduceOp::Max).await.unwrap();
                    let got_sum = comm.reduce(root, own, &ReduceOp::Sum).await.unwrap();
                    if rank == root {
                        assert_eq!(got, Some(max), "max at root {root} over {kind}");
                        assert_eq!(got_sum, Some(sum), "sum at root {root} over {kind}");
                    } else {
                        assert_eq!(got, None);
                        assert_eq!(got_sum, None);
                    }
                }
            })
            .await;
        }
    }
}

#[tokio::test]
async fn test_all_reduce_every_topology() {
    for &(kind, world) in SHAPES {
        run_collective(world, kind, move |comm| async move {
            let rank = comm.rank();
            let sum = comm
                .all_reduce(u64::from(rank) + 1, &ReduceOp::Sum)
                .await
                .unwrap();
            let w = u64::from(world);
            assert_eq!(sum, w * (w + 1) / 2, "rank {rank} all_reduce over {kind}");

            let min = comm
                .all_reduce(f64::from(rank) - 0.5, &ReduceOp::Min)
                .await
                .unwrap();
            assert_eq!(min, -0.5);
        })
        .await;
    }
}

#[tokio::test]
async fn test_all_reduce_elementwise_vectors() {
    run_collective(8, TopologyKind::Hypercube, |comm| async move {
        let rank = comm.rank() as i32;
        let local = vec![rank, -rank, 1];
        let out = comm.all_reduce(local, &ReduceOp::Sum).await.unwrap();
        assert_eq!(out, vec![28, -28, 8]);
    })
    .await;
}

#[tokio::test]
async fn test_reduce_fold_order_is_deterministic() {
    // String concatenation is associative but not commutative, so the
    // result exposes the combine order: own value, then left subtree, then
    // right subtree, over logical ranks.
    run_collective(5, TopologyKind::Complete, |comm| async move {
        let concat = FnOp(|a: String, b: String| Ok::<_, String>(a + &b));
        let got = comm
            .reduce(0, comm.rank().to_string(), &concat)
            .await
            .unwrap();
        if comm.rank() == 0 {
            // Tree: 0 -> {1, 2}, 1 -> {3, 4}.
            assert_eq!(got.as_deref(), Some("01342"));
        }
    })
    .await;
}

#[tokio::test]
async fn test_reduce_single_rank() {
    run_collective(1, TopologyKind::Star, |comm| async move {
        assert_eq!(comm.reduce(0, 9u8, &ReduceOp::Prod).await.unwrap(), Some(9));
        assert_eq!(comm.all_reduce(9u8, &ReduceOp::Prod).await.unwrap(), 9);
    })
    .await;
}
