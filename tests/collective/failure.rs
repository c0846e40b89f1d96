use std::time::Duration;
use topocoll::{CollConfig, CollError, FnOp, ReduceOp, TopologyKind};

use super::helpers::{SHAPES, run_collective, run_with_config, test_config};

#[tokio::test]
async fn test_operator_failure_fails_every_rank() {
    for &(kind, world) in SHAPES {
        if world < 3 {
            continue;
        }
        run_collective(world, kind, move |comm| async move {
            let rank = comm.rank();
            // Only combining rank 2's value fails.
            let op = FnOp(move |a: u32, b: u32| {
                if a == 2 || b == 2 {
                    Err(format!("refusing {a} and {b}"))
                } else {
                    Ok(a + b)
                }
            });
            let err = comm.all_reduce(rank, &op).await.unwrap_err();
            assert!(
                matches!(err, CollError::OperatorFailure { .. }),
                "rank {rank} over {kind}: got {err}"
            );

            // The mesh stays usable after a failed call.
            let sum = comm.all_reduce(1u32, &ReduceOp::Sum).await.unwrap();
            assert_eq!(sum, world);
        })
        .await;
    }
}

#[tokio::test]
async fn test_overflow_is_operator_failure() {
    run_collective(4, TopologyKind::Line, |comm| async move {
        let err = comm.reduce(3, i8::MAX, &ReduceOp::Sum).await.unwrap_err();
        match err {
            CollError::OperatorFailure { reason, .. } => {
                assert!(reason.contains("overflows i8"), "reason: {reason}")
            }
            other => panic!("rank {}: unexpected {other}", comm.rank()),
        }
    })
    .await;
}

#[tokio::test]
async fn test_lowest_failing_rank_is_reported() {
    run_collective(8, TopologyKind::Complete, |comm| async move {
        // Ranks 3 and 6 both supply wrong gather buffers.
        let rank = comm.rank();
        let partition = comm.partition(16);
        let len = partition.size(rank) + usize::from(rank == 3 || rank == 6);
        let local = vec![0u8; len];
        let err = comm.gather(0, 16, &local).await.unwrap_err();
        assert_eq!(
            err,
            CollError::PartitionMismatch {
                rank: 3,
                expected: 2,
                actual: 3
            },
            "rank {rank}"
        );
    })
    .await;
}

#[tokio::test]
async fn test_non_root_scatter_buffer_wrong_length() {
    for &(kind, world) in SHAPES {
        run_collective(world, kind, move |comm| async move {
            let rank = comm.rank();
            let total = 2 * world as usize;
            let source: Vec<i16> = (0..total as i16).collect();
            let send = (rank == 0).then_some(source.as_slice());
            let bad = world - 1;
            let len = if rank == bad { 3 } else { 2 };
            let mut recv = vec![0i16; len];
            let err = comm
                .scatter_into(0, total, send, &mut recv)
                .await
                .unwrap_err();
            assert_eq!(
                err,
                CollError::PartitionMismatch {
                    rank: bad,
                    expected: 2,
                    actual: 3
                },
                "rank {rank} over {kind}"
            );
        })
        .await;
    }
}

#[tokio::test]
async fn test_root_send_buffer_wrong_length() {
    run_collective(8, TopologyKind::Hypercube, |comm| async move {
        let source = vec![1u32; 5];
        let send = (comm.rank() == 2).then_some(source.as_slice());
        let err = comm.scatter(2, 6, send).await.unwrap_err();
        assert_eq!(
            err,
            CollError::PartitionMismatch {
                rank: 2,
                expected: 6,
                actual: 5
            }
        );
    })
    .await;
}

#[tokio::test]
async fn test_invalid_root_rejected_everywhere() {
    run_collective(4, TopologyKind::Torus, |comm| async move {
        let mut buf = vec![1u8];
        assert_eq!(
            comm.broadcast(4, &mut buf).await,
            Err(CollError::RankOutOfRange {
                rank: 4,
                world_size: 4
            })
        );
        // Rejected calls do not consume a sequence number, so the mesh
        // remains in step.
        comm.barrier().await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn test_missing_peer_times_out() {
    let config = CollConfig {
        collective_timeout: Duration::from_millis(100),
        barrier_timeout: Duration::from_millis(100),
        ..test_config(TopologyKind::Line)
    };
    run_with_config(3, config, |comm| async move {
        if comm.rank() == 2 {
            return;
        }
        let err = comm.barrier().await.unwrap_err();
        assert!(
            matches!(err, CollError::CollectiveFailed { operation: "barrier", .. }),
            "rank {}: got {err}",
            comm.rank()
        );
    })
    .await;
}

#[tokio::test]
async fn test_cancel_unblocks_waiters() {
    run_collective(4, TopologyKind::Star, |comm| async move {
        if comm.rank() == 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            comm.cancel_handle().cancel();
            return;
        }
        let err = comm.barrier().await.unwrap_err();
        assert_eq!(err, CollError::Cancelled);
    })
    .await;
}
