use topocoll::{Partition, TopologyKind};

use super::helpers::{SHAPES, run_collective};

#[tokio::test]
async fn test_scatter_ten_over_three() {
    run_collective(3, TopologyKind::Line, |comm| async move {
        let rank = comm.rank();
        let source: Vec<i32> = (0..10).collect();
        let send = (rank == 0).then_some(source.as_slice());
        let shard = comm.scatter(0, 10, send).await.unwrap();
        let expected: Vec<i32> = match rank {
            0 => vec![0, 1, 2, 3],
            1 => vec![4, 5, 6],
            _ => vec![7, 8, 9],
        };
        assert_eq!(shard, expected, "rank {rank} scatter failed");
    })
    .await;
}

#[tokio::test]
async fn test_scatter_gather_round_trip_every_topology() {
    for &(kind, world) in SHAPES {
        for root in [0, world / 2, world - 1] {
            for total in [0usize, 3, world as usize, 4 * world as usize + 3] {
                run_collective(world, kind, move |comm| async move {
                    let rank = comm.rank();
                    let source: Vec<u32> = (0..total as u32).map(|i| i * 7 + 1).collect();
                    let send = (rank == root).then_some(source.as_slice());

                    let shard = comm.scatter(root, total, send).await.unwrap();
                    let partition = Partition::new(total, comm.world_size());
                    assert_eq!(
                        shard,
                        source[partition.shard(rank)].to_vec(),
                        "rank {rank} scatter from {root} over {kind} (N={total})"
                    );

                    let gathered = comm.gather(root, total, &shard).await.unwrap();
                    if rank == root {
                        assert_eq!(
                            gathered.as_deref(),
                            Some(source.as_slice()),
                            "gather at {root} over {kind} (N={total})"
                        );
                    } else {
                        assert!(gathered.is_none(), "rank {rank} should get None");
                    }
                })
                .await;
            }
        }
    }
}

#[tokio::test]
async fn test_scatter_into_buffer() {
    run_collective(4, TopologyKind::Torus, |comm| async move {
        let rank = comm.rank();
        let source: Vec<f64> = (0..9).map(f64::from).collect();
        let send = (rank == 1).then_some(source.as_slice());
        let mut recv = vec![0.0; comm.partition(9).size(rank)];
        comm.scatter_into(1, 9, send, &mut recv).await.unwrap();
        let expected = &source[comm.partition(9).shard(rank)];
        assert_eq!(recv, expected, "rank {rank} scatter_into failed");
    })
    .await;
}

#[tokio::test]
async fn test_gather_fewer_elements_than_ranks() {
    run_collective(9, TopologyKind::Grid2D, |comm| async move {
        let rank = comm.rank();
        let partition = comm.partition(4);
        let local: Vec<u16> = partition.shard(rank).map(|i| i as u16 * 10).collect();
        let gathered = comm.gather(4, 4, &local).await.unwrap();
        if rank == 4 {
            assert_eq!(gathered, Some(vec![0, 10, 20, 30]));
        }
    })
    .await;
}

#[tokio::test]
async fn test_scatter_single_rank() {
    run_collective(1, TopologyKind::Grid2D, |comm| async move {
        let source = vec![1u8, 2, 3];
        let shard = comm.scatter(0, 3, Some(source.as_slice())).await.unwrap();
        assert_eq!(shard, source);
        let back = comm.gather(0, 3, &shard).await.unwrap();
        assert_eq!(back, Some(source));
    })
    .await;
}
