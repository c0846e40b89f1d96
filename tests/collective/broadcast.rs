use topocoll::TopologyKind;

use super::helpers::{SHAPES, run_collective};

#[tokio::test]
async fn test_broadcast_from_root_0() {
    run_collective(3, TopologyKind::Complete, |comm| async move {
        let rank = comm.rank();
        let mut data: Vec<f32> = if rank == 0 {
            vec![42.0, 43.0, 44.0, 45.0]
        } else {
            vec![0.0; 4]
        };
        comm.broadcast(0, &mut data).await.unwrap();
        assert_eq!(
            data,
            vec![42.0, 43.0, 44.0, 45.0],
            "rank {rank} broadcast failed"
        );
    })
    .await;
}

#[tokio::test]
async fn test_broadcast_every_topology_every_root() {
    for &(kind, world) in SHAPES {
        for root in 0..world {
            run_collective(world, kind, move |comm| async move {
                let rank = comm.rank();
                let expected: Vec<u64> = (0..17).map(|i| i * 31 + u64::from(root)).collect();
                let mut data = if rank == root {
                    expected.clone()
                } else {
                    Vec::new()
                };
                comm.broadcast(root, &mut data).await.unwrap();
                assert_eq!(
                    data, expected,
                    "rank {rank} broadcast from root {root} over {kind} failed"
                );
            })
            .await;
        }
    }
}

#[tokio::test]
async fn test_broadcast_overwrites_longer_buffer() {
    run_collective(5, TopologyKind::Line, |comm| async move {
        let mut data: Vec<i32> = if comm.rank() == 2 {
            vec![1]
        } else {
            vec![9; 10]
        };
        comm.broadcast(2, &mut data).await.unwrap();
        assert_eq!(data, vec![1]);
    })
    .await;
}

#[tokio::test]
async fn test_broadcast_strings() {
    run_collective(7, TopologyKind::BinaryTree, |comm| async move {
        let mut data = if comm.rank() == 3 {
            vec!["alpha".to_string(), String::new(), "γ".to_string()]
        } else {
            Vec::new()
        };
        comm.broadcast(3, &mut data).await.unwrap();
        assert_eq!(data, vec!["alpha", "", "γ"]);
    })
    .await;
}

#[tokio::test]
async fn test_broadcast_single_rank() {
    run_collective(1, TopologyKind::Hypercube, |comm| async move {
        let mut data = vec![5u8, 6];
        comm.broadcast(0, &mut data).await.unwrap();
        assert_eq!(data, vec![5, 6]);
    })
    .await;
}

#[tokio::test]
async fn test_consecutive_broadcasts_do_not_mix() {
    run_collective(8, TopologyKind::Hypercube, |comm| async move {
        for round in 0..5u32 {
            let root = round % 8;
            let mut data = if comm.rank() == root {
                vec![round; 3]
            } else {
                Vec::new()
            };
            comm.broadcast(root, &mut data).await.unwrap();
            assert_eq!(data, vec![round; 3], "rank {} round {round}", comm.rank());
        }
    })
    .await;
}
