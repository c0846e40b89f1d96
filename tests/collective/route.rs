use topocoll::{RouteOutcome, TopologyKind};

use super::helpers::{SHAPES, run_collective};

#[tokio::test]
async fn test_hypercube_zero_to_five() {
    run_collective(8, TopologyKind::Hypercube, |comm| async move {
        let rank = comm.rank();
        let payload = (rank == 0).then(|| vec![1.5f32, 2.5]);
        let outcome = comm.route(0, 5, payload).await.unwrap();
        let expected = match rank {
            0 => RouteOutcome::Origin {
                path: vec![0, 1, 5],
            },
            1 => RouteOutcome::Relayed {
                path: vec![0, 1, 5],
            },
            5 => RouteOutcome::Delivered {
                payload: vec![1.5, 2.5],
                path: vec![0, 1, 5],
            },
            _ => RouteOutcome::Released,
        };
        assert_eq!(outcome, expected, "rank {rank}");
    })
    .await;
}

#[tokio::test]
async fn test_route_every_topology() {
    for &(kind, world) in SHAPES {
        for (source, destination) in [(0, world - 1), (world - 1, 0), (world / 2, 1)] {
            run_collective(world, kind, move |comm| async move {
                let rank = comm.rank();
                let path = comm.topology().path(source, destination).unwrap();
                let payload = (rank == source).then(|| format!("{source}->{destination}"));
                let outcome = comm.route(source, destination, payload).await.unwrap();
                match outcome {
                    RouteOutcome::Delivered { payload, path: taken } => {
                        assert_eq!(rank, destination);
                        assert_eq!(payload, format!("{source}->{destination}"));
                        assert_eq!(taken, path, "{kind}: {source}->{destination}");
                    }
                    RouteOutcome::Origin { path: p } => {
                        assert_eq!(rank, source);
                        assert_eq!(p, path);
                    }
                    RouteOutcome::Relayed { path: p } => {
                        assert!(p.contains(&rank) && rank != source && rank != destination);
                    }
                    RouteOutcome::Released => {
                        assert!(!path.contains(&rank), "rank {rank} is on {path:?}");
                    }
                }
            })
            .await;
        }
    }
}

#[tokio::test]
async fn test_route_to_self() {
    run_collective(5, TopologyKind::Line, |comm| async move {
        let rank = comm.rank();
        let payload = (rank == 2).then_some(42u64);
        let outcome = comm.route(2, 2, payload).await.unwrap();
        if rank == 2 {
            assert_eq!(
                outcome,
                RouteOutcome::Delivered {
                    payload: 42,
                    path: vec![2]
                }
            );
        } else {
            assert_eq!(outcome, RouteOutcome::Released);
        }
    })
    .await;
}

#[tokio::test]
async fn test_route_source_without_payload_fails_everywhere() {
    run_collective(5, TopologyKind::Line, |comm| async move {
        let result = comm.route::<u8>(0, 4, None).await;
        assert!(result.is_err(), "rank {} should fail", comm.rank());
    })
    .await;
}

#[tokio::test]
async fn test_route_destination_out_of_range() {
    run_collective(4, TopologyKind::Complete, |comm| async move {
        let payload = (comm.rank() == 0).then_some(1u8);
        assert!(matches!(
            comm.route(0, 4, payload).await,
            Err(topocoll::CollError::RankOutOfRange { rank: 4, .. })
        ));
    })
    .await;
}
