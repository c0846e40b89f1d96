use std::time::Duration;
use topocoll::{CollConfig, Communicator, ReduceOp, RouteOutcome, TopologyKind};

use super::helpers::test_config;

/// Each communicator is moved into its own task and dropped as soon as that
/// rank returns. Ranks still waiting on frames relayed through a finished
/// rank must complete all the same.
async fn run_owned<F, Fut>(world: u32, config: CollConfig, rounds: usize, f: F)
where
    F: Fn(Communicator) -> Fut + Copy + Send + 'static,
    Fut: std::future::Future<Output = topocoll::Result<()>> + Send + 'static,
{
    for round in 0..rounds {
        let comms = Communicator::bootstrap_local(world, config.clone())
            .await
            .unwrap();
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let rank = comm.rank();
                (rank, tokio::spawn(f(comm)))
            })
            .collect();
        for (rank, handle) in handles {
            let result = handle.await.unwrap();
            assert!(
                result.is_ok(),
                "round {round}, rank {rank} over {}: {result:?}",
                config.topology
            );
        }
    }
}

fn short_config(kind: TopologyKind) -> CollConfig {
    CollConfig {
        collective_timeout: Duration::from_secs(2),
        barrier_timeout: Duration::from_secs(2),
        ..test_config(kind)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_all_reduce_with_owned_communicators() {
    for (kind, world) in [(TopologyKind::Line, 8), (TopologyKind::Grid2D, 9)] {
        run_owned(world, short_config(kind), 50, move |comm| async move {
            let sum = comm.all_reduce(comm.rank() as u64, &ReduceOp::Sum).await?;
            assert_eq!(sum, u64::from(world * (world - 1) / 2));
            Ok(())
        })
        .await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_barrier_and_route_with_owned_communicators() {
    run_owned(8, short_config(TopologyKind::Line), 50, |comm| async move {
        comm.barrier().await?;
        let payload = (comm.rank() == 0).then_some(9u8);
        let outcome = comm.route(0, 7, payload).await?;
        if comm.rank() == 7 {
            assert!(matches!(outcome, RouteOutcome::Delivered { payload: 9, .. }));
        }
        Ok(())
    })
    .await;
}
