use std::sync::Arc;
use std::time::Duration;
use topocoll::{CollConfig, Communicator, TopologyKind};

/// One valid mesh size per topology, each with some non-trivial routing.
pub const SHAPES: &[(TopologyKind, u32)] = &[
    (TopologyKind::Complete, 4),
    (TopologyKind::Hypercube, 8),
    (TopologyKind::BinaryTree, 7),
    (TopologyKind::Line, 5),
    (TopologyKind::Star, 6),
    (TopologyKind::Grid2D, 9),
    (TopologyKind::Torus, 16),
];

/// Config with short timeouts so a broken protocol fails fast instead of
/// hanging the test run.
pub fn test_config(kind: TopologyKind) -> CollConfig {
    CollConfig {
        collective_timeout: Duration::from_secs(10),
        barrier_timeout: Duration::from_secs(10),
        ..CollConfig::with_topology(kind)
    }
}

/// Helper: run a collective operation across every rank of a mesh
/// concurrently. Keeps all communicators alive until every task completes.
pub async fn run_collective<F, Fut>(world_size: u32, kind: TopologyKind, f: F)
where
    F: Fn(Arc<Communicator>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    run_with_config(world_size, test_config(kind), f).await
}

pub async fn run_with_config<F, Fut>(world_size: u32, config: CollConfig, f: F)
where
    F: Fn(Arc<Communicator>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let comms = Communicator::bootstrap_local(world_size, config)
        .await
        .unwrap();
    let comms: Vec<Arc<Communicator>> = comms.into_iter().map(Arc::new).collect();

    let f = Arc::new(f);
    let mut handles = Vec::new();
    for c in &comms {
        let c = Arc::clone(c);
        let f = Arc::clone(&f);
        handles.push(tokio::spawn(async move { f(c).await }));
    }
    for h in handles {
        h.await.unwrap();
    }
}
