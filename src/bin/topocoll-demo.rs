//! Runs every collective once over an in-process mesh and logs the results.
//!
//! ```bash
//! TOPOCOLL_TOPOLOGY=hypercube RUST_LOG=topocoll=debug cargo run --bin topocoll-demo
//! ```
//!
//! `TOPOCOLL_WORLD_SIZE` picks the rank count (default 16, which every
//! topology accepts).

use std::sync::Arc;
use topocoll::{CollConfig, CollError, Communicator, Rank, ReduceOp, RouteOutcome};

const DEFAULT_WORLD_SIZE: u32 = 16;

#[derive(Debug)]
struct Report {
    rank: Rank,
    broadcast: Vec<u32>,
    shard: Vec<u64>,
    gathered: Option<Vec<u64>>,
    max: Option<i64>,
    sum: i64,
    route: RouteOutcome<String>,
}

async fn run_rank(comm: Arc<Communicator>) -> topocoll::Result<Report> {
    let rank = comm.rank();
    let world = comm.world_size();
    let root = world - 1;

    let mut broadcast = if rank == root { vec![7, 11, 13] } else { Vec::new() };
    comm.broadcast(root, &mut broadcast).await?;

    let total = 3 * world as usize + 1;
    let source: Vec<u64> = (0..total as u64).collect();
    let send = (rank == 0).then_some(source.as_slice());
    let shard = comm.scatter(0, total, send).await?;

    let gathered = comm.gather(0, total, &shard).await?;

    let max = comm.reduce(0, i64::from(rank) * 3 % 7, &ReduceOp::Max).await?;
    let sum = comm.all_reduce(i64::from(rank), &ReduceOp::Sum).await?;

    let payload = (rank == 0).then(|| format!("hello from rank 0 to rank {root}"));
    let route = comm.route(0, root, payload).await?;

    comm.barrier().await?;

    Ok(Report {
        rank,
        broadcast,
        shard,
        gathered,
        max,
        sum,
        route,
    })
}

#[tokio::main]
async fn main() -> topocoll::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = CollConfig::from_env();
    let world_size = match std::env::var("TOPOCOLL_WORLD_SIZE") {
        Ok(v) => v
            .parse::<u32>()
            .map_err(|e| CollError::InvalidConfig(format!("TOPOCOLL_WORLD_SIZE={v}: {e}")))?,
        Err(_) => DEFAULT_WORLD_SIZE,
    };

    tracing::info!(world_size, topology = %config.topology, "starting demo");
    let comms: Vec<Arc<Communicator>> = Communicator::bootstrap_local(world_size, config)
        .await?
        .into_iter()
        .map(Arc::new)
        .collect();
    if let Some(first) = comms.first() {
        tracing::info!(diameter = first.topology().diameter(), "mesh built");
    }

    let handles: Vec<_> = comms
        .iter()
        .map(|c| tokio::spawn(run_rank(Arc::clone(c))))
        .collect();

    for (rank, handle) in handles.into_iter().enumerate() {
        let report = handle
            .await
            .map_err(|e| CollError::collective("demo", rank as Rank, e.to_string()))??;
        tracing::info!(
            rank = report.rank,
            broadcast = ?report.broadcast,
            shard = ?report.shard,
            sum = report.sum,
            "rank finished"
        );
        if let Some(gathered) = &report.gathered {
            tracing::info!(len = gathered.len(), "root gathered the full buffer");
        }
        if let Some(max) = report.max {
            tracing::info!(max, "reduce(max) at root");
        }
        match &report.route {
            RouteOutcome::Delivered { payload, path } => {
                tracing::info!(?path, payload = %payload, "route delivered")
            }
            other => tracing::debug!(rank = report.rank, outcome = ?other, "route"),
        }
    }

    Ok(())
}
