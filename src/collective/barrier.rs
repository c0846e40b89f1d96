use crate::client::Communicator;
use crate::error::{CollError, Result};
use crate::protocol::{Body, Failure};
use crate::types::{Rank, compose_tag, phase};
use futures::future::try_join_all;

/// Rank 0's view of one status barrier.
///
/// Records which ranks have arrived and keeps the failure from the lowest
/// originating rank among everything reported, its own included.
#[derive(Debug)]
pub(crate) struct BarrierCoordinator {
    arrived: Vec<bool>,
    pending: usize,
    verdict: Option<Failure>,
}

impl BarrierCoordinator {
    /// Start a barrier over `world` ranks; rank 0 arrives immediately.
    pub fn new(world: u32, own: Option<Failure>) -> Self {
        let mut arrived = vec![false; world as usize];
        arrived[0] = true;
        Self {
            arrived,
            pending: world as usize - 1,
            verdict: own,
        }
    }

    pub fn arrive(&mut self, rank: Rank, failure: Option<Failure>) -> Result<()> {
        match self.arrived.get_mut(rank as usize) {
            Some(seen) if !*seen => {
                *seen = true;
                self.pending -= 1;
                self.verdict = Failure::merge(self.verdict.take(), failure);
                Ok(())
            }
            Some(_) => Err(CollError::collective(
                "barrier",
                rank,
                "arrived twice at the same barrier",
            )),
            None => Err(CollError::RankOutOfRange {
                rank,
                world_size: self.arrived.len() as u32,
            }),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }

    pub fn verdict(&self) -> Option<&Failure> {
        self.verdict.as_ref()
    }
}

/// Close a collective call: every rank reports its local failure (if any)
/// to rank 0, which answers all ranks with the combined verdict. Every rank
/// returns the same result.
pub(crate) async fn settle(
    comm: &Communicator,
    sequence: u64,
    local: Option<Failure>,
    operation: &'static str,
) -> Result<()> {
    let world = comm.world_size();
    let rank = comm.rank();
    let verdict = if world <= 1 {
        local
    } else {
        let arrive = compose_tag(sequence, phase::ARRIVE);
        let depart = compose_tag(sequence, phase::DEPART);
        let timeout = comm.config().barrier_timeout;

        if rank == 0 {
            let mut coordinator = BarrierCoordinator::new(world, local);
            for r in 1..world {
                let env = comm.take(r, arrive, timeout, operation).await?;
                match env.body {
                    Body::Barrier { failure } => coordinator.arrive(r, failure)?,
                    other => {
                        return Err(CollError::collective(
                            operation,
                            r,
                            format!("expected barrier arrival, got {other:?}"),
                        ));
                    }
                }
            }
            debug_assert!(coordinator.is_complete());
            let verdict = coordinator.verdict().cloned();

            let acks = (1..world).map(|r| {
                comm.post(
                    r,
                    depart,
                    Body::BarrierAck {
                        failure: verdict.clone(),
                    },
                )
            });
            try_join_all(acks).await?;
            verdict
        } else {
            comm.post(0, arrive, Body::Barrier { failure: local })
                .await?;
            let env = comm.take(0, depart, timeout, operation).await?;
            match env.body {
                Body::BarrierAck { failure } => failure,
                other => {
                    return Err(CollError::collective(
                        operation,
                        0,
                        format!("expected barrier release, got {other:?}"),
                    ));
                }
            }
        }
    };

    match verdict {
        None => Ok(()),
        Some(failure) => {
            tracing::debug!(rank, operation, origin = failure.rank(), "collective failed");
            Err(failure.into_error(operation))
        }
    }
}
