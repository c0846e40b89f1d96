use crate::client::{Communicator, RouteOutcome};
use crate::collective::barrier::settle;
use crate::collective::helpers::CallTags;
use crate::error::{CollError, Result};
use crate::protocol::wire::{from_bytes, to_bytes};
use crate::protocol::{Body, Failure, Wire};
use crate::types::Rank;
use crate::validate::{Operation, check_shared};
use futures::future::try_join_all;

/// Carry one payload from `source` to `destination` hop by hop.
///
/// Every rank calls this. The source posts a probe, which the routers of
/// the ranks on the path forward (each leaving a notice for its own rank),
/// and releases every rank off the path so nobody waits for a probe that
/// will never pass. `payload` is only read on the source.
pub(crate) async fn route<T: Wire>(
    comm: &Communicator,
    source: Rank,
    destination: Rank,
    payload: Option<T>,
) -> Result<RouteOutcome<T>> {
    let op = Operation::Route {
        source,
        destination,
    };
    check_shared(comm.topology(), source, &op)?;
    let path = comm.topology().path(source, destination)?;
    let tags = CallTags::new(comm.next_sequence());
    let rank = comm.rank();

    tracing::debug!(rank, source, destination, hops = path.len() - 1, "route");

    let (outcome, failure) = if rank == source {
        originate(comm, &path, tags, payload).await?
    } else if rank == destination {
        let env = comm
            .take(source, tags.data, comm.config().collective_timeout, "route")
            .await?;
        let received = match env.body {
            Body::Probe(bytes) if env.terminal && env.route == path => {
                from_bytes::<T>(&bytes).map_err(|e| Failure::from_error(rank, &e))
            }
            Body::Probe(_) => Err(Failure::Protocol {
                rank,
                reason: format!("probe took {:?}, expected {path:?}", env.route),
            }),
            Body::FailedProbe(f) => Err(f),
            other => return Err(unexpected(source, "probe", &other)),
        };
        match received {
            Ok(payload) => (
                Some(RouteOutcome::Delivered {
                    payload,
                    path: env.route,
                }),
                None,
            ),
            Err(f) => (None, Some(f)),
        }
    } else if path.contains(&rank) {
        let env = comm
            .take(source, tags.data, comm.config().collective_timeout, "route")
            .await?;
        match env.body {
            Body::Forwarded if path.starts_with(&env.route) => {
                (Some(RouteOutcome::Relayed { path: path.clone() }), None)
            }
            Body::Forwarded => (
                None,
                Some(Failure::Protocol {
                    rank,
                    reason: format!("relayed along {:?}, expected a prefix of {path:?}", env.route),
                }),
            ),
            other => return Err(unexpected(source, "forwarded notice", &other)),
        }
    } else {
        let env = comm
            .take(source, tags.data, comm.config().collective_timeout, "route")
            .await?;
        match env.body {
            Body::Release => (Some(RouteOutcome::Released), None),
            other => return Err(unexpected(source, "release", &other)),
        }
    };

    settle(comm, tags.sequence, failure, "route").await?;
    outcome.ok_or_else(|| CollError::collective("route", rank, "no outcome"))
}

async fn originate<T: Wire>(
    comm: &Communicator,
    path: &[Rank],
    tags: CallTags,
    payload: Option<T>,
) -> Result<(Option<RouteOutcome<T>>, Option<Failure>)> {
    let rank = comm.rank();
    let destination = path[path.len() - 1];

    let missing = || Failure::Protocol {
        rank,
        reason: "route source supplied no payload".into(),
    };

    let releases = (0..comm.world_size())
        .filter(|r| !path.contains(r))
        .map(|r| comm.post(r, tags.data, Body::Release));
    try_join_all(releases).await?;

    if destination == rank {
        return Ok(match payload {
            Some(payload) => (
                Some(RouteOutcome::Delivered {
                    payload,
                    path: path.to_vec(),
                }),
                None,
            ),
            None => (None, Some(missing())),
        });
    }

    let (body, failure) = match &payload {
        Some(p) => (Body::Probe(to_bytes(p)), None),
        None => (Body::FailedProbe(missing()), Some(missing())),
    };
    comm.post(destination, tags.data, body).await?;
    let outcome = failure.is_none().then(|| RouteOutcome::Origin {
        path: path.to_vec(),
    });
    Ok((outcome, failure))
}

fn unexpected(source: Rank, wanted: &str, got: &Body) -> CollError {
    CollError::collective("route", source, format!("expected {wanted}, got {got:?}"))
}
