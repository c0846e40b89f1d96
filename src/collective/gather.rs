use crate::client::Communicator;
use crate::collective::barrier::settle;
use crate::collective::helpers::{CallTags, Logical, Parcel, collective_recv, collective_send};
use crate::collective::schedule::halving_plan;
use crate::collective::scatter::{Holding, expect_shards};
use crate::error::{CollError, Result};
use crate::partition::Partition;
use crate::protocol::wire::slice_to_bytes;
use crate::protocol::{Failure, Wire};
use crate::types::Rank;
use crate::validate::{Operation, check_local, check_shared};
use futures::future::try_join_all;

/// Gather: the inverse of scatter. Every rank supplies its [`Partition`]
/// shard of `total` elements; the root returns the assembled buffer with
/// shard `i` at `offsets[i]`, other ranks return `None`.
pub(crate) async fn gather<T: Wire + Clone>(
    comm: &Communicator,
    root: Rank,
    total: usize,
    local: &[T],
) -> Result<Option<Vec<T>>> {
    let world = comm.world_size();
    let rank = comm.rank();
    let op = Operation::Gather {
        total,
        local_len: local.len(),
    };
    check_shared(comm.topology(), root, &op)?;
    let tags = CallTags::new(comm.next_sequence());
    let local_failure = check_local(comm.topology(), rank, root, &op)
        .err()
        .map(|e| Failure::from_error(rank, &e));

    tracing::debug!(rank, root, total, "gather");

    let partition = Partition::new(total, world);
    let mine = match &local_failure {
        None => Ok(local.to_vec()),
        Some(f) => Err(f.clone()),
    };

    let collected = if comm.topology().is_direct_fanout(root) || world <= 1 {
        direct_gather(comm, root, tags, &partition, mine).await?
    } else {
        halving_gather(comm, root, tags, &partition, mine).await?
    };

    let (out, failure) = match collected {
        None => (None, local_failure),
        Some(Ok(out)) => (Some(out), local_failure),
        Some(Err(f)) => (None, Failure::merge(local_failure, Some(f))),
    };
    settle(comm, tags.sequence, failure, "gather").await?;

    if rank == root {
        out.map(Some)
            .ok_or_else(|| CollError::collective("gather", rank, "nothing assembled"))
    } else {
        Ok(None)
    }
}

/// Every rank sends straight to the root. Returns `Some` on the root.
async fn direct_gather<T: Wire + Clone>(
    comm: &Communicator,
    root: Rank,
    tags: CallTags,
    partition: &Partition,
    mine: std::result::Result<Vec<T>, Failure>,
) -> Result<Option<std::result::Result<Vec<T>, Failure>>> {
    let rank = comm.rank();
    if rank != root {
        if partition.size(rank) > 0 {
            collective_send(comm, root, tags.data, Parcel::encode(&mine), "gather").await?;
        }
        return Ok(None);
    }

    let senders: Vec<Rank> = (0..comm.world_size())
        .filter(|&r| r != root && partition.size(r) > 0)
        .collect();
    let parcels = try_join_all(
        senders
            .iter()
            .map(|&r| collective_recv(comm, r, tags.data, "gather")),
    )
    .await?;

    let mut failure = mine.as_ref().err().cloned();
    let mut pieces: Vec<(Rank, Vec<T>)> = Vec::with_capacity(senders.len() + 1);
    for (&r, parcel) in senders.iter().zip(parcels) {
        match parcel.decode::<Vec<T>>(rank) {
            Ok(values) => pieces.push((r, values)),
            Err(f) => failure = Failure::merge(failure, Some(f)),
        }
    }
    if let Some(f) = failure {
        return Ok(Some(Err(f)));
    }
    if let Ok(own) = mine {
        pieces.push((root, own));
    }
    Ok(Some(Ok(assemble(pieces))))
}

/// Reversed halving tree: each rank collects its children's ranges, nearest
/// first, then passes its whole range up. Returns `Some` on the root.
async fn halving_gather<T: Wire + Clone>(
    comm: &Communicator,
    root: Rank,
    tags: CallTags,
    partition: &Partition,
    mine: std::result::Result<Vec<T>, Failure>,
) -> Result<Option<std::result::Result<Vec<T>, Failure>>> {
    let world = comm.world_size();
    let rank = comm.rank();
    let map = Logical::new(root, world);
    let plan = halving_plan(world, map.of(rank));
    let elements = |range: std::ops::Range<Rank>| partition.span(range.map(|l| map.physical(l)));

    let mut holding: Holding<T> = mine.map(|v| vec![v]);
    for (child, range) in plan.children.iter().rev() {
        if elements(range.clone()) == 0 {
            if let Ok(shards) = &mut holding {
                shards.extend(range.clone().map(|_| Vec::new()));
            }
            continue;
        }
        let parcel = collective_recv(comm, map.physical(*child), tags.data, "gather").await?;
        let received = parcel
            .decode::<Vec<Vec<T>>>(rank)
            .and_then(|shards| expect_shards(shards, range.len(), rank));
        holding = match (holding, received) {
            (Ok(mut shards), Ok(more)) => {
                shards.extend(more);
                Ok(shards)
            }
            (Ok(_), Err(f)) => Err(f),
            (Err(a), Err(b)) => Err(Failure::lowest(a, b)),
            (Err(a), Ok(_)) => Err(a),
        };
    }

    match plan.parent {
        Some(parent) => {
            if elements(plan.span.clone()) > 0 {
                let parcel = match &holding {
                    Ok(shards) => Parcel::Data(slice_to_bytes(shards)),
                    Err(f) => Parcel::Failed(f.clone()),
                };
                collective_send(comm, map.physical(parent), tags.data, parcel, "gather").await?;
            }
            Ok(None)
        }
        None => Ok(Some(holding.map(|shards| {
            let pieces = shards
                .into_iter()
                .enumerate()
                .map(|(l, s)| (map.physical(l as Rank), s))
                .collect();
            assemble(pieces)
        }))),
    }
}

/// Concatenate shards in physical rank order, which is offset order.
fn assemble<T>(mut pieces: Vec<(Rank, Vec<T>)>) -> Vec<T> {
    pieces.sort_by_key(|(r, _)| *r);
    pieces.into_iter().flat_map(|(_, s)| s).collect()
}
