use crate::client::Communicator;
use crate::collective::barrier::settle;
use crate::collective::helpers::{CallTags, Logical, Parcel, collective_recv, collective_send};
use crate::collective::schedule::halving_plan;
use crate::error::{CollError, Result};
use crate::partition::Partition;
use crate::protocol::wire::slice_to_bytes;
use crate::protocol::{Failure, Wire};
use crate::types::Rank;
use crate::validate::{Operation, check_local, check_shared};
use futures::future::try_join_all;

/// Shards of a contiguous logical range, in logical order, or the failure
/// that replaced them.
pub(crate) type Holding<T> = std::result::Result<Vec<Vec<T>>, Failure>;

/// Scatter: root splits `total` elements by [`Partition`] and each rank
/// ends up with its shard.
///
/// `send` is read on the root only and must hold exactly `total` elements.
/// `recv_len`, when given, is the caller's receive buffer length and must
/// match the rank's shard size.
pub(crate) async fn scatter<T: Wire + Clone>(
    comm: &Communicator,
    root: Rank,
    total: usize,
    send: Option<&[T]>,
    recv_len: Option<usize>,
) -> Result<Vec<T>> {
    let world = comm.world_size();
    let rank = comm.rank();
    let partition = Partition::new(total, world);
    let op = Operation::Scatter {
        total,
        local_len: recv_len.unwrap_or_else(|| partition.size(rank)),
        send_len: send.map(<[T]>::len),
    };
    check_shared(comm.topology(), root, &op)?;
    let tags = CallTags::new(comm.next_sequence());
    let mut failure = check_local(comm.topology(), rank, root, &op)
        .err()
        .map(|e| Failure::from_error(rank, &e));

    tracing::debug!(rank, root, total, "scatter");

    // Only a root whose send buffer has the right length hands out data.
    let source: std::result::Result<&[T], Failure> = match send {
        Some(s) if s.len() == total => Ok(s),
        other => Err(Failure::PartitionMismatch {
            rank,
            expected: total as u64,
            actual: other.map_or(0, <[T]>::len) as u64,
        }),
    };

    let own = if comm.topology().is_direct_fanout(root) || world <= 1 {
        direct_scatter(comm, root, tags, &partition, source).await?
    } else {
        halving_scatter(comm, root, tags, &partition, source).await?
    };

    let own = match own {
        Ok(values) => Some(values),
        Err(f) => {
            failure = Failure::merge(failure, Some(f));
            None
        }
    };
    settle(comm, tags.sequence, failure, "scatter").await?;
    own.ok_or_else(|| CollError::collective("scatter", rank, "no shard received"))
}

async fn direct_scatter<T: Wire + Clone>(
    comm: &Communicator,
    root: Rank,
    tags: CallTags,
    partition: &Partition,
    source: std::result::Result<&[T], Failure>,
) -> Result<std::result::Result<Vec<T>, Failure>> {
    let rank = comm.rank();
    if rank != root {
        if partition.size(rank) == 0 {
            return Ok(Ok(Vec::new()));
        }
        let parcel = collective_recv(comm, root, tags.data, "scatter").await?;
        return Ok(parcel.decode::<Vec<T>>(rank));
    }

    let sends = (0..comm.world_size())
        .filter(|&r| r != root && partition.size(r) > 0)
        .map(|r| {
            let parcel = match &source {
                Ok(s) => Parcel::Data(slice_to_bytes(&s[partition.shard(r)])),
                Err(f) => Parcel::Failed(f.clone()),
            };
            collective_send(comm, r, tags.data, parcel, "scatter")
        });
    try_join_all(sends).await?;
    Ok(source.map(|s| s[partition.shard(root)].to_vec()))
}

async fn halving_scatter<T: Wire + Clone>(
    comm: &Communicator,
    root: Rank,
    tags: CallTags,
    partition: &Partition,
    source: std::result::Result<&[T], Failure>,
) -> Result<std::result::Result<Vec<T>, Failure>> {
    let world = comm.world_size();
    let rank = comm.rank();
    let map = Logical::new(root, world);
    let plan = halving_plan(world, map.of(rank));
    let elements = |range: std::ops::Range<Rank>| partition.span(range.map(|l| map.physical(l)));

    let holding: Holding<T> = match plan.parent {
        None => source.map(|s| {
            plan.span
                .clone()
                .map(|l| s[partition.shard(map.physical(l))].to_vec())
                .collect()
        }),
        Some(parent) if elements(plan.span.clone()) > 0 => {
            let parcel = collective_recv(comm, map.physical(parent), tags.data, "scatter").await?;
            parcel
                .decode::<Vec<Vec<T>>>(rank)
                .and_then(|shards| expect_shards(shards, plan.span.len(), rank))
        }
        Some(_) => Ok(plan.span.clone().map(|_| Vec::new()).collect()),
    };

    let sends = plan
        .children
        .iter()
        .filter(|(_, range)| elements(range.clone()) > 0)
        .map(|(child, range)| {
            let parcel = match &holding {
                Ok(shards) => {
                    let lo = (range.start - plan.span.start) as usize;
                    Parcel::Data(slice_to_bytes(&shards[lo..lo + range.len()]))
                }
                Err(f) => Parcel::Failed(f.clone()),
            };
            collective_send(comm, map.physical(*child), tags.data, parcel, "scatter")
        });
    try_join_all(sends).await?;

    Ok(holding.map(|shards| shards.into_iter().next().unwrap_or_default()))
}

/// Check that a received range carries one shard per logical rank.
pub(crate) fn expect_shards<T>(shards: Vec<Vec<T>>, expected: usize, rank: Rank) -> Holding<T> {
    if shards.len() == expected {
        Ok(shards)
    } else {
        Err(Failure::Protocol {
            rank,
            reason: format!("expected {expected} shards, got {}", shards.len()),
        })
    }
}
