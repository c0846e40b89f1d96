use crate::client::Communicator;
use crate::collective::barrier::settle;
use crate::collective::broadcast::fan_out;
use crate::collective::helpers::{
    CallTags, Logical, Parcel, collective_recv, collective_send, tree_children, tree_parent,
};
use crate::error::{CollError, Result};
use crate::protocol::{Failure, Wire};
use crate::reduce::Combine;
use crate::types::{Rank, Tag};
use crate::validate::{Operation, check_shared};

/// Fold every rank's value into `root` over the logical binary tree.
///
/// Each rank combines its own value with its left child's, then its right
/// child's, and passes the result to its parent. A failure anywhere
/// replaces the value on the way up; the lowest originating rank wins.
/// Returns the folded value on the root and `None` elsewhere.
pub(crate) async fn tree_fold<T: Wire, O: Combine<T>>(
    comm: &Communicator,
    root: Rank,
    tag: Tag,
    value: T,
    op: &O,
    operation: &'static str,
) -> Result<Option<std::result::Result<T, Failure>>> {
    let world = comm.world_size();
    let rank = comm.rank();
    let map = Logical::new(root, world);
    let me = map.of(rank);

    let mut acc: std::result::Result<T, Failure> = Ok(value);
    for child in tree_children(me, world) {
        let from = map.physical(child);
        let incoming = collective_recv(comm, from, tag, operation)
            .await?
            .decode::<T>(rank);
        acc = match (acc, incoming) {
            (Ok(a), Ok(b)) => op
                .combine(a, b)
                .map_err(|reason| Failure::Operator { rank, reason }),
            (Ok(_), Err(f)) => Err(f),
            (Err(a), Err(b)) => Err(Failure::lowest(a, b)),
            (Err(a), Ok(_)) => Err(a),
        };
    }

    match tree_parent(me) {
        Some(parent) => {
            collective_send(comm, map.physical(parent), tag, Parcel::encode(&acc), operation)
                .await?;
            Ok(None)
        }
        None => Ok(Some(acc)),
    }
}

pub(crate) async fn reduce<T: Wire, O: Combine<T>>(
    comm: &Communicator,
    root: Rank,
    value: T,
    op: &O,
) -> Result<Option<T>> {
    check_shared(comm.topology(), root, &Operation::Reduce)?;
    let tags = CallTags::new(comm.next_sequence());
    tracing::debug!(rank = comm.rank(), root, "reduce");

    let folded = tree_fold(comm, root, tags.data, value, op, "reduce").await?;
    let (result, failure) = match folded {
        Some(Ok(v)) => (Some(v), None),
        Some(Err(f)) => (None, Some(f)),
        None => (None, None),
    };
    settle(comm, tags.sequence, failure, "reduce").await?;

    if comm.rank() == root {
        result
            .map(Some)
            .ok_or_else(|| CollError::collective("reduce", root, "no result at root"))
    } else {
        Ok(None)
    }
}

/// Reduce to rank 0, then broadcast the result so every rank returns it.
pub(crate) async fn all_reduce<T: Wire, O: Combine<T>>(
    comm: &Communicator,
    value: T,
    op: &O,
) -> Result<T> {
    check_shared(comm.topology(), 0, &Operation::AllReduce)?;
    let tags = CallTags::new(comm.next_sequence());
    let rank = comm.rank();
    tracing::debug!(rank, "all_reduce");

    let folded = tree_fold(comm, 0, tags.data, value, op, "all_reduce").await?;
    let outgoing = folded.as_ref().map(Parcel::encode);
    let received = fan_out(comm, 0, tags.result, outgoing, "all_reduce").await?;

    let (result, failure) = match received.decode::<T>(rank) {
        Ok(v) => (Some(v), None),
        Err(f) => (None, Some(f)),
    };
    settle(comm, tags.sequence, failure, "all_reduce").await?;
    result.ok_or_else(|| CollError::collective("all_reduce", rank, "no result"))
}
