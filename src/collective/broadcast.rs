use crate::client::Communicator;
use crate::collective::barrier::settle;
use crate::collective::helpers::{
    CallTags, Logical, Parcel, collective_recv, collective_send, tree_children, tree_parent,
};
use crate::error::{CollError, Result};
use crate::protocol::Wire;
use crate::protocol::wire::slice_to_bytes;
use crate::types::{Rank, Tag};
use crate::validate::{Operation, check_shared};
use futures::future::try_join_all;

/// Deliver the root's parcel to every rank.
///
/// When the root links directly to every rank (complete graph, star hub) it
/// sends to each one itself. Otherwise the parcel travels down a binary tree
/// over logical ranks (root is logical 0, `l` feeds `2l+1` and `2l+2`);
/// tree edges that are not links are relayed. Every rank returns the parcel.
pub(crate) async fn fan_out(
    comm: &Communicator,
    root: Rank,
    tag: Tag,
    parcel: Option<Parcel>,
    operation: &'static str,
) -> Result<Parcel> {
    let world = comm.world_size();
    let rank = comm.rank();

    if rank == root {
        let parcel = parcel.ok_or_else(|| {
            CollError::collective(operation, rank, "root has nothing to send")
        })?;
        if world <= 1 {
            return Ok(parcel);
        }
        let targets: Vec<Rank> = if comm.topology().is_direct_fanout(root) {
            (0..world).filter(|&r| r != root).collect()
        } else {
            let map = Logical::new(root, world);
            tree_children(0, world).map(|c| map.physical(c)).collect()
        };
        send_all(comm, &targets, tag, &parcel, operation).await?;
        return Ok(parcel);
    }

    if comm.topology().is_direct_fanout(root) {
        return collective_recv(comm, root, tag, operation).await;
    }

    let map = Logical::new(root, world);
    let me = map.of(rank);
    let parent = tree_parent(me).map(|p| map.physical(p)).unwrap_or(root);
    let parcel = collective_recv(comm, parent, tag, operation).await?;
    let children: Vec<Rank> = tree_children(me, world).map(|c| map.physical(c)).collect();
    send_all(comm, &children, tag, &parcel, operation).await?;
    Ok(parcel)
}

async fn send_all(
    comm: &Communicator,
    targets: &[Rank],
    tag: Tag,
    parcel: &Parcel,
    operation: &'static str,
) -> Result<()> {
    let futs = targets
        .iter()
        .map(|&dest| collective_send(comm, dest, tag, parcel.clone(), operation));
    try_join_all(futs).await?;
    Ok(())
}

/// Broadcast `buf` from `root`; on return every rank's `buf` equals the
/// root's.
pub(crate) async fn broadcast<T: Wire>(
    comm: &Communicator,
    root: Rank,
    buf: &mut Vec<T>,
) -> Result<()> {
    check_shared(comm.topology(), root, &Operation::Broadcast)?;
    let tags = CallTags::new(comm.next_sequence());
    let rank = comm.rank();

    let outgoing = (rank == root).then(|| Parcel::Data(slice_to_bytes(buf)));
    let received = fan_out(comm, root, tags.data, outgoing, "broadcast").await?;

    let failure = if rank == root {
        None
    } else {
        match received.decode::<Vec<T>>(rank) {
            Ok(values) => {
                *buf = values;
                None
            }
            Err(f) => Some(f),
        }
    };
    settle(comm, tags.sequence, failure, "broadcast").await
}
