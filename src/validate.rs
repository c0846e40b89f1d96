//! Pre-flight checks for collective calls.
//!
//! [`validate`] answers, without sending anything, whether a call would be
//! rejected. The collectives run the same checks: the shared half on every
//! rank before the first send (every rank reaches the same verdict), the
//! local half as a failure that rides the closing barrier to every rank.

use crate::error::{CollError, Result};
use crate::partition::Partition;
use crate::topology::{Topology, TopologyKind};
use crate::types::Rank;

/// A collective call as seen by one rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Broadcast,
    /// `send_len` is the length of the full buffer supplied on the root
    /// (ignored elsewhere); `local_len` is the receive buffer length.
    Scatter {
        total: usize,
        local_len: usize,
        send_len: Option<usize>,
    },
    Gather {
        total: usize,
        local_len: usize,
    },
    Reduce,
    /// Always rooted at rank 0; the `root` argument is ignored.
    AllReduce,
    Barrier,
    /// `root` is ignored; the route endpoints are checked instead.
    Route {
        source: Rank,
        destination: Rank,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Broadcast => "broadcast",
            Operation::Scatter { .. } => "scatter",
            Operation::Gather { .. } => "gather",
            Operation::Reduce => "reduce",
            Operation::AllReduce => "all_reduce",
            Operation::Barrier => "barrier",
            Operation::Route { .. } => "route",
        }
    }
}

/// Check whether `rank` could take part in `operation` over a mesh of
/// `world_size` ranks linked as `kind`.
///
/// ```
/// use topocoll::{CollError, Operation, TopologyKind, validate};
///
/// assert!(matches!(
///     validate(TopologyKind::Hypercube, 6, 0, 0, &Operation::Broadcast),
///     Err(CollError::InvalidTopologySize { world_size: 6, .. })
/// ));
/// ```
pub fn validate(
    kind: TopologyKind,
    world_size: u32,
    rank: Rank,
    root: Rank,
    operation: &Operation,
) -> Result<()> {
    let topology = Topology::new(kind, world_size)?;
    topology.check_rank(rank)?;
    check_shared(&topology, root, operation)?;
    check_local(&topology, rank, root, operation)
}

/// Checks every rank evaluates identically.
pub(crate) fn check_shared(topology: &Topology, root: Rank, operation: &Operation) -> Result<()> {
    match operation {
        Operation::Broadcast
        | Operation::Scatter { .. }
        | Operation::Gather { .. }
        | Operation::Reduce => topology.check_rank(root),
        Operation::AllReduce | Operation::Barrier => Ok(()),
        Operation::Route {
            source,
            destination,
        } => {
            topology.check_rank(*source)?;
            topology.check_rank(*destination)
        }
    }
}

/// Checks that depend on buffers only `rank` can see.
pub(crate) fn check_local(
    topology: &Topology,
    rank: Rank,
    root: Rank,
    operation: &Operation,
) -> Result<()> {
    match *operation {
        Operation::Scatter {
            total,
            local_len,
            send_len,
        } => {
            if rank == root {
                let actual = send_len.unwrap_or(0);
                if actual != total {
                    return Err(CollError::PartitionMismatch {
                        rank,
                        expected: total,
                        actual,
                    });
                }
            }
            Partition::new(total, topology.world_size()).check_local(rank, local_len)
        }
        Operation::Gather { total, local_len } => {
            Partition::new(total, topology.world_size()).check_local(rank, local_len)
        }
        _ => Ok(()),
    }
}
