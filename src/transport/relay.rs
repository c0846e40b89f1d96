//! Per-hop relay decision.
//!
//! Every rank that handles an envelope appends itself to the route, then
//! either keeps it (it is the destination) or hands it to the next hop the
//! topology prescribes. The decision depends only on the topology, the
//! destination and the current rank, so it is the same on every rank.

use crate::error::{CollError, Result};
use crate::protocol::Envelope;
use crate::topology::Topology;
use crate::types::Rank;

#[derive(Debug, PartialEq)]
pub(crate) enum Hop {
    /// The envelope has reached its destination.
    Deliver(Envelope),
    /// Send the envelope over the link to `next`.
    Forward { next: Rank, envelope: Envelope },
}

/// Decide what the sender does with a freshly built envelope.
pub(crate) fn depart(me: Rank, topology: &Topology, mut envelope: Envelope) -> Result<Hop> {
    topology.check_rank(envelope.destination)?;
    if envelope.destination == me {
        envelope.terminal = true;
        return Ok(Hop::Deliver(envelope));
    }
    let next = topology.next_hop(me, envelope.destination)?;
    Ok(Hop::Forward { next, envelope })
}

/// Decide what a rank does with an envelope that just came off a link.
pub(crate) fn arrive(me: Rank, topology: &Topology, mut envelope: Envelope) -> Result<Hop> {
    // A loop-free route visits each rank at most once.
    if envelope.route.len() >= topology.world_size() as usize {
        return Err(CollError::DecodeFailed(format!(
            "envelope from {} to {} exceeded {} hops at rank {me}",
            envelope.source,
            envelope.destination,
            envelope.route.len()
        )));
    }
    envelope.route.push(me);
    depart(me, topology, envelope)
}
