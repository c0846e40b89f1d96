use crate::error::{CollError, Result};
use crate::protocol::{Envelope, encode_frame};
use crate::topology::Topology;
use crate::types::Rank;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Receiving end of one directed link, tagged with the rank at the far end.
pub(crate) type Inbound = (Rank, mpsc::Receiver<Bytes>);

/// Sending ends of one rank's outgoing links. Only topology neighbors have
/// an entry, so the link set is the adjacency relation.
pub(crate) struct Links {
    rank: Rank,
    out: HashMap<Rank, mpsc::Sender<Bytes>>,
}

impl Links {
    #[cfg(test)]
    pub fn neighbors(&self) -> impl Iterator<Item = Rank> + '_ {
        self.out.keys().copied()
    }

    /// Frame `envelope` and push it onto the link to `neighbor`.
    pub async fn send(&self, neighbor: Rank, envelope: &Envelope) -> Result<()> {
        let tx = self
            .out
            .get(&neighbor)
            .ok_or(CollError::UnknownPeer { rank: neighbor })?;
        let frame = encode_frame(envelope)?;
        tracing::trace!(
            from = self.rank,
            to = neighbor,
            bytes = frame.len(),
            "link send"
        );
        tx.send(frame)
            .await
            .map_err(|_| CollError::PeerDisconnected { rank: neighbor })
    }
}

/// Wire up every directed link of `topology`.
///
/// Returns, for each rank in order, its outgoing links and the receivers of
/// its incoming links.
pub(crate) fn wire_mesh(topology: &Topology, capacity: usize) -> Result<Vec<(Links, Vec<Inbound>)>> {
    let world = topology.world_size();
    let mut outs: Vec<HashMap<Rank, mpsc::Sender<Bytes>>> =
        (0..world).map(|_| HashMap::new()).collect();
    let mut ins: Vec<Vec<Inbound>> = (0..world).map(|_| Vec::new()).collect();

    for rank in 0..world {
        for neighbor in topology.neighbors(rank)? {
            let (tx, rx) = mpsc::channel(capacity);
            outs[rank as usize].insert(neighbor, tx);
            ins[neighbor as usize].push((rank, rx));
        }
    }

    Ok(outs
        .into_iter()
        .zip(ins)
        .enumerate()
        .map(|(rank, (out, inbound))| {
            (
                Links {
                    rank: rank as Rank,
                    out,
                },
                inbound,
            )
        })
        .collect())
}
