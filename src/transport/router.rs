use crate::protocol::{Body, Envelope, decode_frame};
use crate::topology::Topology;
use crate::transport::links::{Inbound, Links};
use crate::transport::mailbox::Mailbox;
use crate::transport::relay::{Hop, arrive};
use crate::types::Rank;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Router tasks of every rank in a mesh.
///
/// Each rank's routers relay frames between other ranks, so they must
/// outlive any single communicator. Every communicator holds the set
/// through an `Arc`; the tasks are aborted when the last one is dropped.
pub(crate) struct RouterSet {
    handles: Vec<JoinHandle<()>>,
}

impl RouterSet {
    pub fn new(handles: Vec<JoinHandle<()>>) -> Self {
        Self { handles }
    }
}

impl Drop for RouterSet {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Start one router task per incoming link of `rank`.
///
/// Each task runs until the far end of its link is dropped. Frames for this
/// rank land in the mailbox; the rest go out on the link the topology picks.
/// A probe passing through also leaves a `Forwarded` notice in the mailbox so
/// the relaying rank can report its part in the route.
pub(crate) fn spawn_routers(
    rank: Rank,
    topology: Arc<Topology>,
    links: Arc<Links>,
    mailbox: Arc<Mailbox>,
    inbound: Vec<Inbound>,
) -> Vec<JoinHandle<()>> {
    inbound
        .into_iter()
        .map(|(neighbor, mut rx)| {
            let topology = Arc::clone(&topology);
            let links = Arc::clone(&links);
            let mailbox = Arc::clone(&mailbox);
            tokio::spawn(async move {
                while let Some(frame) = rx.recv().await {
                    let envelope = match decode_frame(&frame) {
                        Ok((header, env)) => {
                            tracing::trace!(
                                rank,
                                from = neighbor,
                                kind = ?header.kind,
                                hops = header.hops,
                                "router: frame in"
                            );
                            env
                        }
                        Err(e) => {
                            tracing::warn!(rank, from = neighbor, "router: dropping frame: {e}");
                            continue;
                        }
                    };
                    route_one(rank, &topology, &links, &mailbox, neighbor, envelope).await;
                }
                tracing::trace!(rank, from = neighbor, "router: link closed");
            })
        })
        .collect()
}

async fn route_one(
    rank: Rank,
    topology: &Topology,
    links: &Links,
    mailbox: &Mailbox,
    neighbor: Rank,
    envelope: Envelope,
) {
    let (source, destination, tag) = (envelope.source, envelope.destination, envelope.tag);
    match arrive(rank, topology, envelope) {
        Ok(Hop::Deliver(env)) => {
            tracing::trace!(rank, source, tag, hops = env.route.len(), "router: delivered");
            mailbox.deliver(env);
        }
        Ok(Hop::Forward { next, envelope }) => {
            if envelope.body.is_probe() {
                let mut notice = envelope.clone();
                notice.body = Body::Forwarded;
                mailbox.deliver(notice);
            }
            tracing::trace!(rank, source, destination, via = next, "router: forwarding");
            if let Err(e) = links.send(next, &envelope).await {
                tracing::warn!(
                    rank,
                    from = neighbor,
                    via = next,
                    destination,
                    "router: forward failed: {e}"
                );
            }
        }
        Err(e) => {
            tracing::warn!(rank, from = neighbor, source, destination, "router: {e}");
        }
    }
}
