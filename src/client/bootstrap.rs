use crate::client::{CancelHandle, Communicator};
use crate::config::CollConfig;
use crate::error::Result;
use crate::topology::Topology;
use crate::transport::{Mailbox, RouterSet, spawn_routers, wire_mesh};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

impl Communicator {
    /// Build an in-process mesh of `world_size` ranks.
    ///
    /// Links follow `config.topology`: each rank can only send directly to
    /// its neighbors, and everything else is relayed by the router tasks of
    /// intermediate ranks. Must be called from within a tokio runtime.
    pub async fn bootstrap_local(world_size: u32, config: CollConfig) -> Result<Vec<Communicator>> {
        config.validate()?;
        let topology = Arc::new(Topology::new(config.topology, world_size)?);
        let cancel = CancelHandle::new();

        let mesh = wire_mesh(&topology, config.link_capacity)?;
        let mut handles = Vec::new();
        let ends: Vec<_> = mesh
            .into_iter()
            .enumerate()
            .map(|(rank, (links, inbound))| {
                let rank = rank as u32;
                let links = Arc::new(links);
                let mailbox = Arc::new(Mailbox::new());
                handles.extend(spawn_routers(
                    rank,
                    Arc::clone(&topology),
                    Arc::clone(&links),
                    Arc::clone(&mailbox),
                    inbound,
                ));
                (rank, links, mailbox)
            })
            .collect();

        // Routers relay for every rank, so they live until the last
        // communicator of the mesh is gone.
        let routers = Arc::new(RouterSet::new(handles));
        let comms = ends
            .into_iter()
            .map(|(rank, links, mailbox)| Communicator {
                rank,
                topology: Arc::clone(&topology),
                config: config.clone(),
                links,
                mailbox,
                sequence: AtomicU64::new(0),
                cancel: cancel.clone(),
                _routers: Arc::clone(&routers),
            })
            .collect();

        tracing::debug!(
            world_size,
            topology = %config.topology,
            diameter = topology.diameter(),
            "mesh ready"
        );
        Ok(comms)
    }
}
