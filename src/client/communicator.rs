use crate::config::CollConfig;
use crate::topology::Topology;
use crate::transport::{Links, Mailbox, RouterSet};
use crate::types::Rank;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// One rank's handle onto a mesh.
///
/// Holds the outgoing links (for sending), the mailbox the router tasks
/// fill (for receiving), and the call sequence that scopes every
/// collective's frames. Every rank must enter collectives in the same order:
/// the sequence counter advances in lockstep across ranks and is what keeps
/// frames of consecutive calls apart.
///
/// # Example
///
/// ```no_run
/// use topocoll::{CollConfig, Communicator, TopologyKind};
///
/// # async fn example() -> topocoll::Result<()> {
/// let config = CollConfig::with_topology(TopologyKind::Hypercube);
/// let comms = Communicator::bootstrap_local(8, config).await?;
/// assert_eq!(comms[5].rank(), 5);
/// assert_eq!(comms[5].world_size(), 8);
/// # Ok(())
/// # }
/// ```
pub struct Communicator {
    pub(super) rank: Rank,
    pub(super) topology: Arc<Topology>,
    pub(super) config: CollConfig,
    pub(super) links: Arc<Links>,
    pub(super) mailbox: Arc<Mailbox>,
    /// Next call sequence number. Identical on every rank between calls.
    pub(super) sequence: AtomicU64,
    pub(super) cancel: CancelHandle,
    /// Router tasks of the whole mesh, shared with every other rank.
    pub(super) _routers: Arc<RouterSet>,
}

impl Communicator {
    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn world_size(&self) -> u32 {
        self.topology.world_size()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn config(&self) -> &CollConfig {
        &self.config
    }

    /// Handle that cancels every pending and future receive on the mesh.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub(crate) fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

/// Mesh-wide cancellation switch shared by every communicator of a mesh.
///
/// Cancelling is permanent: blocked receives return
/// [`CollError::Cancelled`](crate::CollError::Cancelled) and so does every
/// later receive on any rank.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the mesh is cancelled.
    pub(crate) async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone: cancellation can no longer happen.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
