use crate::collective;
use crate::error::{CollError, Result};
use crate::partition::Partition;
use crate::protocol::Wire;
use crate::reduce::Combine;
use crate::types::Rank;

use super::Communicator;

/// What one rank observed during [`Communicator::route`].
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome<T> {
    /// This rank was the source and sent the payload along `path`.
    Origin { path: Vec<Rank> },
    /// This rank was the destination. `path` is the route the payload
    /// actually took, source first.
    Delivered { payload: T, path: Vec<Rank> },
    /// This rank forwarded the payload; `path` is the full route.
    Relayed { path: Vec<Rank> },
    /// This rank was not on the route.
    Released,
}

impl<T> RouteOutcome<T> {
    /// The route, for every rank that took part in it.
    pub fn path(&self) -> Option<&[Rank]> {
        match self {
            RouteOutcome::Origin { path }
            | RouteOutcome::Delivered { path, .. }
            | RouteOutcome::Relayed { path } => Some(path),
            RouteOutcome::Released => None,
        }
    }
}

impl Communicator {
    /// Broadcast `buf` from `root` to every rank.
    ///
    /// On return every rank's `buf` holds the root's contents; non-root
    /// contents are overwritten, whatever their length.
    pub async fn broadcast<T: Wire>(&self, root: Rank, buf: &mut Vec<T>) -> Result<()> {
        collective::broadcast(self, root, buf).await
    }

    /// Scatter `total` elements from `root`; returns this rank's shard.
    ///
    /// `send` is read on the root only and must hold exactly `total`
    /// elements. Shard sizes follow [`Partition::new`]`(total, world_size)`.
    pub async fn scatter<T: Wire + Clone>(
        &self,
        root: Rank,
        total: usize,
        send: Option<&[T]>,
    ) -> Result<Vec<T>> {
        collective::scatter(self, root, total, send, None).await
    }

    /// Scatter into a caller-supplied buffer, which must be exactly this
    /// rank's shard size. A wrong length fails the call on every rank with
    /// [`CollError::PartitionMismatch`].
    pub async fn scatter_into<T: Wire + Clone>(
        &self,
        root: Rank,
        total: usize,
        send: Option<&[T]>,
        recv: &mut [T],
    ) -> Result<()> {
        let shard = collective::scatter(self, root, total, send, Some(recv.len())).await?;
        if shard.len() != recv.len() {
            return Err(CollError::PartitionMismatch {
                rank: self.rank,
                expected: shard.len(),
                actual: recv.len(),
            });
        }
        for (slot, value) in recv.iter_mut().zip(shard) {
            *slot = value;
        }
        Ok(())
    }

    /// Gather every rank's shard of `total` elements at `root`.
    ///
    /// `local` must be exactly this rank's shard. Returns `Some(buffer)` on
    /// the root and `None` elsewhere.
    pub async fn gather<T: Wire + Clone>(
        &self,
        root: Rank,
        total: usize,
        local: &[T],
    ) -> Result<Option<Vec<T>>> {
        collective::gather(self, root, total, local).await
    }

    /// Combine every rank's `value` with `op` at `root`.
    ///
    /// Returns `Some(result)` on the root and `None` elsewhere. A failing
    /// operator fails the call on every rank with
    /// [`CollError::OperatorFailure`].
    pub async fn reduce<T: Wire, O: Combine<T>>(
        &self,
        root: Rank,
        value: T,
        op: &O,
    ) -> Result<Option<T>> {
        collective::reduce(self, root, value, op).await
    }

    /// Combine every rank's `value` with `op`; every rank gets the result.
    pub async fn all_reduce<T: Wire, O: Combine<T>>(&self, value: T, op: &O) -> Result<T> {
        collective::all_reduce(self, value, op).await
    }

    /// Block until every rank has reached this barrier.
    pub async fn barrier(&self) -> Result<()> {
        let sequence = self.next_sequence();
        tracing::debug!(rank = self.rank, sequence, "barrier");
        collective::settle(self, sequence, None, "barrier").await
    }

    /// Relay `payload` from `source` to `destination` along the topology's
    /// route. Every rank must call this; `payload` is read on the source.
    pub async fn route<T: Wire>(
        &self,
        source: Rank,
        destination: Rank,
        payload: Option<T>,
    ) -> Result<RouteOutcome<T>> {
        collective::route(self, source, destination, payload).await
    }

    /// Shard layout this mesh uses for `total` elements.
    pub fn partition(&self, total: usize) -> Partition {
        Partition::new(total, self.world_size())
    }
}
