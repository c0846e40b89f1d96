use crate::client::Communicator;
use crate::error::{CollError, Result};
use crate::protocol::wire::{from_bytes, to_bytes};
use crate::protocol::{Body, Envelope, Wire};
use crate::transport::{Hop, depart};
use crate::types::{Rank, Tag, USER_TAG_BIT};
use std::time::Duration;

impl Communicator {
    /// Send `body` to `destination`, relaying through intermediate ranks when
    /// it is not a neighbor. Self-addressed envelopes go straight to the
    /// local mailbox.
    pub(crate) async fn post(&self, destination: Rank, tag: Tag, body: Body) -> Result<()> {
        let envelope = Envelope::new(self.rank, destination, tag, body);
        match depart(self.rank, &self.topology, envelope)? {
            Hop::Deliver(envelope) => {
                self.mailbox.deliver(envelope);
                Ok(())
            }
            Hop::Forward { next, envelope } => {
                tracing::trace!(rank = self.rank, dest = destination, via = next, tag, "post");
                self.links.send(next, &envelope).await
            }
        }
    }

    /// Wait for the next envelope from `source` under `tag`.
    ///
    /// Bounded by `timeout` and by mesh cancellation. A timeout is reported
    /// as `CollectiveFailed` for `operation`, naming the rank waited on.
    pub(crate) async fn take(
        &self,
        source: Rank,
        tag: Tag,
        timeout: Duration,
        operation: &'static str,
    ) -> Result<Envelope> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CollError::Cancelled),
            got = self.mailbox.recv(source, tag) => got,
            _ = tokio::time::sleep(timeout) => Err(CollError::collective(
                operation,
                source,
                format!("timed out after {}ms waiting on tag {tag:#x}", timeout.as_millis()),
            )),
        }
    }

    /// Send a typed value to any rank under a user tag.
    ///
    /// Point-to-point traffic shares the relay layer with collectives but
    /// never matches their frames.
    pub async fn send<T: Wire>(&self, destination: Rank, tag: u32, value: &T) -> Result<()> {
        self.topology.check_rank(destination)?;
        self.post(destination, user_tag(tag), Body::Data(to_bytes(value)))
            .await
    }

    /// Receive a typed value sent by `source` under a user tag.
    pub async fn recv<T: Wire>(&self, source: Rank, tag: u32) -> Result<T> {
        self.topology.check_rank(source)?;
        let envelope = self
            .take(source, user_tag(tag), self.config.collective_timeout, "recv")
            .await?;
        match envelope.body {
            Body::Data(bytes) => from_bytes(&bytes),
            other => Err(CollError::collective(
                "recv",
                source,
                format!("expected data, got {other:?}"),
            )),
        }
    }
}

fn user_tag(tag: u32) -> Tag {
    USER_TAG_BIT | Tag::from(tag)
}
