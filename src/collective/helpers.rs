use crate::client::Communicator;
use crate::error::{CollError, Result};
use crate::protocol::{Body, Failure, Wire};
use crate::types::{Rank, Tag, compose_tag, phase};

/// Tags of one collective call, derived from its sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CallTags {
    pub sequence: u64,
    pub data: Tag,
    pub result: Tag,
}

impl CallTags {
    pub fn new(sequence: u64) -> Self {
        Self {
            sequence,
            data: compose_tag(sequence, phase::DATA),
            result: compose_tag(sequence, phase::RESULT),
        }
    }
}

/// Rank numbering with `root` moved to logical rank 0.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Logical {
    root: Rank,
    world: u32,
}

impl Logical {
    pub fn new(root: Rank, world: u32) -> Self {
        Self { root, world }
    }

    pub fn of(&self, physical: Rank) -> Rank {
        (physical + self.world - self.root) % self.world
    }

    pub fn physical(&self, logical: Rank) -> Rank {
        (logical + self.root) % self.world
    }
}

/// Parent of logical rank `l` in the binary tree rooted at logical 0.
pub(crate) fn tree_parent(l: Rank) -> Option<Rank> {
    (l > 0).then(|| (l - 1) / 2)
}

/// Children of logical rank `l`, left first.
pub(crate) fn tree_children(l: Rank, world: u32) -> impl Iterator<Item = Rank> {
    [2 * l + 1, 2 * l + 2].into_iter().filter(move |&c| c < world)
}

/// What a rank hands on during a collective: its encoded contribution, or
/// the failure that replaced it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Parcel {
    Data(Vec<u8>),
    Failed(Failure),
}

impl Parcel {
    pub fn encode<T: Wire>(value: &std::result::Result<T, Failure>) -> Self {
        match value {
            Ok(v) => Parcel::Data(crate::protocol::wire::to_bytes(v)),
            Err(f) => Parcel::Failed(f.clone()),
        }
    }

    /// Decode the payload at `rank`. A payload that does not decode becomes
    /// a failure attributed to `rank`.
    pub fn decode<T: Wire>(self, rank: Rank) -> std::result::Result<T, Failure> {
        match self {
            Parcel::Data(bytes) => crate::protocol::wire::from_bytes(&bytes)
                .map_err(|e| Failure::from_error(rank, &e)),
            Parcel::Failed(f) => Err(f),
        }
    }

    fn into_body(self) -> Body {
        match self {
            Parcel::Data(bytes) => Body::Data(bytes),
            Parcel::Failed(f) => Body::Failed(f),
        }
    }
}

/// Send a parcel to any rank, wrapping transport errors as `CollectiveFailed`.
pub(crate) async fn collective_send(
    comm: &Communicator,
    dest: Rank,
    tag: Tag,
    parcel: Parcel,
    operation: &'static str,
) -> Result<()> {
    comm.post(dest, tag, parcel.into_body())
        .await
        .map_err(|e| wrap(e, operation, dest))
}

/// Receive a parcel from `src`, bounded by the collective timeout.
pub(crate) async fn collective_recv(
    comm: &Communicator,
    src: Rank,
    tag: Tag,
    operation: &'static str,
) -> Result<Parcel> {
    let envelope = comm
        .take(src, tag, comm.config().collective_timeout, operation)
        .await
        .map_err(|e| wrap(e, operation, src))?;
    match envelope.body {
        Body::Data(bytes) => Ok(Parcel::Data(bytes)),
        Body::Failed(f) => Ok(Parcel::Failed(f)),
        other => Err(CollError::collective(
            operation,
            src,
            format!("expected data or failure, got {other:?}"),
        )),
    }
}

fn wrap(err: CollError, operation: &'static str, peer: Rank) -> CollError {
    match err {
        CollError::Cancelled | CollError::CollectiveFailed { .. } => err,
        other => CollError::collective(operation, peer, other.to_string()),
    }
}
