use crate::topology::TopologyKind;
use crate::types::Rank;

pub type Result<T> = std::result::Result<T, CollError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollError {
    #[error("topology {kind} cannot be built over {world_size} ranks")]
    InvalidTopologySize { kind: TopologyKind, world_size: u32 },

    #[error("rank {rank} out of range: world size is {world_size}")]
    RankOutOfRange { rank: Rank, world_size: u32 },

    #[error("partition mismatch at rank {rank}: expected {expected} elements, got {actual}")]
    PartitionMismatch {
        rank: Rank,
        expected: usize,
        actual: usize,
    },

    #[error("reduction operator failed at rank {rank}: {reason}")]
    OperatorFailure { rank: Rank, reason: String },

    #[error("{operation} failed at rank {rank}: {reason}")]
    CollectiveFailed {
        operation: &'static str,
        rank: Rank,
        reason: String,
    },

    #[error("peer {rank} disconnected unexpectedly")]
    PeerDisconnected { rank: Rank },

    #[error("rank {rank} is not a direct neighbor")]
    UnknownPeer { rank: Rank },

    #[error("frame decode failed: {0}")]
    DecodeFailed(String),

    #[error("frame encode failed: {0}")]
    EncodeFailed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl CollError {
    /// Create a `CollectiveFailed` error.
    pub fn collective(operation: &'static str, rank: Rank, reason: impl Into<String>) -> Self {
        Self::CollectiveFailed {
            operation,
            rank,
            reason: reason.into(),
        }
    }

    /// True for the errors `validate` can report: the ones every rank can
    /// detect before sending anything.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidTopologySize { .. }
                | Self::RankOutOfRange { .. }
                | Self::PartitionMismatch { .. }
        )
    }
}
