use crate::error::CollError;
use crate::protocol::header::FrameKind;
use crate::types::{Rank, Tag};

/// Why a rank could not contribute to a collective.
///
/// Travels in place of data so that peers waiting on the failing rank are
/// not left blocked, then decides what every rank returns.
#[derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize, Debug, Clone, PartialEq)]
pub enum Failure {
    PartitionMismatch {
        rank: Rank,
        expected: u64,
        actual: u64,
    },
    Operator {
        rank: Rank,
        reason: String,
    },
    Protocol {
        rank: Rank,
        reason: String,
    },
}

impl Failure {
    /// Rank where the failure originated.
    pub fn rank(&self) -> Rank {
        match self {
            Failure::PartitionMismatch { rank, .. }
            | Failure::Operator { rank, .. }
            | Failure::Protocol { rank, .. } => *rank,
        }
    }

    /// Capture a local error so it can be shipped to peers.
    pub fn from_error(rank: Rank, err: &CollError) -> Self {
        match err {
            CollError::PartitionMismatch {
                rank,
                expected,
                actual,
            } => Failure::PartitionMismatch {
                rank: *rank,
                expected: *expected as u64,
                actual: *actual as u64,
            },
            CollError::OperatorFailure { rank, reason } => Failure::Operator {
                rank: *rank,
                reason: reason.clone(),
            },
            other => Failure::Protocol {
                rank,
                reason: other.to_string(),
            },
        }
    }

    /// The error every rank reports for this failure.
    pub fn into_error(self, operation: &'static str) -> CollError {
        match self {
            Failure::PartitionMismatch {
                rank,
                expected,
                actual,
            } => CollError::PartitionMismatch {
                rank,
                expected: expected as usize,
                actual: actual as usize,
            },
            Failure::Operator { rank, reason } => CollError::OperatorFailure { rank, reason },
            Failure::Protocol { rank, reason } => CollError::collective(operation, rank, reason),
        }
    }

    /// Of two failures, the one from the lower originating rank.
    pub fn lowest(a: Failure, b: Failure) -> Failure {
        if b.rank() < a.rank() { b } else { a }
    }

    /// Keep the failure from the lowest originating rank.
    pub fn merge(current: Option<Failure>, incoming: Option<Failure>) -> Option<Failure> {
        match (current, incoming) {
            (Some(a), Some(b)) => Some(Failure::lowest(a, b)),
            (a, b) => a.or(b),
        }
    }
}

#[derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize, Debug, Clone, PartialEq)]
pub enum Body {
    /// Encoded payload for the destination.
    Data(Vec<u8>),
    /// Sentinel sent instead of `Data` by a rank that failed locally.
    Failed(Failure),
    /// Routed message whose relays report their participation.
    Probe(Vec<u8>),
    /// Probe sent by a source that could not produce a payload.
    FailedProbe(Failure),
    /// Local notice that this rank forwarded a probe. Never sent on a link.
    Forwarded,
    /// Tells an off-path rank that a route finished without it.
    Release,
    /// Arrival at the closing status barrier.
    Barrier { failure: Option<Failure> },
    /// Verdict from the barrier coordinator.
    BarrierAck { failure: Option<Failure> },
}

impl Body {
    /// Probes leave a `Forwarded` notice at every relay they pass.
    pub fn is_probe(&self) -> bool {
        matches!(self, Body::Probe(_) | Body::FailedProbe(_))
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            Body::Data(_) | Body::Failed(_) => FrameKind::Data,
            Body::Probe(_) | Body::FailedProbe(_) | Body::Forwarded => FrameKind::Probe,
            Body::Release | Body::Barrier { .. } | Body::BarrierAck { .. } => FrameKind::Control,
        }
    }
}

/// Unit of transfer between ranks.
///
/// `route` accumulates every rank that handled the envelope, starting with
/// the source. `terminal` is set by the destination on arrival.
#[derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope {
    pub source: Rank,
    pub destination: Rank,
    pub tag: Tag,
    pub route: Vec<Rank>,
    pub terminal: bool,
    pub body: Body,
}

impl Envelope {
    pub fn new(source: Rank, destination: Rank, tag: Tag, body: Body) -> Self {
        Self {
            source,
            destination,
            tag,
            route: vec![source],
            terminal: false,
            body,
        }
    }
}
