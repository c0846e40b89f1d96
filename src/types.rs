/// Rank of a participant in a mesh (0-indexed).
pub type Rank = u32;

/// Sequence tag that scopes every frame to one call.
///
/// The upper 56 bits carry the per-communicator call sequence (identical on
/// every rank because collectives are entered in the same order everywhere);
/// the low byte selects a phase within the call.
pub type Tag = u64;

/// Tags with this bit set belong to user point-to-point traffic and never
/// collide with collective sequence tags.
pub(crate) const USER_TAG_BIT: Tag = 1 << 63;

/// Phases within a single collective call.
pub(crate) mod phase {
    /// Payload traffic (data, partial results, probes).
    pub const DATA: u8 = 0;
    /// Result redistribution after a reduction.
    pub const RESULT: u8 = 1;
    /// Arrival at the closing barrier.
    pub const ARRIVE: u8 = 2;
    /// Release from the closing barrier.
    pub const DEPART: u8 = 3;
}

/// Compose a collective tag from a call sequence number and a phase.
pub(crate) const fn compose_tag(sequence: u64, phase: u8) -> Tag {
    ((sequence << 8) | phase as u64) & !USER_TAG_BIT
}
