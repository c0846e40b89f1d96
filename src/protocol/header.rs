/// Size of the wire header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Class of the envelope that follows the header.
///
/// Lets a router log or count traffic without deserializing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// Collective or point-to-point data (or its failure sentinel).
    Data = 0,
    /// Routed probe travelling hop by hop.
    Probe = 1,
    /// Release and barrier traffic.
    Control = 2,
}

impl FrameKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(FrameKind::Data),
            1 => Some(FrameKind::Probe),
            2 => Some(FrameKind::Control),
            _ => None,
        }
    }
}

/// 8-byte header prepended to every frame on a link.
///
/// ```text
/// [0..4] payload_length: u32 LE
/// [4]    kind: u8
/// [5]    hops: u8 (saturating route length so far)
/// [6..8] reserved: u16 (must be 0)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub payload_length: u32,
    pub kind: FrameKind,
    pub hops: u8,
}

impl Header {
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.payload_length.to_le_bytes());
        buf[4] = self.kind as u8;
        buf[5] = self.hops;
        buf
    }

    /// Returns `None` if the kind byte is unknown.
    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Option<Self> {
        let payload_length = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let kind = FrameKind::from_u8(buf[4])?;
        Some(Header {
            payload_length,
            kind,
            hops: buf[5],
        })
    }
}
