use crate::error::{CollError, Result};
use crate::protocol::header::{HEADER_SIZE, Header};
use crate::protocol::message::Envelope;
use bytes::Bytes;

/// Encode an envelope into a framed buffer: `[header][rkyv payload]`.
pub fn encode_frame(env: &Envelope) -> Result<Bytes> {
    let payload = rkyv::to_bytes::<rkyv::rancor::Error>(env)
        .map_err(|e| CollError::EncodeFailed(e.to_string()))?;

    if payload.len() > u32::MAX as usize {
        return Err(CollError::EncodeFailed(format!(
            "envelope too large for framed header: {} bytes exceeds u32::MAX",
            payload.len()
        )));
    }

    let header = Header {
        payload_length: payload.len() as u32,
        kind: env.body.kind(),
        hops: env.route.len().min(u8::MAX as usize) as u8,
    };

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(&payload);
    Ok(Bytes::from(buf))
}

/// Decode a framed buffer back into `(Header, Envelope)`.
pub fn decode_frame(buf: &[u8]) -> Result<(Header, Envelope)> {
    if buf.len() < HEADER_SIZE {
        return Err(CollError::DecodeFailed(format!(
            "frame too short: {} < {HEADER_SIZE}",
            buf.len()
        )));
    }

    let header_bytes: &[u8; HEADER_SIZE] = buf[..HEADER_SIZE]
        .try_into()
        .map_err(|_| CollError::DecodeFailed("header slice length mismatch".into()))?;
    let header = Header::decode(header_bytes)
        .ok_or_else(|| CollError::DecodeFailed("invalid header: unknown frame kind".into()))?;

    let payload_end = HEADER_SIZE + header.payload_length as usize;
    if buf.len() != payload_end {
        return Err(CollError::DecodeFailed(format!(
            "frame length {} does not match header ({payload_end})",
            buf.len()
        )));
    }

    // The payload sits at offset 8 of an arbitrary allocation; rkyv wants it
    // aligned, so copy it into an aligned buffer first.
    let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(header.payload_length as usize);
    aligned.extend_from_slice(&buf[HEADER_SIZE..payload_end]);
    let env = rkyv::from_bytes::<Envelope, rkyv::rancor::Error>(&aligned)
        .map_err(|e| CollError::DecodeFailed(e.to_string()))?;

    Ok((header, env))
}
