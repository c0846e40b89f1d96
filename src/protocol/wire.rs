//! Little-endian element codec for collective payloads.
//!
//! Collective payloads are opaque bytes to the relay layer; this trait is
//! how typed caller values become those bytes and back.

use crate::error::{CollError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// A value that can cross the mesh as a payload.
pub trait Wire: Sized + Send + Sync + 'static {
    fn encode(&self, buf: &mut BytesMut);
    fn decode<B: Buf>(buf: &mut B) -> Result<Self>;
}

fn need<B: Buf>(buf: &B, n: usize, what: &str) -> Result<()> {
    if buf.remaining() < n {
        return Err(CollError::DecodeFailed(format!(
            "{what}: need {n} bytes, {} remaining",
            buf.remaining()
        )));
    }
    Ok(())
}

macro_rules! impl_wire_num {
    ($($ty:ty => $put:ident, $get:ident);* $(;)?) => {
        $(
            impl Wire for $ty {
                #[inline]
                fn encode(&self, buf: &mut BytesMut) {
                    buf.$put(*self);
                }

                #[inline]
                fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
                    need(buf, std::mem::size_of::<$ty>(), stringify!($ty))?;
                    Ok(buf.$get())
                }
            }
        )*
    };
}

impl_wire_num! {
    u8 => put_u8, get_u8;
    i8 => put_i8, get_i8;
    u16 => put_u16_le, get_u16_le;
    i16 => put_i16_le, get_i16_le;
    u32 => put_u32_le, get_u32_le;
    i32 => put_i32_le, get_i32_le;
    u64 => put_u64_le, get_u64_le;
    i64 => put_i64_le, get_i64_le;
    f32 => put_f32_le, get_f32_le;
    f64 => put_f64_le, get_f64_le;
}

impl Wire for bool {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(u8::from(*self));
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        match u8::decode(buf)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CollError::DecodeFailed(format!("invalid bool byte {other}"))),
        }
    }
}

impl Wire for () {
    fn encode(&self, _buf: &mut BytesMut) {}

    fn decode<B: Buf>(_buf: &mut B) -> Result<Self> {
        Ok(())
    }
}

impl Wire for String {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u64_le(self.len() as u64);
        buf.put_slice(self.as_bytes());
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let len = u64::decode(buf)? as usize;
        need(buf, len, "string body")?;
        let mut raw = vec![0u8; len];
        buf.copy_to_slice(&mut raw);
        String::from_utf8(raw).map_err(|e| CollError::DecodeFailed(e.to_string()))
    }
}

impl<T: Wire> Wire for Vec<T> {
    fn encode(&self, buf: &mut BytesMut) {
        encode_slice(self, buf);
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let len = u64::decode(buf)? as usize;
        // Each element takes at least zero bytes, so only cap the
        // preallocation, never the length.
        let mut out = Vec::with_capacity(len.min(buf.remaining()));
        for _ in 0..len {
            out.push(T::decode(buf)?);
        }
        Ok(out)
    }
}

impl<A: Wire, B2: Wire> Wire for (A, B2) {
    fn encode(&self, buf: &mut BytesMut) {
        self.0.encode(buf);
        self.1.encode(buf);
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let a = A::decode(buf)?;
        let b = B2::decode(buf)?;
        Ok((a, b))
    }
}

/// Encode a slice exactly as the equivalent `Vec<T>` would be encoded.
pub fn encode_slice<T: Wire>(items: &[T], buf: &mut BytesMut) {
    buf.put_u64_le(items.len() as u64);
    for item in items {
        item.encode(buf);
    }
}

/// Encode one value into a fresh byte vector.
pub fn to_bytes<T: Wire>(value: &T) -> Vec<u8> {
    let mut buf = BytesMut::new();
    value.encode(&mut buf);
    buf.to_vec()
}

/// Encode a slice into a fresh byte vector (decodes as `Vec<T>`).
pub fn slice_to_bytes<T: Wire>(items: &[T]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_slice(items, &mut buf);
    buf.to_vec()
}

/// Decode one value, rejecting trailing bytes.
pub fn from_bytes<T: Wire>(bytes: &[u8]) -> Result<T> {
    let mut buf = Bytes::copy_from_slice(bytes);
    let value = T::decode(&mut buf)?;
    if buf.has_remaining() {
        return Err(CollError::DecodeFailed(format!(
            "{} trailing bytes after payload",
            buf.remaining()
        )));
    }
    Ok(value)
}
