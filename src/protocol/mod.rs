pub(crate) mod codec;
pub(crate) mod header;
pub(crate) mod message;
pub mod wire;

pub(crate) use codec::{decode_frame, encode_frame};
pub(crate) use message::{Body, Envelope, Failure};
pub use wire::Wire;
