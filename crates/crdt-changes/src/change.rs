//! Change records: the self-describing binary form of a [`Change`].
//!
//! Each record is framed so that a stream of concatenated records can be split
//! back apart without any outer container:
//!
//! ```text
//! magic(4) checksum(4, crc32 BE) chunk_type(1) vu57(body_len) body
//! ```
//!
//! The checksum covers the chunk type, the length and the body. The body holds
//! the actor, `seq`, `start_op`, the timestamp, an optional message and the op
//! list. Scalar values are single CBOR data items.

mod decode;
mod encode;
mod types;

use thiserror::Error;

pub use decode::{decode, decode_one, split_records};
pub use encode::encode;
pub use types::{Change, ObjId, Op, OpId, OPCODE_DELETE, OPCODE_MAKE_MAP, OPCODE_SET};

pub const MAGIC: [u8; 4] = [0x85, 0x6f, 0x4a, 0x83];
pub const CHUNK_TYPE_CHANGE: u8 = 0x01;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("op {index} has id {found}, expected {expected}")]
    NonContiguousOpId {
        index: usize,
        expected: u64,
        found: u64,
    },
    #[error("op {index} targets object @0, which is reserved for the root")]
    ReservedObjId { index: usize },
    #[error("{field} value {value} does not fit in vu57")]
    ValueTooLarge { field: &'static str, value: u64 },
    #[error("scalar could not be written as cbor: {0}")]
    Cbor(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("change record overflow")]
    Overflow,
    #[error("bad change record magic bytes")]
    BadMagic,
    #[error("unknown chunk type: {0:#04x}")]
    UnknownChunkType(u8),
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
    #[error("unknown change opcode: {0}")]
    UnknownOpcode(u8),
    #[error("invalid utf-8 in change record")]
    InvalidUtf8,
    #[error("invalid cbor in change record")]
    InvalidCbor,
    #[error("unsupported cbor scalar in change record")]
    UnsupportedScalar,
    #[error("invalid actor id: {0}")]
    InvalidActor(#[from] crate::actor::ActorIdError),
    #[error("trailing bytes in change record")]
    TrailingBytes,
}

/// A decode failure inside a record stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record at byte {offset}: {source}")]
pub struct StreamError {
    pub offset: usize,
    /// Records that decoded cleanly before the failure.
    pub decoded: usize,
    #[source]
    pub source: DecodeError,
}
