use ciborium::value::Value as CborValue;

use super::types::{Change, ObjId, Op, OpId, OPCODE_DELETE, OPCODE_MAKE_MAP, OPCODE_SET};
use super::{DecodeError, StreamError, CHUNK_TYPE_CHANGE, MAGIC};
use crate::actor::ActorId;
use crate::crdt_binary::BinaryCursor;
use crate::value::ScalarValue;

/// Decodes exactly one record; trailing bytes are an error.
pub fn decode(data: &[u8]) -> Result<Change, DecodeError> {
    let (change, consumed) = decode_one(data)?;
    if consumed != data.len() {
        return Err(DecodeError::TrailingBytes);
    }
    Ok(change)
}

/// Decodes the record at the front of `data`, returning it together with the
/// number of bytes it occupied.
pub fn decode_one(data: &[u8]) -> Result<(Change, usize), DecodeError> {
    let mut reader = BinaryCursor::new(data);
    let magic = reader.read_bytes(MAGIC.len()).ok_or(DecodeError::Overflow)?;
    if magic != MAGIC {
        return Err(DecodeError::BadMagic);
    }
    let stored = reader.u32_be().ok_or(DecodeError::Overflow)?;

    let header_start = reader.position();
    let chunk_type = reader.u8().ok_or(DecodeError::Overflow)?;
    if chunk_type != CHUNK_TYPE_CHANGE {
        return Err(DecodeError::UnknownChunkType(chunk_type));
    }
    let body_len = reader.vu57().ok_or(DecodeError::Overflow)?;
    let body_len = usize::try_from(body_len).map_err(|_| DecodeError::Overflow)?;
    let body = reader.read_bytes(body_len).ok_or(DecodeError::Overflow)?;
    let end = reader.position();

    let computed = crc32fast::hash(&data[header_start..end]);
    if computed != stored {
        return Err(DecodeError::ChecksumMismatch { stored, computed });
    }

    let change = decode_body(body)?;
    Ok((change, end))
}

/// Splits a stream of concatenated records back into changes.
pub fn split_records(data: &[u8]) -> Result<Vec<Change>, StreamError> {
    let mut changes = Vec::new();
    let mut offset = 0usize;
    while offset < data.len() {
        let (change, consumed) = decode_one(&data[offset..]).map_err(|source| StreamError {
            offset,
            decoded: changes.len(),
            source,
        })?;
        changes.push(change);
        offset += consumed;
    }
    Ok(changes)
}

fn read_len_from_low3_or_var(
    reader: &mut BinaryCursor<'_>,
    octet: u8,
) -> Result<usize, DecodeError> {
    let low = (octet & 0b111) as usize;
    if low == 0 {
        let len = reader.vu57().ok_or(DecodeError::Overflow)?;
        usize::try_from(len).map_err(|_| DecodeError::Overflow)
    } else {
        Ok(low)
    }
}

fn read_str(reader: &mut BinaryCursor<'_>, len: usize) -> Result<String, DecodeError> {
    let bytes = reader.read_bytes(len).ok_or(DecodeError::Overflow)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
}

fn decode_body(body: &[u8]) -> Result<Change, DecodeError> {
    let mut reader = BinaryCursor::new(body);

    let actor_len = reader.vu57().ok_or(DecodeError::Overflow)?;
    let actor_len = usize::try_from(actor_len).map_err(|_| DecodeError::Overflow)?;
    let actor = ActorId::from_bytes(reader.read_bytes(actor_len).ok_or(DecodeError::Overflow)?)?;
    let seq = reader.vu57().ok_or(DecodeError::Overflow)?;
    let start_op = reader.vu57().ok_or(DecodeError::Overflow)?;
    let time = reader.i64_be().ok_or(DecodeError::Overflow)?;

    let message = match reader.vu57().ok_or(DecodeError::Overflow)? {
        0 => None,
        n => {
            let len = usize::try_from(n - 1).map_err(|_| DecodeError::Overflow)?;
            Some(read_str(&mut reader, len)?)
        }
    };

    let ops_len = reader.vu57().ok_or(DecodeError::Overflow)?;
    // Every op takes at least two bytes, which bounds a sane preallocation.
    let mut ops = Vec::with_capacity((ops_len as usize).min(reader.remaining() / 2));
    for index in 0..ops_len {
        let id = OpId(start_op.checked_add(index).ok_or(DecodeError::Overflow)?);
        ops.push(decode_op(&mut reader, id)?);
    }

    if !reader.is_eof() {
        return Err(DecodeError::TrailingBytes);
    }

    Ok(Change {
        actor,
        seq,
        start_op,
        time,
        message,
        ops,
    })
}

fn decode_op(reader: &mut BinaryCursor<'_>, id: OpId) -> Result<Op, DecodeError> {
    let octet = reader.u8().ok_or(DecodeError::Overflow)?;
    let opcode = octet >> 3;
    let key_len = read_len_from_low3_or_var(reader, octet)?;
    let obj = ObjId::from_wire(reader.vu57().ok_or(DecodeError::Overflow)?);
    let key = read_str(reader, key_len)?;

    match opcode {
        OPCODE_SET => {
            let value = cbor_to_scalar(reader.read_one_cbor().ok_or(DecodeError::InvalidCbor)?)?;
            Ok(Op::Set { id, obj, key, value })
        }
        OPCODE_MAKE_MAP => Ok(Op::MakeMap { id, obj, key }),
        OPCODE_DELETE => Ok(Op::Delete { id, obj, key }),
        _ => Err(DecodeError::UnknownOpcode(opcode)),
    }
}

fn cbor_to_scalar(value: CborValue) -> Result<ScalarValue, DecodeError> {
    match value {
        CborValue::Null => Ok(ScalarValue::Null),
        CborValue::Bool(b) => Ok(ScalarValue::Bool(b)),
        CborValue::Integer(i) => i64::try_from(i)
            .map(ScalarValue::Int)
            .map_err(|_| DecodeError::UnsupportedScalar),
        CborValue::Float(f) => Ok(ScalarValue::F64(f)),
        CborValue::Text(s) => Ok(ScalarValue::Str(s)),
        CborValue::Bytes(b) => Ok(ScalarValue::Bytes(b)),
        _ => Err(DecodeError::UnsupportedScalar),
    }
}
