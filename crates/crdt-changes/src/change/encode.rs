use ciborium::value::Value as CborValue;

use super::types::{Change, ObjId, Op, OpId};
use super::{EncodeError, CHUNK_TYPE_CHANGE, MAGIC};
use crate::crdt_binary::{vu57_len, write_vu57, VU57_MAX};
use crate::value::{canonical_f64_bits, ScalarValue};

/// Encodes one change into a standalone record.
///
/// Deterministic: equal changes always produce identical bytes.
pub fn encode(change: &Change) -> Result<Vec<u8>, EncodeError> {
    let body = encode_body(change)?;
    let body_len = checked(body.len() as u64, "body length")?;

    let mut out = Vec::with_capacity(MAGIC.len() + 4 + 1 + vu57_len(body_len) + body.len());
    out.extend_from_slice(&MAGIC);
    let checksum_at = out.len();
    out.extend_from_slice(&[0; 4]);
    out.push(CHUNK_TYPE_CHANGE);
    write_vu57(&mut out, body_len);
    out.extend_from_slice(&body);

    let checksum = crc32fast::hash(&out[checksum_at + 4..]);
    out[checksum_at..checksum_at + 4].copy_from_slice(&checksum.to_be_bytes());
    Ok(out)
}

fn checked(value: u64, field: &'static str) -> Result<u64, EncodeError> {
    if value > VU57_MAX {
        return Err(EncodeError::ValueTooLarge { field, value });
    }
    Ok(value)
}

fn encode_body(change: &Change) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(64 + change.ops.len() * 16);

    let actor = change.actor.as_bytes();
    write_vu57(&mut out, actor.len() as u64);
    out.extend_from_slice(actor);
    write_vu57(&mut out, checked(change.seq, "seq")?);
    write_vu57(&mut out, checked(change.start_op, "start_op")?);
    out.extend_from_slice(&change.time.to_be_bytes());

    match &change.message {
        None => write_vu57(&mut out, 0),
        Some(message) => {
            write_vu57(&mut out, checked(message.len() as u64 + 1, "message length")?);
            out.extend_from_slice(message.as_bytes());
        }
    }

    write_vu57(&mut out, change.ops.len() as u64);
    for (index, op) in change.ops.iter().enumerate() {
        let expected = change.start_op + index as u64;
        let OpId(found) = op.id();
        if found != expected {
            return Err(EncodeError::NonContiguousOpId {
                index,
                expected,
                found,
            });
        }
        encode_op(&mut out, index, op)?;
    }
    Ok(out)
}

fn write_op_header(out: &mut Vec<u8>, opcode: u8, key_len: usize) {
    // Key lengths 1..=7 ride in the low three bits of the opcode octet.
    if (1..=7).contains(&key_len) {
        out.push((opcode << 3) | key_len as u8);
    } else {
        out.push(opcode << 3);
        write_vu57(out, key_len as u64);
    }
}

fn encode_op(out: &mut Vec<u8>, index: usize, op: &Op) -> Result<(), EncodeError> {
    let obj = op.obj();
    if obj == ObjId::Op(OpId(0)) {
        return Err(EncodeError::ReservedObjId { index });
    }
    let key = op.key();
    write_op_header(out, op.opcode(), key.len());
    write_vu57(out, checked(obj.to_wire(), "object id")?);
    out.extend_from_slice(key.as_bytes());
    if let Op::Set { value, .. } = op {
        write_scalar(out, value)?;
    }
    Ok(())
}

fn scalar_to_cbor(value: &ScalarValue) -> CborValue {
    match value {
        ScalarValue::Null => CborValue::Null,
        ScalarValue::Bool(b) => CborValue::Bool(*b),
        ScalarValue::Int(i) => CborValue::Integer((*i).into()),
        ScalarValue::F64(f) => CborValue::Float(f64::from_bits(canonical_f64_bits(*f))),
        ScalarValue::Str(s) => CborValue::Text(s.clone()),
        ScalarValue::Bytes(b) => CborValue::Bytes(b.clone()),
    }
}

fn write_scalar(out: &mut Vec<u8>, value: &ScalarValue) -> Result<(), EncodeError> {
    ciborium::ser::into_writer(&scalar_to_cbor(value), &mut *out)
        .map_err(|err| EncodeError::Cbor(format!("{err:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorId;

    fn actor() -> ActorId {
        ActorId::from_hex("414141").unwrap()
    }

    fn set(id: u64, key: &str, value: ScalarValue) -> Op {
        Op::Set {
            id: OpId(id),
            obj: ObjId::Root,
            key: key.into(),
            value,
        }
    }

    #[test]
    fn record_starts_with_magic_and_chunk_type() {
        let change = Change {
            actor: actor(),
            seq: 1,
            start_op: 1,
            time: 0,
            message: None,
            ops: vec![set(1, "a", ScalarValue::Int(1))],
        };
        let bytes = encode(&change).unwrap();
        assert_eq!(&bytes[..4], &MAGIC);
        assert_eq!(bytes[8], CHUNK_TYPE_CHANGE);
        let stored = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        assert_eq!(stored, crc32fast::hash(&bytes[8..]));
    }

    #[test]
    fn short_keys_are_packed_into_the_opcode_octet() {
        let mut out = Vec::new();
        write_op_header(&mut out, 1, 3);
        assert_eq!(out, vec![0b0000_1011]);

        let mut out = Vec::new();
        write_op_header(&mut out, 2, 8);
        assert_eq!(out, vec![0b0001_0000, 8]);

        let mut out = Vec::new();
        write_op_header(&mut out, 0, 0);
        assert_eq!(out, vec![0, 0]);
    }

    #[test]
    fn rejects_gaps_in_op_ids() {
        let change = Change {
            actor: actor(),
            seq: 1,
            start_op: 1,
            time: 0,
            message: None,
            ops: vec![set(1, "a", ScalarValue::Int(1)), set(3, "b", ScalarValue::Int(2))],
        };
        match encode(&change) {
            Err(EncodeError::NonContiguousOpId {
                index,
                expected,
                found,
            }) => assert_eq!((index, expected, found), (1, 2, 3)),
            other => panic!("expected NonContiguousOpId, got {other:?}"),
        }
    }

    #[test]
    fn rejects_the_reserved_object_id() {
        let change = Change {
            actor: actor(),
            seq: 1,
            start_op: 1,
            time: 0,
            message: None,
            ops: vec![Op::Delete {
                id: OpId(1),
                obj: ObjId::Op(OpId(0)),
                key: "a".into(),
            }],
        };
        assert!(matches!(
            encode(&change),
            Err(EncodeError::ReservedObjId { index: 0 })
        ));
    }

    #[test]
    fn rejects_counters_beyond_vu57() {
        let change = Change {
            actor: actor(),
            seq: u64::MAX,
            start_op: 1,
            time: 0,
            message: None,
            ops: Vec::new(),
        };
        assert!(matches!(
            encode(&change),
            Err(EncodeError::ValueTooLarge { field: "seq", .. })
        ));
    }

    #[test]
    fn encoding_is_deterministic() {
        let change = Change {
            actor: actor(),
            seq: 2,
            start_op: 2,
            time: 1_741_534_262,
            message: Some("bump".into()),
            ops: vec![
                set(2, "a", ScalarValue::F64(1.5)),
                set(3, "b", ScalarValue::Bytes(vec![0, 1, 2])),
            ],
        };
        assert_eq!(encode(&change).unwrap(), encode(&change.clone()).unwrap());
    }

    #[test]
    fn every_nan_is_written_as_the_canonical_nan() {
        let with = |f: f64| Change {
            actor: actor(),
            seq: 1,
            start_op: 1,
            time: 0,
            message: None,
            ops: vec![set(1, "x", ScalarValue::F64(f))],
        };
        let payload = f64::from_bits(f64::NAN.to_bits() | 0x5);
        assert!(payload.is_nan());
        assert_eq!(encode(&with(payload)).unwrap(), encode(&with(f64::NAN)).unwrap());
        assert_ne!(encode(&with(0.0)).unwrap(), encode(&with(-0.0)).unwrap());
    }
}
