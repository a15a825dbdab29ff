use std::fmt;

use crate::actor::ActorId;
use crate::value::ScalarValue;

/// Operation identifier: a per-document counter starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(pub u64);

/// A map object: the document root, or a map created by a `make_map` op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjId {
    Root,
    Op(OpId),
}

impl ObjId {
    /// Wire form: `0` is the root, anything else is the creating op counter.
    pub fn to_wire(self) -> u64 {
        match self {
            ObjId::Root => 0,
            ObjId::Op(OpId(counter)) => counter,
        }
    }

    pub fn from_wire(value: u64) -> Self {
        if value == 0 {
            ObjId::Root
        } else {
            ObjId::Op(OpId(value))
        }
    }
}

impl fmt::Display for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjId::Root => f.write_str("_root"),
            ObjId::Op(OpId(counter)) => write!(f, "@{counter}"),
        }
    }
}

pub const OPCODE_SET: u8 = 0;
pub const OPCODE_MAKE_MAP: u8 = 1;
pub const OPCODE_DELETE: u8 = 2;

/// One field-level step of a change.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Assign a scalar to `key` of `obj`.
    Set {
        id: OpId,
        obj: ObjId,
        key: String,
        value: ScalarValue,
    },
    /// Create an empty map under `key` of `obj`; the new map's id is `id`.
    MakeMap { id: OpId, obj: ObjId, key: String },
    /// Remove `key` from `obj`.
    Delete { id: OpId, obj: ObjId, key: String },
}

impl Op {
    pub fn id(&self) -> OpId {
        match self {
            Op::Set { id, .. } | Op::MakeMap { id, .. } | Op::Delete { id, .. } => *id,
        }
    }

    pub fn obj(&self) -> ObjId {
        match self {
            Op::Set { obj, .. } | Op::MakeMap { obj, .. } | Op::Delete { obj, .. } => *obj,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Op::Set { key, .. } | Op::MakeMap { key, .. } | Op::Delete { key, .. } => key,
        }
    }

    pub fn opcode(&self) -> u8 {
        match self {
            Op::Set { .. } => OPCODE_SET,
            Op::MakeMap { .. } => OPCODE_MAKE_MAP,
            Op::Delete { .. } => OPCODE_DELETE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Op::Set { .. } => "set",
            Op::MakeMap { .. } => "make_map",
            Op::Delete { .. } => "del",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @{} {}.{:?}",
            self.name(),
            self.id().0,
            self.obj(),
            self.key()
        )?;
        if let Op::Set { value, .. } = self {
            write!(f, " = {}", value.to_json())?;
        }
        Ok(())
    }
}

/// One atomic mutation step.
///
/// Op ids are contiguous: the `i`-th op has id `start_op + i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub actor: ActorId,
    /// 1-based position of this change in its document's history.
    pub seq: u64,
    pub start_op: u64,
    /// Seconds since the Unix epoch.
    pub time: i64,
    pub message: Option<String>,
    pub ops: Vec<Op>,
}

impl Change {
    /// Counter of the last op, or `start_op - 1` for an empty change.
    pub fn max_op(&self) -> u64 {
        (self.start_op + self.ops.len() as u64).saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, super::EncodeError> {
        super::encode(self)
    }

    pub fn from_binary(data: &[u8]) -> Result<Change, super::DecodeError> {
        super::decode(data)
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Change {}#{} t={} ops={}",
            self.actor,
            self.seq,
            self.time,
            self.ops.len()
        )?;
        for op in &self.ops {
            write!(f, "\n  {op}")?;
        }
        Ok(())
    }
}
