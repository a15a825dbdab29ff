use thiserror::Error;

use crate::actor::{ActorId, ActorIdError};
use crate::change::ObjId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("invalid actor id: {0}")]
    InvalidActorId(#[from] ActorIdError),
    #[error("change by {found} cannot join a document owned by {expected}")]
    ActorMismatch { expected: ActorId, found: ActorId },
    #[error("expected change seq {expected}, found {found}")]
    SequenceGap { expected: u64, found: u64 },
    #[error("expected op counter {expected}, found {found}")]
    OpCounterGap { expected: u64, found: u64 },
    #[error("operation targets unknown object {0}")]
    UnknownObject(ObjId),
    #[error("cannot rebuild a document from an empty change list")]
    EmptyHistory,
}
