//! Actor identifiers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Longest accepted actor identifier, in bytes.
pub const MAX_ACTOR_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActorIdError {
    #[error("actor id is empty")]
    Empty,
    #[error("actor id has odd hex length {0}")]
    OddLength(usize),
    #[error("invalid hex character {c:?} at index {index}")]
    InvalidHexCharacter { c: char, index: usize },
    #[error("actor id is {0} bytes, at most {MAX_ACTOR_LEN} allowed")]
    TooLong(usize),
}

/// Opaque identifier naming the writer of a change.
///
/// Written as hex text: `"414141"` names the three bytes `AAA`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(Vec<u8>);

impl ActorId {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ActorIdError> {
        if bytes.is_empty() {
            return Err(ActorIdError::Empty);
        }
        if bytes.len() > MAX_ACTOR_LEN {
            return Err(ActorIdError::TooLong(bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn from_hex(text: &str) -> Result<Self, ActorIdError> {
        if text.is_empty() {
            return Err(ActorIdError::Empty);
        }
        let bytes = hex::decode(text).map_err(|err| match err {
            hex::FromHexError::InvalidHexCharacter { c, index } => {
                ActorIdError::InvalidHexCharacter { c, index }
            }
            _ => ActorIdError::OddLength(text.len()),
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl FromStr for ActorId {
    type Err = ActorIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", self.to_hex())
    }
}
