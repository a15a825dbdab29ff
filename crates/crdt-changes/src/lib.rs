//! Deterministic single-actor CRDT change log.
//!
//! A [`Document`] holds a field mapping and the ordered [`Change`]s that
//! produced it. Changes serialize to self-describing binary records that can
//! be concatenated into one file and split apart again.
//!
//! # Example
//!
//! ```
//! use crdt_changes::{ChangeOptions, Document, FieldMap};
//!
//! let mut doc = Document::create(FieldMap::new().with("a", 1), "414141").unwrap();
//! doc.change(ChangeOptions::at(1741534262), |v| {
//!     v.set("a", 2);
//! })
//! .unwrap();
//!
//! let changes = doc.get_all_changes();
//! assert_eq!(changes.len(), 2);
//!
//! let record = crdt_changes::change::encode(&changes[1]).unwrap();
//! assert_eq!(crdt_changes::change::decode(&record).unwrap(), changes[1]);
//! ```

pub mod actor;
pub mod change;
pub mod change_file;
pub mod clock;
pub mod crdt_binary;
pub mod document;
pub mod value;

pub use actor::{ActorId, ActorIdError};
pub use change::{Change, DecodeError, EncodeError, ObjId, Op, OpId, StreamError};
pub use change_file::{read_all, write_all, ChangeFileError};
pub use clock::{FixedClock, SystemClock, TimeSource};
pub use document::{ChangeOptions, Document, DocumentError};
pub use value::{FieldMap, FieldValue, ScalarValue, ValueError};
