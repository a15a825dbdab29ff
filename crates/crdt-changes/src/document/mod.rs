//! Single-actor document: a versioned field mapping plus its change history.
//!
//! Every mutation closure becomes exactly one [`Change`]. The materialized
//! value is always the fold of the recorded changes, so a document rebuilt
//! from its own history via [`Document::from_changes`] has the same view.

mod diff;
mod error;
mod state;

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::actor::ActorId;
use crate::change::{Change, ObjId, OpId};
use crate::clock::{SystemClock, TimeSource};
use crate::value::FieldMap;

pub use error::DocumentError;

use diff::{diff_map, OpEmitter};
use state::ObjectTable;

/// Options for one mutation. The actor always comes from the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeOptions {
    /// Explicit timestamp; the document's time source is used when absent.
    pub time: Option<i64>,
    pub message: Option<String>,
}

impl ChangeOptions {
    pub fn at(time: i64) -> Self {
        Self {
            time: Some(time),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Clone)]
pub struct Document {
    actor: ActorId,
    clock: Arc<dyn TimeSource>,
    changes: Vec<Change>,
    objects: ObjectTable,
    max_op: u64,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("actor", &self.actor)
            .field("changes", &self.changes.len())
            .field("max_op", &self.max_op)
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Creates a document stamped by the wall clock.
    ///
    /// The first change registers every field of `initial`.
    pub fn create(initial: FieldMap, actor: &str) -> Result<Self, DocumentError> {
        Self::create_with_clock(initial, actor, Arc::new(SystemClock))
    }

    pub fn create_with_clock(
        initial: FieldMap,
        actor: &str,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, DocumentError> {
        let actor = ActorId::from_hex(actor)?;
        let mut doc = Self::empty(actor, clock);
        let mut emitter = OpEmitter::new(1);
        diff_map(&mut emitter, ObjId::Root, &FieldMap::new(), &initial);
        let time = doc.clock.now();
        doc.commit(emitter, time, None)?;
        Ok(doc)
    }

    /// Rebuilds a document by replaying a complete history.
    pub fn from_changes(changes: &[Change]) -> Result<Self, DocumentError> {
        let first = changes.first().ok_or(DocumentError::EmptyHistory)?;
        let mut doc = Self::empty(first.actor.clone(), Arc::new(SystemClock));
        doc.apply_changes(changes)?;
        Ok(doc)
    }

    fn empty(actor: ActorId, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            actor,
            clock,
            changes: Vec::new(),
            objects: ObjectTable::new(),
            max_op: 0,
        }
    }

    /// Replaces the time source used for changes without an explicit time.
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    /// Number of changes recorded so far.
    pub fn seq(&self) -> u64 {
        self.changes.len() as u64
    }

    pub fn max_op(&self) -> u64 {
        self.max_op
    }

    /// Applies `mutate` to a draft of the current value and records the
    /// difference as one change.
    ///
    /// A closure that leaves the value untouched still records a change, with
    /// an empty op list.
    pub fn change<F>(&mut self, options: ChangeOptions, mutate: F) -> Result<&Change, DocumentError>
    where
        F: FnOnce(&mut FieldMap),
    {
        let before = self.value();
        let mut draft = before.clone();
        mutate(&mut draft);

        let mut emitter = OpEmitter::new(self.max_op + 1);
        diff_map(&mut emitter, ObjId::Root, &before, &draft);
        let time = options.time.unwrap_or_else(|| self.clock.now());
        self.commit(emitter, time, options.message)
    }

    fn commit(
        &mut self,
        emitter: OpEmitter,
        time: i64,
        message: Option<String>,
    ) -> Result<&Change, DocumentError> {
        let change = Change {
            actor: self.actor.clone(),
            seq: self.seq() + 1,
            start_op: self.max_op + 1,
            time,
            message,
            ops: emitter.finish(),
        };
        self.apply_change(change)?;
        Ok(&self.changes[self.changes.len() - 1])
    }

    /// Appends changes produced elsewhere by the same actor.
    ///
    /// Each change must continue the history exactly: next `seq`, next op
    /// counter, contiguous op ids. A change that fails validation leaves the
    /// document as it was before that change.
    pub fn apply_changes(&mut self, changes: &[Change]) -> Result<(), DocumentError> {
        for change in changes {
            self.apply_change(change.clone())?;
        }
        Ok(())
    }

    fn apply_change(&mut self, change: Change) -> Result<(), DocumentError> {
        if change.actor != self.actor {
            return Err(DocumentError::ActorMismatch {
                expected: self.actor.clone(),
                found: change.actor,
            });
        }
        let expected_seq = self.seq() + 1;
        if change.seq != expected_seq {
            return Err(DocumentError::SequenceGap {
                expected: expected_seq,
                found: change.seq,
            });
        }
        let mut expected_op = self.max_op + 1;
        if change.start_op != expected_op {
            return Err(DocumentError::OpCounterGap {
                expected: expected_op,
                found: change.start_op,
            });
        }
        for op in &change.ops {
            let OpId(found) = op.id();
            if found != expected_op {
                return Err(DocumentError::OpCounterGap {
                    expected: expected_op,
                    found,
                });
            }
            expected_op += 1;
        }

        let mut objects = self.objects.clone();
        for op in &change.ops {
            objects.apply_op(op)?;
        }
        self.objects = objects;
        self.max_op = change.max_op().max(self.max_op);
        debug!(
            "applied change {}#{} ({} ops, t={})",
            change.actor,
            change.seq,
            change.ops.len(),
            change.time
        );
        self.changes.push(change);
        Ok(())
    }

    /// All changes in causal order, starting with the creation change.
    pub fn get_all_changes(&self) -> Vec<Change> {
        self.changes.clone()
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// The materialized value; nested maps carry their object ids.
    pub fn value(&self) -> FieldMap {
        self.objects.materialize(ObjId::Root)
    }

    pub fn view(&self) -> serde_json::Value {
        self.value().to_json()
    }
}
