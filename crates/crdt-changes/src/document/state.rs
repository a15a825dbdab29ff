use std::collections::HashMap;

use indexmap::IndexMap;

use super::DocumentError;
use crate::change::{ObjId, Op};
use crate::value::{FieldMap, FieldValue, ScalarValue};

#[derive(Debug, Clone)]
enum Slot {
    Scalar(ScalarValue),
    Map(ObjId),
}

/// Flat object table holding the materialized value.
///
/// Only objects reachable from the root are kept: a map that is overwritten
/// or deleted is dropped together with everything nested inside it.
#[derive(Debug, Clone)]
pub(crate) struct ObjectTable {
    objects: HashMap<ObjId, IndexMap<String, Slot>>,
}

impl ObjectTable {
    pub(crate) fn new() -> Self {
        let mut objects = HashMap::new();
        objects.insert(ObjId::Root, IndexMap::new());
        Self { objects }
    }

    pub(crate) fn apply_op(&mut self, op: &Op) -> Result<(), DocumentError> {
        let obj = op.obj();
        if !self.objects.contains_key(&obj) {
            return Err(DocumentError::UnknownObject(obj));
        }
        let slot = match op {
            Op::Set { key, value, .. } => Some((key, Slot::Scalar(value.clone()))),
            Op::MakeMap { id, key, .. } => {
                let child = ObjId::Op(*id);
                self.objects.insert(child, IndexMap::new());
                Some((key, Slot::Map(child)))
            }
            Op::Delete { .. } => None,
        };
        let fields = self
            .objects
            .get_mut(&obj)
            .ok_or(DocumentError::UnknownObject(obj))?;
        let replaced = match slot {
            Some((key, slot)) => fields.insert(key.clone(), slot),
            None => fields.shift_remove(op.key()),
        };
        if let Some(Slot::Map(orphan)) = replaced {
            self.drop_subtree(orphan);
        }
        Ok(())
    }

    fn drop_subtree(&mut self, obj: ObjId) {
        let mut pending = vec![obj];
        while let Some(obj) = pending.pop() {
            if let Some(fields) = self.objects.remove(&obj) {
                pending.extend(fields.values().filter_map(|slot| match slot {
                    Slot::Map(child) => Some(*child),
                    Slot::Scalar(_) => None,
                }));
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.objects.len()
    }

    pub(crate) fn materialize(&self, obj: ObjId) -> FieldMap {
        let mut out = FieldMap::with_obj(obj);
        if let Some(fields) = self.objects.get(&obj) {
            for (key, slot) in fields {
                let value = match slot {
                    Slot::Scalar(s) => FieldValue::Scalar(s.clone()),
                    Slot::Map(child) => FieldValue::Map(self.materialize(*child)),
                };
                out.set(key.clone(), value);
            }
        }
        out
    }
}
