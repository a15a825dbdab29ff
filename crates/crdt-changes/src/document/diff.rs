//! Field-level diff between two snapshots of a document value.

use log::trace;

use crate::change::{ObjId, Op, OpId};
use crate::value::{FieldMap, FieldValue};

pub(crate) struct OpEmitter {
    next: u64,
    ops: Vec<Op>,
}

impl OpEmitter {
    pub(crate) fn new(start_op: u64) -> Self {
        Self {
            next: start_op,
            ops: Vec::new(),
        }
    }

    fn next_id(&mut self) -> OpId {
        let id = OpId(self.next);
        self.next += 1;
        id
    }

    fn push(&mut self, op: Op) {
        trace!("diff emit {op}");
        self.ops.push(op);
    }

    pub(crate) fn finish(self) -> Vec<Op> {
        self.ops
    }
}

/// Emits the ops turning `before` into `after`, both being object `obj`.
///
/// Removed keys come first, then assignments in `after` order. A nested map
/// is diffed in place only when it is the same object on both sides;
/// otherwise it is created anew and its fields registered in the same pass.
pub(crate) fn diff_map(emitter: &mut OpEmitter, obj: ObjId, before: &FieldMap, after: &FieldMap) {
    for key in before.keys() {
        if !after.contains_key(key) {
            let id = emitter.next_id();
            emitter.push(Op::Delete {
                id,
                obj,
                key: key.to_owned(),
            });
        }
    }

    for (key, new) in after.iter() {
        match (before.get(key), new) {
            (Some(FieldValue::Scalar(old)), FieldValue::Scalar(new)) if old == new => {}
            (_, FieldValue::Scalar(value)) => {
                let id = emitter.next_id();
                emitter.push(Op::Set {
                    id,
                    obj,
                    key: key.to_owned(),
                    value: value.clone(),
                });
            }
            (Some(FieldValue::Map(old)), FieldValue::Map(new))
                if old.obj_id().is_some() && old.obj_id() == new.obj_id() =>
            {
                if let Some(child) = old.obj_id() {
                    diff_map(emitter, child, old, new);
                }
            }
            (_, FieldValue::Map(new)) => {
                let id = emitter.next_id();
                emitter.push(Op::MakeMap {
                    id,
                    obj,
                    key: key.to_owned(),
                });
                diff_map(emitter, ObjId::Op(id), &FieldMap::new(), new);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ScalarValue;

    fn diff(start: u64, before: &FieldMap, after: &FieldMap) -> Vec<Op> {
        let mut emitter = OpEmitter::new(start);
        diff_map(&mut emitter, ObjId::Root, before, after);
        emitter.finish()
    }

    #[test]
    fn equal_snapshots_emit_nothing() {
        let map = FieldMap::new().with("a", 1).with("b", FieldMap::new().with("c", 2));
        let mut materialized = FieldMap::with_obj(ObjId::Root);
        materialized.set("a", 1);
        let mut nested = FieldMap::with_obj(ObjId::Op(OpId(2)));
        nested.set("c", 2);
        materialized.set("b", nested);
        assert!(diff(5, &materialized, &materialized.clone()).is_empty());
        // A caller-built map has no identity, so it is always recreated.
        assert_eq!(diff(5, &materialized, &map).len(), 2);
    }

    #[test]
    fn scalar_replacement_is_one_set() {
        let before = FieldMap::new().with("a", 1).with("b", "x");
        let after = FieldMap::new().with("a", 2).with("b", "x");
        assert_eq!(
            diff(3, &before, &after),
            vec![Op::Set {
                id: OpId(3),
                obj: ObjId::Root,
                key: "a".into(),
                value: ScalarValue::Int(2),
            }]
        );
    }

    #[test]
    fn deletes_come_before_assignments() {
        let before = FieldMap::new().with("a", 1).with("b", 2);
        let after = FieldMap::new().with("c", 3);
        let ops = diff(1, &before, &after);
        let names: Vec<_> = ops.iter().map(|op| (op.name(), op.key().to_owned())).collect();
        assert_eq!(
            names,
            vec![
                ("del", "a".to_owned()),
                ("del", "b".to_owned()),
                ("set", "c".to_owned()),
            ]
        );
        let ids: Vec<_> = ops.iter().map(|op| op.id().0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn new_nested_map_registers_its_fields() {
        let before = FieldMap::new();
        let after = FieldMap::new().with("b", FieldMap::new().with("a", 3).with("c", FieldMap::new()));
        let ops = diff(10, &before, &after);
        assert_eq!(
            ops,
            vec![
                Op::MakeMap {
                    id: OpId(10),
                    obj: ObjId::Root,
                    key: "b".into(),
                },
                Op::Set {
                    id: OpId(11),
                    obj: ObjId::Op(OpId(10)),
                    key: "a".into(),
                    value: ScalarValue::Int(3),
                },
                Op::MakeMap {
                    id: OpId(12),
                    obj: ObjId::Op(OpId(10)),
                    key: "c".into(),
                },
            ]
        );
    }

    #[test]
    fn same_object_is_diffed_in_place() {
        let mut before = FieldMap::with_obj(ObjId::Root);
        before.set("b", FieldMap::with_obj(ObjId::Op(OpId(4))));
        let mut after = before.clone();
        after.get_map_mut("b").unwrap().set("a", 3);

        assert_eq!(
            diff(7, &before, &after),
            vec![Op::Set {
                id: OpId(7),
                obj: ObjId::Op(OpId(4)),
                key: "a".into(),
                value: ScalarValue::Int(3),
            }]
        );
    }

    #[test]
    fn map_replacing_scalar_and_scalar_replacing_map() {
        let mut before = FieldMap::with_obj(ObjId::Root);
        before.set("a", 1);
        before.set("b", FieldMap::with_obj(ObjId::Op(OpId(2))));
        let after = FieldMap::new().with("a", FieldMap::new()).with("b", 5);
        let ops = diff(3, &before, &after);
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], Op::MakeMap { key, .. } if key == "a"));
        assert!(matches!(&ops[1], Op::Set { key, value: ScalarValue::Int(5), .. } if key == "b"));
    }

    #[test]
    fn nan_field_left_alone_emits_nothing() {
        let before = FieldMap::new().with("x", f64::NAN).with("a", 1);
        assert!(diff(3, &before, &before.clone()).is_empty());
    }

    #[test]
    fn negative_zero_over_zero_is_a_set() {
        let before = FieldMap::new().with("x", 0.0);
        let after = FieldMap::new().with("x", -0.0);
        let ops = diff(2, &before, &after);
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            Op::Set {
                value: ScalarValue::F64(f),
                ..
            } => assert!(f.is_sign_negative()),
            other => panic!("expected a float set, got {other}"),
        }
    }
}
