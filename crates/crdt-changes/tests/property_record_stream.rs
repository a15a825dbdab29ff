use std::sync::Arc;

use crdt_changes::change::{decode, encode, split_records};
use crdt_changes::{ActorId, Change, ChangeOptions, Document, FieldMap, FixedClock, ObjId, Op, OpId, ScalarValue};
use proptest::prelude::*;

fn scalar() -> impl Strategy<Value = ScalarValue> {
    prop_oneof![
        Just(ScalarValue::Null),
        any::<bool>().prop_map(ScalarValue::Bool),
        any::<i64>().prop_map(ScalarValue::Int),
        any::<f64>().prop_map(ScalarValue::F64),
        prop_oneof![
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
            Just(-0.0),
            Just(0.0),
        ]
        .prop_map(ScalarValue::F64),
        "[a-z0-9 ]{0,24}".prop_map(ScalarValue::Str),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(ScalarValue::Bytes),
    ]
}

#[derive(Debug, Clone)]
enum OpKind {
    Set(ScalarValue),
    MakeMap,
    Delete,
}

fn op_kind() -> impl Strategy<Value = OpKind> {
    prop_oneof![
        3 => scalar().prop_map(OpKind::Set),
        1 => Just(OpKind::MakeMap),
        1 => Just(OpKind::Delete),
    ]
}

fn change() -> impl Strategy<Value = Change> {
    (
        prop::collection::vec(any::<u8>(), 1..=32),
        1u64..1_000,
        1u64..1_000_000,
        any::<i64>(),
        prop::option::of("[ -~]{0,40}"),
        prop::collection::vec(("[a-z]{0,12}", 0u64..50, op_kind()), 0..12),
    )
        .prop_map(|(actor, seq, start_op, time, message, raw_ops)| {
            let ops = raw_ops
                .into_iter()
                .enumerate()
                .map(|(i, (key, obj, kind))| {
                    let id = OpId(start_op + i as u64);
                    let obj = ObjId::from_wire(obj);
                    match kind {
                        OpKind::Set(value) => Op::Set { id, obj, key, value },
                        OpKind::MakeMap => Op::MakeMap { id, obj, key },
                        OpKind::Delete => Op::Delete { id, obj, key },
                    }
                })
                .collect();
            Change {
                actor: ActorId::from_bytes(&actor).expect("1..=32 bytes"),
                seq,
                start_op,
                time,
                message,
                ops,
            }
        })
}

proptest! {
    #[test]
    fn record_round_trips(c in change()) {
        let bytes = encode(&c).expect("encode");
        prop_assert_eq!(decode(&bytes).expect("decode"), c.clone());
        prop_assert_eq!(encode(&c).expect("encode twice"), bytes);
    }

    #[test]
    fn concatenated_records_split_back_in_order(changes in prop::collection::vec(change(), 0..6)) {
        let mut stream = Vec::new();
        for c in &changes {
            stream.extend(encode(c).expect("encode"));
        }
        prop_assert_eq!(split_records(&stream).expect("split"), changes);
    }

    #[test]
    fn history_length_tracks_mutations(values in prop::collection::vec(any::<i64>(), 0..10)) {
        let mut doc = Document::create_with_clock(FieldMap::new(), "414141", Arc::new(FixedClock(0)))
            .expect("create");
        for (i, value) in values.iter().enumerate() {
            doc.change(ChangeOptions::at(i as i64), |v| {
                v.set("n", *value);
            })
            .expect("change");
        }
        prop_assert_eq!(doc.get_all_changes().len(), values.len() + 1);
        prop_assert_eq!(doc.get_all_changes(), doc.get_all_changes());
        let replayed = Document::from_changes(doc.changes()).expect("replay");
        prop_assert_eq!(replayed.view(), doc.view());
    }
}
