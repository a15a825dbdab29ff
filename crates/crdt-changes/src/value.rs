//! Field values held by a document.
//!
//! A document value is a tree of [`FieldMap`]s whose leaves are
//! [`ScalarValue`]s. Maps materialized from a document remember the CRDT
//! object they came from, which is how the differ tells an in-place edit of a
//! nested map apart from the assignment of a new one.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::change::ObjId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("arrays are not supported (at {0:?})")]
    UnsupportedArray(String),
    #[error("integer {0} does not fit in i64")]
    IntegerOutOfRange(u64),
    #[error("expected a JSON object at the document root")]
    NotAnObject,
}

/// A leaf value.
///
/// Floats compare by bit pattern, so `0.0` and `-0.0` differ and a NaN equals
/// itself. Every NaN is treated as the canonical [`f64::NAN`].
#[derive(Debug, Clone)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
}

/// Bit pattern of `f` with every NaN folded onto [`f64::NAN`].
pub(crate) fn canonical_f64_bits(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else {
        f.to_bits()
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScalarValue::Null, ScalarValue::Null) => true,
            (ScalarValue::Bool(a), ScalarValue::Bool(b)) => a == b,
            (ScalarValue::Int(a), ScalarValue::Int(b)) => a == b,
            (ScalarValue::F64(a), ScalarValue::F64(b)) => {
                canonical_f64_bits(*a) == canonical_f64_bits(*b)
            }
            (ScalarValue::Str(a), ScalarValue::Str(b)) => a == b,
            (ScalarValue::Bytes(a), ScalarValue::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl ScalarValue {
    pub fn to_json(&self) -> Value {
        match self {
            ScalarValue::Null => Value::Null,
            ScalarValue::Bool(b) => Value::Bool(*b),
            ScalarValue::Int(i) => Value::Number(Number::from(*i)),
            ScalarValue::F64(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            ScalarValue::Str(s) => Value::String(s.clone()),
            ScalarValue::Bytes(b) => {
                Value::Array(b.iter().map(|byte| Value::Number(Number::from(*byte))).collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(ScalarValue),
    Map(FieldMap),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            FieldValue::Scalar(s) => Some(s),
            FieldValue::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&FieldMap> {
        match self {
            FieldValue::Map(m) => Some(m),
            FieldValue::Scalar(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Scalar(s) => s.to_json(),
            FieldValue::Map(m) => m.to_json(),
        }
    }
}

/// Insertion-ordered mapping from field name to value.
///
/// Equality compares fields only, never the object identity.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    obj: Option<ObjId>,
    fields: IndexMap<String, FieldValue>,
}

impl PartialEq for FieldMap {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_obj(obj: ObjId) -> Self {
        Self {
            obj: Some(obj),
            fields: IndexMap::new(),
        }
    }

    /// The CRDT object this map was materialized from, if any.
    pub fn obj_id(&self) -> Option<ObjId> {
        self.obj
    }

    /// Builder-style [`FieldMap::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn get_scalar(&self, key: &str) -> Option<&ScalarValue> {
        self.fields.get(key).and_then(FieldValue::as_scalar)
    }

    pub fn get_map(&self, key: &str) -> Option<&FieldMap> {
        self.fields.get(key).and_then(FieldValue::as_map)
    }

    /// Mutable access to a nested map; edits through it stay on the same object.
    pub fn get_map_mut(&mut self, key: &str) -> Option<&mut FieldMap> {
        match self.fields.get_mut(key)? {
            FieldValue::Map(m) => Some(m),
            FieldValue::Scalar(_) => None,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for (k, v) in &self.fields {
            out.insert(k.clone(), v.to_json());
        }
        Value::Object(out)
    }
}

impl From<ScalarValue> for FieldValue {
    fn from(value: ScalarValue) -> Self {
        FieldValue::Scalar(value)
    }
}

impl From<FieldMap> for FieldValue {
    fn from(value: FieldMap) -> Self {
        FieldValue::Map(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Scalar(ScalarValue::Bool(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Scalar(ScalarValue::Int(value))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Scalar(ScalarValue::Int(value as i64))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Scalar(ScalarValue::F64(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Scalar(ScalarValue::Str(value.to_owned()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Scalar(ScalarValue::Str(value))
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        FieldValue::Scalar(ScalarValue::Bytes(value))
    }
}

fn json_to_field(path: &str, value: Value) -> Result<FieldValue, ValueError> {
    Ok(match value {
        Value::Null => FieldValue::Scalar(ScalarValue::Null),
        Value::Bool(b) => FieldValue::Scalar(ScalarValue::Bool(b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Scalar(ScalarValue::Int(i))
            } else if let Some(u) = n.as_u64() {
                return Err(ValueError::IntegerOutOfRange(u));
            } else {
                FieldValue::Scalar(ScalarValue::F64(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        Value::String(s) => FieldValue::Scalar(ScalarValue::Str(s)),
        Value::Array(_) => return Err(ValueError::UnsupportedArray(path.to_owned())),
        Value::Object(obj) => FieldValue::Map(json_object_to_map(path, obj)?),
    })
}

fn json_object_to_map(path: &str, obj: Map<String, Value>) -> Result<FieldMap, ValueError> {
    let mut map = FieldMap::new();
    for (k, v) in obj {
        let child = format!("{path}/{k}");
        let value = json_to_field(&child, v)?;
        map.fields.insert(k, value);
    }
    Ok(map)
}

impl TryFrom<Value> for FieldMap {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(obj) => json_object_to_map("", obj),
            _ => Err(ValueError::NotAnObject),
        }
    }
}

impl TryFrom<Value> for FieldValue {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        json_to_field("", value)
    }
}
