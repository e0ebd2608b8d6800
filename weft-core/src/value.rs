//! Dynamic Values
//!
//! The data-binding runtime operates on loosely structured host data:
//! scalars, ordered sequences, and named-property maps, nested arbitrarily.
//! `Value` is that data model. It covers three lifecycles of the same data:
//!
//! - **Plain** containers (`List`, `Object`): raw input that has not been
//!   made observable yet. Assigning a plain container into a record or
//!   sequence always produces a fresh wrapped child.
//! - **Wrapped** containers (`Seq`, `Map`): live observable containers.
//!   Assigning one of these uses it as-is, so wrapping is idempotent in type.
//! - **Opaque** values: host objects the runtime does not understand (a
//!   date, a file handle). These are stored and compared by pointer identity
//!   and are never wrapped.
//!
//! # Identity
//!
//! Every "did it change?" decision in the runtime uses [`Value::same`]:
//! scalars and strings compare by value, wrapped containers and opaques by
//! pointer, and plain containers are *never* identical to anything (each
//! literal is a fresh identity). This is not the `PartialEq` relation, which
//! compares plain containers structurally and is meant for assertions and
//! snapshots.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::reactive::{Computed, ObservableArray, ObservableMap, Snapshot};

/// A dynamically typed value flowing through the binding runtime.
#[derive(Clone)]
pub enum Value {
    /// Absence of a value. Also returned when reading a missing property.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// A plain, not-yet-observable sequence.
    List(Vec<Value>),
    /// A plain, not-yet-observable map.
    Object(IndexMap<String, Value>),
    /// A live observable sequence.
    Seq(Rc<ObservableArray>),
    /// A live observable record.
    Map(Rc<ObservableMap>),
    /// A host value the runtime never wraps; identity is the pointer.
    Opaque(Rc<dyn Any>),
    /// A computed-property descriptor travelling inside a construction
    /// literal. Routed to descriptor installation, never stored as data.
    Computed(Computed),
}

impl Value {
    /// Wrap an arbitrary host value as an opaque, never-wrapped `Value`.
    pub fn opaque<T: Any>(value: T) -> Self {
        Value::Opaque(Rc::new(value))
    }

    /// Identity comparison.
    ///
    /// Scalars and strings compare by value; wrapped containers and opaques
    /// by pointer; plain containers are never identical (every plain literal
    /// has a fresh identity and will be re-wrapped on assignment).
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(a, b),
            (Value::Computed(a), Value::Computed(b)) => a == b,
            _ => false,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "map",
            Value::Opaque(_) => "opaque",
            Value::Computed(_) => "computed",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view: integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Rc<ObservableMap>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&Rc<ObservableArray>> {
        match self {
            Value::Seq(seq) => Some(seq),
            _ => None,
        }
    }

    /// Recursively unwrap to plain data.
    ///
    /// Wrapped containers become plain `Object`/`List` copies of their
    /// current contents; everything else is cloned through unchanged.
    pub fn to_plain(&self) -> Value {
        match self {
            Value::Seq(seq) => seq.to_plain(),
            Value::Map(map) => map.to_plain(),
            Value::List(items) => Value::List(items.iter().map(Value::to_plain).collect()),
            Value::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_plain()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Convert to a JSON value.
    ///
    /// Wrapped containers are snapshotted through [`Value::to_plain`] first.
    /// Opaque and computed values have no JSON representation and become
    /// `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(n) => serde_json::Value::from(*n),
            Value::Str(s) => serde_json::Value::String(s.to_string()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Seq(_) | Value::Map(_) => self.to_plain().to_json(),
            Value::Opaque(_) | Value::Computed(_) => serde_json::Value::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    n.as_f64().map(Value::Float).unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(s) => Value::Str(Rc::from(s)),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(value: IndexMap<String, Value>) -> Self {
        Value::Object(value)
    }
}

impl From<Computed> for Value {
    fn from(value: Computed) -> Self {
        Value::Computed(value)
    }
}

/// Structural equality, for assertions and snapshots.
///
/// Plain containers compare element-wise; wrapped containers and opaques
/// compare by pointer, same as [`Value::same`].
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => self.same(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Object(entries) => {
                let mut map = f.debug_map();
                for (key, value) in entries {
                    map.entry(key, value);
                }
                map.finish()
            }
            Value::Seq(seq) => write!(f, "Seq(len={})", seq.len()),
            Value::Map(map) => write!(f, "Map(id={:?})", map.id()),
            Value::Opaque(_) => f.write_str("Opaque(..)"),
            Value::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}
