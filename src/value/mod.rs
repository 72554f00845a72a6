//! Runtime values produced by evaluating a graph
//!
//! `Value` is the single dynamic representation used for literal payloads,
//! evaluation results, environment bindings and callable arguments.

mod object;
mod slice;

pub use object::Object;
pub use slice::Slice;

use indexmap::IndexMap;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Container kind of a sequence constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    List,
    Tuple,
}

impl SequenceKind {
    /// Wrap already evaluated elements in this kind of container.
    #[inline]
    pub fn assemble(
        self,
        items: Vec<Value>,
    ) -> Value {
        match self {
            SequenceKind::List => Value::List(items),
            SequenceKind::Tuple => Value::Tuple(items),
        }
    }
}

/// Class of a mapping constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    /// Plain dictionary
    Dict,
    /// Insertion-ordered dictionary
    Ordered,
}

impl fmt::Display for MappingKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            MappingKind::Dict => write!(f, "dict"),
            MappingKind::Ordered => write!(f, "OrderedDict"),
        }
    }
}

/// An evaluated mapping.
///
/// Entries keep insertion order. Equality ignores both order and kind, so a
/// plain dict equals an ordered one holding the same entries.
#[derive(Debug, Clone)]
pub struct Mapping {
    kind: MappingKind,
    entries: IndexMap<Value, Value>,
}

impl Mapping {
    #[inline]
    pub fn new(kind: MappingKind) -> Self {
        Self {
            kind,
            entries: IndexMap::new(),
        }
    }

    pub fn from_entries(
        kind: MappingKind,
        entries: impl IntoIterator<Item = (Value, Value)>,
    ) -> Self {
        Self {
            kind,
            entries: entries.into_iter().collect(),
        }
    }

    #[inline]
    pub fn kind(&self) -> MappingKind {
        self.kind
    }

    #[inline]
    pub fn get(
        &self,
        key: &Value,
    ) -> Option<&Value> {
        self.entries.get(key)
    }

    #[inline]
    pub fn insert(
        &mut self,
        key: Value,
        value: Value,
    ) -> Option<Value> {
        self.entries.insert(key, value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> indexmap::map::Iter<'_, Value, Value> {
        self.entries.iter()
    }
}

impl PartialEq for Mapping {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Mapping {}

/// Dynamic value.
///
/// Equality is structural except for [`Object`], which compares by pointer
/// identity. Numbers compare across `Bool`, `Int` and `Float`.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Map(Mapping),
    Slice(Slice),
    /// The class literal stored as the first argument of a mapping constructor
    MappingClass(MappingKind),
    Object(Object),
}

impl Value {
    /// Build a string value.
    #[inline]
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    /// Text form with strings quoted, as they appear inside containers.
    pub fn repr(&self) -> String {
        format!("{:?}", DisplayRepr(self))
    }

    /// Short name of the value's type, used in error messages.
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "dict",
            Value::Slice(_) => "slice",
            Value::MappingClass(_) => "type",
            Value::Object(obj) => obj.type_name(),
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of the value; `Bool` counts as an integer.
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Float view of any numeric value.
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Int(_) | Value::Float(_))
    }

    /// Elements of a list or tuple.
    #[inline]
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Truthiness in the usual dynamic-language sense.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) | Value::Tuple(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Slice(_) | Value::MappingClass(_) | Value::Object(_) => true,
        }
    }

    /// Ordering used by comparison operators. `None` when the two values
    /// are not comparable.
    pub fn compare(
        &self,
        other: &Value,
    ) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    if x != y {
                        return x.compare(y);
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_int(), b.as_int()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                (Some(x), None) => int_float_order(x, b.as_float()?),
                (None, Some(y)) => int_float_order(y, a.as_float()?).map(Ordering::reverse),
                (None, None) => a.as_float()?.partial_cmp(&b.as_float()?),
            },
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Slice(a), Value::Slice(b)) => a == b,
            (Value::MappingClass(a), Value::MappingClass(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits() || a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_int(), b.as_int()) {
                (Some(x), Some(y)) => x == y,
                (Some(x), None) => b.as_float().and_then(exact_int) == Some(x),
                (None, Some(y)) => a.as_float().and_then(exact_int) == Some(y),
                (None, None) => a.as_float() == b.as_float(),
            },
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        match self {
            Value::None => 0u8.hash(state),
            // Integral numbers hash alike regardless of variant so that
            // `1`, `1.0` and `true` land on the same key.
            Value::Bool(_) | Value::Int(_) => {
                1u8.hash(state);
                self.as_int().hash(state);
            }
            Value::Float(f) => match exact_int(*f) {
                Some(i) => {
                    1u8.hash(state);
                    Some(i).hash(state);
                }
                None => {
                    2u8.hash(state);
                    f.to_bits().hash(state);
                }
            },
            Value::Str(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Value::List(items) => {
                4u8.hash(state);
                items.hash(state);
            }
            Value::Tuple(items) => {
                5u8.hash(state);
                items.hash(state);
            }
            Value::Map(map) => {
                6u8.hash(state);
                map.len().hash(state);
            }
            Value::Slice(slice) => {
                7u8.hash(state);
                slice.hash(state);
            }
            Value::MappingClass(kind) => {
                8u8.hash(state);
                kind.hash(state);
            }
            Value::Object(obj) => {
                9u8.hash(state);
                obj.hash(state);
            }
        }
    }
}

/// 2^63, the first float above the `i64` range.
const I64_END: f64 = 9_223_372_036_854_775_808.0;

/// `f` as an integer, when it is integral and within `i64`.
pub(crate) fn exact_int(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && (-I64_END..I64_END).contains(&f)).then_some(f as i64)
}

/// Order of an integer against a float, without rounding the integer.
fn int_float_order(
    x: i64,
    f: f64,
) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    if f >= I64_END {
        return Some(Ordering::Less);
    }
    if f < -I64_END {
        return Some(Ordering::Greater);
    }
    let floor = f.floor() as i64;
    Some(match x.cmp(&floor) {
        Ordering::Equal if f.fract() != 0.0 => Ordering::Less,
        ordering => ordering,
    })
}

fn write_items(
    f: &mut fmt::Formatter<'_>,
    items: &[Value],
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{:?}", DisplayRepr(item))?;
    }
    Ok(())
}

/// Formats nested strings quoted, the way container contents are shown.
struct DisplayRepr<'a>(&'a Value);

impl fmt::Debug for DisplayRepr<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.0 {
            Value::Str(s) => write!(f, "'{}'", s),
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{:.1}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {:?}", DisplayRepr(k), DisplayRepr(v))?;
                }
                write!(f, "}}")
            }
            Value::Slice(slice) => write!(f, "{}", slice),
            Value::MappingClass(kind) => write!(f, "<class '{}'>", kind),
            Value::Object(obj) => write!(f, "{:?}", obj),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Slice> for Value {
    fn from(slice: Slice) -> Self {
        Value::Slice(slice)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Map(map)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}
