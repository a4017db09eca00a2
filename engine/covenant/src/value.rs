use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use ordered_float::OrderedFloat;

use crate::calendar::Period;
use crate::duration::Duration;
use crate::error::{CovenantError, CovenantResult};

/// An ordered sequence whose logical content is the first `length` elements
/// of a shared backing storage.
///
/// Storage past `length` is logically absent. Handles are copy-on-write:
/// mutation through [`Collection::append`] only touches the storage in place
/// when no other handle can observe it.
#[derive(Clone, Debug, Default)]
pub struct Collection {
    storage: Arc<Vec<Value>>,
    length: usize,
}

impl Collection {
    pub fn new(items: Vec<Value>) -> Self {
        let length = items.len();
        Self {
            storage: Arc::new(items),
            length,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a collection with a declared length that may be shorter than the
    /// storage. Lengths past the end of storage are clamped.
    pub fn with_length(storage: Vec<Value>, length: usize) -> Self {
        let length = length.min(storage.len());
        Self {
            storage: Arc::new(storage),
            length,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn storage_len(&self) -> usize {
        self.storage.len()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.storage[..self.length]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.as_slice().iter()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.as_slice().get(index)
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.as_slice().to_vec()
    }

    /// A shorter view over the same storage.
    pub fn truncated(&self, length: usize) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            length: length.min(self.length),
        }
    }

    /// Push `value` after the logical end.
    ///
    /// When this handle is the only owner and nothing lives past the declared
    /// length, the storage grows in place; otherwise the logical prefix is
    /// copied first so other handles never see the new element.
    pub fn append(mut self, value: Value) -> Self {
        if self.length < self.storage.len() {
            let mut items = self.to_vec();
            items.push(value);
            return Self::new(items);
        }
        Arc::make_mut(&mut self.storage).push(value);
        self.length += 1;
        self
    }

    /// True when both handles read from the same backing storage.
    pub fn shares_storage_with(&self, other: &Collection) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }
}

impl FromIterator<Value> for Collection {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A finite mapping from field name to value. Field iteration is always in
/// ascending name order.
#[derive(Clone, Debug, Default)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; a repeated name keeps the last value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    pub(crate) fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A payload tagged with every nominal type it satisfies, most specific first.
#[derive(Clone, Debug)]
pub struct Branded {
    type_names: Vec<String>,
    payload: Box<Value>,
}

impl Branded {
    pub fn new(type_names: Vec<String>, payload: Value) -> CovenantResult<Self> {
        if type_names.is_empty() {
            return Err(CovenantError::type_error(
                "branded value requires at least one type name",
            ));
        }
        Ok(Self {
            type_names,
            payload: Box::new(payload),
        })
    }

    /// Brand with exactly one type name; never fails.
    pub fn single(type_name: impl Into<String>, payload: Value) -> Self {
        Self {
            type_names: vec![type_name.into()],
            payload: Box::new(payload),
        }
    }

    pub fn type_names(&self) -> &[String] {
        &self.type_names
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        *self.payload
    }
}

/// Two-armed tagged union.
#[derive(Clone, Debug)]
pub enum Sum {
    Left(Box<Value>),
    Right(Box<Value>),
}

impl Sum {
    pub fn is_left(&self) -> bool {
        matches!(self, Sum::Left(_))
    }

    pub fn payload(&self) -> &Value {
        match self {
            Sum::Left(value) | Sum::Right(value) => value,
        }
    }

    pub fn into_payload(self) -> Value {
        match self {
            Sum::Left(value) | Sum::Right(value) => *value,
        }
    }
}

/// Runtime values handled by compiled programs.
///
/// `Nat`, `Coll`, `Record`, `Brand` and `Sum` are the five calculus shapes.
/// `Unit`, `Bool`, `Float` and `String` are host scalars, and the last three
/// variants are opaque values produced by the calendar primitive.
///
/// Equality and ordering come from [`crate::ordering::compare`], so `==` on
/// collections is multiset equality.
#[derive(Clone, Debug)]
pub enum Value {
    Unit,
    Bool(bool),
    Float(OrderedFloat<f64>),
    String(String),
    Nat(i64),
    Coll(Collection),
    Record(Record),
    Brand(Branded),
    Sum(Sum),
    DateTime(DateTime<FixedOffset>),
    Duration(Duration),
    Period(Period),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Nat(_) => "nat",
            Value::Coll(_) => "collection",
            Value::Record(_) => "record",
            Value::Brand(_) => "branded",
            Value::Sum(Sum::Left(_)) => "left",
            Value::Sum(Sum::Right(_)) => "right",
            Value::DateTime(_) => "datetime",
            Value::Duration(_) => "duration",
            Value::Period(_) => "period",
        }
    }

    pub fn float(value: f64) -> Value {
        Value::Float(OrderedFloat(value))
    }

    pub fn string(value: impl Into<String>) -> Value {
        Value::String(value.into())
    }

    pub fn coll(items: Vec<Value>) -> Value {
        Value::Coll(Collection::new(items))
    }

    pub fn record<K, I>(fields: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Record(
            fields
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    pub fn left(value: Value) -> Value {
        Value::Sum(Sum::Left(Box::new(value)))
    }

    pub fn right(value: Value) -> Value {
        Value::Sum(Sum::Right(Box::new(value)))
    }

    pub fn expect_bool(&self) -> CovenantResult<bool> {
        match self {
            Value::Bool(value) => Ok(*value),
            other => Err(mismatch("bool", other)),
        }
    }

    pub fn expect_nat(&self) -> CovenantResult<i64> {
        match self {
            Value::Nat(value) => Ok(*value),
            other => Err(mismatch("nat", other)),
        }
    }

    pub fn expect_float(&self) -> CovenantResult<f64> {
        match self {
            Value::Float(value) => Ok(value.into_inner()),
            other => Err(mismatch("float", other)),
        }
    }

    pub fn expect_str(&self) -> CovenantResult<&str> {
        match self {
            Value::String(value) => Ok(value),
            other => Err(mismatch("string", other)),
        }
    }

    pub fn expect_coll(&self) -> CovenantResult<&Collection> {
        match self {
            Value::Coll(items) => Ok(items),
            other => Err(mismatch("collection", other)),
        }
    }

    pub fn expect_record(&self) -> CovenantResult<&Record> {
        match self {
            Value::Record(record) => Ok(record),
            other => Err(mismatch("record", other)),
        }
    }

    pub fn expect_sum(&self) -> CovenantResult<&Sum> {
        match self {
            Value::Sum(sum) => Ok(sum),
            other => Err(mismatch("sum", other)),
        }
    }

    pub fn expect_datetime(&self) -> CovenantResult<DateTime<FixedOffset>> {
        match self {
            Value::DateTime(value) => Ok(*value),
            other => Err(mismatch("datetime", other)),
        }
    }

    pub fn expect_duration(&self) -> CovenantResult<Duration> {
        match self {
            Value::Duration(value) => Ok(*value),
            other => Err(mismatch("duration", other)),
        }
    }
}

pub(crate) fn mismatch(expected: &str, found: &Value) -> CovenantError {
    CovenantError::type_error(format!("expected {expected}, found {}", found.kind()))
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Collection> for Value {
    fn from(value: Collection) -> Self {
        Value::Coll(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}

impl From<Branded> for Value {
    fn from(value: Branded) -> Self {
        Value::Brand(value)
    }
}

impl From<Sum> for Value {
    fn from(value: Sum) -> Self {
        Value::Sum(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::DateTime(value)
    }
}

impl From<Duration> for Value {
    fn from(value: Duration) -> Self {
        Value::Duration(value)
    }
}

impl From<Period> for Value {
    fn from(value: Period) -> Self {
        Value::Period(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("unit"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{}", value.into_inner()),
            Value::String(value) => write!(f, "{value:?}"),
            Value::Nat(value) => write!(f, "{value}n"),
            Value::Coll(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt(f)?;
                }
                f.write_str("]")
            }
            Value::Record(record) => {
                f.write_str("{")?;
                for (idx, (name, value)) in record.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Brand(branded) => {
                write!(f, "<{}>", branded.type_names().join(", "))?;
                branded.payload().fmt(f)
            }
            Value::Sum(Sum::Left(value)) => write!(f, "left({value})"),
            Value::Sum(Sum::Right(value)) => write!(f, "right({value})"),
            Value::DateTime(value) => f.write_str(&value.to_rfc3339()),
            Value::Duration(value) => value.fmt(f),
            Value::Period(value) => value.fmt(f),
        }
    }
}
