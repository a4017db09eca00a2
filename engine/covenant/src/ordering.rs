//! The single structural order over [`Value`].
//!
//! Every equality or ordering decision in the runtime (sorting, set algebra,
//! de-duplication, grouping, merge conflicts) goes through [`compare`]; the
//! `PartialEq`/`Ord` impls for `Value` are thin wrappers around it.

use std::borrow::Cow;
use std::cmp::Ordering;

use crate::value::{Sum, Value};

/// Total order over values.
///
/// 1. Host types order by name: `boolean < number < object < string`.
///    Naturals and floats are both `number` and compare by exact numeric
///    value, so `Nat(3)` equals `Float(3.0)`.
/// 2. Inside `object`, class names order `Array < Date < Duration < Null <
///    Object < Period`.
/// 3. Collections compare as sorted copies, lexicographically, so order
///    within a collection never matters.
/// 4. Records (and the field views of brands and sums) compare as sorted
///    `(name, value)` sequences.
///
/// `compare(a, b) as i8` yields the `-1 / 0 / 1` form.
pub fn compare(left: &Value, right: &Value) -> Ordering {
    let (left_host, right_host) = (host_type(left), host_type(right));
    if left_host != right_host {
        return left_host.cmp(right_host);
    }
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => a.cmp(b),
        (Value::Nat(a), Value::Nat(b)) => a.cmp(b),
        (Value::Nat(a), Value::Float(b)) => compare_nat_float(*a, b.into_inner()),
        (Value::Float(a), Value::Nat(b)) => compare_nat_float(*b, a.into_inner()).reverse(),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => compare_objects(left, right),
    }
}

pub fn equal(left: &Value, right: &Value) -> bool {
    compare(left, right) == Ordering::Equal
}

fn host_type(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "boolean",
        Value::Float(_) | Value::Nat(_) => "number",
        Value::String(_) => "string",
        _ => "object",
    }
}

fn class_name(value: &Value) -> &'static str {
    match value {
        Value::Coll(_) => "Array",
        Value::DateTime(_) => "Date",
        Value::Duration(_) => "Duration",
        Value::Unit => "Null",
        Value::Period(_) => "Period",
        _ => "Object",
    }
}

fn compare_objects(left: &Value, right: &Value) -> Ordering {
    let (left_class, right_class) = (class_name(left), class_name(right));
    if left_class != right_class {
        return left_class.cmp(right_class);
    }
    match (left, right) {
        (Value::Unit, Value::Unit) => Ordering::Equal,
        (Value::Coll(a), Value::Coll(b)) => compare_multisets(a.as_slice(), b.as_slice()),
        (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
        (Value::Duration(a), Value::Duration(b)) => a.exact_seconds().cmp(&b.exact_seconds()),
        (Value::Period(a), Value::Period(b)) => a.exact_parts().cmp(&b.exact_parts()),
        _ => compare_field_views(&field_view(left), &field_view(right)),
    }
}

/// Exact `i64` against `f64`; NaN sorts above every natural, matching
/// `OrderedFloat`.
fn compare_nat_float(nat: i64, float: f64) -> Ordering {
    // 2^63: the first float past the `i64` range.
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if float.is_nan() || float >= BOUND {
        return Ordering::Less;
    }
    if float < -BOUND {
        return Ordering::Greater;
    }
    let whole = float.trunc();
    // In range and integral, so the cast is exact.
    let by_whole = nat.cmp(&(whole as i64));
    if by_whole != Ordering::Equal {
        return by_whole;
    }
    0.0f64
        .partial_cmp(&(float - whole))
        .unwrap_or(Ordering::Equal)
}

/// Sort private reference copies of both sides, then compare lexicographically.
/// The caller's storage is never reordered.
fn compare_multisets(left: &[Value], right: &[Value]) -> Ordering {
    let left = sorted_refs(left);
    let right = sorted_refs(right);
    left.into_iter().cmp(right)
}

pub(crate) fn sorted_refs(items: &[Value]) -> Vec<&Value> {
    let mut refs: Vec<&Value> = items.iter().collect();
    refs.sort_by(|a, b| compare(a, b));
    refs
}

type FieldView<'a> = Vec<(&'a str, Cow<'a, Value>)>;

/// Record-shaped view of an `Object`-class value, fields in ascending name order.
fn field_view(value: &Value) -> FieldView<'_> {
    match value {
        Value::Record(record) => record
            .iter()
            .map(|(name, value)| (name.as_str(), Cow::Borrowed(value)))
            .collect(),
        Value::Brand(branded) => vec![
            (
                "$class",
                Cow::Owned(Value::coll(
                    branded
                        .type_names()
                        .iter()
                        .map(|name| Value::String(name.clone()))
                        .collect(),
                )),
            ),
            ("$data", Cow::Borrowed(branded.payload())),
        ],
        Value::Sum(Sum::Left(payload)) => vec![("$left", Cow::Borrowed(payload.as_ref()))],
        Value::Sum(Sum::Right(payload)) => vec![("$right", Cow::Borrowed(payload.as_ref()))],
        _ => Vec::new(),
    }
}

/// At the first differing name the side holding the smaller name (the field
/// the other side lacks) is smaller; a strict prefix is smaller.
fn compare_field_views(left: &FieldView<'_>, right: &FieldView<'_>) -> Ordering {
    for ((left_name, left_value), (right_name, right_value)) in left.iter().zip(right.iter()) {
        let by_name = left_name.cmp(right_name);
        if by_name != Ordering::Equal {
            return by_name;
        }
        let by_value = compare(left_value, right_value);
        if by_value != Ordering::Equal {
            return by_value;
        }
    }
    left.len().cmp(&right.len())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        equal(self, other)
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}
