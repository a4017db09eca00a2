//! Operations over boxed collections.
//!
//! Every operation reads only the declared-length prefix of its inputs and
//! returns a fresh collection. Operations that reorder elements work on
//! private copies; a caller's collection is never observed reordered.

use std::cmp::Ordering;

use crate::error::{CovenantError, CovenantResult};
use crate::ordering::{compare, equal, sorted_refs};
use crate::record::dot_ref;
use crate::sum;
use crate::value::{Collection, Record, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One sort key: compare on `field`, in `direction`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortCriterion {
    pub field: String,
    pub direction: SortDirection,
}

impl SortCriterion {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

pub fn coll_of(items: Vec<Value>) -> Value {
    Value::coll(items)
}

pub fn count(items: &Value) -> CovenantResult<Value> {
    let len = items.expect_coll()?.len();
    Ok(Value::Nat(i64::try_from(len).unwrap_or(i64::MAX)))
}

pub fn append(items: &Value, value: Value) -> CovenantResult<Value> {
    Ok(Value::Coll(items.expect_coll()?.clone().append(value)))
}

/// First occurrences only, in input order.
pub fn distinct(items: &Value) -> CovenantResult<Value> {
    Ok(Value::coll(distinct_values(items.expect_coll()?.as_slice())))
}

fn distinct_values(items: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !out.iter().any(|seen| equal(seen, item)) {
            out.push(item.clone());
        }
    }
    out
}

/// `Left(element)` for a one-element collection, `Right(unit)` otherwise.
pub fn singleton(items: &Value) -> CovenantResult<Value> {
    match items.expect_coll()?.as_slice() {
        [only] => Ok(sum::left(only.clone())),
        _ => Ok(sum::none()),
    }
}

pub fn flatten(items: &Value) -> CovenantResult<Value> {
    let mut out = Vec::new();
    for inner in items.expect_coll()? {
        out.extend(inner.expect_coll()?.iter().cloned());
    }
    Ok(Value::coll(out))
}

/// Multiset concatenation.
pub fn union(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (left, right) = (left.expect_coll()?, right.expect_coll()?);
    let mut out = Vec::with_capacity(left.len() + right.len());
    out.extend(left.iter().cloned());
    out.extend(right.iter().cloned());
    Ok(Value::coll(out))
}

/// Remove one occurrence of `left` elements per matching `right` element.
pub fn minus(left: &Value, right: &Value) -> CovenantResult<Value> {
    sweep(left, right, |order, out, l, _| match order {
        Ordering::Less => {
            out.push(l.clone());
            Step::Left
        }
        Ordering::Equal => Step::Both,
        Ordering::Greater => Step::Right,
    })
    .map(|(mut out, rest_left, _)| {
        out.extend(rest_left.into_iter().cloned());
        Value::coll(out)
    })
}

/// Multiset intersection: each shared element kept with the smaller multiplicity.
pub fn min(left: &Value, right: &Value) -> CovenantResult<Value> {
    sweep(left, right, |order, out, l, _| match order {
        Ordering::Less => Step::Left,
        Ordering::Equal => {
            out.push(l.clone());
            Step::Both
        }
        Ordering::Greater => Step::Right,
    })
    .map(|(out, _, _)| Value::coll(out))
}

/// Multiset union: each element kept with the larger multiplicity.
pub fn max(left: &Value, right: &Value) -> CovenantResult<Value> {
    sweep(left, right, |order, out, l, r| match order {
        Ordering::Less => {
            out.push(l.clone());
            Step::Left
        }
        Ordering::Equal => {
            out.push(l.clone());
            Step::Both
        }
        Ordering::Greater => {
            out.push(r.clone());
            Step::Right
        }
    })
    .map(|(mut out, rest_left, rest_right)| {
        out.extend(rest_left.into_iter().cloned());
        out.extend(rest_right.into_iter().cloned());
        Value::coll(out)
    })
}

enum Step {
    Left,
    Right,
    Both,
}

type SweepOutput<'a> = (Vec<Value>, Vec<&'a Value>, Vec<&'a Value>);

/// Two-cursor merge over independently sorted copies of both inputs.
/// Returns the emitted values plus the unconsumed tails of each side.
fn sweep<'a, F>(left: &'a Value, right: &'a Value, mut visit: F) -> CovenantResult<SweepOutput<'a>>
where
    F: FnMut(Ordering, &mut Vec<Value>, &Value, &Value) -> Step,
{
    let left = sorted_refs(left.expect_coll()?.as_slice());
    let right = sorted_refs(right.expect_coll()?.as_slice());
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match visit(compare(left[i], right[j]), &mut out, left[i], right[j]) {
            Step::Left => i += 1,
            Step::Right => j += 1,
            Step::Both => {
                i += 1;
                j += 1;
            }
        }
    }
    Ok((out, left[i..].to_vec(), right[j..].to_vec()))
}

/// Stable multi-key sort of a collection of records.
///
/// Criteria apply in priority order; the first non-equal key decides. With no
/// criteria the input value is returned as is, sharing its storage.
pub fn sort(items: &Value, criteria: &[SortCriterion]) -> CovenantResult<Value> {
    let collection = items.expect_coll()?;
    if criteria.is_empty() {
        return Ok(items.clone());
    }
    let mut keyed = Vec::with_capacity(collection.len());
    for item in collection {
        let keys = criteria
            .iter()
            .map(|criterion| dot_ref(item, &criterion.field))
            .collect::<CovenantResult<Vec<&Value>>>()?;
        keyed.push((keys, item));
    }
    keyed.sort_by(|(left_keys, _), (right_keys, _)| {
        for ((left, right), criterion) in left_keys.iter().zip(right_keys).zip(criteria) {
            let order = compare(left, right);
            let order = match criterion.direction {
                SortDirection::Ascending => order,
                SortDirection::Descending => order.reverse(),
            };
            if order != Ordering::Equal {
                return order;
            }
        }
        Ordering::Equal
    });
    Ok(Value::coll(
        keyed.into_iter().map(|(_, item)| item.clone()).collect(),
    ))
}

/// Group records by the values of `key_fields`.
///
/// Emits one record per distinct key, in first-occurrence order: the key
/// fields plus `partition_name` holding every input record with that key.
pub fn group_by<S: AsRef<str>>(
    partition_name: &str,
    key_fields: &[S],
    items: &Value,
) -> CovenantResult<Value> {
    let collection = items.expect_coll()?;
    let projected = collection
        .iter()
        .map(|item| Ok(item.expect_record()?.project(key_fields)))
        .collect::<CovenantResult<Vec<Record>>>()?;
    let keys: Vec<Value> = projected.iter().cloned().map(Value::Record).collect();

    let mut groups = Vec::new();
    for key in distinct_values(&keys) {
        let members: Collection = collection
            .iter()
            .zip(&keys)
            .filter(|(_, item_key)| equal(item_key, &key))
            .map(|(item, _)| item.clone())
            .collect();
        let Value::Record(key) = key else {
            return Err(CovenantError::type_error("group key must be a record"));
        };
        groups.push(Value::Record(key.with(partition_name, members)));
    }
    Ok(Value::coll(groups))
}

/// `Left(element)` when `0 <= index < len`, `Right(unit)` otherwise.
pub fn nth(items: &Value, index: &Value) -> CovenantResult<Value> {
    let collection = items.expect_coll()?;
    let index = index.expect_nat()?;
    let element = usize::try_from(index)
        .ok()
        .and_then(|index| collection.get(index));
    Ok(match element {
        Some(element) => sum::left(element.clone()),
        None => sum::none(),
    })
}

pub fn contains(value: &Value, items: &Value) -> CovenantResult<Value> {
    Ok(Value::Bool(
        items.expect_coll()?.iter().any(|item| equal(item, value)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nats(values: &[i64]) -> Value {
        Value::coll(values.iter().map(|n| Value::Nat(*n)).collect())
    }

    fn as_nats(value: &Value) -> Vec<i64> {
        value
            .expect_coll()
            .unwrap()
            .iter()
            .map(|item| item.expect_nat().unwrap())
            .collect()
    }

    /// A collection whose storage runs past its declared length.
    fn truncated(values: &[i64], length: usize) -> Value {
        Value::Coll(Collection::with_length(
            values.iter().map(|n| Value::Nat(*n)).collect(),
            length,
        ))
    }

    fn row(name: &str, dept: &str, salary: i64) -> Value {
        Value::record([
            ("name", Value::string(name)),
            ("dept", Value::string(dept)),
            ("salary", Value::Nat(salary)),
        ])
    }

    #[test]
    fn distinct_keeps_first_occurrences() {
        assert_eq!(as_nats(&distinct(&nats(&[3, 1, 3, 2, 1])).unwrap()), vec![3, 1, 2]);
    }

    #[test]
    fn minus_removes_matching_multiplicity() {
        assert_eq!(as_nats(&minus(&nats(&[1, 1, 2]), &nats(&[1])).unwrap()), vec![1, 2]);
        assert_eq!(as_nats(&minus(&nats(&[2, 1]), &nats(&[5, 1, 1])).unwrap()), vec![2]);
    }

    #[test]
    fn min_and_max_respect_multiplicity() {
        let left = nats(&[1, 1, 2, 3]);
        let right = nats(&[1, 3, 3, 4]);
        assert_eq!(as_nats(&min(&left, &right).unwrap()), vec![1, 3]);
        assert_eq!(as_nats(&max(&left, &right).unwrap()), vec![1, 1, 2, 3, 3, 4]);
    }

    #[test]
    fn set_operations_leave_inputs_in_place() {
        let left = nats(&[3, 2, 1]);
        let _ = minus(&left, &nats(&[2])).unwrap();
        assert_eq!(as_nats(&left), vec![3, 2, 1]);
    }

    #[test]
    fn singleton_and_nth_are_recoverable() {
        assert_eq!(singleton(&nats(&[7])).unwrap(), Value::left(Value::Nat(7)));
        assert_eq!(singleton(&nats(&[7, 8])).unwrap(), sum::none());
        assert_eq!(nth(&nats(&[4, 5]), &Value::Nat(1)).unwrap(), Value::left(Value::Nat(5)));
        assert_eq!(nth(&nats(&[4, 5]), &Value::Nat(2)).unwrap(), sum::none());
        assert_eq!(nth(&nats(&[4, 5]), &Value::Nat(-1)).unwrap(), sum::none());
    }

    #[test]
    fn flatten_and_union_concatenate() {
        let nested = Value::coll(vec![nats(&[1, 2]), nats(&[]), nats(&[3])]);
        assert_eq!(as_nats(&flatten(&nested).unwrap()), vec![1, 2, 3]);
        assert_eq!(as_nats(&union(&nats(&[1]), &nats(&[1, 2])).unwrap()), vec![1, 1, 2]);
        assert!(flatten(&nats(&[1])).unwrap_err().is_type_error());
    }

    #[test]
    fn sort_applies_criteria_in_priority_order() {
        let rows = Value::coll(vec![
            row("c", "ops", 10),
            row("a", "eng", 30),
            row("b", "eng", 20),
            row("d", "ops", 10),
        ]);
        let sorted = sort(
            &rows,
            &[
                SortCriterion::ascending("dept"),
                SortCriterion::descending("salary"),
            ],
        )
        .unwrap();
        let names: Vec<String> = sorted
            .expect_coll()
            .unwrap()
            .iter()
            .map(|item| dot_ref(item, "name").unwrap().expect_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn sort_without_criteria_returns_input() {
        let rows = nats(&[3, 1, 2]);
        let sorted = sort(&rows, &[]).unwrap();
        let (Value::Coll(before), Value::Coll(after)) = (&rows, &sorted) else {
            panic!("expected collections");
        };
        assert!(before.shares_storage_with(after));
        assert_eq!(as_nats(&sorted), vec![3, 1, 2]);
    }

    #[test]
    fn sort_requires_key_fields() {
        let rows = Value::coll(vec![row("a", "eng", 1), Value::record([("name", Value::string("x"))])]);
        let error = sort(&rows, &[SortCriterion::ascending("salary")]).unwrap_err();
        assert!(error.is_type_error());
    }

    #[test]
    fn group_by_partitions_on_key_fields() {
        let rows = Value::coll(vec![
            row("a", "eng", 30),
            row("b", "ops", 10),
            row("c", "eng", 20),
        ]);
        let groups = group_by("members", &["dept"], &rows).unwrap();
        let groups = groups.expect_coll().unwrap();
        assert_eq!(groups.len(), 2);

        let first = &groups.as_slice()[0];
        assert_eq!(dot_ref(first, "dept").unwrap(), &Value::string("eng"));
        let members = dot_ref(first, "members").unwrap().expect_coll().unwrap();
        assert_eq!(members.len(), 2);
        assert!(dot_ref(first, "name").is_err());
    }

    #[test]
    fn group_by_ignores_key_field_order() {
        let rows = Value::coll(vec![
            row("a", "eng", 30),
            row("b", "ops", 10),
            row("c", "eng", 30),
            row("d", "eng", 20),
        ]);
        let forward = group_by("members", &["dept", "salary"], &rows).unwrap();
        let backward = group_by("members", &["salary", "dept"], &rows).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.expect_coll().unwrap().len(), 3);
    }

    #[test]
    fn set_operations_stop_at_declared_length() {
        let items = truncated(&[3, 1, 3, 9, 9], 3);
        assert_eq!(as_nats(&distinct(&items).unwrap()), vec![3, 1]);
        assert_eq!(as_nats(&minus(&items, &nats(&[3])).unwrap()), vec![1, 3]);
        assert_eq!(as_nats(&minus(&nats(&[9, 2]), &truncated(&[2, 9], 1)).unwrap()), vec![9]);
    }

    #[test]
    fn singleton_and_nth_stop_at_declared_length() {
        assert_eq!(singleton(&truncated(&[7, 8], 1)).unwrap(), Value::left(Value::Nat(7)));
        assert_eq!(singleton(&truncated(&[7], 0)).unwrap(), sum::none());
        let items = truncated(&[4, 5, 6], 2);
        assert_eq!(nth(&items, &Value::Nat(1)).unwrap(), Value::left(Value::Nat(5)));
        assert_eq!(nth(&items, &Value::Nat(2)).unwrap(), sum::none());
    }

    #[test]
    fn sort_and_group_by_stop_at_declared_length() {
        let rows = Value::Coll(Collection::with_length(
            vec![row("b", "eng", 20), row("a", "eng", 30), row("z", "ops", 1)],
            2,
        ));
        let sorted = sort(&rows, &[SortCriterion::ascending("salary")]).unwrap();
        let sorted = sorted.expect_coll().unwrap();
        assert_eq!(sorted.len(), 2);
        assert_eq!(dot_ref(&sorted.as_slice()[0], "name").unwrap(), &Value::string("b"));

        let groups = group_by("members", &["dept"], &rows).unwrap();
        let groups = groups.expect_coll().unwrap();
        assert_eq!(groups.len(), 1);
        let members = dot_ref(&groups.as_slice()[0], "members").unwrap();
        assert_eq!(members.expect_coll().unwrap().len(), 2);
    }

    #[test]
    fn contains_and_count() {
        let items = nats(&[1, 2]);
        assert_eq!(contains(&Value::Nat(2), &items).unwrap(), Value::Bool(true));
        assert_eq!(contains(&Value::Nat(9), &items).unwrap(), Value::Bool(false));
        assert_eq!(count(&items).unwrap(), Value::Nat(2));
        let grown = append(&items, Value::Nat(3)).unwrap();
        assert_eq!(count(&grown).unwrap(), Value::Nat(3));
        assert_eq!(count(&items).unwrap(), Value::Nat(2));
    }
}
