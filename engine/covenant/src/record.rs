use crate::error::{CovenantError, CovenantResult};
use crate::ordering::equal;
use crate::value::{Collection, Record, Value};

impl Record {
    /// Union of fields; on conflict `other` wins.
    pub fn concat(&self, other: &Record) -> Record {
        let mut out = self.clone();
        for (name, value) in other {
            out.insert(name.clone(), value.clone());
        }
        out
    }

    /// Union of fields, or `None` when a shared field holds unequal values.
    pub fn merge(&self, other: &Record) -> Option<Record> {
        let mut out = self.clone();
        for (name, value) in other {
            match self.get(name) {
                Some(existing) if !equal(existing, value) => return None,
                Some(_) => {}
                None => {
                    out.insert(name.clone(), value.clone());
                }
            }
        }
        Some(out)
    }

    pub fn without(&self, name: &str) -> Record {
        let mut out = self.clone();
        out.remove_field(name);
        out
    }

    /// Keep only `names`; names absent from the record are skipped.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Record {
        names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                self.get(name)
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect()
    }
}

pub fn concat(left: &Value, right: &Value) -> CovenantResult<Value> {
    Ok(Value::Record(
        left.expect_record()?.concat(right.expect_record()?),
    ))
}

/// Merge two records into a collection holding the merged record, or an
/// empty collection when they disagree on a shared field.
pub fn merge(left: &Value, right: &Value) -> CovenantResult<Value> {
    let merged = left.expect_record()?.merge(right.expect_record()?);
    Ok(Value::Coll(
        merged.map(Value::Record).into_iter().collect::<Collection>(),
    ))
}

pub fn remove(record: &Value, field: &str) -> CovenantResult<Value> {
    Ok(Value::Record(record.expect_record()?.without(field)))
}

pub fn project<S: AsRef<str>>(record: &Value, fields: &[S]) -> CovenantResult<Value> {
    Ok(Value::Record(record.expect_record()?.project(fields)))
}

/// Field access. Fails immediately on a non-record or a missing field.
pub fn dot(record: &Value, field: &str) -> CovenantResult<Value> {
    dot_ref(record, field).cloned()
}

pub fn dot_ref<'a>(record: &'a Value, field: &str) -> CovenantResult<&'a Value> {
    record.expect_record()?.get(field).ok_or_else(|| {
        CovenantError::Type(format!("record has no field '{field}'"))
    })
}

/// Field names in ascending order, as a collection of strings.
pub fn fields(record: &Value) -> CovenantResult<Value> {
    Ok(Value::coll(
        record
            .expect_record()?
            .names()
            .map(Value::string)
            .collect(),
    ))
}

pub fn has_field(record: &Value, field: &str) -> CovenantResult<bool> {
    Ok(record.expect_record()?.contains(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Value {
        Value::record([
            ("name", Value::string("Ada")),
            ("age", Value::Nat(36)),
        ])
    }

    #[test]
    fn concat_prefers_right_fields() {
        let updated = concat(&person(), &Value::record([("age", Value::Nat(37))])).unwrap();
        assert_eq!(dot(&updated, "age").unwrap(), Value::Nat(37));
        assert_eq!(dot(&updated, "name").unwrap(), Value::string("Ada"));
    }

    #[test]
    fn merge_signals_conflicts_with_an_empty_collection() {
        let agreeing = merge(&person(), &Value::record([("age", Value::Nat(36))])).unwrap();
        assert_eq!(agreeing.expect_coll().unwrap().len(), 1);

        let conflicting = merge(&person(), &Value::record([("age", Value::Nat(40))])).unwrap();
        assert!(conflicting.expect_coll().unwrap().is_empty());
    }

    #[test]
    fn merge_uses_structural_equality() {
        let left = Value::record([("tags", Value::coll(vec![Value::Nat(1), Value::Nat(2)]))]);
        let right = Value::record([("tags", Value::coll(vec![Value::Nat(2), Value::Nat(1)]))]);
        assert_eq!(merge(&left, &right).unwrap().expect_coll().unwrap().len(), 1);
    }

    #[test]
    fn remove_and_project_skip_absent_fields() {
        assert_eq!(remove(&person(), "missing").unwrap(), person());
        let without_age = remove(&person(), "age").unwrap();
        assert!(!has_field(&without_age, "age").unwrap());

        assert_eq!(
            fields(&person()).unwrap(),
            Value::coll(vec![Value::string("age"), Value::string("name")])
        );
        let projected = project(&person(), &["name", "missing"]).unwrap();
        assert_eq!(projected, Value::record([("name", Value::string("Ada"))]));
    }

    #[test]
    fn dot_fails_loudly() {
        let missing = dot(&person(), "email").expect_err("missing field");
        assert_eq!(missing.to_string(), "type error: record has no field 'email'");
        let not_record = dot(&Value::Nat(1), "age").expect_err("not a record");
        assert!(not_record.is_type_error());
    }
}
