//! JSON wire encoding of runtime values.
//!
//! Host scalars map to their JSON counterparts. The calculus shapes and the
//! calendar values use single-purpose `$`-prefixed objects; every other JSON
//! object is a record.

use chrono::DateTime;
use serde_json::{Map, Number, Value as Json};

use crate::calendar::{Period, PeriodUnit};
use crate::duration::{Duration, DurationUnit};
use crate::error::{CovenantError, CovenantResult};
use crate::value::{Branded, Collection, Record, Sum, Value};

pub fn to_json(value: &Value) -> CovenantResult<Json> {
    match value {
        Value::Unit => Ok(Json::Null),
        Value::Bool(boolean) => Ok(Json::Bool(*boolean)),
        Value::Float(number) => float_to_json(number.into_inner()),
        Value::String(text) => Ok(Json::String(text.clone())),
        Value::Nat(number) => Ok(tagged("$nat", Json::Number(Number::from(*number)))),
        Value::Coll(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(to_json(item)?);
            }
            Ok(Json::Array(out))
        }
        Value::Record(record) => {
            let mut object = Map::new();
            for (name, field) in record {
                object.insert(name.clone(), to_json(field)?);
            }
            Ok(Json::Object(object))
        }
        Value::Brand(branded) => {
            let names = branded
                .type_names()
                .iter()
                .map(|name| Json::String(name.clone()))
                .collect();
            let mut object = Map::new();
            object.insert("$class".to_string(), Json::Array(names));
            object.insert("$data".to_string(), to_json(branded.payload())?);
            Ok(Json::Object(object))
        }
        Value::Sum(Sum::Left(payload)) => Ok(tagged("$left", to_json(payload)?)),
        Value::Sum(Sum::Right(payload)) => Ok(tagged("$right", to_json(payload)?)),
        Value::DateTime(date) => Ok(tagged("$date", Json::String(date.to_rfc3339()))),
        Value::Duration(duration) => Ok(tagged(
            "$duration",
            unit_amount(duration.unit.as_str(), duration.amount),
        )),
        Value::Period(period) => Ok(tagged(
            "$period",
            unit_amount(period.unit.as_str(), period.amount),
        )),
    }
}

pub fn from_json(json: &Json) -> CovenantResult<Value> {
    match json {
        Json::Null => Ok(Value::Unit),
        Json::Bool(boolean) => Ok(Value::Bool(*boolean)),
        Json::Number(number) => number
            .as_f64()
            .map(Value::float)
            .ok_or_else(|| CovenantError::Json(format!("unsupported number {number}"))),
        Json::String(text) => Ok(Value::String(text.clone())),
        Json::Array(items) => Ok(Value::Coll(decode_items(items)?)),
        Json::Object(object) => decode_object(object),
    }
}

pub fn parse_str(text: &str) -> CovenantResult<Value> {
    let json: Json =
        serde_json::from_str(text).map_err(|error| CovenantError::Json(error.to_string()))?;
    from_json(&json)
}

pub fn to_string_pretty(value: &Value) -> CovenantResult<String> {
    serde_json::to_string_pretty(&to_json(value)?)
        .map_err(|error| CovenantError::Json(error.to_string()))
}

fn decode_object(object: &Map<String, Json>) -> CovenantResult<Value> {
    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    match keys.as_slice() {
        ["$nat"] => decode_nat(&object["$nat"]),
        ["$coll"] => Ok(Value::Coll(decode_items(expect_array(&object["$coll"], "$coll")?)?)),
        ["$coll", "$length"] => {
            let items = decode_items(expect_array(&object["$coll"], "$coll")?)?;
            let length = expect_length(&object["$length"])?;
            if length > items.len() {
                return Err(CovenantError::Json(format!(
                    "declared length {length} exceeds {} stored elements",
                    items.len()
                )));
            }
            Ok(Value::Coll(Collection::with_length(items.to_vec(), length)))
        }
        ["$class", "$data"] => {
            let names = expect_array(&object["$class"], "$class")?
                .iter()
                .map(|name| {
                    name.as_str().map(str::to_string).ok_or_else(|| {
                        CovenantError::Json("$class entries must be strings".to_string())
                    })
                })
                .collect::<CovenantResult<Vec<_>>>()?;
            Ok(Value::Brand(Branded::new(names, from_json(&object["$data"])?)?))
        }
        ["$left"] => Ok(Value::left(from_json(&object["$left"])?)),
        ["$right"] => Ok(Value::right(from_json(&object["$right"])?)),
        ["$date"] => {
            let text = object["$date"]
                .as_str()
                .ok_or_else(|| CovenantError::Json("$date must be a string".to_string()))?;
            DateTime::parse_from_rfc3339(text)
                .map(Value::DateTime)
                .map_err(|error| CovenantError::Json(format!("invalid $date '{text}': {error}")))
        }
        ["$duration"] => {
            let (unit, amount) = decode_unit_amount(&object["$duration"], "$duration")?;
            Ok(Value::Duration(Duration::new(amount, unit.parse::<DurationUnit>()?)))
        }
        ["$period"] => {
            let (unit, amount) = decode_unit_amount(&object["$period"], "$period")?;
            Ok(Value::Period(Period::new(amount, unit.parse::<PeriodUnit>()?)))
        }
        _ => {
            let mut record = Record::new();
            for (name, field) in object {
                record.insert(name.clone(), from_json(field)?);
            }
            Ok(Value::Record(record))
        }
    }
}

fn decode_items(items: &[Json]) -> CovenantResult<Collection> {
    items.iter().map(from_json).collect()
}

fn decode_nat(json: &Json) -> CovenantResult<Value> {
    json.as_i64()
        .map(Value::Nat)
        .ok_or_else(|| CovenantError::Json(format!("$nat must be a 64-bit integer, got {json}")))
}

fn expect_array<'a>(json: &'a Json, key: &str) -> CovenantResult<&'a [Json]> {
    json.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| CovenantError::Json(format!("{key} must be an array")))
}

fn expect_length(json: &Json) -> CovenantResult<usize> {
    json.as_u64()
        .and_then(|length| usize::try_from(length).ok())
        .ok_or_else(|| CovenantError::Json("$length must be a non-negative integer".to_string()))
}

fn decode_unit_amount<'a>(json: &'a Json, key: &str) -> CovenantResult<(&'a str, i64)> {
    let unit = json.get("unit").and_then(Json::as_str);
    let amount = json.get("amount").and_then(Json::as_i64);
    match (unit, amount) {
        (Some(unit), Some(amount)) => Ok((unit, amount)),
        _ => Err(CovenantError::Json(format!(
            "{key} requires a string 'unit' and an integer 'amount'"
        ))),
    }
}

fn tagged(key: &str, value: Json) -> Json {
    let mut object = Map::new();
    object.insert(key.to_string(), value);
    Json::Object(object)
}

fn unit_amount(unit: &str, amount: i64) -> Json {
    let mut object = Map::new();
    object.insert("unit".to_string(), Json::String(unit.to_string()));
    object.insert("amount".to_string(), Json::Number(Number::from(amount)));
    Json::Object(object)
}

fn float_to_json(value: f64) -> CovenantResult<Json> {
    Number::from_f64(value)
        .map(Json::Number)
        .ok_or_else(|| CovenantError::Json("float values must be finite".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_every_tagged_form() {
        let value = from_json(&json!({
            "id": {"$nat": 7},
            "tags": ["a", "b"],
            "request": {"$class": ["Ping", "Request"], "$data": {"n": 1.5}},
            "ok": {"$left": null},
            "due": {"$date": "2024-03-01T00:00:00Z"},
            "grace": {"$duration": {"unit": "days", "amount": 3}},
            "term": {"$period": {"unit": "months", "amount": 1}}
        }))
        .unwrap();
        let record = value.expect_record().unwrap();
        assert_eq!(record.get("id"), Some(&Value::Nat(7)));
        assert_eq!(record.get("ok"), Some(&Value::left(Value::Unit)));
        assert_eq!(
            record.get("grace"),
            Some(&Value::Duration(Duration::days(3)))
        );
        let Some(Value::Brand(branded)) = record.get("request") else {
            panic!("expected branded request");
        };
        assert_eq!(branded.type_names(), ["Ping", "Request"]);
        assert!(matches!(record.get("due"), Some(Value::DateTime(_))));
        assert!(matches!(record.get("term"), Some(Value::Period(_))));
    }

    #[test]
    fn declared_length_is_honoured() {
        let value = from_json(&json!({"$coll": [1, 2, 3], "$length": 2})).unwrap();
        assert_eq!(value.expect_coll().unwrap().len(), 2);
        assert_eq!(to_json(&value).unwrap(), json!([1.0, 2.0]));

        let error = from_json(&json!({"$coll": [1], "$length": 4})).unwrap_err();
        assert!(matches!(error, CovenantError::Json(_)));
    }

    #[test]
    fn encodes_shapes_with_tags() {
        let value = Value::record([
            ("n", Value::Nat(2)),
            ("miss", Value::right(Value::Unit)),
        ]);
        assert_eq!(
            to_json(&value).unwrap(),
            json!({"n": {"$nat": 2}, "miss": {"$right": null}})
        );
    }

    #[test]
    fn rejects_malformed_tags() {
        assert!(from_json(&json!({"$nat": 1.5})).is_err());
        assert!(from_json(&json!({"$class": [], "$data": 1})).unwrap_err().is_type_error());
        assert!(from_json(&json!({"$duration": {"unit": "fortnights", "amount": 1}})).is_err());
        assert!(to_json(&Value::float(f64::NAN)).is_err());
    }

    #[test]
    fn objects_with_extra_keys_are_records() {
        let value = from_json(&json!({"$nat": 1, "other": true})).unwrap();
        assert_eq!(value.expect_record().unwrap().len(), 2);
    }
}
