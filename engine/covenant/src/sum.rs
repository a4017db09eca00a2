use crate::error::CovenantResult;
use crate::value::{mismatch, Sum, Value};

pub fn left(value: Value) -> Value {
    Value::left(value)
}

pub fn right(value: Value) -> Value {
    Value::right(value)
}

/// `Right(unit)`: the "nothing here" outcome of casts, `nth` and `singleton`.
pub fn none() -> Value {
    Value::right(Value::Unit)
}

/// True for the Left arm.
pub fn either(value: &Value) -> CovenantResult<bool> {
    Ok(value.expect_sum()?.is_left())
}

pub fn to_left(value: &Value) -> CovenantResult<Value> {
    match value.expect_sum()? {
        Sum::Left(payload) => Ok(payload.as_ref().clone()),
        Sum::Right(_) => Err(mismatch("left", value)),
    }
}

pub fn to_right(value: &Value) -> CovenantResult<Value> {
    match value.expect_sum()? {
        Sum::Right(payload) => Ok(payload.as_ref().clone()),
        Sum::Left(_) => Err(mismatch("right", value)),
    }
}
