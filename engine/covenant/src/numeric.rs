//! Boxed-natural and host-float arithmetic.
//!
//! Natural arithmetic saturates at the `i64` bounds instead of wrapping;
//! only division and remainder by zero fail.

use crate::error::{CovenantError, CovenantResult};
use crate::value::Value;

fn nat_pair(left: &Value, right: &Value) -> CovenantResult<(i64, i64)> {
    Ok((left.expect_nat()?, right.expect_nat()?))
}

fn float_pair(left: &Value, right: &Value) -> CovenantResult<(f64, f64)> {
    Ok((left.expect_float()?, right.expect_float()?))
}

pub fn nat_add(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (a, b) = nat_pair(left, right)?;
    Ok(Value::Nat(a.saturating_add(b)))
}

pub fn nat_sub(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (a, b) = nat_pair(left, right)?;
    Ok(Value::Nat(a.saturating_sub(b)))
}

pub fn nat_mult(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (a, b) = nat_pair(left, right)?;
    Ok(Value::Nat(a.saturating_mul(b)))
}

/// Integer division truncating toward zero.
pub fn nat_div(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (a, b) = nat_pair(left, right)?;
    if b == 0 {
        return Err(CovenantError::DivisionByZero);
    }
    Ok(Value::Nat(a.saturating_div(b)))
}

/// Remainder with the sign of the dividend.
pub fn nat_rem(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (a, b) = nat_pair(left, right)?;
    if b == 0 {
        return Err(CovenantError::DivisionByZero);
    }
    Ok(Value::Nat(a.checked_rem(b).unwrap_or(0)))
}

pub fn nat_abs(value: &Value) -> CovenantResult<Value> {
    Ok(Value::Nat(value.expect_nat()?.saturating_abs()))
}

pub fn nat_min(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (a, b) = nat_pair(left, right)?;
    Ok(Value::Nat(a.min(b)))
}

pub fn nat_max(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (a, b) = nat_pair(left, right)?;
    Ok(Value::Nat(a.max(b)))
}

/// Floor of the base-2 logarithm.
pub fn nat_log2(value: &Value) -> CovenantResult<Value> {
    let n = value.expect_nat()?;
    if n <= 0 {
        return Err(CovenantError::type_error(format!(
            "log2 of non-positive natural {n}"
        )));
    }
    Ok(Value::Nat(i64::from(n.ilog2())))
}

/// Floor of the square root.
pub fn nat_sqrt(value: &Value) -> CovenantResult<Value> {
    let n = value.expect_nat()?;
    if n < 0 {
        return Err(CovenantError::type_error(format!(
            "square root of negative natural {n}"
        )));
    }
    // Float estimate, then correct by one in either direction.
    let mut root = (n as f64).sqrt() as i64;
    while root > 0 && root.checked_mul(root).map_or(true, |square| square > n) {
        root -= 1;
    }
    while (root + 1)
        .checked_mul(root + 1)
        .is_some_and(|square| square <= n)
    {
        root += 1;
    }
    Ok(Value::Nat(root))
}

fn nats(items: &Value) -> CovenantResult<Vec<i64>> {
    items.expect_coll()?.iter().map(Value::expect_nat).collect()
}

fn floats(items: &Value) -> CovenantResult<Vec<f64>> {
    items.expect_coll()?.iter().map(Value::expect_float).collect()
}

pub fn nat_sum(items: &Value) -> CovenantResult<Value> {
    Ok(Value::Nat(
        nats(items)?.into_iter().fold(0i64, i64::saturating_add),
    ))
}

/// Truncated mean; the mean of an empty collection is 0.
pub fn nat_mean(items: &Value) -> CovenantResult<Value> {
    let values = nats(items)?;
    if values.is_empty() {
        return Ok(Value::Nat(0));
    }
    let total: i128 = values.iter().map(|n| i128::from(*n)).sum();
    let mean = total / values.len() as i128;
    Ok(Value::Nat(i64::try_from(mean).unwrap_or(i64::MAX)))
}

pub fn nat_list_min(items: &Value) -> CovenantResult<Value> {
    nats(items)?
        .into_iter()
        .min()
        .map(Value::Nat)
        .ok_or_else(|| CovenantError::type_error("minimum of an empty collection"))
}

pub fn nat_list_max(items: &Value) -> CovenantResult<Value> {
    nats(items)?
        .into_iter()
        .max()
        .map(Value::Nat)
        .ok_or_else(|| CovenantError::type_error("maximum of an empty collection"))
}

pub fn float_of_nat(value: &Value) -> CovenantResult<Value> {
    Ok(Value::float(value.expect_nat()? as f64))
}

/// Truncate toward zero; values past the `i64` range saturate.
pub fn nat_of_float(value: &Value) -> CovenantResult<Value> {
    let f = value.expect_float()?;
    if !f.is_finite() {
        return Err(CovenantError::type_error(format!(
            "cannot convert {f} to a natural"
        )));
    }
    Ok(Value::Nat(f.trunc() as i64))
}

pub fn float_add(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (a, b) = float_pair(left, right)?;
    Ok(Value::float(a + b))
}

pub fn float_sub(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (a, b) = float_pair(left, right)?;
    Ok(Value::float(a - b))
}

pub fn float_mult(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (a, b) = float_pair(left, right)?;
    Ok(Value::float(a * b))
}

/// Host division: dividing by zero yields an infinity or NaN, never an error.
pub fn float_div(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (a, b) = float_pair(left, right)?;
    Ok(Value::float(a / b))
}

pub fn float_pow(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (a, b) = float_pair(left, right)?;
    Ok(Value::float(a.powf(b)))
}

pub fn float_min(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (a, b) = float_pair(left, right)?;
    Ok(Value::float(a.min(b)))
}

pub fn float_max(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (a, b) = float_pair(left, right)?;
    Ok(Value::float(a.max(b)))
}

pub fn float_abs(value: &Value) -> CovenantResult<Value> {
    Ok(Value::float(value.expect_float()?.abs()))
}

pub fn float_floor(value: &Value) -> CovenantResult<Value> {
    Ok(Value::float(value.expect_float()?.floor()))
}

pub fn float_ceil(value: &Value) -> CovenantResult<Value> {
    Ok(Value::float(value.expect_float()?.ceil()))
}

pub fn float_sum(items: &Value) -> CovenantResult<Value> {
    Ok(Value::float(floats(items)?.into_iter().sum()))
}

/// Mean of the collection; the mean of an empty collection is 0.
pub fn float_mean(items: &Value) -> CovenantResult<Value> {
    let values = floats(items)?;
    if values.is_empty() {
        return Ok(Value::float(0.0));
    }
    let total: f64 = values.iter().sum();
    Ok(Value::float(total / values.len() as f64))
}

/// Smallest element; `+inf` for an empty collection.
pub fn float_list_min(items: &Value) -> CovenantResult<Value> {
    Ok(Value::float(
        floats(items)?.into_iter().fold(f64::INFINITY, f64::min),
    ))
}

/// Largest element; `-inf` for an empty collection.
pub fn float_list_max(items: &Value) -> CovenantResult<Value> {
    Ok(Value::float(
        floats(items)?.into_iter().fold(f64::NEG_INFINITY, f64::max),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nats(values: &[i64]) -> Value {
        Value::coll(values.iter().map(|n| Value::Nat(*n)).collect())
    }

    #[test]
    fn division_by_zero_is_fatal() {
        let error = nat_div(&Value::Nat(1), &Value::Nat(0)).unwrap_err();
        assert!(matches!(error, CovenantError::DivisionByZero));
        assert!(error.is_type_error());
        assert!(nat_rem(&Value::Nat(1), &Value::Nat(0)).is_err());
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(nat_div(&Value::Nat(7), &Value::Nat(2)).unwrap(), Value::Nat(3));
        assert_eq!(nat_div(&Value::Nat(-7), &Value::Nat(2)).unwrap(), Value::Nat(-3));
        assert_eq!(nat_rem(&Value::Nat(-7), &Value::Nat(2)).unwrap(), Value::Nat(-1));
        assert_eq!(
            nat_div(&Value::Nat(i64::MIN), &Value::Nat(-1)).unwrap(),
            Value::Nat(i64::MAX)
        );
    }

    #[test]
    fn arithmetic_saturates() {
        assert_eq!(
            nat_add(&Value::Nat(i64::MAX), &Value::Nat(1)).unwrap(),
            Value::Nat(i64::MAX)
        );
        assert_eq!(nat_abs(&Value::Nat(i64::MIN)).unwrap(), Value::Nat(i64::MAX));
    }

    #[test]
    fn log2_and_sqrt_floor() {
        assert_eq!(nat_log2(&Value::Nat(1)).unwrap(), Value::Nat(0));
        assert_eq!(nat_log2(&Value::Nat(1023)).unwrap(), Value::Nat(9));
        assert_eq!(nat_log2(&Value::Nat(1024)).unwrap(), Value::Nat(10));
        assert!(nat_log2(&Value::Nat(0)).is_err());
        assert_eq!(nat_sqrt(&Value::Nat(15)).unwrap(), Value::Nat(3));
        assert_eq!(nat_sqrt(&Value::Nat(16)).unwrap(), Value::Nat(4));
        assert_eq!(nat_sqrt(&Value::Nat(i64::MAX)).unwrap(), Value::Nat(3_037_000_499));
        assert!(nat_sqrt(&Value::Nat(-4)).is_err());
    }

    #[test]
    fn aggregates_over_empty_collections() {
        assert_eq!(nat_mean(&nats(&[])).unwrap(), Value::Nat(0));
        assert_eq!(float_mean(&Value::coll(Vec::new())).unwrap(), Value::float(0.0));
        assert_eq!(nat_sum(&nats(&[])).unwrap(), Value::Nat(0));
        assert!(nat_list_min(&nats(&[])).is_err());
        assert_eq!(
            float_list_min(&Value::coll(Vec::new())).unwrap(),
            Value::float(f64::INFINITY)
        );
    }

    #[test]
    fn aggregates_over_values() {
        assert_eq!(nat_sum(&nats(&[1, 2, 3])).unwrap(), Value::Nat(6));
        assert_eq!(nat_mean(&nats(&[1, 2, 4])).unwrap(), Value::Nat(2));
        assert_eq!(nat_list_max(&nats(&[4, 9, 2])).unwrap(), Value::Nat(9));
        let floats = Value::coll(vec![Value::float(1.5), Value::float(2.5)]);
        assert_eq!(float_mean(&floats).unwrap(), Value::float(2.0));
        assert_eq!(float_list_max(&floats).unwrap(), Value::float(2.5));
    }

    #[test]
    fn float_nat_conversions_truncate() {
        assert_eq!(nat_of_float(&Value::float(2.9)).unwrap(), Value::Nat(2));
        assert_eq!(nat_of_float(&Value::float(-2.9)).unwrap(), Value::Nat(-2));
        assert!(nat_of_float(&Value::float(f64::NAN)).is_err());
        assert_eq!(float_of_nat(&Value::Nat(3)).unwrap(), Value::float(3.0));
    }
}
