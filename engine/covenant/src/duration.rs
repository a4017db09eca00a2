use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::{CovenantError, CovenantResult};
use crate::value::Value;

/// Units on the fixed chain `seconds -> minutes -> hours -> days -> weeks`,
/// declared finest first so the derived ordering reads "finer < coarser".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DurationUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl DurationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Seconds => "seconds",
            DurationUnit::Minutes => "minutes",
            DurationUnit::Hours => "hours",
            DurationUnit::Days => "days",
            DurationUnit::Weeks => "weeks",
        }
    }

    /// Ratio from this unit to the next coarser one, `None` for weeks.
    fn step(&self) -> Option<(i64, DurationUnit)> {
        match self {
            DurationUnit::Seconds => Some((60, DurationUnit::Minutes)),
            DurationUnit::Minutes => Some((60, DurationUnit::Hours)),
            DurationUnit::Hours => Some((24, DurationUnit::Days)),
            DurationUnit::Days => Some((7, DurationUnit::Weeks)),
            DurationUnit::Weeks => None,
        }
    }
}

impl FromStr for DurationUnit {
    type Err = CovenantError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "seconds" | "second" => Ok(DurationUnit::Seconds),
            "minutes" | "minute" => Ok(DurationUnit::Minutes),
            "hours" | "hour" => Ok(DurationUnit::Hours),
            "days" | "day" => Ok(DurationUnit::Days),
            "weeks" | "week" => Ok(DurationUnit::Weeks),
            other => Err(CovenantError::Calendar(format!(
                "unknown duration unit '{other}'"
            ))),
        }
    }
}

impl Display for DurationUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product of the chain ratios walking from `finer` up to `coarser`.
fn chain_ratio(finer: DurationUnit, coarser: DurationUnit) -> i64 {
    let mut factor: i64 = 1;
    let mut unit = finer;
    while unit < coarser {
        let Some((ratio, next)) = unit.step() else {
            break;
        };
        factor = factor.saturating_mul(ratio);
        unit = next;
    }
    factor
}

/// An integral amount of one [`DurationUnit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Duration {
    pub unit: DurationUnit,
    pub amount: i64,
}

impl Duration {
    pub fn new(amount: i64, unit: DurationUnit) -> Self {
        Self { unit, amount }
    }

    pub fn seconds(amount: i64) -> Self {
        Self::new(amount, DurationUnit::Seconds)
    }

    pub fn days(amount: i64) -> Self {
        Self::new(amount, DurationUnit::Days)
    }

    pub fn to_seconds(&self) -> i64 {
        self.amount
            .saturating_mul(chain_ratio(DurationUnit::Seconds, self.unit))
    }

    /// Seconds without saturation; used for ordering.
    pub fn exact_seconds(&self) -> i128 {
        i128::from(self.amount) * i128::from(chain_ratio(DurationUnit::Seconds, self.unit))
    }

    /// Re-express this duration in `target`.
    ///
    /// Branches are tested in chain order (seconds, minutes, hours, days,
    /// weeks). Inside a branch the amount is multiplied when the source unit
    /// is coarser than the target and divided, truncating toward zero, when it
    /// is finer.
    pub fn convert(self, target: DurationUnit) -> Duration {
        let amount = if target == DurationUnit::Seconds {
            self.scale_to(DurationUnit::Seconds)
        } else if target == DurationUnit::Minutes {
            self.scale_to(DurationUnit::Minutes)
        } else if target == DurationUnit::Hours {
            self.scale_to(DurationUnit::Hours)
        } else if target == DurationUnit::Days {
            self.scale_to(DurationUnit::Days)
        } else {
            self.scale_to(DurationUnit::Weeks)
        };
        Duration::new(amount, target)
    }

    fn scale_to(&self, target: DurationUnit) -> i64 {
        if self.unit > target {
            self.amount.saturating_mul(chain_ratio(target, self.unit))
        } else {
            self.amount / chain_ratio(self.unit, target)
        }
    }
}

impl Display for Duration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.unit)
    }
}

/// Sum of two durations, expressed in the finer of the two units.
pub fn duration_add(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (left, right) = (left.expect_duration()?, right.expect_duration()?);
    let unit = left.unit.min(right.unit);
    let amount = left
        .convert(unit)
        .amount
        .saturating_add(right.convert(unit).amount);
    Ok(Value::Duration(Duration::new(amount, unit)))
}

/// Difference of two durations, expressed in the finer of the two units.
pub fn duration_subtract(left: &Value, right: &Value) -> CovenantResult<Value> {
    let (left, right) = (left.expect_duration()?, right.expect_duration()?);
    let unit = left.unit.min(right.unit);
    let amount = left
        .convert(unit)
        .amount
        .saturating_sub(right.convert(unit).amount);
    Ok(Value::Duration(Duration::new(amount, unit)))
}

/// Convert a duration value into `unit`.
pub fn duration_as(duration: &Value, unit: DurationUnit) -> CovenantResult<Value> {
    Ok(Value::Duration(duration.expect_duration()?.convert(unit)))
}

/// The amount of a duration in its own unit, as a boxed natural.
pub fn duration_amount(duration: &Value) -> CovenantResult<Value> {
    Ok(Value::Nat(duration.expect_duration()?.amount))
}

pub fn duration_from_seconds(seconds: &Value) -> CovenantResult<Value> {
    Ok(Value::Duration(Duration::seconds(seconds.expect_nat()?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_week_of_seconds_round_trips() {
        let week = Duration::seconds(604_800).convert(DurationUnit::Weeks);
        assert_eq!(week, Duration::new(1, DurationUnit::Weeks));
        assert_eq!(week.convert(DurationUnit::Seconds).amount, 604_800);
    }

    #[test]
    fn exact_seconds_keeps_units_apart_at_the_extremes() {
        let weeks = Duration::new(i64::MAX, DurationUnit::Weeks);
        let days = Duration::new(i64::MAX, DurationUnit::Days);
        assert_eq!(weeks.to_seconds(), days.to_seconds());
        assert!(weeks.exact_seconds() > days.exact_seconds());
        assert_eq!(Duration::new(-2, DurationUnit::Hours).exact_seconds(), -7_200);
    }

    #[test]
    fn conversion_truncates_toward_zero() {
        assert_eq!(Duration::seconds(119).convert(DurationUnit::Minutes).amount, 1);
        assert_eq!(Duration::seconds(-119).convert(DurationUnit::Minutes).amount, -1);
        assert_eq!(
            Duration::new(47, DurationUnit::Hours)
                .convert(DurationUnit::Days)
                .amount,
            1
        );
    }

    #[test]
    fn conversion_between_intermediate_units() {
        let days = Duration::new(3, DurationUnit::Weeks).convert(DurationUnit::Days);
        assert_eq!(days.amount, 21);
        let minutes = Duration::new(2, DurationUnit::Days).convert(DurationUnit::Minutes);
        assert_eq!(minutes.amount, 2 * 24 * 60);
        let same = Duration::new(5, DurationUnit::Hours).convert(DurationUnit::Hours);
        assert_eq!(same.amount, 5);
    }

    #[test]
    fn add_uses_finer_unit() {
        let sum = duration_add(
            &Value::Duration(Duration::days(1)),
            &Value::Duration(Duration::new(3, DurationUnit::Hours)),
        )
        .expect("add durations");
        let Value::Duration(sum) = sum else {
            panic!("expected duration");
        };
        assert_eq!(sum, Duration::new(27, DurationUnit::Hours));
    }

    #[test]
    fn unit_names_parse_in_both_forms() {
        assert_eq!("week".parse::<DurationUnit>().unwrap(), DurationUnit::Weeks);
        assert_eq!("hours".parse::<DurationUnit>().unwrap(), DurationUnit::Hours);
        assert!("fortnights".parse::<DurationUnit>().is_err());
    }
}
