//! Calendar runtime built on `chrono`.
//!
//! Dates are fixed-offset instants. This module contributes date comparison,
//! differences, duration/period arithmetic and moment-style patterns; all
//! calendar math itself is delegated to `chrono`.

use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, Offset as _,
    TimeDelta, TimeZone as _, Timelike, Utc,
};

use crate::duration::{Duration, DurationUnit};
use crate::error::{CovenantError, CovenantResult};
use crate::value::Value;

pub type Date = DateTime<FixedOffset>;

const SECONDS_PER_DAY: i32 = 86_400;

/// Parsing and construction context: every date it produces carries the
/// configured fixed UTC offset.
#[derive(Clone, Copy, Debug)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Default for Calendar {
    fn default() -> Self {
        Self { offset: Utc.fix() }
    }
}

impl Calendar {
    pub fn utc() -> Self {
        Self::default()
    }

    pub fn with_offset_seconds(seconds: i32) -> CovenantResult<Self> {
        if seconds.unsigned_abs() >= SECONDS_PER_DAY.unsigned_abs() {
            return Err(CovenantError::Config(format!(
                "utc offset {seconds}s is outside (-86400, 86400)"
            )));
        }
        let offset = FixedOffset::east_opt(seconds).ok_or_else(|| {
            CovenantError::Config(format!("utc offset {seconds}s is not representable"))
        })?;
        Ok(Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn now(&self) -> Date {
        Utc::now().with_timezone(&self.offset)
    }

    pub fn from_timestamp(&self, seconds: i64) -> CovenantResult<Date> {
        DateTime::<Utc>::from_timestamp(seconds, 0)
            .map(|utc| utc.with_timezone(&self.offset))
            .ok_or_else(|| {
                CovenantError::Calendar(format!("timestamp {seconds} is out of range"))
            })
    }

    /// Parse RFC 3339, or an ISO date / date-time without offset, which is
    /// read as local time in the configured offset.
    pub fn parse(&self, text: &str) -> CovenantResult<Date> {
        if let Ok(date) = DateTime::parse_from_rfc3339(text) {
            return Ok(date);
        }
        for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
                return self.localize(naive);
            }
        }
        if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return self.localize(day.and_time(NaiveTime::MIN));
        }
        Err(CovenantError::Calendar(format!(
            "cannot parse date '{text}'"
        )))
    }

    /// Parse `text` against a moment-style pattern such as `DD/MM/YYYY`.
    pub fn parse_with_format(&self, text: &str, pattern: &str) -> CovenantResult<Date> {
        let translated = translate_pattern(pattern)?;
        let failure = |err: chrono::ParseError| {
            CovenantError::Calendar(format!(
                "cannot parse '{text}' with pattern '{pattern}': {err}"
            ))
        };
        if translated.has_offset {
            return DateTime::parse_from_str(text, &translated.strftime).map_err(failure);
        }
        if translated.has_time {
            let naive = NaiveDateTime::parse_from_str(text, &translated.strftime).map_err(failure)?;
            return self.localize(naive);
        }
        let day = NaiveDate::parse_from_str(text, &translated.strftime).map_err(failure)?;
        self.localize(day.and_time(NaiveTime::MIN))
    }

    fn localize(&self, naive: NaiveDateTime) -> CovenantResult<Date> {
        self.offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| CovenantError::Calendar(format!("local time {naive} is out of range")))
    }
}

/// Render `date` with a moment-style pattern.
pub fn format(date: &Date, pattern: &str) -> CovenantResult<String> {
    let translated = translate_pattern(pattern)?;
    Ok(date.format(&translated.strftime).to_string())
}

struct TranslatedPattern {
    strftime: String,
    has_time: bool,
    has_offset: bool,
}

/// Tokens are matched longest first; `[...]` escapes literal text.
const PATTERN_TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("YY", "%y"),
    ("MMMM", "%B"),
    ("MMM", "%b"),
    ("MM", "%m"),
    ("M", "%-m"),
    ("dddd", "%A"),
    ("ddd", "%a"),
    ("DD", "%d"),
    ("D", "%-d"),
    ("HH", "%H"),
    ("H", "%-H"),
    ("hh", "%I"),
    ("h", "%-I"),
    ("mm", "%M"),
    ("m", "%-M"),
    ("ss", "%S"),
    ("s", "%-S"),
    ("SSS", "%3f"),
    ("A", "%p"),
    ("a", "%P"),
    ("ZZ", "%z"),
    ("Z", "%:z"),
];

fn translate_pattern(pattern: &str) -> CovenantResult<TranslatedPattern> {
    let mut out = TranslatedPattern {
        strftime: String::with_capacity(pattern.len() * 2),
        has_time: false,
        has_offset: false,
    };
    let mut rest = pattern;
    'outer: while let Some(ch) = rest.chars().next() {
        if ch == '[' {
            let Some(end) = rest.find(']') else {
                return Err(CovenantError::Calendar(format!(
                    "unterminated literal in pattern '{pattern}'"
                )));
            };
            push_literal(&mut out.strftime, &rest[1..end]);
            rest = &rest[end + 1..];
            continue;
        }
        for (token, replacement) in PATTERN_TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.strftime.push_str(replacement);
                match token.chars().next() {
                    Some('H' | 'h' | 'm' | 's' | 'S' | 'A' | 'a') => out.has_time = true,
                    Some('Z') => {
                        out.has_time = true;
                        out.has_offset = true;
                    }
                    _ => {}
                }
                rest = tail;
                continue 'outer;
            }
        }
        push_literal(&mut out.strftime, &rest[..ch.len_utf8()]);
        rest = &rest[ch.len_utf8()..];
    }
    Ok(out)
}

fn push_literal(out: &mut String, literal: &str) {
    for ch in literal.chars() {
        if ch == '%' {
            out.push_str("%%");
        } else {
            out.push(ch);
        }
    }
}

/// Calendar fields that can be extracted from, or truncated on, a date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CalendarUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl FromStr for CalendarUnit {
    type Err = CovenantError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "second" | "seconds" => Ok(CalendarUnit::Second),
            "minute" | "minutes" => Ok(CalendarUnit::Minute),
            "hour" | "hours" => Ok(CalendarUnit::Hour),
            "day" | "days" => Ok(CalendarUnit::Day),
            "week" | "weeks" => Ok(CalendarUnit::Week),
            "month" | "months" => Ok(CalendarUnit::Month),
            "quarter" | "quarters" => Ok(CalendarUnit::Quarter),
            "year" | "years" => Ok(CalendarUnit::Year),
            other => Err(CovenantError::Calendar(format!(
                "unknown calendar unit '{other}'"
            ))),
        }
    }
}

/// Local field value; `Day` is the day of month and `Week` the ISO week.
pub fn component(date: &Date, unit: CalendarUnit) -> i64 {
    match unit {
        CalendarUnit::Second => i64::from(date.second()),
        CalendarUnit::Minute => i64::from(date.minute()),
        CalendarUnit::Hour => i64::from(date.hour()),
        CalendarUnit::Day => i64::from(date.day()),
        CalendarUnit::Week => i64::from(date.iso_week().week()),
        CalendarUnit::Month => i64::from(date.month()),
        CalendarUnit::Quarter => i64::from(date.month0() / 3 + 1),
        CalendarUnit::Year => i64::from(date.year()),
    }
}

/// Truncate `date` to the start of its enclosing `unit` (weeks start on Monday).
pub fn start_of(date: &Date, unit: CalendarUnit) -> CovenantResult<Date> {
    let local = date.naive_local();
    let day = local.date();
    let naive = match unit {
        CalendarUnit::Second => day.and_hms_opt(local.hour(), local.minute(), local.second()),
        CalendarUnit::Minute => day.and_hms_opt(local.hour(), local.minute(), 0),
        CalendarUnit::Hour => day.and_hms_opt(local.hour(), 0, 0),
        CalendarUnit::Day => Some(day.and_time(NaiveTime::MIN)),
        CalendarUnit::Week => day
            .checked_sub_signed(TimeDelta::days(i64::from(
                day.weekday().num_days_from_monday(),
            )))
            .map(|monday| monday.and_time(NaiveTime::MIN)),
        CalendarUnit::Month => NaiveDate::from_ymd_opt(day.year(), day.month(), 1)
            .map(|first| first.and_time(NaiveTime::MIN)),
        CalendarUnit::Quarter => NaiveDate::from_ymd_opt(day.year(), day.month0() / 3 * 3 + 1, 1)
            .map(|first| first.and_time(NaiveTime::MIN)),
        CalendarUnit::Year => {
            NaiveDate::from_ymd_opt(day.year(), 1, 1).map(|first| first.and_time(NaiveTime::MIN))
        }
    };
    naive
        .and_then(|naive| date.offset().from_local_datetime(&naive).single())
        .ok_or_else(|| CovenantError::Calendar(format!("cannot truncate {date} to {unit:?}")))
}

/// Last millisecond of the `unit` enclosing `date`.
pub fn end_of(date: &Date, unit: CalendarUnit) -> CovenantResult<Date> {
    let start = start_of(date, unit)?;
    let next = match unit {
        CalendarUnit::Second => start.checked_add_signed(TimeDelta::seconds(1)),
        CalendarUnit::Minute => start.checked_add_signed(TimeDelta::minutes(1)),
        CalendarUnit::Hour => start.checked_add_signed(TimeDelta::hours(1)),
        CalendarUnit::Day => start.checked_add_signed(TimeDelta::days(1)),
        CalendarUnit::Week => start.checked_add_signed(TimeDelta::weeks(1)),
        CalendarUnit::Month => start.checked_add_months(Months::new(1)),
        CalendarUnit::Quarter => start.checked_add_months(Months::new(3)),
        CalendarUnit::Year => start.checked_add_months(Months::new(12)),
    };
    next.and_then(|next| next.checked_sub_signed(TimeDelta::milliseconds(1)))
        .ok_or_else(|| CovenantError::Calendar(format!("no end of {unit:?} for {date}")))
}

pub fn compare_dates(left: &Date, right: &Date) -> Ordering {
    left.cmp(right)
}

pub fn is_before(left: &Date, right: &Date) -> bool {
    compare_dates(left, right) == Ordering::Less
}

pub fn is_after(left: &Date, right: &Date) -> bool {
    compare_dates(left, right) == Ordering::Greater
}

pub fn is_same(left: &Date, right: &Date) -> bool {
    compare_dates(left, right) == Ordering::Equal
}

/// `left - right` in whole seconds.
pub fn diff(left: &Date, right: &Date) -> Duration {
    Duration::seconds(left.signed_duration_since(*right).num_seconds())
}

/// `left - right` converted to `unit`.
pub fn diff_in(left: &Date, right: &Date, unit: DurationUnit) -> Duration {
    diff(left, right).convert(unit)
}

pub fn add_duration(date: &Date, duration: Duration) -> CovenantResult<Date> {
    shift_seconds(date, duration.to_seconds())
}

pub fn subtract_duration(date: &Date, duration: Duration) -> CovenantResult<Date> {
    shift_seconds(date, duration.to_seconds().saturating_neg())
}

fn shift_seconds(date: &Date, seconds: i64) -> CovenantResult<Date> {
    TimeDelta::try_seconds(seconds)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| {
            CovenantError::Calendar(format!("shifting {date} by {seconds}s is out of range"))
        })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeriodUnit {
    Days,
    Weeks,
    Months,
    Quarters,
    Years,
}

impl PeriodUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodUnit::Days => "days",
            PeriodUnit::Weeks => "weeks",
            PeriodUnit::Months => "months",
            PeriodUnit::Quarters => "quarters",
            PeriodUnit::Years => "years",
        }
    }
}

impl FromStr for PeriodUnit {
    type Err = CovenantError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "days" | "day" => Ok(PeriodUnit::Days),
            "weeks" | "week" => Ok(PeriodUnit::Weeks),
            "months" | "month" => Ok(PeriodUnit::Months),
            "quarters" | "quarter" => Ok(PeriodUnit::Quarters),
            "years" | "year" => Ok(PeriodUnit::Years),
            other => Err(CovenantError::Calendar(format!(
                "unknown period unit '{other}'"
            ))),
        }
    }
}

/// A calendar-relative amount: months and years vary in length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Period {
    pub unit: PeriodUnit,
    pub amount: i64,
}

impl Period {
    pub fn new(amount: i64, unit: PeriodUnit) -> Self {
        Self { unit, amount }
    }

    /// `(months, days)` split without saturation; used for ordering.
    pub fn exact_parts(&self) -> (i128, i128) {
        let amount = i128::from(self.amount);
        match self.unit {
            PeriodUnit::Days => (0, amount),
            PeriodUnit::Weeks => (0, amount * 7),
            PeriodUnit::Months => (amount, 0),
            PeriodUnit::Quarters => (amount * 3, 0),
            PeriodUnit::Years => (amount * 12, 0),
        }
    }

    /// Saturating `(months, days)` split used for arithmetic.
    pub fn normalized(&self) -> (i64, i64) {
        match self.unit {
            PeriodUnit::Days => (0, self.amount),
            PeriodUnit::Weeks => (0, self.amount.saturating_mul(7)),
            PeriodUnit::Months => (self.amount, 0),
            PeriodUnit::Quarters => (self.amount.saturating_mul(3), 0),
            PeriodUnit::Years => (self.amount.saturating_mul(12), 0),
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.unit.as_str())
    }
}

/// Month arithmetic clamps to the last day of the target month.
pub fn add_period(date: &Date, period: Period) -> CovenantResult<Date> {
    shift_period(date, period.normalized())
}

pub fn subtract_period(date: &Date, period: Period) -> CovenantResult<Date> {
    let (months, days) = period.normalized();
    shift_period(date, (months.saturating_neg(), days.saturating_neg()))
}

fn shift_period(date: &Date, (months, days): (i64, i64)) -> CovenantResult<Date> {
    let out_of_range =
        || CovenantError::Calendar(format!("shifting {date} by a period is out of range"));
    let magnitude = u32::try_from(months.unsigned_abs()).map_err(|_| out_of_range())?;
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(magnitude))
    } else {
        date.checked_sub_months(Months::new(magnitude))
    }
    .ok_or_else(out_of_range)?;
    TimeDelta::try_days(days)
        .and_then(|delta| shifted.checked_add_signed(delta))
        .ok_or_else(out_of_range)
}

/// Sentinel returned by [`max_date`] over no dates.
pub fn min_sentinel() -> Date {
    DateTime::<Utc>::MIN_UTC.with_timezone(&Utc.fix())
}

/// Sentinel returned by [`min_date`] over no dates.
pub fn max_sentinel() -> Date {
    DateTime::<Utc>::MAX_UTC.with_timezone(&Utc.fix())
}

/// Earliest date, or the maximum sentinel for an empty input.
pub fn min_date(dates: &[Date]) -> Date {
    dates.iter().copied().min().unwrap_or_else(max_sentinel)
}

/// Latest date, or the minimum sentinel for an empty input.
pub fn max_date(dates: &[Date]) -> Date {
    dates.iter().copied().max().unwrap_or_else(min_sentinel)
}

/// [`min_date`] over a collection of datetime values.
pub fn date_min(dates: &Value) -> CovenantResult<Value> {
    Ok(Value::DateTime(min_date(&collect_dates(dates)?)))
}

/// [`max_date`] over a collection of datetime values.
pub fn date_max(dates: &Value) -> CovenantResult<Value> {
    Ok(Value::DateTime(max_date(&collect_dates(dates)?)))
}

fn collect_dates(dates: &Value) -> CovenantResult<Vec<Date>> {
    dates
        .expect_coll()?
        .iter()
        .map(Value::expect_datetime)
        .collect()
}
