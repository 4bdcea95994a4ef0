//! Minimal cron primitive: parse an expression, compute the next fire time.
//!
//! Accepts 6-field expressions (`sec min hour day-of-month month day-of-week`)
//! and classic 5-field ones, where seconds are implied to be `0`. Day-of-month
//! and day-of-week must both match; `?` is an alias for `*`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{
    DateTime, Datelike, Duration as ChronoDuration, NaiveDate, NaiveDateTime, TimeZone, Timelike,
};

use crate::core::ListenerError;

/// Upper bound on how far ahead a fire time is searched for.
const SEARCH_HORIZON_YEARS: i32 = 5;

const MONTH_NAMES: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Set of allowed values for one field, as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldSet(u64);

impl FieldSet {
    const fn contains(self, value: u32) -> bool {
        value < 64 && self.0 & (1 << value) != 0
    }
}

#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [&'static str],
    names_offset: u32,
}

const SECONDS: FieldSpec = FieldSpec {
    name: "seconds",
    min: 0,
    max: 59,
    names: &[],
    names_offset: 0,
};
const MINUTES: FieldSpec = FieldSpec {
    name: "minutes",
    min: 0,
    max: 59,
    names: &[],
    names_offset: 0,
};
const HOURS: FieldSpec = FieldSpec {
    name: "hours",
    min: 0,
    max: 23,
    names: &[],
    names_offset: 0,
};
const DAYS_OF_MONTH: FieldSpec = FieldSpec {
    name: "day-of-month",
    min: 1,
    max: 31,
    names: &[],
    names_offset: 0,
};
const MONTHS: FieldSpec = FieldSpec {
    name: "month",
    min: 1,
    max: 12,
    names: &MONTH_NAMES,
    names_offset: 1,
};
// 7 is accepted as Sunday and folded onto 0 after parsing.
const DAYS_OF_WEEK: FieldSpec = FieldSpec {
    name: "day-of-week",
    min: 0,
    max: 7,
    names: &DAY_NAMES,
    names_offset: 0,
};

/// A parsed cron expression.
#[derive(Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expression: String,
    seconds: FieldSet,
    minutes: FieldSet,
    hours: FieldSet,
    days_of_month: FieldSet,
    months: FieldSet,
    days_of_week: FieldSet,
}

impl CronSchedule {
    /// Parse a 5- or 6-field cron expression.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::InvalidCron`] when the expression has the wrong
    /// number of fields or a field is out of range or malformed.
    pub fn parse(expression: &str) -> Result<Self, ListenerError> {
        let invalid = |reason: String| ListenerError::InvalidCron {
            expression: expression.to_string(),
            reason,
        };

        let fields: Vec<&str> = expression.split_whitespace().collect();
        let fields: Vec<&str> = match fields.len() {
            6 => fields,
            5 => std::iter::once("0").chain(fields).collect(),
            n => return Err(invalid(format!("expected 5 or 6 fields, found {n}"))),
        };

        let seconds = parse_field(fields[0], SECONDS).map_err(&invalid)?;
        let minutes = parse_field(fields[1], MINUTES).map_err(&invalid)?;
        let hours = parse_field(fields[2], HOURS).map_err(&invalid)?;
        let days_of_month = parse_field(fields[3], DAYS_OF_MONTH).map_err(&invalid)?;
        let months = parse_field(fields[4], MONTHS).map_err(&invalid)?;
        let mut days_of_week = parse_field(fields[5], DAYS_OF_WEEK).map_err(&invalid)?;
        if days_of_week.contains(7) {
            days_of_week = FieldSet((days_of_week.0 | 1) & !(1 << 7));
        }

        Ok(Self {
            expression: expression.trim().to_string(),
            seconds,
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
        })
    }

    /// The expression as written.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`, or `None` when the expression
    /// never fires within the search horizon (e.g. `0 0 0 30 2 *`).
    #[must_use]
    pub fn next_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let mut t = after.with_nanosecond(0)? + ChronoDuration::seconds(1);
        let horizon = after.year() + SEARCH_HORIZON_YEARS;

        while t.year() <= horizon {
            if !self.months.contains(t.month()) {
                t = first_of_next_month(t.date())?;
                continue;
            }
            if !self.day_matches(t.date()) {
                t = (t.date() + ChronoDuration::days(1)).and_hms_opt(0, 0, 0)?;
                continue;
            }
            if !self.hours.contains(t.hour()) {
                t = t.with_minute(0)?.with_second(0)? + ChronoDuration::hours(1);
                continue;
            }
            if !self.minutes.contains(t.minute()) {
                t = t.with_second(0)? + ChronoDuration::minutes(1);
                continue;
            }
            if !self.seconds.contains(t.second()) {
                t += ChronoDuration::seconds(1);
                continue;
            }
            return Some(t);
        }
        None
    }

    /// Time to wait from `now` until the next fire time, both read as
    /// wall-clock times without an offset.
    #[must_use]
    pub fn delay_until_next(&self, now: NaiveDateTime) -> Option<Duration> {
        let next = self.next_after(now)?;
        (next - now).to_std().ok()
    }

    /// Time to wait from `now` until the next fire time on the wall clock of
    /// `now`'s time zone.
    ///
    /// The wait is measured between real instants, so it stays correct across
    /// offset changes. Fire times that fall into a skipped hour are dropped;
    /// in a repeated hour the first occurrence still ahead of `now` is used.
    #[must_use]
    pub fn delay_until_next_in<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<Duration> {
        let zone = now.timezone();
        let mut wall = now.naive_local();
        loop {
            wall = self.next_after(wall)?;
            let earliest = zone.from_local_datetime(&wall).earliest();
            let latest = zone.from_local_datetime(&wall).latest();
            for candidate in [earliest, latest].into_iter().flatten() {
                if let Ok(wait) = candidate.signed_duration_since(now).to_std() {
                    return Some(wait);
                }
            }
        }
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        self.days_of_month.contains(date.day())
            && self
                .days_of_week
                .contains(date.weekday().num_days_from_sunday())
    }
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDateTime> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}

fn parse_field(field: &str, spec: FieldSpec) -> Result<FieldSet, String> {
    let mut set = 0_u64;
    for part in field.split(',') {
        if part.is_empty() {
            return Err(format!("empty entry in {} field `{field}`", spec.name));
        }
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("invalid step `{step}` in {} field", spec.name))?;
                if step == 0 {
                    return Err(format!("zero step in {} field", spec.name));
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range == "*" || range == "?" {
            (spec.min, spec.max)
        } else if let Some((lo, hi)) = range.split_once('-') {
            (parse_value(lo, spec)?, parse_value(hi, spec)?)
        } else {
            let value = parse_value(range, spec)?;
            // `a/n` runs from `a` to the end of the field.
            (value, if step.is_some() { spec.max } else { value })
        };

        if start > end {
            return Err(format!("range {start}-{end} is reversed in {} field", spec.name));
        }

        let step = step.unwrap_or(1);
        let mut value = start;
        while value <= end {
            set |= 1 << value;
            value += step;
        }
    }
    Ok(FieldSet(set))
}

fn parse_value(token: &str, spec: FieldSpec) -> Result<u32, String> {
    let upper = token.to_ascii_uppercase();
    let value = if let Some(index) = spec.names.iter().position(|name| *name == upper) {
        u32::try_from(index).map_err(|e| e.to_string())? + spec.names_offset
    } else {
        token
            .parse()
            .map_err(|_| format!("invalid value `{token}` in {} field", spec.name))?
    };
    if value < spec.min || value > spec.max {
        return Err(format!(
            "value {value} out of range {}-{} in {} field",
            spec.min, spec.max, spec.name
        ));
    }
    Ok(value)
}

impl FromStr for CronSchedule {
    type Err = ListenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl fmt::Debug for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronSchedule").field(&self.expression).finish()
    }
}
