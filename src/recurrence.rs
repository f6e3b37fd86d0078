// src/recurrence.rs

//! Crontab-like recurrence evaluation for process definitions.
//!
//! Each process carries five recurrence fields (minute, hour, day of month,
//! month, day of week). A field is either `*` (always matches) or a
//! comma-separated list of integers and `low-high` ranges, e.g. `"1,5,10-15"`.
//!
//! Parsing doubles as the definition-time validator: a malformed token is
//! rejected with an error naming the token and the field, so bad definitions
//! never reach the store.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::errors::{JobflowError, Result};

/// Day-of-week bounds. ISO convention: Monday = 1 .. Sunday = 7.
pub const DAY_OF_WEEK_MIN: u32 = 1;
pub const DAY_OF_WEEK_MAX: u32 = 7;

/// Which of the five recurrence fields a value belongs to.
///
/// Determines the legal integer range and the field name used in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Minute => "minute",
            FieldKind::Hour => "hour",
            FieldKind::DayOfMonth => "day_of_month",
            FieldKind::Month => "month",
            FieldKind::DayOfWeek => "day_of_week",
        }
    }

    /// Inclusive legal range for values of this field.
    pub fn range(self) -> (u32, u32) {
        match self {
            FieldKind::Minute => (0, 59),
            FieldKind::Hour => (0, 23),
            FieldKind::DayOfMonth => (1, 31),
            FieldKind::Month => (1, 12),
            FieldKind::DayOfWeek => (DAY_OF_WEEK_MIN, DAY_OF_WEEK_MAX),
        }
    }
}

/// One parsed recurrence field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CronField {
    /// `*`: matches every value.
    Any,
    /// Explicit set of allowed values, expanded from list and range tokens.
    Set(BTreeSet<u32>),
}

impl CronField {
    /// Parse a raw field string (`"*"`, `"5"`, `"1,2,10-15"`, ...).
    pub fn parse(kind: FieldKind, input: &str) -> Result<Self> {
        if input == "*" {
            return Ok(CronField::Any);
        }

        let mut values = BTreeSet::new();

        for token in input.split(',') {
            match token.matches('-').count() {
                0 => {
                    values.insert(parse_value(kind, token)?);
                }
                1 => {
                    let (low, high) = token.split_once('-').expect("token has one hyphen");
                    let low = parse_range_bound(kind, token, low)?;
                    let high = parse_range_bound(kind, token, high)?;
                    if low >= high {
                        return Err(JobflowError::ValidationError(format!(
                            "{}: in range '{token}' the upper bound must be greater than {low}",
                            kind.name()
                        )));
                    }
                    values.extend(low..=high);
                }
                _ => {
                    return Err(JobflowError::ValidationError(format!(
                        "{}: '{token}' is not a valid range value",
                        kind.name()
                    )));
                }
            }
        }

        Ok(CronField::Set(values))
    }

    /// Whether the given time component is allowed by this field.
    pub fn matches(&self, value: u32) -> bool {
        match self {
            CronField::Any => true,
            CronField::Set(values) => values.contains(&value),
        }
    }

    /// The expanded value set, or `None` for `*`. Exposed for diagnostics.
    pub fn expanded(&self) -> Option<&BTreeSet<u32>> {
        match self {
            CronField::Any => None,
            CronField::Set(values) => Some(values),
        }
    }
}

fn parse_value(kind: FieldKind, token: &str) -> Result<u32> {
    let (min, max) = kind.range();
    token
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|v| (min..=max).contains(v))
        .ok_or_else(|| {
            JobflowError::ValidationError(format!(
                "{}: '{token}' is not a valid value (expected {min}-{max})",
                kind.name()
            ))
        })
}

fn parse_range_bound(kind: FieldKind, token: &str, bound: &str) -> Result<u32> {
    parse_value(kind, bound).map_err(|_| {
        let (min, max) = kind.range();
        JobflowError::ValidationError(format!(
            "{}: '{token}' is not a valid range value (bounds must be {min}-{max})",
            kind.name()
        ))
    })
}

/// The five parsed recurrence fields of a process definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub minute: CronField,
    pub hour: CronField,
    pub day_of_month: CronField,
    pub month: CronField,
    pub day_of_week: CronField,
}

impl Schedule {
    pub fn parse(
        minute: &str,
        hour: &str,
        day_of_month: &str,
        month: &str,
        day_of_week: &str,
    ) -> Result<Self> {
        Ok(Self {
            minute: CronField::parse(FieldKind::Minute, minute)?,
            hour: CronField::parse(FieldKind::Hour, hour)?,
            day_of_month: CronField::parse(FieldKind::DayOfMonth, day_of_month)?,
            month: CronField::parse(FieldKind::Month, month)?,
            day_of_week: CronField::parse(FieldKind::DayOfWeek, day_of_week)?,
        })
    }

    /// A schedule that matches every minute.
    pub fn any() -> Self {
        Self {
            minute: CronField::Any,
            hour: CronField::Any,
            day_of_month: CronField::Any,
            month: CronField::Any,
            day_of_week: CronField::Any,
        }
    }

    /// Whether a process with this schedule is due at the given instant.
    ///
    /// True iff all five fields match the corresponding component of `at`.
    /// Day of week uses the ISO numbering (Monday = 1).
    pub fn matches(&self, at: NaiveDateTime) -> bool {
        self.minute.matches(at.minute())
            && self.hour.matches(at.hour())
            && self.day_of_month.matches(at.day())
            && self.month.matches(at.month())
            && self.day_of_week.matches(at.weekday().number_from_monday())
    }
}
