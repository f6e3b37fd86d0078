// tests/recurrence.rs

//! Recurrence field parsing and due-time matching.

use chrono::{NaiveDate, NaiveDateTime};

use jobflow::errors::JobflowError;
use jobflow::recurrence::{CronField, FieldKind, Schedule};

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, 0)
        .unwrap()
}

#[test]
fn star_parses_to_any() {
    let field = CronField::parse(FieldKind::Minute, "*").unwrap();
    assert_eq!(field, CronField::Any);
    assert!(field.matches(0));
    assert!(field.matches(59));
}

#[test]
fn list_and_ranges_expand_to_exact_set() {
    // '1,2,3,7,4-9' expands to {1,2,3,4,5,6,7,8,9}.
    let field = CronField::parse(FieldKind::Minute, "1,2,3,7,4-9").unwrap();
    let expanded = field.expanded().unwrap();
    let expected: std::collections::BTreeSet<u32> = (1..=9).collect();
    assert_eq!(expanded, &expected);
}

#[test]
fn boundary_values_match_exactly() {
    let field = CronField::parse(FieldKind::Minute, "0-5,59").unwrap();
    for m in 0..=5 {
        assert!(field.matches(m), "minute {m} should match");
    }
    assert!(field.matches(59));
    assert!(!field.matches(6));
    assert!(!field.matches(58));
}

#[test]
fn out_of_range_value_is_rejected_naming_token_and_field() {
    let err = CronField::parse(FieldKind::Minute, "5,61").unwrap_err();
    match err {
        JobflowError::ValidationError(msg) => {
            assert!(msg.contains("61"), "message should name the token: {msg}");
            assert!(msg.contains("minute"), "message should name the field: {msg}");
        }
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

#[test]
fn non_numeric_token_is_rejected() {
    let err = CronField::parse(FieldKind::Hour, "3,x").unwrap_err();
    assert!(matches!(err, JobflowError::ValidationError(_)));
    assert!(err.to_string().contains("'x'"));
}

#[test]
fn reversed_and_degenerate_ranges_are_rejected() {
    assert!(CronField::parse(FieldKind::Minute, "9-4").is_err());
    assert!(CronField::parse(FieldKind::Minute, "5-5").is_err());
}

#[test]
fn multi_hyphen_token_is_rejected() {
    let err = CronField::parse(FieldKind::Minute, "1-2-3").unwrap_err();
    assert!(err.to_string().contains("1-2-3"));
}

#[test]
fn range_bound_out_of_field_range_is_rejected() {
    assert!(CronField::parse(FieldKind::Hour, "20-25").is_err());
    assert!(CronField::parse(FieldKind::Month, "0-3").is_err());
}

#[test]
fn field_ranges_follow_field_kind() {
    assert!(CronField::parse(FieldKind::Minute, "59").is_ok());
    assert!(CronField::parse(FieldKind::Hour, "24").is_err());
    assert!(CronField::parse(FieldKind::DayOfMonth, "0").is_err());
    assert!(CronField::parse(FieldKind::DayOfMonth, "31").is_ok());
    assert!(CronField::parse(FieldKind::Month, "12").is_ok());
    assert!(CronField::parse(FieldKind::Month, "13").is_err());
    // ISO day of week: Monday = 1 .. Sunday = 7; 0 is not a valid day.
    assert!(CronField::parse(FieldKind::DayOfWeek, "0").is_err());
    assert!(CronField::parse(FieldKind::DayOfWeek, "7").is_ok());
}

#[test]
fn matches_requires_all_five_fields() {
    // Every minute of 02:xx on the 1st of January.
    let schedule = Schedule::parse("*", "2", "1", "1", "*").unwrap();

    assert!(schedule.matches(at(2024, 1, 1, 2, 0)));
    assert!(schedule.matches(at(2024, 1, 1, 2, 59)));
    // Wrong hour.
    assert!(!schedule.matches(at(2024, 1, 1, 3, 0)));
    // Wrong day.
    assert!(!schedule.matches(at(2024, 1, 2, 2, 0)));
    // Wrong month.
    assert!(!schedule.matches(at(2024, 2, 1, 2, 0)));
}

#[test]
fn day_of_week_uses_iso_monday_numbering() {
    // 2024-01-03 is a Wednesday (ISO day 3).
    let schedule = Schedule::parse("*", "*", "*", "*", "3").unwrap();
    assert!(schedule.matches(at(2024, 1, 3, 12, 0)));
    // Thursday does not match.
    assert!(!schedule.matches(at(2024, 1, 4, 12, 0)));

    // 2024-01-07 is a Sunday (ISO day 7).
    let sunday = Schedule::parse("*", "*", "*", "*", "7").unwrap();
    assert!(sunday.matches(at(2024, 1, 7, 12, 0)));
}

#[test]
fn all_star_schedule_matches_any_instant() {
    let schedule = Schedule::any();
    assert!(schedule.matches(at(2024, 6, 15, 23, 59)));
    assert!(schedule.matches(at(1999, 12, 31, 0, 0)));
}
