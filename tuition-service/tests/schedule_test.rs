//! Weekday normalization and schedule resolution.

mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tuition_service::services::{normalize_weekday, weekday_name, RosterStore, ScheduleResolver};
use uuid::Uuid;

use common::MemoryRosterStore;

#[test]
fn normalizes_english_weekdays_case_insensitively() {
    assert_eq!(normalize_weekday("monday"), "Monday");
    assert_eq!(normalize_weekday("WEDNESDAY"), "Wednesday");
    assert_eq!(normalize_weekday("  friday "), "Friday");
}

#[test]
fn normalizes_russian_weekdays() {
    assert_eq!(normalize_weekday("Понедельник"), "Monday");
    assert_eq!(normalize_weekday("среда"), "Wednesday");
    assert_eq!(normalize_weekday("воскресенье"), "Sunday");
}

#[test]
fn unknown_weekday_passes_through_unchanged() {
    assert_eq!(normalize_weekday("someday"), "someday");
}

#[test]
fn weekday_name_matches_calendar() {
    // 2026-02-01 is a Sunday.
    assert_eq!(
        weekday_name(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()),
        "Sunday"
    );
    assert_eq!(
        weekday_name(NaiveDate::from_ymd_opt(2026, 2, 2).unwrap()),
        "Monday"
    );
}

#[tokio::test]
async fn resolver_deduplicates_and_normalizes_entries() {
    let roster = MemoryRosterStore::new();
    let course_id = roster.add_course("Math", Decimal::from(800));
    let group_id = roster.add_group("M-1", Some(course_id));
    roster.set_schedule(group_id, &["понедельник", "Monday", "wednesday"]);

    let resolver = ScheduleResolver::new(roster as Arc<dyn RosterStore>);
    let weekdays = resolver.resolve(group_id).await.unwrap();

    assert_eq!(weekdays.len(), 2);
    assert!(weekdays.contains("Monday"));
    assert!(weekdays.contains("Wednesday"));
}

#[tokio::test]
async fn resolver_yields_empty_set_for_unscheduled_group() {
    let roster = MemoryRosterStore::new();
    let resolver = ScheduleResolver::new(roster as Arc<dyn RosterStore>);
    let weekdays = resolver.resolve(Uuid::new_v4()).await.unwrap();
    assert!(weekdays.is_empty());
}
