//! First-month proration arithmetic.
//!
//! February 2026 starts on a Sunday: Mondays fall on the 2nd, 9th, 16th
//! and 23rd, Wednesdays on the 4th, 11th, 18th and 25th.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tuition_service::services::prorate;

fn weekdays(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn mid_month_enrollment_charges_remaining_occurrences() {
    // Enrolling on Monday the 9th leaves 3 Mondays and 3 Wednesdays.
    let charge = prorate(
        Decimal::from(800),
        date(2026, 2, 9),
        &weekdays(&["Monday", "Wednesday"]),
    );
    assert_eq!(charge, Decimal::new(60000, 2));
}

#[test]
fn enrollment_on_the_first_covers_the_full_schedule() {
    let charge = prorate(
        Decimal::from(800),
        date(2026, 2, 1),
        &weekdays(&["Monday", "Wednesday"]),
    );
    assert_eq!(charge, Decimal::new(80000, 2));
}

#[test]
fn enrollment_day_itself_counts_when_scheduled() {
    // Monday the 23rd is the last scheduled day of the month.
    let charge = prorate(Decimal::from(800), date(2026, 2, 23), &weekdays(&["Monday"]));
    assert_eq!(charge, Decimal::new(10000, 2));
}

#[test]
fn empty_schedule_falls_back_to_twice_weekly() {
    // 14 days remain from the 15th; 14 * 2 / 7 = 4 assumed occurrences.
    let charge = prorate(Decimal::from(800), date(2026, 2, 15), &BTreeSet::new());
    assert_eq!(charge, Decimal::new(40000, 2));
}

#[test]
fn rounds_half_away_from_zero() {
    // 85 / 8 = 10.625 for a single occurrence.
    let charge = prorate(Decimal::from(85), date(2026, 2, 23), &weekdays(&["Monday"]));
    assert_eq!(charge, Decimal::new(1063, 2));
}

#[test]
fn no_remaining_occurrences_charges_nothing() {
    // Enrolling the day after the last Monday of the month.
    let charge = prorate(Decimal::from(800), date(2026, 2, 24), &weekdays(&["Monday"]));
    assert_eq!(charge, Decimal::new(0, 2));
}
