//! First-month tuition proration.
//!
//! Pure arithmetic, no storage access. A full month is always 8 class
//! occurrences regardless of calendar length, so the per-class price is
//! `full_month_price / 8`. The first charge covers the occurrences left
//! between the enrollment date and the end of that month.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::MonthKey;

use super::schedule::weekday_name;

/// Class occurrences that make up one fully billed month.
pub const FULL_MONTH_CLASSES: u32 = 8;

/// Weekly class frequency assumed when a group has no schedule entries.
pub const FALLBACK_CLASSES_PER_WEEK: u32 = 2;

/// Compute the prorated first-month charge.
///
/// Occurrences are the dates in [enrollment_date, last day of that
/// month] whose weekday is in `weekdays`. With an empty set the charge
/// assumes [`FALLBACK_CLASSES_PER_WEEK`] spread over the remaining days
/// (`remaining_days * 2 / 7`, fractional, settled by the rounding step).
/// The result is rounded to 2 decimal places, half-up.
pub fn prorate(
    full_month_price: Decimal,
    enrollment_date: NaiveDate,
    weekdays: &BTreeSet<String>,
) -> Decimal {
    let price_per_class = full_month_price / Decimal::from(FULL_MONTH_CLASSES);
    let last_day = MonthKey::from_date(enrollment_date).last_day();

    let occurrences = if weekdays.is_empty() {
        let remaining_days = (last_day - enrollment_date).num_days() + 1;
        Decimal::from(remaining_days * FALLBACK_CLASSES_PER_WEEK as i64) / Decimal::from(7)
    } else {
        let mut count = 0i64;
        let mut day = enrollment_date;
        while day <= last_day {
            if weekdays.contains(weekday_name(day)) {
                count += 1;
            }
            day += Duration::days(1);
        }
        Decimal::from(count)
    };

    (price_per_class * occurrences).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
