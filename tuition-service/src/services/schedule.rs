//! Weekly schedule resolution and weekday-name normalization.
//!
//! Upstream schedule rows carry weekday names in Russian or English, in
//! any casing. Everything is normalized to the canonical English set;
//! unrecognized values pass through unchanged so a failure to normalize
//! stays visible instead of silently dropping class days.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use service_core::error::AppError;
use uuid::Uuid;

use super::store::RosterStore;

pub const CANONICAL_WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Map a raw weekday name to its canonical form.
pub fn normalize_weekday(raw: &str) -> String {
    match raw.trim().to_lowercase().as_str() {
        "monday" | "понедельник" => "Monday".to_string(),
        "tuesday" | "вторник" => "Tuesday".to_string(),
        "wednesday" | "среда" => "Wednesday".to_string(),
        "thursday" | "четверг" => "Thursday".to_string(),
        "friday" | "пятница" => "Friday".to_string(),
        "saturday" | "суббота" => "Saturday".to_string(),
        "sunday" | "воскресенье" => "Sunday".to_string(),
        _ => raw.to_string(),
    }
}

/// Canonical weekday name of a calendar date.
pub fn weekday_name(date: NaiveDate) -> &'static str {
    CANONICAL_WEEKDAYS[date.weekday().num_days_from_monday() as usize]
}

/// Resolves the distinct weekdays a group meets on.
#[derive(Clone)]
pub struct ScheduleResolver {
    roster: Arc<dyn RosterStore>,
}

impl ScheduleResolver {
    pub fn new(roster: Arc<dyn RosterStore>) -> Self {
        Self { roster }
    }

    /// The set of distinct canonical weekday names for a group. A group
    /// without schedule entries yields an empty set; callers fall back
    /// to the documented twice-weekly default instead of dividing by
    /// zero.
    pub async fn resolve(&self, group_id: Uuid) -> Result<BTreeSet<String>, AppError> {
        let entries = self.roster.list_group_schedule(group_id).await?;
        Ok(entries
            .iter()
            .map(|entry| normalize_weekday(&entry.weekday))
            .collect())
    }
}
