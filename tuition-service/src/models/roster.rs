//! Read-only roster entities supplied by the rest of the platform.
//!
//! The ledger never writes these; their CRUD lives in other services.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An enrolled student. Only active students with a group assignment are
/// eligible for monthly reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub student_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Correlates self-service callers with their roster entry.
    pub email: Option<String>,
    pub is_active: bool,
    pub group_id: Option<Uuid>,
    pub enrolled_date: NaiveDate,
    pub created_utc: DateTime<Utc>,
}

/// A study group; ties students to a course.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub group_id: Uuid,
    pub name: String,
    pub course_id: Option<Uuid>,
}

/// A course with its full-month tuition price.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub course_id: Uuid,
    pub name: String,
    pub price: Decimal,
}

/// One weekly class slot of a group. Only the weekday name matters to
/// proration; times are carried for completeness.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduleEntry {
    pub entry_id: Uuid,
    pub group_id: Uuid,
    pub weekday: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}
