//! Billing ledger models: records, statuses, commands and statistics.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use super::month::{validate_month_key, MonthKey};
use super::roster::{Course, Student};

/// Billing record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    Pending,
    Paid,
    Overdue,
    Refunded,
}

impl BillingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingStatus::Pending => "pending",
            BillingStatus::Paid => "paid",
            BillingStatus::Overdue => "overdue",
            BillingStatus::Refunded => "refunded",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BillingStatus::Pending),
            "paid" => Some(BillingStatus::Paid),
            "overdue" => Some(BillingStatus::Overdue),
            "refunded" => Some(BillingStatus::Refunded),
            _ => None,
        }
    }
}

/// One student's tuition obligation for one calendar month.
///
/// `student_id` and `month` never change after creation and are unique as
/// a pair. `payment_date` is non-nullable: first day of the month at
/// creation, overwritten with the payment day on transition to paid.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BillingRecord {
    pub record_id: Uuid,
    pub student_id: Uuid,
    pub course_id: Option<Uuid>,
    pub month: String,
    pub amount: Decimal,
    pub status: String,
    pub payment_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl BillingRecord {
    /// Apply a validated update in place. The caller has already enforced
    /// the month-immutability rule; this only touches mutable fields.
    pub fn apply_update(&mut self, input: &UpdateBillingRecord, now: DateTime<Utc>) {
        if let Some(amount) = input.amount {
            self.amount = amount;
        }
        if let Some(status) = input.status {
            self.status = status.as_str().to_string();
        }
        if let Some(payment_date) = input.payment_date {
            self.payment_date = payment_date;
        }
        if let Some(due_date) = &input.due_date {
            self.due_date = *due_date;
        }
        if let Some(payment_method) = &input.payment_method {
            self.payment_method = payment_method.clone();
        }
        if let Some(notes) = &input.notes {
            self.notes = notes.clone();
        }
        self.updated_utc = now;
    }
}

/// A record joined with its student and course associations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRecordDetail {
    pub record: BillingRecord,
    pub student: Option<Student>,
    pub course: Option<Course>,
}

/// Validated creation command for the ledger store.
#[derive(Debug, Clone)]
pub struct CreateBillingRecord {
    pub student_id: Uuid,
    pub course_id: Option<Uuid>,
    pub month: MonthKey,
    pub amount: Decimal,
    /// Defaults to the first day of `month` when absent.
    pub payment_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// Validated update command for the ledger store.
///
/// Outer `None` leaves a field unchanged; `Some(None)` clears a nullable
/// field. `month` and `student_id` are absent on purpose: they are
/// immutable and stripped before the command is built.
#[derive(Debug, Clone, Default)]
pub struct UpdateBillingRecord {
    pub amount: Option<Decimal>,
    pub status: Option<BillingStatus>,
    pub payment_date: Option<NaiveDate>,
    pub due_date: Option<Option<NaiveDate>>,
    pub payment_method: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

/// Payment details attached when a record transitions to paid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkPaid {
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// Filter parameters for listing billing records.
#[derive(Debug, Clone, Default)]
pub struct ListBillingFilter {
    pub student_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub status: Option<BillingStatus>,
    /// Filters on the `month` column only, never on `payment_date`
    /// ranges: `payment_date` stops representing the billing period the
    /// moment a record is marked paid.
    pub month: Option<MonthKey>,
}

/// Aggregate counts and summed amounts for a filtered record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingStats {
    pub total: i64,
    pub total_amount: Decimal,
    pub paid: i64,
    pub paid_amount: Decimal,
    pub pending: i64,
    pub pending_amount: Decimal,
    pub overdue: i64,
    pub overdue_amount: Decimal,
}

impl BillingStats {
    pub fn from_records(records: &[BillingRecord]) -> Self {
        let mut stats = BillingStats::default();
        for record in records {
            stats.total += 1;
            stats.total_amount += record.amount;
            match BillingStatus::from_string(&record.status) {
                Some(BillingStatus::Paid) => {
                    stats.paid += 1;
                    stats.paid_amount += record.amount;
                }
                Some(BillingStatus::Pending) => {
                    stats.pending += 1;
                    stats.pending_amount += record.amount;
                }
                Some(BillingStatus::Overdue) => {
                    stats.overdue += 1;
                    stats.overdue_amount += record.amount;
                }
                _ => {}
            }
        }
        stats
    }
}

/// Wire payload for direct administrative creation.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBillingRequest {
    pub student_id: Uuid,
    pub course_id: Option<Uuid>,
    #[validate(custom(function = validate_month_key))]
    pub month: String,
    pub amount: Decimal,
    pub payment_date: Option<String>,
    pub due_date: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

impl CreateBillingRequest {
    /// Normalize and type-check the payload into a creation command.
    /// Empty-string dates and texts become absent rather than literal
    /// values.
    pub fn into_command(self) -> Result<CreateBillingRecord, AppError> {
        if self.amount < Decimal::ZERO {
            return Err(field_validation_error("amount", "non_negative"));
        }
        let month = MonthKey::parse(&self.month)
            .map_err(|_| field_validation_error("month", "month_format"))?;
        Ok(CreateBillingRecord {
            student_id: self.student_id,
            course_id: self.course_id,
            month,
            amount: self.amount,
            payment_date: parse_optional_date("payment_date", self.payment_date)?,
            due_date: parse_optional_date("due_date", self.due_date)?,
            payment_method: normalize_text(self.payment_method),
            notes: normalize_text(self.notes),
        })
    }
}

/// Wire payload for record updates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBillingRequest {
    pub month: Option<String>,
    pub amount: Option<Decimal>,
    pub status: Option<String>,
    pub payment_date: Option<String>,
    pub due_date: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

impl UpdateBillingRequest {
    /// Normalize the payload against the stored record.
    ///
    /// A `month` equal to the stored one is dropped; a different `month`
    /// is rejected. An empty `payment_date` keeps the stored value (it
    /// cannot be cleared); an empty `due_date` or text field clears it.
    pub fn into_command(self, stored_month: &str) -> Result<UpdateBillingRecord, AppError> {
        if let Some(month) = &self.month {
            if month != stored_month {
                return Err(field_validation_error("month", "immutable"));
            }
        }
        if let Some(amount) = self.amount {
            if amount < Decimal::ZERO {
                return Err(field_validation_error("amount", "non_negative"));
            }
        }
        let status = match self.status.as_deref() {
            None => None,
            Some(s) => Some(
                BillingStatus::from_string(s)
                    .ok_or_else(|| field_validation_error("status", "unknown_status"))?,
            ),
        };
        // payment_date is non-nullable, so "" means "retain".
        let payment_date = match self.payment_date.as_deref() {
            None | Some("") => None,
            Some(s) => Some(parse_date("payment_date", s)?),
        };
        let due_date = match self.due_date.as_deref() {
            None => None,
            Some("") => Some(None),
            Some(s) => Some(Some(parse_date("due_date", s)?)),
        };
        Ok(UpdateBillingRecord {
            amount: self.amount,
            status,
            payment_date,
            due_date,
            payment_method: self.payment_method.map(|v| normalize_text(Some(v))),
            notes: self.notes.map(|v| normalize_text(Some(v))),
        })
    }
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_optional_date(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<NaiveDate>, AppError> {
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => parse_date(field, s).map(Some),
    }
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, AppError> {
    value
        .parse::<NaiveDate>()
        .map_err(|_| field_validation_error(field, "date_format"))
}

/// Single-field validation failure as the shared `AppError` kind.
pub fn field_validation_error(field: &'static str, code: &'static str) -> AppError {
    let mut errors = validator::ValidationErrors::new();
    errors.add(field, validator::ValidationError::new(code));
    AppError::ValidationError(errors)
}
