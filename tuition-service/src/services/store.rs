//! Storage ports for the billing ledger.
//!
//! Components take these traits at construction instead of a shared
//! database handle, so tests substitute in-memory fakes and production
//! wires the Postgres adapter. The ledger port's create carries the one
//! hard invariant: at most one record per (student, month), surfaced as
//! `AppError::Conflict` on violation.

use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    BillingRecord, Course, CreateBillingRecord, Group, ListBillingFilter, MarkPaid, MonthKey,
    ScheduleEntry, Student, UpdateBillingRecord,
};

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_by_student_and_month(
        &self,
        student_id: Uuid,
        month: &MonthKey,
    ) -> Result<Option<BillingRecord>, AppError>;

    async fn get(&self, record_id: Uuid) -> Result<Option<BillingRecord>, AppError>;

    /// Fails with `AppError::Conflict` when a record for the same
    /// (student, month) already exists.
    async fn create(&self, input: &CreateBillingRecord) -> Result<BillingRecord, AppError>;

    /// Applies a validated update. `month` and `student_id` are not part
    /// of the command and therefore cannot change here.
    async fn update(
        &self,
        record_id: Uuid,
        input: &UpdateBillingRecord,
    ) -> Result<Option<BillingRecord>, AppError>;

    /// Transition to paid, stamping the current day as `payment_date`.
    async fn mark_paid(
        &self,
        record_id: Uuid,
        input: &MarkPaid,
    ) -> Result<Option<BillingRecord>, AppError>;

    /// Returns whether a record was removed.
    async fn delete(&self, record_id: Uuid) -> Result<bool, AppError>;

    async fn list(&self, filter: &ListBillingFilter) -> Result<Vec<BillingRecord>, AppError>;
}

#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn list_active_students(&self) -> Result<Vec<Student>, AppError>;

    async fn get_student(&self, student_id: Uuid) -> Result<Option<Student>, AppError>;

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, AppError>;

    async fn get_group(&self, group_id: Uuid) -> Result<Option<Group>, AppError>;

    async fn get_course(&self, course_id: Uuid) -> Result<Option<Course>, AppError>;

    async fn list_group_schedule(&self, group_id: Uuid)
        -> Result<Vec<ScheduleEntry>, AppError>;
}
