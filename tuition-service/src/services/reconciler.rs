//! Monthly reconciliation: ensure every eligible active student has
//! exactly one billing record for a target month.
//!
//! The run is idempotent and tolerant of partial failure. Students are
//! processed sequentially; the only serialization against concurrent
//! runs is the storage uniqueness constraint on (student, month), whose
//! violation is absorbed as a benign no-op.

use std::sync::Arc;

use rust_decimal::Decimal;
use service_core::error::AppError;
use tracing::{debug, error, info, instrument};

use crate::models::{CreateBillingRecord, MonthKey, Student};

use super::metrics::{
    record_error, record_race_absorbed, record_reconciliation_run, record_record_created,
};
use super::store::{LedgerStore, RosterStore};

/// Per-run counters, returned for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub examined: usize,
    pub created: usize,
    pub skipped_existing: usize,
    pub skipped_ineligible: usize,
    pub races_absorbed: usize,
    pub failed: usize,
}

enum StudentOutcome {
    Created,
    Existing,
    Ineligible,
    RaceAbsorbed,
}

#[derive(Clone)]
pub struct Reconciler {
    ledger: Arc<dyn LedgerStore>,
    roster: Arc<dyn RosterStore>,
}

impl Reconciler {
    pub fn new(ledger: Arc<dyn LedgerStore>, roster: Arc<dyn RosterStore>) -> Self {
        Self { ledger, roster }
    }

    /// Ensure one billing record per eligible student for `month`.
    ///
    /// Callers validate the month key before invoking. Existing records
    /// are never touched, even when amount or status disagree with what
    /// a fresh run would produce. A failing student is logged and
    /// skipped; the batch continues.
    #[instrument(skip(self), fields(month = %month))]
    pub async fn ensure_monthly_records(
        &self,
        month: &MonthKey,
    ) -> Result<ReconcileOutcome, AppError> {
        record_reconciliation_run(&month.to_string());

        let students = self.roster.list_active_students().await?;
        let mut outcome = ReconcileOutcome::default();

        for student in &students {
            outcome.examined += 1;
            match self.reconcile_student(student, month).await {
                Ok(StudentOutcome::Created) => outcome.created += 1,
                Ok(StudentOutcome::Existing) => outcome.skipped_existing += 1,
                Ok(StudentOutcome::Ineligible) => outcome.skipped_ineligible += 1,
                Ok(StudentOutcome::RaceAbsorbed) => outcome.races_absorbed += 1,
                Err(e) => {
                    outcome.failed += 1;
                    record_error("storage", "reconcile_student");
                    error!(
                        student_id = %student.student_id,
                        month = %month,
                        error = %e,
                        "Failed to reconcile student, skipping"
                    );
                }
            }
        }

        info!(
            month = %month,
            examined = outcome.examined,
            created = outcome.created,
            skipped_existing = outcome.skipped_existing,
            races_absorbed = outcome.races_absorbed,
            failed = outcome.failed,
            "Monthly reconciliation finished"
        );

        Ok(outcome)
    }

    async fn reconcile_student(
        &self,
        student: &Student,
        month: &MonthKey,
    ) -> Result<StudentOutcome, AppError> {
        let Some(group_id) = student.group_id else {
            return Ok(StudentOutcome::Ineligible);
        };
        let Some(group) = self.roster.get_group(group_id).await? else {
            return Ok(StudentOutcome::Ineligible);
        };
        let Some(course_id) = group.course_id else {
            return Ok(StudentOutcome::Ineligible);
        };
        let Some(course) = self.roster.get_course(course_id).await? else {
            return Ok(StudentOutcome::Ineligible);
        };
        if course.price <= Decimal::ZERO {
            return Ok(StudentOutcome::Ineligible);
        }

        if self
            .ledger
            .find_by_student_and_month(student.student_id, month)
            .await?
            .is_some()
        {
            return Ok(StudentOutcome::Existing);
        }

        // Reconciliation always charges the full course price; proration
        // is an enrollment-time concern handled by other call sites.
        let input = CreateBillingRecord {
            student_id: student.student_id,
            course_id: Some(course_id),
            month: month.clone(),
            amount: course.price,
            payment_date: Some(month.first_day()),
            due_date: Some(month.last_day()),
            payment_method: None,
            notes: None,
        };

        match self.ledger.create(&input).await {
            Ok(_) => {
                record_record_created("reconciler");
                Ok(StudentOutcome::Created)
            }
            Err(AppError::Conflict(_)) => {
                // A concurrent run won the race for this student; the
                // record exists, which is all this run needs.
                debug!(
                    student_id = %student.student_id,
                    month = %month,
                    "Duplicate billing record absorbed"
                );
                record_race_absorbed(&month.to_string());
                Ok(StudentOutcome::RaceAbsorbed)
            }
            Err(e) => Err(e),
        }
    }
}
