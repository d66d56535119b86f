//! Month-scoped ledger operations: reconcile-then-read queries, role
//! visibility, direct administrative mutations and aggregate stats.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;

use crate::models::{
    field_validation_error, BillingRecord, BillingRecordDetail, BillingStats, CallerIdentity,
    CreateBillingRecord, ListBillingFilter, MarkPaid, MonthKey, Student, UpdateBillingRequest,
};

use super::metrics::record_record_created;
use super::reconciler::Reconciler;
use super::store::{LedgerStore, RosterStore};

/// How a self-service caller maps onto the roster.
enum CallerScope {
    /// Staff roles see every record the filter matches.
    All,
    /// Student role, correlated to a roster entry by email.
    OwnRecords(Uuid),
    /// Student role with no matching roster entry: empty results, not an
    /// error.
    Nothing,
}

#[derive(Clone)]
pub struct LedgerService {
    ledger: Arc<dyn LedgerStore>,
    roster: Arc<dyn RosterStore>,
    reconciler: Reconciler,
}

impl LedgerService {
    pub fn new(ledger: Arc<dyn LedgerStore>, roster: Arc<dyn RosterStore>) -> Self {
        let reconciler = Reconciler::new(ledger.clone(), roster.clone());
        Self {
            ledger,
            roster,
            reconciler,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Month-scoped listing. Reconciles the month first so gaps are
    /// filled lazily on first access, then filters on the `month` column
    /// and orders by student surname, given name.
    #[instrument(skip(self, caller), fields(month = %month))]
    pub async fn list_month(
        &self,
        month: MonthKey,
        mut filter: ListBillingFilter,
        caller: &CallerIdentity,
    ) -> Result<Vec<BillingRecord>, AppError> {
        self.reconciler.ensure_monthly_records(&month).await?;

        filter.month = Some(month);
        match self.resolve_scope(caller).await? {
            CallerScope::All => {}
            CallerScope::OwnRecords(student_id) => filter.student_id = Some(student_id),
            CallerScope::Nothing => return Ok(Vec::new()),
        }

        let records = self.ledger.list(&filter).await?;
        self.sort_by_student_name(records).await
    }

    /// Aggregate stats for a month, over the same visibility rules as
    /// the listing.
    #[instrument(skip(self, caller), fields(month = %month))]
    pub async fn stats(
        &self,
        month: MonthKey,
        mut filter: ListBillingFilter,
        caller: &CallerIdentity,
    ) -> Result<BillingStats, AppError> {
        self.reconciler.ensure_monthly_records(&month).await?;

        filter.month = Some(month);
        match self.resolve_scope(caller).await? {
            CallerScope::All => {}
            CallerScope::OwnRecords(student_id) => filter.student_id = Some(student_id),
            CallerScope::Nothing => return Ok(BillingStats::default()),
        }

        let records = self.ledger.list(&filter).await?;
        Ok(BillingStats::from_records(&records))
    }

    /// Fetch one record with its student/course associations.
    pub async fn get(
        &self,
        record_id: Uuid,
        caller: &CallerIdentity,
    ) -> Result<BillingRecordDetail, AppError> {
        let record = self
            .ledger
            .get(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Billing record not found")))?;

        // Self-service callers only ever see their own records; anything
        // else looks like a missing record rather than a hint that it
        // exists.
        match self.resolve_scope(caller).await? {
            CallerScope::All => {}
            CallerScope::OwnRecords(student_id) if student_id == record.student_id => {}
            _ => return Err(AppError::NotFound(anyhow!("Billing record not found"))),
        }

        let student = self.roster.get_student(record.student_id).await?;
        let course = match record.course_id {
            Some(course_id) => self.roster.get_course(course_id).await?,
            None => None,
        };

        Ok(BillingRecordDetail {
            record,
            student,
            course,
        })
    }

    /// Direct administrative creation. Bypasses the reconciler; a
    /// duplicate (student, month) surfaces as `Conflict`.
    #[instrument(skip(self, input), fields(student_id = %input.student_id, month = %input.month))]
    pub async fn create(&self, mut input: CreateBillingRecord) -> Result<BillingRecord, AppError> {
        self.roster
            .get_student(input.student_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Student not found")))?;
        if let Some(course_id) = input.course_id {
            self.roster
                .get_course(course_id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow!("Course not found")))?;
        }

        if input.payment_date.is_none() {
            input.payment_date = Some(input.month.first_day());
        }

        let record = self.ledger.create(&input).await?;
        record_record_created("api");
        Ok(record)
    }

    /// Administrative update. The stored month is immutable: an equal
    /// month in the payload is dropped, a different one is rejected
    /// before anything reaches the store.
    #[instrument(skip(self, request), fields(record_id = %record_id))]
    pub async fn update(
        &self,
        record_id: Uuid,
        request: UpdateBillingRequest,
    ) -> Result<BillingRecord, AppError> {
        let stored = self
            .ledger
            .get(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Billing record not found")))?;

        let command = request.into_command(&stored.month)?;

        self.ledger
            .update(record_id, &command)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Billing record not found")))
    }

    /// Transition a record to paid, stamping the current day.
    #[instrument(skip(self, input), fields(record_id = %record_id))]
    pub async fn mark_paid(
        &self,
        record_id: Uuid,
        input: MarkPaid,
    ) -> Result<BillingRecord, AppError> {
        self.ledger
            .mark_paid(record_id, &input)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Billing record not found")))
    }

    pub async fn delete(&self, record_id: Uuid) -> Result<(), AppError> {
        if self.ledger.delete(record_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(anyhow!("Billing record not found")))
        }
    }

    /// Parse a raw status filter value, rejecting unknown statuses.
    pub fn parse_status_filter(
        raw: Option<&str>,
    ) -> Result<Option<crate::models::BillingStatus>, AppError> {
        match raw {
            None | Some("") => Ok(None),
            Some(s) => crate::models::BillingStatus::from_string(s)
                .map(Some)
                .ok_or_else(|| field_validation_error("status", "unknown_status")),
        }
    }

    async fn resolve_scope(&self, caller: &CallerIdentity) -> Result<CallerScope, AppError> {
        if !caller.is_self_service() {
            return Ok(CallerScope::All);
        }
        let Some(email) = caller.email.as_deref() else {
            return Ok(CallerScope::Nothing);
        };
        match self.roster.find_student_by_email(email).await? {
            Some(student) => Ok(CallerScope::OwnRecords(student.student_id)),
            None => Ok(CallerScope::Nothing),
        }
    }

    async fn sort_by_student_name(
        &self,
        mut records: Vec<BillingRecord>,
    ) -> Result<Vec<BillingRecord>, AppError> {
        let mut names: HashMap<Uuid, (String, String)> = HashMap::new();
        for record in &records {
            if names.contains_key(&record.student_id) {
                continue;
            }
            let name = match self.roster.get_student(record.student_id).await? {
                Some(Student {
                    first_name,
                    last_name,
                    ..
                }) => (last_name, first_name),
                None => (String::new(), String::new()),
            };
            names.insert(record.student_id, name);
        }

        records.sort_by(|a, b| {
            let empty = (String::new(), String::new());
            let left = names.get(&a.student_id).unwrap_or(&empty);
            let right = names.get(&b.student_id).unwrap_or(&empty);
            left.cmp(right).then(a.student_id.cmp(&b.student_id))
        });
        Ok(records)
    }
}
