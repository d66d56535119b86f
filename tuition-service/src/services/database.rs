//! Database service for tuition-service.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    BillingRecord, BillingStatus, Course, CreateBillingRecord, Group, ListBillingFilter, MarkPaid,
    MonthKey, ScheduleEntry, Student, UpdateBillingRecord,
};

use super::metrics::DB_QUERY_DURATION;
use super::store::{LedgerStore, RosterStore};

const RECORD_COLUMNS: &str = "record_id, student_id, course_id, month, amount, status, payment_date, due_date, payment_method, notes, created_utc, updated_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "tuition-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for Database {
    #[instrument(skip(self), fields(student_id = %student_id, month = %month))]
    async fn find_by_student_and_month(
        &self,
        student_id: Uuid,
        month: &MonthKey,
    ) -> Result<Option<BillingRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_by_student_and_month"])
            .start_timer();

        let record = sqlx::query_as::<_, BillingRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM billing_records WHERE student_id = $1 AND month = $2"
        ))
        .bind(student_id)
        .bind(month.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to find billing record: {}", e)))?;

        timer.observe_duration();

        Ok(record)
    }

    #[instrument(skip(self), fields(record_id = %record_id))]
    async fn get(&self, record_id: Uuid) -> Result<Option<BillingRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_billing_record"])
            .start_timer();

        let record = sqlx::query_as::<_, BillingRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM billing_records WHERE record_id = $1"
        ))
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to get billing record: {}", e)))?;

        timer.observe_duration();

        Ok(record)
    }

    #[instrument(skip(self, input), fields(student_id = %input.student_id, month = %input.month))]
    async fn create(&self, input: &CreateBillingRecord) -> Result<BillingRecord, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_billing_record"])
            .start_timer();

        let record_id = Uuid::new_v4();
        let payment_date = input
            .payment_date
            .unwrap_or_else(|| input.month.first_day());

        let record = sqlx::query_as::<_, BillingRecord>(&format!(
            r#"
            INSERT INTO billing_records (record_id, student_id, course_id, month, amount, status, payment_date, due_date, payment_method, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(record_id)
        .bind(input.student_id)
        .bind(input.course_id)
        .bind(input.month.to_string())
        .bind(input.amount)
        .bind(BillingStatus::Pending.as_str())
        .bind(payment_date)
        .bind(input.due_date)
        .bind(&input.payment_method)
        .bind(&input.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                // Another creator holds (student, month); recognized
                // structurally, never by driver message text.
                AppError::Conflict(anyhow!("Billing record already exists for this month"))
            }
            _ => AppError::DatabaseError(anyhow!("Failed to create billing record: {}", e)),
        })?;

        timer.observe_duration();
        info!(record_id = %record.record_id, month = %record.month, "Billing record created");

        Ok(record)
    }

    #[instrument(skip(self, input), fields(record_id = %record_id))]
    async fn update(
        &self,
        record_id: Uuid,
        input: &UpdateBillingRecord,
    ) -> Result<Option<BillingRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_billing_record"])
            .start_timer();

        let Some(mut record) = LedgerStore::get(self, record_id).await? else {
            timer.observe_duration();
            return Ok(None);
        };
        record.apply_update(input, Utc::now());

        let record = sqlx::query_as::<_, BillingRecord>(&format!(
            r#"
            UPDATE billing_records
            SET amount = $2, status = $3, payment_date = $4, due_date = $5, payment_method = $6, notes = $7, updated_utc = $8
            WHERE record_id = $1
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(record_id)
        .bind(record.amount)
        .bind(&record.status)
        .bind(record.payment_date)
        .bind(record.due_date)
        .bind(&record.payment_method)
        .bind(&record.notes)
        .bind(record.updated_utc)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to update billing record: {}", e)))?;

        timer.observe_duration();

        Ok(record)
    }

    #[instrument(skip(self, input), fields(record_id = %record_id))]
    async fn mark_paid(
        &self,
        record_id: Uuid,
        input: &MarkPaid,
    ) -> Result<Option<BillingRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_paid"])
            .start_timer();

        let record = sqlx::query_as::<_, BillingRecord>(&format!(
            r#"
            UPDATE billing_records
            SET status = $2, payment_date = $3,
                payment_method = COALESCE($4, payment_method),
                notes = COALESCE($5, notes),
                updated_utc = $6
            WHERE record_id = $1
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(record_id)
        .bind(BillingStatus::Paid.as_str())
        .bind(Utc::now().date_naive())
        .bind(&input.payment_method)
        .bind(&input.notes)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to mark record paid: {}", e)))?;

        timer.observe_duration();

        if let Some(ref r) = record {
            info!(record_id = %r.record_id, month = %r.month, "Billing record marked paid");
        }

        Ok(record)
    }

    #[instrument(skip(self), fields(record_id = %record_id))]
    async fn delete(&self, record_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_billing_record"])
            .start_timer();

        let result = sqlx::query("DELETE FROM billing_records WHERE record_id = $1")
            .bind(record_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow!("Failed to delete billing record: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, filter))]
    async fn list(&self, filter: &ListBillingFilter) -> Result<Vec<BillingRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_billing_records"])
            .start_timer();

        let status = filter.status.map(|s| s.as_str().to_string());
        let month = filter.month.as_ref().map(|m| m.to_string());

        let records = sqlx::query_as::<_, BillingRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM billing_records
            WHERE ($1::uuid IS NULL OR student_id = $1)
              AND ($2::uuid IS NULL OR course_id = $2)
              AND ($3::varchar IS NULL OR status = $3)
              AND ($4::varchar IS NULL OR month = $4)
            ORDER BY month, created_utc
            "#
        ))
        .bind(filter.student_id)
        .bind(filter.course_id)
        .bind(&status)
        .bind(&month)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to list billing records: {}", e)))?;

        timer.observe_duration();

        Ok(records)
    }
}

#[async_trait]
impl RosterStore for Database {
    #[instrument(skip(self))]
    async fn list_active_students(&self) -> Result<Vec<Student>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_active_students"])
            .start_timer();

        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT student_id, first_name, last_name, email, is_active, group_id, enrolled_date, created_utc
            FROM students
            WHERE is_active = TRUE
            ORDER BY last_name, first_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to list active students: {}", e)))?;

        timer.observe_duration();

        Ok(students)
    }

    #[instrument(skip(self), fields(student_id = %student_id))]
    async fn get_student(&self, student_id: Uuid) -> Result<Option<Student>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_student"])
            .start_timer();

        let student = sqlx::query_as::<_, Student>(
            r#"
            SELECT student_id, first_name, last_name, email, is_active, group_id, enrolled_date, created_utc
            FROM students
            WHERE student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to get student: {}", e)))?;

        timer.observe_duration();

        Ok(student)
    }

    #[instrument(skip(self))]
    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_student_by_email"])
            .start_timer();

        let student = sqlx::query_as::<_, Student>(
            r#"
            SELECT student_id, first_name, last_name, email, is_active, group_id, enrolled_date, created_utc
            FROM students
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to find student by email: {}", e)))?;

        timer.observe_duration();

        Ok(student)
    }

    #[instrument(skip(self), fields(group_id = %group_id))]
    async fn get_group(&self, group_id: Uuid) -> Result<Option<Group>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_group"])
            .start_timer();

        let group = sqlx::query_as::<_, Group>(
            "SELECT group_id, name, course_id FROM study_groups WHERE group_id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to get group: {}", e)))?;

        timer.observe_duration();

        Ok(group)
    }

    #[instrument(skip(self), fields(course_id = %course_id))]
    async fn get_course(&self, course_id: Uuid) -> Result<Option<Course>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_course"])
            .start_timer();

        let course = sqlx::query_as::<_, Course>(
            "SELECT course_id, name, price FROM courses WHERE course_id = $1",
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to get course: {}", e)))?;

        timer.observe_duration();

        Ok(course)
    }

    #[instrument(skip(self), fields(group_id = %group_id))]
    async fn list_group_schedule(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<ScheduleEntry>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_group_schedule"])
            .start_timer();

        let entries = sqlx::query_as::<_, ScheduleEntry>(
            r#"
            SELECT entry_id, group_id, weekday, start_time, end_time
            FROM group_schedule
            WHERE group_id = $1
            ORDER BY start_time
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to list group schedule: {}", e)))?;

        timer.observe_duration();

        Ok(entries)
    }
}
