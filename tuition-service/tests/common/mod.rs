//! Shared in-memory fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{NaiveDate, NaiveTime, Utc};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use service_core::error::AppError;
use tower::ServiceExt;
use uuid::Uuid;

use tuition_service::models::{
    BillingRecord, BillingStatus, Course, CreateBillingRecord, Group, ListBillingFilter, MarkPaid,
    MonthKey, ScheduleEntry, Student, UpdateBillingRecord,
};
use tuition_service::services::{LedgerService, LedgerStore, RosterStore};
use tuition_service::startup::api_router;

/// In-memory ledger store enforcing the (student, month) uniqueness
/// constraint the same way the database does.
#[derive(Default)]
pub struct MemoryLedgerStore {
    records: Mutex<HashMap<Uuid, BillingRecord>>,
    /// Students whose creation should fail with a storage error, for
    /// partial-failure tests.
    fail_for: Mutex<HashSet<Uuid>>,
    /// Students hidden from the existence pre-check so that creation
    /// runs into the uniqueness constraint, simulating a lost race.
    hide_from_find: Mutex<HashSet<Uuid>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_creates_for(&self, student_id: Uuid) {
        self.fail_for.lock().unwrap().insert(student_id);
    }

    pub fn hide_from_find(&self, student_id: Uuid) {
        self.hide_from_find.lock().unwrap().insert(student_id);
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn all_records(&self) -> Vec<BillingRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn find_by_student_and_month(
        &self,
        student_id: Uuid,
        month: &MonthKey,
    ) -> Result<Option<BillingRecord>, AppError> {
        if self.hide_from_find.lock().unwrap().contains(&student_id) {
            return Ok(None);
        }
        let month = month.to_string();
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| r.student_id == student_id && r.month == month)
            .cloned())
    }

    async fn get(&self, record_id: Uuid) -> Result<Option<BillingRecord>, AppError> {
        Ok(self.records.lock().unwrap().get(&record_id).cloned())
    }

    async fn create(&self, input: &CreateBillingRecord) -> Result<BillingRecord, AppError> {
        if self.fail_for.lock().unwrap().contains(&input.student_id) {
            return Err(AppError::DatabaseError(anyhow!("simulated storage outage")));
        }

        let mut records = self.records.lock().unwrap();
        let month = input.month.to_string();
        if records
            .values()
            .any(|r| r.student_id == input.student_id && r.month == month)
        {
            return Err(AppError::Conflict(anyhow!(
                "Billing record already exists for this month"
            )));
        }

        let now = Utc::now();
        let record = BillingRecord {
            record_id: Uuid::new_v4(),
            student_id: input.student_id,
            course_id: input.course_id,
            month,
            amount: input.amount,
            status: BillingStatus::Pending.as_str().to_string(),
            payment_date: input.payment_date.unwrap_or_else(|| input.month.first_day()),
            due_date: input.due_date,
            payment_method: input.payment_method.clone(),
            notes: input.notes.clone(),
            created_utc: now,
            updated_utc: now,
        };
        records.insert(record.record_id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        record_id: Uuid,
        input: &UpdateBillingRecord,
    ) -> Result<Option<BillingRecord>, AppError> {
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.get_mut(&record_id) else {
            return Ok(None);
        };
        record.apply_update(input, Utc::now());
        Ok(Some(record.clone()))
    }

    async fn mark_paid(
        &self,
        record_id: Uuid,
        input: &MarkPaid,
    ) -> Result<Option<BillingRecord>, AppError> {
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.get_mut(&record_id) else {
            return Ok(None);
        };
        record.status = BillingStatus::Paid.as_str().to_string();
        record.payment_date = Utc::now().date_naive();
        if let Some(method) = &input.payment_method {
            record.payment_method = Some(method.clone());
        }
        if let Some(notes) = &input.notes {
            record.notes = Some(notes.clone());
        }
        record.updated_utc = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn delete(&self, record_id: Uuid) -> Result<bool, AppError> {
        Ok(self.records.lock().unwrap().remove(&record_id).is_some())
    }

    async fn list(&self, filter: &ListBillingFilter) -> Result<Vec<BillingRecord>, AppError> {
        let month = filter.month.as_ref().map(|m| m.to_string());
        let status = filter.status.map(|s| s.as_str().to_string());
        let mut records: Vec<BillingRecord> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| filter.student_id.map_or(true, |id| r.student_id == id))
            .filter(|r| filter.course_id.map_or(true, |id| r.course_id == Some(id)))
            .filter(|r| status.as_ref().map_or(true, |s| &r.status == s))
            .filter(|r| month.as_ref().map_or(true, |m| &r.month == m))
            .cloned()
            .collect();
        records.sort_by(|a, b| (a.month.clone(), a.created_utc).cmp(&(b.month.clone(), b.created_utc)));
        Ok(records)
    }
}

/// In-memory roster with fixture builders.
#[derive(Default)]
pub struct MemoryRosterStore {
    students: Mutex<HashMap<Uuid, Student>>,
    groups: Mutex<HashMap<Uuid, Group>>,
    courses: Mutex<HashMap<Uuid, Course>>,
    schedules: Mutex<HashMap<Uuid, Vec<ScheduleEntry>>>,
}

impl MemoryRosterStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_course(&self, name: &str, price: Decimal) -> Uuid {
        let course_id = Uuid::new_v4();
        self.courses.lock().unwrap().insert(
            course_id,
            Course {
                course_id,
                name: name.to_string(),
                price,
            },
        );
        course_id
    }

    pub fn add_group(&self, name: &str, course_id: Option<Uuid>) -> Uuid {
        let group_id = Uuid::new_v4();
        self.groups.lock().unwrap().insert(
            group_id,
            Group {
                group_id,
                name: name.to_string(),
                course_id,
            },
        );
        group_id
    }

    pub fn add_student(
        &self,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
        group_id: Option<Uuid>,
    ) -> Uuid {
        let student_id = Uuid::new_v4();
        self.students.lock().unwrap().insert(
            student_id,
            Student {
                student_id,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.map(|e| e.to_string()),
                is_active: true,
                group_id,
                enrolled_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                created_utc: Utc::now(),
            },
        );
        student_id
    }

    pub fn deactivate_student(&self, student_id: Uuid) {
        if let Some(student) = self.students.lock().unwrap().get_mut(&student_id) {
            student.is_active = false;
        }
    }

    pub fn set_schedule(&self, group_id: Uuid, weekdays: &[&str]) {
        let entries = weekdays
            .iter()
            .map(|weekday| ScheduleEntry {
                entry_id: Uuid::new_v4(),
                group_id,
                weekday: weekday.to_string(),
                start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(11, 30, 0).unwrap(),
            })
            .collect();
        self.schedules.lock().unwrap().insert(group_id, entries);
    }
}

#[async_trait]
impl RosterStore for MemoryRosterStore {
    async fn list_active_students(&self) -> Result<Vec<Student>, AppError> {
        let mut students: Vec<Student> = self
            .students
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.is_active)
            .cloned()
            .collect();
        students.sort_by(|a, b| {
            (a.last_name.clone(), a.first_name.clone())
                .cmp(&(b.last_name.clone(), b.first_name.clone()))
        });
        Ok(students)
    }

    async fn get_student(&self, student_id: Uuid) -> Result<Option<Student>, AppError> {
        Ok(self.students.lock().unwrap().get(&student_id).cloned())
    }

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, AppError> {
        Ok(self
            .students
            .lock()
            .unwrap()
            .values()
            .find(|s| {
                s.email
                    .as_deref()
                    .map_or(false, |e| e.eq_ignore_ascii_case(email))
            })
            .cloned())
    }

    async fn get_group(&self, group_id: Uuid) -> Result<Option<Group>, AppError> {
        Ok(self.groups.lock().unwrap().get(&group_id).cloned())
    }

    async fn get_course(&self, course_id: Uuid) -> Result<Option<Course>, AppError> {
        Ok(self.courses.lock().unwrap().get(&course_id).cloned())
    }

    async fn list_group_schedule(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<ScheduleEntry>, AppError> {
        Ok(self
            .schedules
            .lock()
            .unwrap()
            .get(&group_id)
            .cloned()
            .unwrap_or_default())
    }
}

pub fn test_service(
    ledger: Arc<MemoryLedgerStore>,
    roster: Arc<MemoryRosterStore>,
) -> Arc<LedgerService> {
    let ledger: Arc<dyn LedgerStore> = ledger;
    let roster: Arc<dyn RosterStore> = roster;
    Arc::new(LedgerService::new(ledger, roster))
}

pub fn test_router(service: Arc<LedgerService>) -> Router {
    api_router(service)
}

/// Send a request through the router and decode the JSON body.
pub async fn send_request(
    router: &Router,
    request: Request<Body>,
) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should not fail");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body should be JSON")
    };
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn get_as(uri: &str, role: &str, email: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-caller-role", role);
    if let Some(email) = email {
        builder = builder.header("x-caller-email", email);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
