//! HTTP handlers for the billing ledger.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    field_validation_error, CallerIdentity, CreateBillingRequest, ListBillingFilter, MarkPaid,
    MonthKey, UpdateBillingRequest,
};
use crate::services::LedgerService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LedgerService>,
}

/// Query parameters for month-scoped listing and stats.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub month: Option<String>,
    pub student_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub status: Option<String>,
}

impl ListParams {
    /// A month is mandatory: every read is scoped to one billing period.
    fn required_month(&self) -> Result<MonthKey, AppError> {
        match self.month.as_deref() {
            None | Some("") => Err(field_validation_error("month", "required")),
            Some(raw) => {
                MonthKey::parse(raw).map_err(|_| field_validation_error("month", "month_format"))
            }
        }
    }

    fn into_filter(self) -> Result<ListBillingFilter, AppError> {
        Ok(ListBillingFilter {
            student_id: self.student_id,
            course_id: self.course_id,
            status: LedgerService::parse_status_filter(self.status.as_deref())?,
            month: None,
        })
    }
}

/// GET /billing?month=YYYY-MM
pub async fn list_records(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let month = params.required_month()?;
    let filter = params.into_filter()?;
    let records = state.service.list_month(month, filter, &caller).await?;
    Ok(Json(records))
}

/// GET /billing/month/{month}
pub async fn list_month_records(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(month): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let month =
        MonthKey::parse(&month).map_err(|_| field_validation_error("month", "month_format"))?;
    // A month query parameter that contradicts the path is rejected
    // rather than silently ignored.
    if let Some(raw) = params.month.as_deref() {
        if MonthKey::parse(raw).ok().as_ref() != Some(&month) {
            return Err(field_validation_error("month", "conflicting_values"));
        }
    }
    let filter = params.into_filter()?;
    let records = state.service.list_month(month, filter, &caller).await?;
    Ok(Json(records))
}

/// GET /billing/stats?month=YYYY-MM
pub async fn get_stats(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let month = params.required_month()?;
    let filter = params.into_filter()?;
    let stats = state.service.stats(month, filter, &caller).await?;
    Ok(Json(stats))
}

/// GET /billing/{id}
pub async fn get_record(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(record_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.service.get(record_id, &caller).await?;
    Ok(Json(detail))
}

/// POST /billing
pub async fn create_record(
    State(state): State<AppState>,
    Json(payload): Json<CreateBillingRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let input = payload.into_command()?;
    let record = state.service.create(input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /billing/{id}
pub async fn update_record(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
    Json(payload): Json<UpdateBillingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.service.update(record_id, payload).await?;
    Ok(Json(record))
}

/// POST /billing/{id}/pay
pub async fn mark_record_paid(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
    payload: Option<Json<MarkPaid>>,
) -> Result<impl IntoResponse, AppError> {
    let input = payload.map(|Json(p)| p).unwrap_or_default();
    let record = state.service.mark_paid(record_id, input).await?;
    Ok(Json(record))
}

/// DELETE /billing/{id}
pub async fn delete_record(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.service.delete(record_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
