// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentDraft, AppointmentError, AppointmentPatch, AvailabilityResponse,
    QueryFilters, ServiceInfo, ServiceType, Slot,
};
use crate::services::query;
use crate::services::validation::fixed_offset;
use crate::state::AppointmentState;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub date: String,
    pub service: Option<String>,
    pub tz_offset: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsQuery {
    pub date: String,
    pub tz_offset: Option<i32>,
}

/// Malformed bodies and query strings get the same `{"error", "field"}`
/// shape as every other validation failure.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppointmentError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppointmentError::validation("body", rejection.body_text()))
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppointmentError> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| AppointmentError::validation("query", rejection.body_text()))
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppointmentError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppointmentError::validation("date", format!("'{}' is not a YYYY-MM-DD date", raw))
    })
}

fn parse_offset(raw: Option<i32>) -> Result<i32, AppointmentError> {
    let offset = raw.unwrap_or(0);
    fixed_offset(offset)?;
    Ok(offset)
}

// ==============================================================================
// LISTING & LOOKUP HANDLERS
// ==============================================================================

pub async fn list_appointments(
    State(state): State<Arc<AppointmentState>>,
) -> Json<Vec<Appointment>> {
    Json(state.repository.list().await)
}

pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.repository.get(appointment_id).await?))
}

/// Filtered list for the dashboard table, newest first.
pub async fn search_appointments(
    State(state): State<Arc<AppointmentState>>,
    filters: Result<Query<QueryFilters>, QueryRejection>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let filters = query_params(filters)?;
    fixed_offset(filters.tz_offset)?;
    debug!("Searching appointments with {:?}", filters);

    let snapshot = state.repository.snapshot().await;
    Ok(Json(query::query_now(&snapshot.appointments, &filters)))
}

pub async fn list_services() -> Json<Vec<ServiceInfo>> {
    Json(
        ServiceType::ALL
            .iter()
            .map(|service| ServiceInfo {
                key: *service,
                duration_minutes: service.duration_minutes(),
            })
            .collect(),
    )
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

pub async fn get_availability(
    State(state): State<Arc<AppointmentState>>,
    params: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let params = query_params(params)?;
    let date = parse_date(&params.date)?;
    let tz_offset = parse_offset(params.tz_offset)?;
    let service = params
        .service
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.parse::<ServiceType>()
                .map_err(|e| AppointmentError::validation("service", e))
        })
        .transpose()?;

    let response = state
        .resolver
        .availability(date, &state.window, service, tz_offset)
        .await;

    Ok(Json(response))
}

pub async fn get_slots(
    State(state): State<Arc<AppointmentState>>,
    params: Result<Query<SlotsQuery>, QueryRejection>,
) -> Result<Json<Vec<Slot>>, AppError> {
    let params = query_params(params)?;
    let date = parse_date(&params.date)?;
    let tz_offset = parse_offset(params.tz_offset)?;

    Ok(Json(state.resolver.resolve(date, &state.window, tz_offset).await))
}

// ==============================================================================
// MUTATION HANDLERS
// ==============================================================================

pub async fn create_appointment(
    State(state): State<Arc<AppointmentState>>,
    draft: Result<Json<AppointmentDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let appointment = state.repository.create(json_body(draft)?).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn update_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    patch: Result<Json<AppointmentPatch>, JsonRejection>,
) -> Result<Json<Appointment>, AppError> {
    let patch = json_body(patch)?;
    Ok(Json(state.repository.update(appointment_id, patch).await?))
}

pub async fn delete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.repository.delete(appointment_id).await?;

    Ok(Json(json!({
        "message": "Appointment deleted successfully"
    })))
}
