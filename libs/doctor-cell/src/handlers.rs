use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CreateDoctorRequest, GetSlotsRequest, UpdateDoctorRequest};
use crate::services::{DoctorService, ScheduleService};

#[axum::debug_handler]
pub async fn list_doctors(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&config);

    let doctors = service
        .list_doctors(auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&config);

    let doctor = service
        .create_doctor(request, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&config);

    let doctor = service
        .get_doctor(doctor_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&config);

    let doctor = service
        .update_doctor(doctor_id, request, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(doctor)))
}

/// Returns the slot set for a date, creating it from the daily template on
/// first access.
#[axum::debug_handler]
pub async fn get_slots(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<GetSlotsRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&config);

    let schedule = service
        .get_or_create_date_schedule(doctor_id, &request.date, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(schedule)))
}
