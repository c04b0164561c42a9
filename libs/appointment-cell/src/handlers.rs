use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{BookSlotRequest, SetMeetLinkRequest, SubmitFeedbackRequest};
use crate::services::{BookingService, LedgerService};

#[axum::debug_handler]
pub async fn book_slot(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Booking request from user {}", user.id);
    let service = BookingService::new(&config);

    let appointment = service
        .book_slot(request, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = LedgerService::new(&config);

    let appointment = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_by_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = LedgerService::new(&config);

    let appointments = service
        .list_by_doctor(doctor_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn list_today_by_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = LedgerService::new(&config);

    let appointments = service
        .list_today_by_doctor(doctor_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn list_past_by_doctor(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = LedgerService::new(&config);

    let appointments = service
        .list_past_by_doctor(doctor_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn list_past_by_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = LedgerService::new(&config);

    let appointments = service
        .list_past_by_patient(&patient_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn list_upcoming_by_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = LedgerService::new(&config);

    let appointments = service
        .list_upcoming_by_patient(&patient_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn set_meet_link(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<SetMeetLinkRequest>,
) -> Result<Json<Value>, AppError> {
    let service = LedgerService::new(&config);

    let appointment = service
        .set_meet_link(appointment_id, &request.meet_link, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn submit_feedback(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<SubmitFeedbackRequest>,
) -> Result<Json<Value>, AppError> {
    let service = LedgerService::new(&config);

    let appointment = service
        .submit_feedback(
            appointment_id,
            request.stars,
            &request.title,
            &request.review,
            auth.token(),
        )
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(appointment)))
}
