use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn appointment_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(book_slot))
        .route("/{id}", get(get_appointment))
        .route("/{id}/meet-link", put(set_meet_link))
        .route("/{id}/feedback", put(submit_feedback))
        .route("/doctor/{doctor_id}", get(list_by_doctor))
        .route("/doctor/{doctor_id}/today", get(list_today_by_doctor))
        .route("/doctor/{doctor_id}/past", get(list_past_by_doctor))
        .route("/patient/{patient_id}/past", get(list_past_by_patient))
        .route("/patient/{patient_id}/upcoming", get(list_upcoming_by_patient))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
