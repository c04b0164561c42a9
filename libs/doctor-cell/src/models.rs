use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

/// The fixed daily template: every schedule gets exactly these three slots
/// at creation time and never gains or loses one afterwards.
pub const DAILY_SLOT_TIMES: [&str; 3] = ["09:00:00", "12:00:00", "15:00:00"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub specialization: String,
    pub fees_per_session: f64,
}

/// One doctor's slot set for one calendar date. `date` is an opaque string
/// key, unique per doctor; rows are created lazily and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateSchedule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: String,
}

/// A bookable time-of-day unit. `is_booked` defaults to false and, once
/// set, never reverts (there is no cancellation path).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub date_schedule_id: Uuid,
    pub time: String,
    #[serde(default)]
    pub is_booked: bool,
}

/// What the schedule endpoint hands back: the schedule row joined with its
/// slots, ordered by time of day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateScheduleWithSlots {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: String,
    pub slots: Vec<Slot>,
}

impl DateScheduleWithSlots {
    pub fn from_parts(schedule: DateSchedule, slots: Vec<Slot>) -> Self {
        Self {
            id: schedule.id,
            doctor_id: schedule.doctor_id,
            date: schedule.date,
            slots,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub specialization: String,
    pub fees_per_session: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub specialization: Option<String>,
    pub fees_per_session: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSlotsRequest {
    pub date: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
            DoctorError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
