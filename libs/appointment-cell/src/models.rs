use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

/// Feedback sub-record, embedded 1:1 in its appointment. Created empty at
/// booking time; a submission overwrites all four fields together and a
/// re-submission silently overwrites the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// false until the patient files feedback.
    #[serde(default)]
    pub given: bool,
    /// Star rating, 0-5 inclusive.
    #[serde(default)]
    pub stars: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub review: String,
}

/// Durable record of a successful slot claim.
///
/// `date`, `slot_time`, `doctor_name`, `doctor_email` and `patient_name`
/// are snapshots taken at booking time; later edits to the doctor or
/// patient profile never rewrite them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date_id: Uuid,
    pub slot_id: Uuid,
    pub patient_id: String,
    pub date: String,
    pub slot_time: String,
    pub doctor_name: String,
    pub doctor_email: String,
    pub patient_name: String,
    #[serde(default)]
    pub meet_link: String,
    #[serde(default)]
    pub feedback: Feedback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub doctor_id: Uuid,
    pub date_id: Uuid,
    pub slot_id: Uuid,
    pub patient_id: String,
    pub patient_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetMeetLinkRequest {
    pub meet_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitFeedbackRequest {
    pub stars: i32,
    pub title: String,
    pub review: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Date not found")]
    DateNotFound,

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Appointment not found")]
    NotFound,

    #[error("Slot is already booked")]
    AlreadyBooked,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
            AppointmentError::DateNotFound => AppError::NotFound("Date not found".to_string()),
            AppointmentError::SlotNotFound => AppError::NotFound("Slot not found".to_string()),
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::AlreadyBooked => {
                AppError::AlreadyBooked("Slot is already booked".to_string())
            }
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
