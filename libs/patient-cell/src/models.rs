use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

/// A patient profile. `external_id` is the identity key handed over by the
/// auth collaborator and is unique across patients; appointments reference
/// it as their `patient_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub external_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub external_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePhoneRequest {
    pub phone_number: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Patient with identity {external_id} already exists")]
    AlreadyExists { external_id: String },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
            PatientError::AlreadyExists { external_id } => AppError::Conflict(format!(
                "Patient with identity {} already exists",
                external_id
            )),
            PatientError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
