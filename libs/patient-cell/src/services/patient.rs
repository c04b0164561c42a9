use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{prefer_representation, SupabaseClient, SupabaseError};

use crate::models::{CreatePatientRequest, Patient, PatientError, UpdatePhoneRequest};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_patients(&self, auth_token: &str) -> Result<Vec<Patient>, PatientError> {
        debug!("Listing patients");

        let result: Vec<Patient> = self
            .supabase
            .request(Method::GET, "/rest/v1/patients", Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        Ok(result)
    }

    /// Uniqueness of `external_id` is the store's unique constraint, not an
    /// in-process pre-check; a 409 from the insert maps to AlreadyExists.
    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Creating patient profile for identity: {}", request.external_id);

        let patient_data = json!({
            "id": Uuid::new_v4(),
            "external_id": request.external_id,
            "email": request.email,
            "name": request.name,
            "picture": request.picture,
            "phone_number": null,
        });

        let result: Vec<Patient> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/patients",
                Some(auth_token),
                Some(patient_data),
                Some(prefer_representation()),
            )
            .await
            .map_err(|e| match e.downcast_ref::<SupabaseError>() {
                Some(status_err) if status_err.is_conflict() => PatientError::AlreadyExists {
                    external_id: request.external_id.clone(),
                },
                _ => PatientError::DatabaseError(e.to_string()),
            })?;

        let patient = result
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("Failed to create patient".to_string()))?;

        debug!("Patient profile created with ID: {}", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(
        &self,
        external_id: &str,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Fetching patient by identity: {}", external_id);

        let path = format!(
            "/rest/v1/patients?external_id=eq.{}",
            urlencoding::encode(external_id)
        );
        let result: Vec<Patient> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(PatientError::NotFound)
    }

    pub async fn update_phone(
        &self,
        external_id: &str,
        request: UpdatePhoneRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating phone number for identity: {}", external_id);

        let path = format!(
            "/rest/v1/patients?external_id=eq.{}",
            urlencoding::encode(external_id)
        );
        let result: Vec<Patient> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "phone_number": request.phone_number })),
                Some(prefer_representation()),
            )
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(PatientError::NotFound)
    }
}
