use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{prefer_representation, SupabaseClient};

use crate::models::{CreateDoctorRequest, Doctor, DoctorError, UpdateDoctorRequest};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_doctors(&self, auth_token: &str) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors");

        let result: Vec<Doctor> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/doctors?order=name.asc",
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(result)
    }

    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Doctor> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(DoctorError::NotFound)
    }

    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Creating doctor profile for: {}", request.email);

        if request.fees_per_session < 0.0 {
            return Err(DoctorError::ValidationError(
                "fees_per_session must not be negative".to_string(),
            ));
        }

        let doctor_data = json!({
            "id": Uuid::new_v4(),
            "name": request.name,
            "email": request.email,
            "phone_number": request.phone_number,
            "specialization": request.specialization,
            "fees_per_session": request.fees_per_session,
        });

        let result: Vec<Doctor> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctors",
                Some(auth_token),
                Some(doctor_data),
                Some(prefer_representation()),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let doctor = result
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::DatabaseError("Failed to create doctor".to_string()))?;

        debug!("Doctor profile created with ID: {}", doctor.id);
        Ok(doctor)
    }

    /// Profile updates never touch appointment rows: appointments keep the
    /// name and email snapshotted at booking time.
    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Updating doctor profile: {}", doctor_id);

        let mut update_data = serde_json::Map::new();

        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(phone_number) = request.phone_number {
            update_data.insert("phone_number".to_string(), json!(phone_number));
        }
        if let Some(specialization) = request.specialization {
            update_data.insert("specialization".to_string(), json!(specialization));
        }
        if let Some(fees) = request.fees_per_session {
            if fees < 0.0 {
                return Err(DoctorError::ValidationError(
                    "fees_per_session must not be negative".to_string(),
                ));
            }
            update_data.insert("fees_per_session".to_string(), json!(fees));
        }

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Doctor> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(prefer_representation()),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(DoctorError::NotFound)
    }
}
