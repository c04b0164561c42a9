use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::{DateSchedule, Doctor, Slot};
use shared_config::AppConfig;
use shared_database::supabase::{prefer_representation, SupabaseClient};

use crate::models::{Appointment, AppointmentError, BookSlotRequest, Feedback};

/// Converts a (doctor, date, slot) selection into an exclusive claim.
///
/// The claim itself is a single conditional PATCH: it flips `is_booked`
/// only where it is still false, so of N concurrent attempts against one
/// slot exactly one observes the flip and the rest resolve to
/// `AlreadyBooked`. There is no separate read-then-write step.
pub struct BookingService {
    supabase: SupabaseClient,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn book_slot(
        &self,
        request: BookSlotRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking slot {} for patient {} with doctor {}",
            request.slot_id, request.patient_id, request.doctor_id
        );

        // Containment order: doctor, then schedule by row id, then slot.
        let doctor = self.resolve_doctor(request.doctor_id, auth_token).await?;
        let schedule = self
            .resolve_schedule(request.doctor_id, request.date_id, auth_token)
            .await?;

        let slot = self.claim_slot(request.date_id, request.slot_id, auth_token).await?;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: doctor.id,
            date_id: schedule.id,
            slot_id: slot.id,
            patient_id: request.patient_id,
            date: schedule.date.clone(),
            slot_time: slot.time.clone(),
            doctor_name: doctor.name.clone(),
            doctor_email: doctor.email.clone(),
            patient_name: request.patient_name,
            meet_link: String::new(),
            feedback: Feedback::default(),
        };

        match self.insert_appointment(&appointment, auth_token).await {
            Ok(created) => {
                info!(
                    "Appointment {} created for slot {} at {} {}",
                    created.id, slot.id, created.date, created.slot_time
                );
                Ok(created)
            }
            Err(e) => {
                // The claim and the ledger insert are one logical
                // transaction: a claimed slot with no appointment row must
                // not survive the failure.
                self.release_claim(slot.id, auth_token).await;
                Err(e)
            }
        }
    }

    async fn resolve_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Doctor, AppointmentError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Doctor> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or(AppointmentError::DoctorNotFound)
    }

    async fn resolve_schedule(
        &self,
        doctor_id: Uuid,
        date_id: Uuid,
        auth_token: &str,
    ) -> Result<DateSchedule, AppointmentError> {
        let path = format!(
            "/rest/v1/date_schedules?id=eq.{}&doctor_id=eq.{}",
            date_id, doctor_id
        );
        let result: Vec<DateSchedule> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or(AppointmentError::DateNotFound)
    }

    /// The atomic check-and-set. The PATCH matches only an unbooked row,
    /// so an empty representation means either the slot does not exist or
    /// somebody else already holds it; one follow-up read tells the two
    /// apart.
    async fn claim_slot(
        &self,
        date_id: Uuid,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<Slot, AppointmentError> {
        let path = format!(
            "/rest/v1/slots?id=eq.{}&date_schedule_id=eq.{}&is_booked=eq.false",
            slot_id, date_id
        );
        let claimed: Vec<Slot> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "is_booked": true })),
                Some(prefer_representation()),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if let Some(slot) = claimed.into_iter().next() {
            return Ok(slot);
        }

        let lookup = format!(
            "/rest/v1/slots?id=eq.{}&date_schedule_id=eq.{}",
            slot_id, date_id
        );
        let existing: Vec<Slot> = self
            .supabase
            .request(Method::GET, &lookup, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if existing.is_empty() {
            Err(AppointmentError::SlotNotFound)
        } else {
            debug!("Slot {} already booked", slot_id);
            Err(AppointmentError::AlreadyBooked)
        }
    }

    async fn insert_appointment(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let result: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(json!(appointment)),
                Some(prefer_representation()),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or_else(|| {
            AppointmentError::DatabaseError("Failed to create appointment".to_string())
        })
    }

    /// Compensating write for a failed ledger insert. Conditional on the
    /// flag still being set; best effort, the failure is logged and the
    /// original error propagates regardless.
    async fn release_claim(&self, slot_id: Uuid, auth_token: &str) {
        let path = format!("/rest/v1/slots?id=eq.{}&is_booked=eq.true", slot_id);
        let released: Result<Vec<Slot>, _> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "is_booked": false })),
                Some(prefer_representation()),
            )
            .await;

        if let Err(e) = released {
            warn!(
                "Failed to release claim on slot {} after appointment insert failure: {}",
                slot_id, e
            );
        }
    }
}
