use chrono::{NaiveDateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{prefer_representation, SupabaseClient};

use crate::models::{Appointment, AppointmentError, Feedback};

/// Combined date+time comparison key. A malformed pair sorts as
/// `NaiveDateTime::MIN`, deterministic per input; callers guarantee
/// `%Y-%m-%d` dates and `%H:%M:%S` times for the ordering to be
/// meaningful.
fn schedule_key(appointment: &Appointment) -> NaiveDateTime {
    let combined = format!("{}T{}", appointment.date, appointment.slot_time);
    NaiveDateTime::parse_from_str(&combined, "%Y-%m-%dT%H:%M:%S")
        .unwrap_or(NaiveDateTime::MIN)
}

/// Query and mutation surface over the appointment records produced by
/// successful claims. Appointments are never deleted; the only mutations
/// are the meet link and the feedback sub-record.
pub struct LedgerService {
    supabase: SupabaseClient,
}

impl LedgerService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// All of a doctor's appointments, most recent first.
    pub async fn list_by_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut appointments = self
            .fetch_by_filter(&format!("doctor_id=eq.{}", doctor_id), auth_token)
            .await?;

        appointments.sort_by(|a, b| schedule_key(b).cmp(&schedule_key(a)));
        Ok(appointments)
    }

    /// Today's appointments for a doctor, ascending by time of day. The
    /// filter truncates to the calendar date: an appointment later today
    /// is included even though it is still in the future.
    pub async fn list_today_by_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let filter = format!(
            "doctor_id=eq.{}&date=eq.{}",
            doctor_id,
            urlencoding::encode(&today)
        );

        let mut appointments = self.fetch_by_filter(&filter, auth_token).await?;
        appointments.sort_by(|a, b| schedule_key(a).cmp(&schedule_key(b)));
        Ok(appointments)
    }

    /// Appointments strictly before the current instant, descending. Uses
    /// full date-time comparison, so today's not-yet-reached slots are
    /// excluded.
    pub async fn list_past_by_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let now = Utc::now().naive_utc();
        let mut appointments = self
            .fetch_by_filter(&format!("doctor_id=eq.{}", doctor_id), auth_token)
            .await?;

        appointments.retain(|a| schedule_key(a) < now);
        appointments.sort_by(|a, b| schedule_key(b).cmp(&schedule_key(a)));
        Ok(appointments)
    }

    /// A patient's appointments at or before the current instant,
    /// descending.
    pub async fn list_past_by_patient(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let now = Utc::now().naive_utc();
        let mut appointments = self.fetch_by_patient(patient_id, auth_token).await?;

        appointments.retain(|a| schedule_key(a) <= now);
        appointments.sort_by(|a, b| schedule_key(b).cmp(&schedule_key(a)));
        Ok(appointments)
    }

    /// A patient's appointments at or after the current instant,
    /// ascending.
    pub async fn list_upcoming_by_patient(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let now = Utc::now().naive_utc();
        let mut appointments = self.fetch_by_patient(patient_id, auth_token).await?;

        appointments.retain(|a| schedule_key(a) >= now);
        appointments.sort_by(|a, b| schedule_key(a).cmp(&schedule_key(b)));
        Ok(appointments)
    }

    /// Idempotent overwrite of the meeting link.
    pub async fn set_meet_link(
        &self,
        appointment_id: Uuid,
        meet_link: &str,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Setting meet link on appointment {}", appointment_id);

        self.patch_appointment(appointment_id, json!({ "meet_link": meet_link }), auth_token)
            .await
    }

    /// Overwrites all four feedback fields and marks the record as given.
    /// A second submission silently replaces the first.
    pub async fn submit_feedback(
        &self,
        appointment_id: Uuid,
        stars: i32,
        title: &str,
        review: &str,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        if !(0..=5).contains(&stars) {
            return Err(AppointmentError::ValidationError(
                "stars must be between 0 and 5".to_string(),
            ));
        }

        debug!("Submitting feedback for appointment {}", appointment_id);

        let feedback = Feedback {
            given: true,
            stars,
            title: title.to_string(),
            review: review.to_string(),
        };

        self.patch_appointment(appointment_id, json!({ "feedback": feedback }), auth_token)
            .await
    }

    async fn fetch_by_filter(
        &self,
        filter: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?{}", filter);
        let appointments: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(appointments)
    }

    async fn fetch_by_patient(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = format!("patient_id=eq.{}", urlencoding::encode(patient_id));
        self.fetch_by_filter(&filter, auth_token).await
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        body: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(prefer_representation()),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appointment(date: &str, slot_time: &str) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            date_id: Uuid::new_v4(),
            slot_id: Uuid::new_v4(),
            patient_id: "patient-1".to_string(),
            date: date.to_string(),
            slot_time: slot_time.to_string(),
            doctor_name: "Dr. Test".to_string(),
            doctor_email: "doctor@example.com".to_string(),
            patient_name: "Test Patient".to_string(),
            meet_link: String::new(),
            feedback: Feedback::default(),
        }
    }

    #[test]
    fn schedule_key_orders_by_date_then_time() {
        let earlier = appointment("2024-06-01", "09:00:00");
        let later_same_day = appointment("2024-06-01", "15:00:00");
        let next_day = appointment("2024-06-02", "09:00:00");

        assert!(schedule_key(&earlier) < schedule_key(&later_same_day));
        assert!(schedule_key(&later_same_day) < schedule_key(&next_day));
    }

    #[test]
    fn schedule_key_is_deterministic_for_malformed_input() {
        let bad = appointment("not-a-date", "nope");
        assert_eq!(schedule_key(&bad), schedule_key(&bad));
        assert_eq!(schedule_key(&bad), NaiveDateTime::MIN);

        let good = appointment("2024-06-01", "09:00:00");
        assert!(schedule_key(&bad) < schedule_key(&good));
    }
}
