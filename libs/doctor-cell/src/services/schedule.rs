use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{prefer_ignore_duplicates, SupabaseClient};

use crate::models::{
    DateSchedule, DateScheduleWithSlots, DoctorError, Slot, DAILY_SLOT_TIMES,
};

/// Materializes a doctor's slot set for a calendar date. The read path is
/// a pure lookup; the creation path is duplicate-safe under concurrent
/// first access because both the schedule row and its slot rows go in as
/// conditional inserts against unique constraints.
pub struct ScheduleService {
    supabase: SupabaseClient,
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_or_create_date_schedule(
        &self,
        doctor_id: Uuid,
        date: &str,
        auth_token: &str,
    ) -> Result<DateScheduleWithSlots, DoctorError> {
        debug!("Resolving schedule for doctor {} on {}", doctor_id, date);

        self.ensure_doctor_exists(doctor_id, auth_token).await?;

        if let Some(existing) = self.find_schedule(doctor_id, date, auth_token).await? {
            let slots = self.fetch_slots(existing.id, auth_token).await?;
            return Ok(DateScheduleWithSlots::from_parts(existing, slots));
        }

        let schedule = self.create_schedule(doctor_id, date, auth_token).await?;
        let slots = self.fetch_slots(schedule.id, auth_token).await?;

        Ok(DateScheduleWithSlots::from_parts(schedule, slots))
    }

    async fn ensure_doctor_exists(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<(), DoctorError> {
        let path = format!("/rest/v1/doctors?id=eq.{}&select=id", doctor_id);
        let result: Vec<serde_json::Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::NotFound);
        }
        Ok(())
    }

    async fn find_schedule(
        &self,
        doctor_id: Uuid,
        date: &str,
        auth_token: &str,
    ) -> Result<Option<DateSchedule>, DoctorError> {
        let path = format!(
            "/rest/v1/date_schedules?doctor_id=eq.{}&date=eq.{}",
            doctor_id,
            urlencoding::encode(date)
        );
        let result: Vec<DateSchedule> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(result.into_iter().next())
    }

    /// Conditional insert against the (doctor_id, date) unique constraint.
    /// An empty representation means a concurrent creator won; in that case
    /// the surviving row is re-read and no slot rows are inserted here.
    async fn create_schedule(
        &self,
        doctor_id: Uuid,
        date: &str,
        auth_token: &str,
    ) -> Result<DateSchedule, DoctorError> {
        let schedule_data = json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "date": date,
        });

        let result: Vec<DateSchedule> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/date_schedules?on_conflict=doctor_id,date",
                Some(auth_token),
                Some(schedule_data),
                Some(prefer_ignore_duplicates()),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(schedule) => {
                info!(
                    "Created schedule {} for doctor {} on {}",
                    schedule.id, doctor_id, date
                );
                self.insert_slot_template(schedule.id, auth_token).await?;
                Ok(schedule)
            }
            None => self
                .find_schedule(doctor_id, date, auth_token)
                .await?
                .ok_or_else(|| {
                    DoctorError::DatabaseError(
                        "Schedule creation raced but winning row is not visible".to_string(),
                    )
                }),
        }
    }

    async fn insert_slot_template(
        &self,
        schedule_id: Uuid,
        auth_token: &str,
    ) -> Result<(), DoctorError> {
        let slot_rows: Vec<serde_json::Value> = DAILY_SLOT_TIMES
            .iter()
            .map(|time| {
                json!({
                    "id": Uuid::new_v4(),
                    "date_schedule_id": schedule_id,
                    "time": time,
                    "is_booked": false,
                })
            })
            .collect();

        let _inserted: Vec<Slot> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/slots?on_conflict=date_schedule_id,time",
                Some(auth_token),
                Some(json!(slot_rows)),
                Some(prefer_ignore_duplicates()),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn fetch_slots(
        &self,
        schedule_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Slot>, DoctorError> {
        let path = format!(
            "/rest/v1/slots?date_schedule_id=eq.{}&order=time.asc",
            schedule_id
        );
        let slots: Vec<Slot> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(slots)
    }
}
