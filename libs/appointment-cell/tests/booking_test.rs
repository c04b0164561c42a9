use futures::future::join_all;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{AppointmentError, BookSlotRequest};
use appointment_cell::services::BookingService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

struct BookingFixture {
    doctor_id: Uuid,
    date_id: Uuid,
    slot_id: Uuid,
}

impl BookingFixture {
    fn new() -> Self {
        Self {
            doctor_id: Uuid::new_v4(),
            date_id: Uuid::new_v4(),
            slot_id: Uuid::new_v4(),
        }
    }

    fn request(&self, patient_id: &str, patient_name: &str) -> BookSlotRequest {
        BookSlotRequest {
            doctor_id: self.doctor_id,
            date_id: self.date_id,
            slot_id: self.slot_id,
            patient_id: patient_id.to_string(),
            patient_name: patient_name.to_string(),
        }
    }

    async fn mount_doctor_and_schedule(&self, mock_server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/doctors"))
            .and(query_param("id", format!("eq.{}", self.doctor_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::doctor_response(
                    &self.doctor_id.to_string(),
                    "Dr. A",
                    "dr.a@example.com",
                )
            ])))
            .mount(mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/date_schedules"))
            .and(query_param("id", format!("eq.{}", self.date_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::date_schedule_response(
                    &self.date_id.to_string(),
                    &self.doctor_id.to_string(),
                    "2024-06-01",
                )
            ])))
            .mount(mock_server)
            .await;
    }

    async fn mount_successful_claim(&self, mock_server: &MockServer) {
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/slots"))
            .and(query_param("is_booked", "eq.false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::slot_response(
                    &self.slot_id.to_string(),
                    &self.date_id.to_string(),
                    "12:00:00",
                    true,
                )
            ])))
            .up_to_n_times(1)
            .mount(mock_server)
            .await;

        // Every later attempt finds the conditional update matching no rows.
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/slots"))
            .and(query_param("is_booked", "eq.false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/slots"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::slot_response(
                    &self.slot_id.to_string(),
                    &self.date_id.to_string(),
                    "12:00:00",
                    true,
                )
            ])))
            .mount(mock_server)
            .await;
    }
}

fn service_for(mock_server: &MockServer) -> BookingService {
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    BookingService::new(&config)
}

#[tokio::test]
async fn booking_snapshots_doctor_and_slot_details() {
    let mock_server = MockServer::start().await;
    let fixture = BookingFixture::new();

    fixture.mount_doctor_and_schedule(&mock_server).await;
    fixture.mount_successful_claim(&mock_server).await;

    let appointment_id = Uuid::new_v4().to_string();
    // The insert must carry the snapshot taken at claim time plus an empty
    // meet link and unfiled feedback.
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({
            "doctor_id": fixture.doctor_id,
            "date_id": fixture.date_id,
            "slot_id": fixture.slot_id,
            "patient_id": "p1",
            "patient_name": "Pat One",
            "date": "2024-06-01",
            "slot_time": "12:00:00",
            "doctor_name": "Dr. A",
            "doctor_email": "dr.a@example.com",
            "meet_link": "",
            "feedback": { "given": false, "stars": 0 }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &appointment_id,
                &fixture.doctor_id.to_string(),
                "p1",
                "2024-06-01",
                "12:00:00",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let appointment = service
        .book_slot(fixture.request("p1", "Pat One"), "token")
        .await
        .unwrap();

    assert_eq!(appointment.slot_time, "12:00:00");
    assert_eq!(appointment.date, "2024-06-01");
    assert!(!appointment.feedback.given);
}

#[tokio::test]
async fn concurrent_bookings_produce_exactly_one_winner() {
    let mock_server = MockServer::start().await;
    let fixture = BookingFixture::new();

    fixture.mount_doctor_and_schedule(&mock_server).await;
    fixture.mount_successful_claim(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &Uuid::new_v4().to_string(),
                &fixture.doctor_id.to_string(),
                "p1",
                "2024-06-01",
                "12:00:00",
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let attempts = (0..4).map(|i| {
        let request = fixture.request(&format!("p{}", i), "Racing Patient");
        service.book_slot(request, "token")
    });

    let outcomes = join_all(attempts).await;

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let already_booked = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AppointmentError::AlreadyBooked)))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(already_booked, 3);
}

#[tokio::test]
async fn booked_slot_is_rejected() {
    let mock_server = MockServer::start().await;
    let fixture = BookingFixture::new();

    fixture.mount_doctor_and_schedule(&mock_server).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::slot_response(
                &fixture.slot_id.to_string(),
                &fixture.date_id.to_string(),
                "12:00:00",
                true,
            )
        ])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service.book_slot(fixture.request("p2", "Pat Two"), "token").await;

    assert!(matches!(result, Err(AppointmentError::AlreadyBooked)));
}

#[tokio::test]
async fn unknown_slot_is_a_distinct_not_found() {
    let mock_server = MockServer::start().await;
    let fixture = BookingFixture::new();

    fixture.mount_doctor_and_schedule(&mock_server).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service.book_slot(fixture.request("p1", "Pat One"), "token").await;

    assert!(matches!(result, Err(AppointmentError::SlotNotFound)));
}

#[tokio::test]
async fn unknown_doctor_fails_before_any_slot_access() {
    let mock_server = MockServer::start().await;
    let fixture = BookingFixture::new();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service.book_slot(fixture.request("p1", "Pat One"), "token").await;

    assert!(matches!(result, Err(AppointmentError::DoctorNotFound)));
}

#[tokio::test]
async fn unknown_date_schedule_is_a_distinct_not_found() {
    let mock_server = MockServer::start().await;
    let fixture = BookingFixture::new();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(
                &fixture.doctor_id.to_string(),
                "Dr. A",
                "dr.a@example.com",
            )
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/date_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service.book_slot(fixture.request("p1", "Pat One"), "token").await;

    assert!(matches!(result, Err(AppointmentError::DateNotFound)));
}

#[tokio::test]
async fn failed_ledger_insert_releases_the_claim() {
    let mock_server = MockServer::start().await;
    let fixture = BookingFixture::new();

    fixture.mount_doctor_and_schedule(&mock_server).await;
    fixture.mount_successful_claim(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("insert failed"))
        .mount(&mock_server)
        .await;

    // The compensating write flips the flag back, conditionally.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .and(query_param("is_booked", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::slot_response(
                &fixture.slot_id.to_string(),
                &fixture.date_id.to_string(),
                "12:00:00",
                false,
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service.book_slot(fixture.request("p1", "Pat One"), "token").await;

    assert!(matches!(result, Err(AppointmentError::DatabaseError(_))));
}
