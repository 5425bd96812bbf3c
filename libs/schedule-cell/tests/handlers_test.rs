// libs/schedule-cell/tests/handlers_test.rs
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::Authorization;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use schedule_cell::handlers::{
    cancel_appointment, create_appointment, create_quick_patient, get_agenda, ingest_change,
    subscribe_feed, update_appointment,
};
use schedule_cell::models::{
    AgendaMode, AgendaQuery, ChangeEvent, ChangeKind, CreateAppointmentRequest,
    QuickPatientRequest, UpdateAppointmentRequest,
};
use schedule_cell::services::{ChangeFeedHub, ScheduleStore};
use shared_config::AppConfig;
use shared_models::domain::{Appointment, AppointmentRow, AppointmentStatus, Location};
use shared_models::error::AppError;
use shared_utils::test_utils::TestUser;

fn mock_config(mock_server: &MockServer) -> Arc<AppConfig> {
    Arc::new(AppConfig {
        supabase_url: mock_server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
    })
}

fn bearer() -> TypedHeader<Authorization<headers::authorization::Bearer>> {
    TypedHeader(Authorization::bearer("test-token").unwrap())
}

fn appointment_row_json(id: Uuid, clinic: Uuid, status: &str, price: f64) -> Value {
    json!({
        "id": id,
        "clinic_id": clinic,
        "patient_id": Uuid::new_v4(),
        "collaborator_id": null,
        "service_ids": [],
        "start_time": "2024-03-01T09:00:00+00:00",
        "end_time": "2024-03-01T10:00:00+00:00",
        "date": null,
        "status": status,
        "payment_status": "pending",
        "price": price,
        "location": "clinic",
        "notes": null,
        "created_at": "2024-03-01T08:00:00Z"
    })
}

fn parse_appointment(row: Value) -> Appointment {
    let row: AppointmentRow = serde_json::from_value(row).unwrap();
    Appointment::from_row(row).unwrap()
}

async fn mount_clinic_profile(mock_server: &MockServer, clinic: Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"clinic_id": clinic}])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn create_derives_price_and_merges_exactly_one_row() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let clinic = Uuid::new_v4();
    let service_a = Uuid::new_v4();
    let service_b = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    mount_clinic_profile(&mock_server, clinic).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": service_a, "price": 100.0},
            {"id": service_b, "price": 50.0},
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({
            "status": "pending",
            "price": 150.0,
            "source": "app",
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([appointment_row_json(appointment_id, clinic, "pending", 150.0)])),
        )
        .mount(&mock_server)
        .await;

    let store = ScheduleStore::new();
    let request = CreateAppointmentRequest {
        patient_id: Uuid::new_v4(),
        collaborator_id: None,
        service_ids: vec![service_a, service_b],
        date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        start_time: "09:00".to_string(),
        end_time: "10:00".to_string(),
        location: Location::default(),
        notes: None,
    };

    let response = create_appointment(
        State(config.clone()),
        Extension(store.clone()),
        bearer(),
        Extension(user.to_user()),
        Json(request.clone()),
    )
    .await
    .unwrap();

    assert_eq!(response.0["success"], true);
    assert_eq!(response.0["appointment"]["id"], json!(appointment_id));

    // Re-submitting merges the authoritative row by id instead of stacking a
    // duplicate next to it.
    create_appointment(
        State(config),
        Extension(store.clone()),
        bearer(),
        Extension(user.to_user()),
        Json(request),
    )
    .await
    .unwrap();

    let rows = store.rows(clinic).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, appointment_id);
    assert_eq!(rows[0].price, 150.0);
}

#[tokio::test]
async fn create_without_resolved_tenant_never_touches_the_backend() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let request = CreateAppointmentRequest {
        patient_id: Uuid::new_v4(),
        collaborator_id: None,
        service_ids: vec![],
        date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        start_time: "09:00".to_string(),
        end_time: "10:00".to_string(),
        location: Location::default(),
        notes: None,
    };

    let result = create_appointment(
        State(config),
        Extension(ScheduleStore::new()),
        bearer(),
        Extension(user.to_user()),
        Json(request),
    )
    .await;

    match result.unwrap_err() {
        AppError::PreconditionFailed(_) => {}
        other => panic!("Expected precondition failure, got {:?}", other),
    }
}

#[tokio::test]
async fn update_rejects_illegal_status_transitions() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let clinic = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    mount_clinic_profile(&mock_server, clinic).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([appointment_row_json(appointment_id, clinic, "pending", 100.0)])),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let request = UpdateAppointmentRequest {
        status: Some(AppointmentStatus::Completed),
        ..Default::default()
    };

    let store = ScheduleStore::new();
    let result = update_appointment(
        State(config),
        Extension(store.clone()),
        bearer(),
        Extension(user.to_user()),
        Path(appointment_id),
        Json(request),
    )
    .await;

    match result.unwrap_err() {
        AppError::Conflict(_) => {}
        other => panic!("Expected conflict, got {:?}", other),
    }

    // The compensating refetch reconciled the cache with the backend row.
    let rows = store.rows(clinic).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn failed_update_reconciles_the_cache_from_the_backend() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let clinic = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    mount_clinic_profile(&mock_server, clinic).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([appointment_row_json(appointment_id, clinic, "pending", 100.0)])),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("write refused"))
        .mount(&mock_server)
        .await;

    // Seed a speculative local row that diverges from the backend.
    let store = ScheduleStore::new();
    let mut stale = parse_appointment(appointment_row_json(appointment_id, clinic, "pending", 100.0));
    stale.price = 999.0;
    store.merge(clinic, stale).await;

    let request = UpdateAppointmentRequest {
        notes: Some("updated notes".to_string()),
        ..Default::default()
    };

    let result = update_appointment(
        State(config),
        Extension(store.clone()),
        bearer(),
        Extension(user.to_user()),
        Path(appointment_id),
        Json(request),
    )
    .await;

    match result.unwrap_err() {
        AppError::Database(_) => {}
        other => panic!("Expected database error, got {:?}", other),
    }

    let rows = store.rows(clinic).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].price, 100.0);
}

#[tokio::test]
async fn cancel_flips_status_and_merges_the_authoritative_row() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let clinic = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([appointment_row_json(appointment_id, clinic, "pending", 100.0)])),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({"status": "canceled"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([appointment_row_json(appointment_id, clinic, "canceled", 100.0)])),
        )
        .mount(&mock_server)
        .await;

    let store = ScheduleStore::new();
    store
        .merge(clinic, parse_appointment(appointment_row_json(appointment_id, clinic, "pending", 100.0)))
        .await;

    let response = cancel_appointment(
        State(config),
        Extension(store.clone()),
        bearer(),
        Extension(user.to_user()),
        Path(appointment_id),
    )
    .await
    .unwrap();

    assert_eq!(response.0["success"], true);
    assert_eq!(response.0["appointment"]["status"], "canceled");

    let rows = store.rows(clinic).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, AppointmentStatus::Canceled);
}

#[tokio::test]
async fn cancel_of_a_canceled_appointment_is_rejected_and_reconciled() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let clinic = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([appointment_row_json(appointment_id, clinic, "canceled", 100.0)])),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let store = ScheduleStore::new();
    let result = cancel_appointment(
        State(config),
        Extension(store.clone()),
        bearer(),
        Extension(user.to_user()),
        Path(appointment_id),
    )
    .await;

    match result.unwrap_err() {
        AppError::Conflict(_) => {}
        other => panic!("Expected conflict, got {:?}", other),
    }

    let rows = store.rows(clinic).await;
    assert_eq!(rows[0].status, AppointmentStatus::Canceled);
}

#[tokio::test]
async fn quick_patient_stores_digits_only_and_stays_active() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let clinic = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    mount_clinic_profile(&mock_server, clinic).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .and(body_partial_json(json!({
            "name": "Carlos Lima",
            "phone": "11988887777",
            "is_active": true,
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": patient_id,
            "clinic_id": clinic,
            "name": "Carlos Lima",
            "phone": "11988887777",
            "email": "",
            "cpf": "",
            "birth_date": null,
            "address": {"street": "", "number": "", "neighborhood": "", "city": ""},
            "avatar_url": "https://ui-avatars.com/api/?name=Carlos%20Lima&background=random",
            "is_active": true,
            "created_at": "2024-03-01T08:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    let request = QuickPatientRequest {
        name: "  Carlos Lima  ".to_string(),
        phone: "(11) 98888-7777".to_string(),
        cpf: None,
        birth_date: None,
    };

    let response = create_quick_patient(
        State(config),
        bearer(),
        Extension(user.to_user()),
        Json(request),
    )
    .await
    .unwrap();

    assert_eq!(response.0["success"], true);
    assert_eq!(response.0["patient"]["id"], json!(patient_id));
}

#[tokio::test]
async fn agenda_normalizes_both_row_shapes_and_hides_canceled() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let clinic = Uuid::new_v4();

    mount_clinic_profile(&mock_server, clinic).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row_json(Uuid::new_v4(), clinic, "pending", 100.0),
            {
                "id": Uuid::new_v4(),
                "clinic_id": clinic,
                "date": "2024-03-01",
                "start_time": "14:00",
                "end_time": "15:00",
                "status": "confirmed"
            },
            appointment_row_json(Uuid::new_v4(), clinic, "canceled", 100.0),
        ])))
        .mount(&mock_server)
        .await;
    for (table, body) in [
        ("patients", json!([])),
        ("services", json!([])),
        ("collaborators", json!([])),
    ] {
        Mock::given(method("GET"))
            .and(path(format!("/rest/v1/{}", table)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&mock_server)
            .await;
    }

    let query = AgendaQuery {
        mode: AgendaMode::Day,
        date: NaiveDate::from_ymd_opt(2024, 3, 1),
        search: None,
        collaborator_id: None,
        status: None,
    };

    let response = get_agenda(
        State(config),
        Extension(ScheduleStore::new()),
        bearer(),
        Extension(user.to_user()),
        Query(query),
    )
    .await
    .unwrap();

    assert_eq!(response.0["ticket"], 1);
    let blocks = response.0["days"][0]["blocks"].as_array().unwrap();
    assert_eq!(blocks.len(), 2);

    // 09:00 sits four hours past the 05:00 grid anchor.
    let offset = blocks[0]["offset_px"].as_f64().unwrap();
    assert!((offset - 256.0).abs() < 1e-6);
    // The legacy date+wall-clock row normalized to 14:00.
    let legacy_offset = blocks[1]["offset_px"].as_f64().unwrap();
    assert!((legacy_offset - 576.0).abs() < 1e-6);
}

#[tokio::test]
async fn change_ingest_invalidates_the_cache_and_notifies_subscribers() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let clinic = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    let store = ScheduleStore::new();
    store
        .merge(clinic, parse_appointment(appointment_row_json(appointment_id, clinic, "pending", 100.0)))
        .await;
    let hub = ChangeFeedHub::new();
    let mut receiver = hub.subscribe(clinic).await;

    let event = ChangeEvent {
        kind: ChangeKind::Update,
        table: "appointments".to_string(),
        record: Some(json!({"id": appointment_id, "clinic_id": clinic})),
        old_record: None,
    };

    let response = ingest_change(
        State(config),
        Extension(store.clone()),
        Extension(hub),
        Json(event),
    )
    .await
    .unwrap();

    assert_eq!(response.0["success"], true);
    assert_eq!(response.0["subscribers_notified"], 1);
    assert!(store.rows(clinic).await.is_empty());
    assert_eq!(receiver.recv().await.unwrap().kind, ChangeKind::Update);
}

#[tokio::test]
async fn change_ingest_ignores_other_tables() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let event = ChangeEvent {
        kind: ChangeKind::Insert,
        table: "patients".to_string(),
        record: Some(json!({"clinic_id": Uuid::new_v4()})),
        old_record: None,
    };

    let response = ingest_change(
        State(config),
        Extension(ScheduleStore::new()),
        Extension(ChangeFeedHub::new()),
        Json(event),
    )
    .await
    .unwrap();

    assert_eq!(response.0["ignored"], true);
}

#[tokio::test]
async fn feed_subscription_reports_refetch_on_external_change() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let clinic = Uuid::new_v4();

    mount_clinic_profile(&mock_server, clinic).await;

    let hub = ChangeFeedHub::new();
    let publisher = hub.clone();
    let publish = async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        publisher
            .publish(
                clinic,
                ChangeEvent {
                    kind: ChangeKind::Insert,
                    table: "appointments".to_string(),
                    record: Some(json!({"clinic_id": clinic})),
                    old_record: None,
                },
            )
            .await
    };

    let subscribe = subscribe_feed(
        State(config),
        Extension(hub),
        bearer(),
        Extension(user.to_user()),
    );

    let (response, delivered) = tokio::join!(subscribe, publish);
    assert_eq!(delivered, 1);
    assert_eq!(response.unwrap().0["action"], "refetch");
}
