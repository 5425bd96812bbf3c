// libs/insight-cell/tests/insights_test.rs
use std::sync::Arc;

use axum::extract::{Extension, Query, State};
use axum_extra::TypedHeader;
use headers::Authorization;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use insight_cell::models::DashboardQuery;
use insight_cell::handlers::dashboard;
use shared_config::AppConfig;
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

fn appointment_row(clinic: Uuid, start: &str, price: f64, status: &str) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "clinic_id": clinic,
        "patient_id": null,
        "collaborator_id": null,
        "service_ids": [],
        "service_id": null,
        "start_time": start,
        "end_time": null,
        "date": null,
        "status": status,
        "payment_status": "pending",
        "price": price,
        "location": "clinic",
        "notes": null,
        "created_at": null
    })
}

async fn mount_clinic_profile(mock_server: &MockServer, clinic: Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"clinic_id": clinic}])))
        .mount(mock_server)
        .await;
}

async fn mount_reference_tables(mock_server: &MockServer, services: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("is_active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(services))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn revenue_and_count_exclude_canceled_rows() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let clinic = Uuid::new_v4();

    mount_clinic_profile(&mock_server, clinic).await;
    mount_reference_tables(&mock_server, json!([])).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("clinic_id", format!("eq.{}", clinic)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(clinic, "2024-03-15T10:00:00Z", 100.0, "pending"),
            appointment_row(clinic, "2024-03-15T11:00:00Z", 50.0, "canceled"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let query = DashboardQuery {
        range: Some("all".to_string()),
        date: None,
    };

    let response = dashboard(State(config), bearer(), Extension(user.to_user()), Query(query))
        .await
        .unwrap();

    let report = &response.0["dashboard"];
    assert_eq!(report["metrics"]["revenue"], 100.0);
    assert_eq!(report["metrics"]["appointments"], 1);
    assert_eq!(report["metrics"]["revenue_pct"], 100.0);
}

#[tokio::test]
async fn single_day_report_preseeds_business_hours() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let clinic = Uuid::new_v4();

    mount_clinic_profile(&mock_server, clinic).await;
    mount_reference_tables(&mock_server, json!([])).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(clinic, "2024-03-15T14:30:00Z", 200.0, "confirmed"),
        ])))
        .mount(&mock_server)
        .await;

    let query = DashboardQuery {
        range: Some("custom".to_string()),
        date: Some("2024-03-15".parse().unwrap()),
    };

    let response = dashboard(State(config), bearer(), Extension(user.to_user()), Query(query))
        .await
        .unwrap();

    let series = response.0["dashboard"]["revenue_series"]
        .as_array()
        .expect("revenue series");
    assert_eq!(series.len(), 13);
    assert_eq!(series[0]["label"], "8:00");
    assert_eq!(series[12]["label"], "20:00");

    let two_pm = series
        .iter()
        .find(|p| p["label"] == "14:00")
        .expect("14:00 bucket");
    assert_eq!(two_pm["value"], 200.0);
}

#[tokio::test]
async fn top_services_rank_by_resolved_name() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let clinic = Uuid::new_v4();
    let physio = Uuid::new_v4();
    let massage = Uuid::new_v4();

    mount_clinic_profile(&mock_server, clinic).await;
    mount_reference_tables(
        &mock_server,
        json!([
            {"id": physio, "name": "Physiotherapy"},
            {"id": massage, "name": "Massage"},
        ]),
    )
    .await;

    let mut rows = Vec::new();
    for hour in 0..4 {
        let mut row = appointment_row(
            clinic,
            &format!("2024-03-15T{:02}:00:00Z", 10 + hour),
            100.0,
            "pending",
        );
        row["service_ids"] = json!([physio]);
        rows.push(row);
    }
    let mut other = appointment_row(clinic, "2024-03-15T15:00:00Z", 80.0, "pending");
    other["service_ids"] = json!([massage]);
    rows.push(other);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(rows)))
        .mount(&mock_server)
        .await;

    let query = DashboardQuery {
        range: Some("all".to_string()),
        date: None,
    };

    let response = dashboard(State(config), bearer(), Extension(user.to_user()), Query(query))
        .await
        .unwrap();

    let ranking = response.0["dashboard"]["top_services"]
        .as_array()
        .expect("top services");
    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0]["name"], "Physiotherapy");
    assert_eq!(ranking[0]["count"], 4);
    assert_eq!(ranking[0]["revenue"], 400.0);
    assert_eq!(ranking[1]["name"], "Massage");
    assert_eq!(ranking[1]["count"], 1);
}

#[tokio::test]
async fn unknown_range_tokens_never_reach_the_backend() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let query = DashboardQuery {
        range: Some("fortnight".to_string()),
        date: None,
    };

    let result = dashboard(State(config), bearer(), Extension(user.to_user()), Query(query)).await;

    match result.unwrap_err() {
        AppError::BadRequest(_) => {}
        other => panic!("Expected bad request, got {:?}", other),
    }
}

#[tokio::test]
async fn custom_range_without_a_date_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let query = DashboardQuery {
        range: Some("custom".to_string()),
        date: None,
    };

    let result = dashboard(State(config), bearer(), Extension(user.to_user()), Query(query)).await;

    match result.unwrap_err() {
        AppError::BadRequest(_) => {}
        other => panic!("Expected bad request, got {:?}", other),
    }
}
