// libs/entitlement-cell/tests/gate_test.rs
use std::sync::Arc;

use axum::extract::Extension;
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use headers::Authorization;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path};

use entitlement_cell::gate::EntitlementGate;
use entitlement_cell::handlers::{get_access, refresh_access};
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, TestUser};

fn mock_config(mock_server: &MockServer) -> Arc<AppConfig> {
    Arc::new(AppConfig {
        supabase_url: mock_server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
    })
}

async fn mount_paid_probe(mock_server: &MockServer, paid: bool) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/is_subscription_valid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(paid)))
        .mount(mock_server)
        .await;
}

async fn mount_profile(mock_server: &MockServer, user_id: &str, trial_ends_at: Option<chrono::DateTime<Utc>>) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": user_id,
            "subscription_status": "trialing",
            "trial_ends_at": trial_ends_at.map(|dt| dt.to_rfc3339()),
        }])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn paid_subscription_grants_access() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    mount_paid_probe(&mock_server, true).await;
    mount_profile(&mock_server, &user.id, Some(Utc::now() - Duration::days(10))).await;

    let gate = EntitlementGate::new(config);
    let status = gate.check(&user.id, &token).await.unwrap();

    assert!(status.has_access);
    assert_eq!(status.reason.to_string(), "paid_subscription");
}

#[tokio::test]
async fn expired_trial_without_paid_subscription_denies() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    mount_paid_probe(&mock_server, false).await;
    mount_profile(&mock_server, &user.id, Some(Utc::now() - Duration::days(1))).await;

    let gate = EntitlementGate::new(config);
    let status = gate.check(&user.id, &token).await.unwrap();

    assert!(!status.has_access);
    assert_eq!(status.reason.to_string(), "trial_expired");
    assert_eq!(status.trial_days_left, Some(0));
}

#[tokio::test]
async fn future_trial_grants_even_when_paid_probe_fails() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    // The paid probe erroring out must never deny a live trial.
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/is_subscription_valid"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;
    mount_profile(&mock_server, &user.id, Some(Utc::now() + Duration::days(4))).await;

    let gate = EntitlementGate::new(config);
    let status = gate.check(&user.id, &token).await.unwrap();

    assert!(status.has_access);
    assert_eq!(status.reason.to_string(), "active_trial");
    assert_eq!(status.trial_days_left, Some(4));
}

#[tokio::test]
async fn missing_profile_without_paid_subscription_denies() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    mount_paid_probe(&mock_server, false).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let gate = EntitlementGate::new(config);
    let status = gate.check(&user.id, &token).await.unwrap();

    assert!(!status.has_access);
    assert_eq!(status.reason.to_string(), "no_subscription");
}

#[tokio::test]
async fn identical_token_recheck_is_served_from_cache() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/is_subscription_valid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_profile(&mock_server, &user.id, None).await;

    let gate = EntitlementGate::new(config);
    let first = gate.check(&user.id, &token).await.unwrap();
    let second = gate.check(&user.id, &token).await.unwrap();

    assert!(first.has_access);
    assert!(second.has_access);
}

#[tokio::test]
async fn rotated_token_forces_fresh_resolution() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let token_a = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let token_b = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(48));

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/is_subscription_valid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_profile(&mock_server, &user.id, None).await;

    let gate = EntitlementGate::new(config);
    gate.check(&user.id, &token_a).await.unwrap();
    gate.check(&user.id, &token_b).await.unwrap();
}

#[tokio::test]
async fn refresh_endpoint_drops_cache_entry() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);
    let user = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/is_subscription_valid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_profile(&mock_server, &user.id, None).await;

    let gate = EntitlementGate::new(config);
    let auth = TypedHeader(Authorization::bearer(&token).unwrap());

    let first = get_access(
        Extension(gate.clone()),
        auth,
        Extension(user.to_user()),
    )
    .await
    .unwrap();
    assert_eq!(first.0["has_access"], true);

    let auth = TypedHeader(Authorization::bearer(&token).unwrap());
    let refreshed = refresh_access(
        Extension(gate),
        auth,
        Extension(user.to_user()),
    )
    .await
    .unwrap();
    assert_eq!(refreshed.0["has_access"], true);
}
