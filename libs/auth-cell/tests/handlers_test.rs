// libs/auth-cell/tests/handlers_test.rs
use std::sync::Arc;
use axum::{
    extract::{Extension, State},
    http::{HeaderMap, HeaderValue},
    Json,
};
use axum_extra::TypedHeader;
use headers::Authorization;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, header, body_partial_json};

use auth_cell::handlers::{sign_up, sign_in, sign_out, validate_token, get_profile};
use auth_cell::models::{SignInRequest, SignUpRequest, SpecialtyNiche};
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockBackendRows};

fn create_test_config() -> AppConfig {
    TestConfig::default().to_app_config()
}

fn mock_config(mock_server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: mock_server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
    }
}

fn create_auth_header(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "authorization",
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

fn sign_up_request() -> SignUpRequest {
    SignUpRequest {
        full_name: "Maria Souza".to_string(),
        email: "maria@example.com".to_string(),
        password: "hunter22".to_string(),
        phone: Some("(11) 99999-0000".to_string()),
        cpf: Some("529.982.247-25".to_string()),
        clinic_name: None,
        specialty: SpecialtyNiche::Nutrition,
    }
}

#[tokio::test]
async fn test_sign_up_success() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "jwt-token",
            "refresh_token": "refresh-token",
            "user": { "id": "11111111-1111-1111-1111-111111111111", "email": "maria@example.com" }
        })))
        .mount(&mock_server)
        .await;

    let result = sign_up(State(Arc::new(config)), Json(sign_up_request())).await;

    assert!(result.is_ok(), "sign_up failed: {:?}", result.err());
    let response = result.unwrap().0;
    assert_eq!(response["access_token"], "jwt-token");
}

#[tokio::test]
async fn test_sign_up_defaults_clinic_name_and_strips_masks() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    // The onboarding metadata must carry the derived clinic name and
    // digits-only phone/cpf.
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_partial_json(json!({
            "data": {
                "clinic_name": "Maria Souza's Clinic",
                "phone": "11999990000",
                "cpf": "52998224725",
                "role": "nutrition"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "jwt-token",
            "user": {}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = sign_up(State(Arc::new(config)), Json(sign_up_request())).await;
    assert!(result.is_ok(), "sign_up failed: {:?}", result.err());
}

#[tokio::test]
async fn test_sign_up_rejects_short_password() {
    let config = Arc::new(create_test_config());

    let mut request = sign_up_request();
    request.password = "12345".to_string();

    let result = sign_up(State(config), Json(request)).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::ValidationError(_) => {},
        other => panic!("Expected ValidationError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sign_in_success() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "jwt-token",
            "refresh_token": "refresh-token",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .mount(&mock_server)
        .await;

    let request = SignInRequest {
        email: "maria@example.com".to_string(),
        password: "hunter22".to_string(),
    };

    let result = sign_in(State(Arc::new(config)), Json(request)).await;

    assert!(result.is_ok());
    let response = result.unwrap().0;
    assert_eq!(response["token_type"], "bearer");
}

#[tokio::test]
async fn test_sign_in_bad_credentials() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&mock_server)
        .await;

    let request = SignInRequest {
        email: "maria@example.com".to_string(),
        password: "wrong".to_string(),
    };

    let result = sign_in(State(Arc::new(config)), Json(request)).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::Auth(_) => {},
        other => panic!("Expected Auth error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sign_out_success() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let user = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("Authorization", format!("Bearer {}", token)))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let auth = TypedHeader(Authorization::bearer(&token).unwrap());
    let result = sign_out(State(Arc::new(config)), auth, Extension(user.to_user())).await;

    assert!(result.is_ok(), "sign_out failed: {:?}", result.err());
    assert_eq!(result.unwrap().0["success"], true);
}

#[tokio::test]
async fn test_validate_token_success() {
    let config = Arc::new(create_test_config());
    let user = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let headers = create_auth_header(&token);

    let result = validate_token(State(config), headers).await;

    assert!(result.is_ok());
    let response = result.unwrap().0;
    assert_eq!(response.valid, true);
    assert_eq!(response.user_id, user.id);
    assert_eq!(response.email, Some(user.email));
    assert_eq!(response.role, Some(user.role));
}

#[tokio::test]
async fn test_validate_token_expired() {
    let config = Arc::new(create_test_config());
    let user = TestUser::default();
    let token = JwtTestUtils::create_expired_token(&user, &config.supabase_jwt_secret);
    let headers = create_auth_header(&token);

    let result = validate_token(State(config), headers).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::Auth(_) => {},
        _ => panic!("Expected Auth error"),
    }
}

#[tokio::test]
async fn test_validate_token_missing_header() {
    let config = Arc::new(create_test_config());
    let headers = HeaderMap::new();

    let result = validate_token(State(config), headers).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::Auth(msg) => assert_eq!(msg, "Missing authorization header"),
        _ => panic!("Expected Auth error"),
    }
}

#[tokio::test]
async fn test_get_profile_success() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let user = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let clinic_id = uuid::Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("Authorization", format!("Bearer {}", token)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": user.id,
            "email": user.email,
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBackendRows::profile_row(&user.id, &clinic_id)
        ])))
        .mount(&mock_server)
        .await;

    let auth = TypedHeader(Authorization::bearer(&token).unwrap());
    let result = get_profile(State(Arc::new(config)), auth, Extension(user.to_user())).await;

    assert!(result.is_ok(), "get_profile failed: {:?}", result.err());
    let response = result.unwrap().0;
    assert_eq!(response["user"]["id"], user.id);
    assert_eq!(response["profile"]["clinic_id"], clinic_id);
}

#[tokio::test]
async fn test_get_profile_missing_row() {
    let mock_server = MockServer::start().await;
    let config = mock_config(&mock_server);

    let user = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": user.id })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let auth = TypedHeader(Authorization::bearer(&token).unwrap());
    let result = get_profile(State(Arc::new(config)), auth, Extension(user.to_user())).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::ExternalService(_) => {},
        other => panic!("Expected ExternalService error, got {:?}", other),
    }
}
