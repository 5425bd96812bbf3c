use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "owner".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn owner(email: &str) -> Self {
        Self::new(email, "owner")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn collaborator(email: &str) -> Self {
        Self::new(email, "collaborator")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "not-a-jwt".to_string()
    }
}

/// Canned backend rows for wiremock-based tests. Shapes mirror what the
/// hosted data API returns for each collection.
pub struct MockBackendRows;

impl MockBackendRows {
    pub fn profile_row(user_id: &str, clinic_id: &str) -> Value {
        json!({
            "id": user_id,
            "clinic_id": clinic_id,
            "email": "owner@example.com",
            "full_name": "Test Owner",
            "clinic_name": "Test Clinic",
            "phone": "11999990000",
            "cpf": null,
            "role": "owner",
            "avatar_url": null,
            "subscription_status": "trialing",
            "trial_ends_at": (Utc::now() + Duration::days(5)).to_rfc3339(),
            "brand_color": "#0ea5e9",
            "logo_url": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn clinic_row(clinic_id: &str, name: &str) -> Value {
        json!({
            "id": clinic_id,
            "name": name,
            "owner_id": Uuid::new_v4(),
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn subscription_row(user_id: &str, status: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "status": status,
            "stripe_customer_id": null,
            "stripe_subscription_id": null,
            "current_period_end": (Utc::now() + Duration::days(30)).to_rfc3339(),
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(clinic_id: &str, patient_id: &str, start: &str, end: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "patient_id": patient_id,
            "collaborator_id": null,
            "service_ids": [],
            "start_time": start,
            "end_time": end,
            "date": null,
            "status": "pending",
            "payment_status": "pending",
            "price": 100.0,
            "location": "clinic",
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_row(clinic_id: &str, name: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "name": name,
            "phone": "11988887777",
            "email": "patient@example.com",
            "cpf": "52998224725",
            "birth_date": "1990-06-15",
            "address": {"street": "Rua A", "number": "10", "neighborhood": "Centro", "city": "São Paulo"},
            "avatar_url": null,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn service_row(clinic_id: &str, name: &str, price: f64) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "name": name,
            "duration_minutes": 30,
            "price": price,
            "color": "bg-blue-100 text-blue-700",
            "is_package": false,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn collaborator_row(clinic_id: &str, name: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "name": name,
            "role": "Dentist",
            "color": null,
            "avatar_url": null,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn medical_record_row(patient_id: &str, description: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "description": description,
            "attachment": null,
            "created_at": "2024-02-01T12:00:00Z"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::collaborator("staff@example.com");
        assert_eq!(user.email, "staff@example.com");
        assert_eq!(user.role, "collaborator");

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.role, Some(user.role.clone()));
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert!(token.contains('.'));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn mock_rows_carry_soft_delete_flag() {
        let clinic = Uuid::new_v4().to_string();
        assert_eq!(MockBackendRows::patient_row(&clinic, "Ana")["is_active"], true);
        assert_eq!(MockBackendRows::service_row(&clinic, "Consulta", 100.0)["is_active"], true);
        assert_eq!(MockBackendRows::collaborator_row(&clinic, "Dr. X")["is_active"], true);
    }
}
