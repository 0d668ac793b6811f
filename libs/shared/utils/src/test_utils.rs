use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, UserProfile, UserRole};

pub const TEST_JWT_SECRET: &str = "test-secret-key-for-jwt-validation-must-be-long-enough";

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: TEST_JWT_SECRET.to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Points the data backend at a mock server.
    pub fn with_supabase(url: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            ..Self::default()
        }
    }

    /// No data backend: the practice cell runs on the in-memory repository.
    pub fn offline() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            reminder_window_days: 7,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// `role` is the token role; the practice role lives in the `profiles` table.
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub profile_role: UserRole,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", UserRole::Psychologist)
    }
}

impl TestUser {
    pub fn new(email: &str, profile_role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: "authenticated".to_string(),
            profile_role,
        }
    }

    pub fn psychologist(email: &str) -> Self {
        Self::new(email, UserRole::Psychologist)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, UserRole::Admin)
    }

    pub fn to_profile(&self, full_name: &str) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            full_name: full_name.to_string(),
            role: self.profile_role,
        }
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
        "invalid.token.format".to_string()
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn session_response(user_id: &str, email: &str) -> serde_json::Value {
        json!({
            "access_token": format!("access-{}", user_id),
            "refresh_token": "refresh-token",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": {
                "id": user_id,
                "email": email,
                "user_metadata": { "full_name": "Test User" }
            }
        })
    }

    pub fn profile_response(user_id: &str, email: &str, full_name: &str, role: &str) -> serde_json::Value {
        json!({
            "id": user_id,
            "email": email,
            "full_name": full_name,
            "role": role,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_row(id: &str, owner_id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "user_id": owner_id,
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            "phone": "+55 11 98888 0101",
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(id: &str, patient_id: &str, patient_name: Option<&str>, date: &str, time: &str) -> serde_json::Value {
        json!({
            "id": id,
            "user_id": "owner",
            "patient_id": patient_id,
            "date": date,
            "time": format!("{}:00", time),
            "duration": 50,
            "type": "ONLINE",
            "status": "SCHEDULED",
            "notes": null,
            "summary": null,
            "patients": patient_name.map(|name| json!({ "name": name }))
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
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
        assert!(app_config.is_configured());
        assert!(!TestConfig::offline().to_app_config().is_data_backend_configured());
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_appointment_row_embeds_patient_name() {
        let row = MockSupabaseResponses::appointment_row("apt_1", "pat_1", Some("John Doe"), "2026-11-02", "10:00");
        assert_eq!(row["patients"]["name"], "John Doe");
        assert_eq!(row["time"], "10:00:00");

        let orphan = MockSupabaseResponses::appointment_row("apt_2", "pat_x", None, "2026-11-02", "11:00");
        assert!(orphan["patients"].is_null());
    }
}
