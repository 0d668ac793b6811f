use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Caller identity extracted from a validated bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Psychologist,
    Patient,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "ADMIN"),
            UserRole::Psychologist => write!(f, "PSYCHOLOGIST"),
            UserRole::Patient => write!(f, "PATIENT"),
        }
    }
}

/// Row of the `profiles` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub role: UserRole,
}

pub const UNKNOWN_DISPLAY_NAME: &str = "Dr. Unknown";

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            UNKNOWN_DISPLAY_NAME
        } else {
            &self.full_name
        }
    }
}

/// Identity-service user as returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: AuthUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_role_parses_uppercase() {
        let profile: UserProfile = serde_json::from_value(json!({
            "id": "u1",
            "email": "alice@companionpsi.com",
            "full_name": "Alice Rivera",
            "role": "ADMIN"
        }))
        .unwrap();

        assert!(profile.is_admin());
        assert_eq!(profile.display_name(), "Alice Rivera");
    }

    #[test]
    fn test_blank_name_falls_back() {
        let profile = UserProfile {
            id: "u2".to_string(),
            email: String::new(),
            full_name: "  ".to_string(),
            role: UserRole::Psychologist,
        };
        assert_eq!(profile.display_name(), UNKNOWN_DISPLAY_NAME);
    }
}
