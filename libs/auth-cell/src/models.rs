use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::SupabaseError;
use shared_models::auth::{AuthUser, Session, UserProfile, UserRole};
use shared_models::error::AppError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// A sign-up without a session means the identity service is waiting on email verification.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignUpOutcome {
    SignedIn { session: Session },
    VerificationPending { user: AuthUser },
}

/// Actions gated on the caller's profile role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Impersonate,
    ListProfiles,
}

impl Capability {
    pub fn allowed_for(&self, role: UserRole) -> bool {
        match self {
            Capability::Impersonate | Capability::ListProfiles => role == UserRole::Admin,
        }
    }
}

/// What the chrome shows for the signed-in user. `profile` is `None` when the lookup failed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResolvedIdentity {
    pub user_id: String,
    pub profile: Option<UserProfile>,
    pub display_name: String,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Literal message from the identity provider.
    #[error("{0}")]
    Rejected(String),

    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error("Profile not found for user {0}")]
    ProfileNotFound(String),

    #[error("Identity service unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected identity service response: {0}")]
    InvalidResponse(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<SupabaseError>() {
            Some(provider) if provider.is_auth() => AuthError::Rejected(provider.message.clone()),
            Some(provider) => AuthError::Unavailable(provider.message.clone()),
            None => AuthError::Unavailable(err.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Rejected(msg) => AppError::Auth(msg),
            AuthError::Forbidden(msg) => AppError::Forbidden(msg),
            AuthError::ProfileNotFound(id) => AppError::NotFound(format!("Profile {} not found", id)),
            AuthError::Unavailable(msg) | AuthError::InvalidResponse(msg) => {
                AppError::ExternalService(msg)
            }
        }
    }
}
