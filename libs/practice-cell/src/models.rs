use serde::{Deserialize, Serialize};
use thiserror::Error;

use auth_cell::AuthError;
use shared_models::error::AppError;
use shared_models::practice::{Appointment, Patient};

use crate::repository::RepositoryError;
use crate::services::store::StoreSnapshot;
use crate::services::view::View;

/// Rejections raised before anything is written.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Appointments cannot be scheduled in the past")]
    ScheduledInPast,

    #[error("Duration must be a positive number of minutes")]
    NonPositiveDuration,

    #[error("A patient must be selected")]
    MissingPatient,

    #[error("Patient name is required")]
    EmptyName,

    #[error("Appointment {0} is not in the current workspace")]
    UnknownAppointment(String),

    #[error("{year}-{month} is not a calendar month")]
    InvalidMonth { year: i32, month: u32 },

    #[error("{0} has no phone number on file")]
    MissingPhone(String),
}

#[derive(Debug, Error)]
pub enum PracticeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Data store error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<PracticeError> for AppError {
    fn from(err: PracticeError) -> Self {
        match err {
            PracticeError::Validation(e) => AppError::ValidationError(e.to_string()),
            PracticeError::Repository(e) => AppError::ExternalService(e.to_string()),
            PracticeError::Auth(e) => e.into(),
        }
    }
}

/// Result of one load cycle. Failed loads keep whatever the store held before.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded { patients: usize, appointments: usize },
    Failed { reason: String },
    Superseded,
}

impl LoadOutcome {
    pub fn is_stale(&self) -> bool {
        !matches!(self, LoadOutcome::Loaded { .. })
    }
}

#[derive(Debug, Serialize)]
pub struct LoadResponse {
    pub outcome: LoadOutcome,
    pub stale: bool,
    pub workspace: StoreSnapshot,
}

impl LoadResponse {
    pub fn new(outcome: LoadOutcome, workspace: StoreSnapshot) -> Self {
        Self {
            stale: outcome.is_stale(),
            outcome,
            workspace,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorkspaceResponse {
    pub authenticated_user: String,
    pub impersonating: Option<String>,
    pub view: View,
    #[serde(flatten)]
    pub snapshot: StoreSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub view: View,
}

#[derive(Debug, Deserialize)]
pub struct ImpersonateRequest {
    pub user_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedPatient {
    pub patient: Patient,
    pub total_patients: usize,
}

#[derive(Debug, Serialize)]
pub struct CreatedAppointment {
    pub appointment: Appointment,
    pub total_appointments: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReminderLink {
    pub appointment_id: String,
    pub url: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_errors_map_to_http_statuses() {
        let validation: AppError = PracticeError::from(ValidationError::ScheduledInPast).into();
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);

        let remote: AppError =
            PracticeError::from(RepositoryError::Remote("timeout".to_string())).into();
        assert_eq!(remote.status_code(), StatusCode::BAD_GATEWAY);

        let denied: AppError =
            PracticeError::from(AuthError::Forbidden("no".to_string())).into();
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_only_completed_loads_are_fresh() {
        assert!(!LoadOutcome::Loaded { patients: 1, appointments: 0 }.is_stale());
        assert!(LoadOutcome::Failed { reason: "x".to_string() }.is_stale());
        assert!(LoadOutcome::Superseded.is_stale());
    }
}
