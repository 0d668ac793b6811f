use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use shared_config::AppConfig;
use shared_database::SupabaseError;
use shared_models::practice::{Appointment, NewAppointment, NewPatient, Patient};

pub mod memory;
pub mod supabase;

pub use memory::InMemoryRepository;
pub use supabase::SupabaseRepository;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    /// Message reported by the data store.
    #[error("{0}")]
    Remote(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Malformed row: {0}")]
    Decode(String),
}

impl From<anyhow::Error> for RepositoryError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<SupabaseError>() {
            Some(provider) => RepositoryError::Remote(provider.message.clone()),
            None => RepositoryError::Remote(err.to_string()),
        }
    }
}

/// Persistence for one clinician's patients and appointments.
///
/// Both implementations join the patient's name into appointments at read
/// time, so a renamed patient shows the new name only after the next load.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PracticeRepository: Send + Sync {
    /// Patients owned by `owner_id`, ordered by name.
    async fn list_patients(&self, owner_id: &str) -> Result<Vec<Patient>, RepositoryError>;

    /// Appointments owned by `owner_id`, ordered by date then time.
    async fn list_appointments(&self, owner_id: &str) -> Result<Vec<Appointment>, RepositoryError>;

    async fn create_patient(
        &self,
        owner_id: &str,
        patient: &NewPatient,
    ) -> Result<Patient, RepositoryError>;

    /// Inserts a SCHEDULED appointment. The patient reference is not checked here.
    async fn create_appointment(
        &self,
        owner_id: &str,
        appointment: &NewAppointment,
    ) -> Result<Appointment, RepositoryError>;

    /// Writes status, notes, summary, date and time; answers with the stored row.
    async fn update_appointment(&self, appointment: &Appointment) -> Result<Appointment, RepositoryError>;
}

/// Hands out a repository bound to the caller's access token.
pub trait RepositoryFactory: Send + Sync {
    fn for_token(&self, access_token: &str) -> Arc<dyn PracticeRepository>;
}

/// Remote repositories when the data backend is configured, otherwise one
/// shared in-memory repository seeded with demo data.
pub enum BackendFactory {
    Remote(Arc<AppConfig>),
    Memory(Arc<InMemoryRepository>),
}

impl BackendFactory {
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        if config.is_data_backend_configured() {
            BackendFactory::Remote(config)
        } else {
            tracing::warn!("Data backend not configured, serving demo data from memory");
            BackendFactory::Memory(Arc::new(InMemoryRepository::with_demo_data()))
        }
    }
}

impl RepositoryFactory for BackendFactory {
    fn for_token(&self, access_token: &str) -> Arc<dyn PracticeRepository> {
        match self {
            BackendFactory::Remote(config) => {
                Arc::new(SupabaseRepository::new(config, access_token))
            }
            BackendFactory::Memory(repository) => repository.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_provider_message_survives_conversion() {
        let err = anyhow::Error::new(SupabaseError {
            status: StatusCode::CONFLICT,
            message: "duplicate key value".to_string(),
        });
        assert_eq!(
            RepositoryError::from(err),
            RepositoryError::Remote("duplicate key value".to_string())
        );
    }

    #[test]
    fn test_factory_falls_back_to_memory_without_backend() {
        let factory = BackendFactory::from_config(Arc::new(AppConfig::default()));
        assert!(matches!(factory, BackendFactory::Memory(_)));

        let configured = AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon".to_string(),
            ..AppConfig::default()
        };
        let factory = BackendFactory::from_config(Arc::new(configured));
        assert!(matches!(factory, BackendFactory::Remote(_)));
    }
}
