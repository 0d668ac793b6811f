use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::RwLock;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::{UserProfile, UserRole};

use crate::models::AuthError;

/// Read access to the `profiles` table.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn fetch_profile(&self, user_id: &str, access_token: &str) -> Result<UserProfile, AuthError>;

    /// All profiles ordered by display name.
    async fn list_profiles(&self, access_token: &str) -> Result<Vec<UserProfile>, AuthError>;
}

pub struct SupabaseProfileDirectory {
    supabase: SupabaseClient,
}

impl SupabaseProfileDirectory {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl ProfileDirectory for SupabaseProfileDirectory {
    async fn fetch_profile(&self, user_id: &str, access_token: &str) -> Result<UserProfile, AuthError> {
        debug!("Fetching profile for user: {}", user_id);

        let path = format!(
            "/rest/v1/profiles?id=eq.{}&select=*",
            urlencoding::encode(user_id)
        );
        let rows: Vec<UserProfile> = self
            .supabase
            .request(Method::GET, &path, Some(access_token), None)
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AuthError::ProfileNotFound(user_id.to_string()))
    }

    async fn list_profiles(&self, access_token: &str) -> Result<Vec<UserProfile>, AuthError> {
        let profiles: Vec<UserProfile> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/profiles?select=*&order=full_name.asc",
                Some(access_token),
                None,
            )
            .await?;
        Ok(profiles)
    }
}

/// In-process directory for running without a data backend.
#[derive(Default)]
pub struct StaticProfileDirectory {
    profiles: RwLock<Vec<UserProfile>>,
}

impl StaticProfileDirectory {
    pub fn new(profiles: Vec<UserProfile>) -> Self {
        Self {
            profiles: RwLock::new(profiles),
        }
    }

    pub fn demo() -> Self {
        Self::new(vec![UserProfile {
            id: "psy_1".to_string(),
            email: "alice@companionpsi.com".to_string(),
            full_name: "Dr. Alice Rivera".to_string(),
            role: UserRole::Psychologist,
        }])
    }

    pub async fn upsert(&self, profile: UserProfile) {
        let mut profiles = self.profiles.write().await;
        match profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => profiles.push(profile),
        }
    }

    pub async fn set_role(&self, user_id: &str, role: UserRole) {
        let mut profiles = self.profiles.write().await;
        if let Some(profile) = profiles.iter_mut().find(|p| p.id == user_id) {
            info!("Role for {} changed to {}", user_id, role);
            profile.role = role;
        }
    }
}

#[async_trait]
impl ProfileDirectory for StaticProfileDirectory {
    async fn fetch_profile(&self, user_id: &str, _access_token: &str) -> Result<UserProfile, AuthError> {
        self.profiles
            .read()
            .await
            .iter()
            .find(|p| p.id == user_id)
            .cloned()
            .ok_or_else(|| AuthError::ProfileNotFound(user_id.to_string()))
    }

    async fn list_profiles(&self, _access_token: &str) -> Result<Vec<UserProfile>, AuthError> {
        let mut profiles = self.profiles.read().await.clone();
        profiles.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(profiles)
    }
}

pub fn directory_from_config(config: &AppConfig) -> Arc<dyn ProfileDirectory> {
    if config.is_data_backend_configured() {
        Arc::new(SupabaseProfileDirectory::new(config))
    } else {
        info!("No data backend configured, using demo profiles");
        Arc::new(StaticProfileDirectory::demo())
    }
}
