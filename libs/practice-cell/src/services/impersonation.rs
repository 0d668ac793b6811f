use tokio::sync::RwLock;
use tracing::info;

use auth_cell::{Capability, IdentityResolver};

use crate::models::PracticeError;

/// Optional override of whose data the workspace shows.
#[derive(Default)]
pub struct ImpersonationOverlay {
    target: RwLock<Option<String>>,
}

impl ImpersonationOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<String> {
        self.target.read().await.clone()
    }

    pub async fn effective_user(&self, authenticated_user: &str) -> String {
        self.current()
            .await
            .unwrap_or_else(|| authenticated_user.to_string())
    }

    /// The actor's role is re-read from the profile directory on every call,
    /// so a revoked ADMIN role stops working on the next switch.
    pub async fn authorize(
        &self,
        resolver: &IdentityResolver,
        actor_id: &str,
        access_token: &str,
    ) -> Result<(), PracticeError> {
        resolver
            .authorize(actor_id, access_token, Capability::Impersonate)
            .await?;
        Ok(())
    }

    /// Selecting yourself is the same as clearing the override.
    pub async fn set(&self, actor_id: &str, target_id: &str) {
        let mut target = self.target.write().await;
        if target_id == actor_id {
            *target = None;
        } else {
            info!("{} is now viewing as {}", actor_id, target_id);
            *target = Some(target_id.to_string());
        }
    }

    pub async fn clear(&self) -> Option<String> {
        self.target.write().await.take()
    }
}
