use std::sync::Arc;

use tracing::{debug, warn};

use shared_models::auth::{User, UserProfile, UNKNOWN_DISPLAY_NAME};

use crate::models::{AuthError, Capability, ResolvedIdentity};
use crate::services::profile::ProfileDirectory;

#[derive(Clone)]
pub struct IdentityResolver {
    directory: Arc<dyn ProfileDirectory>,
}

impl IdentityResolver {
    pub fn new(directory: Arc<dyn ProfileDirectory>) -> Self {
        Self { directory }
    }

    /// Never fails: a missing or unreadable profile falls back to what the session carries.
    pub async fn resolve(&self, user: &User, access_token: &str) -> ResolvedIdentity {
        let profile = match self.directory.fetch_profile(&user.id, access_token).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Error fetching profile for {}: {}", user.id, e);
                None
            }
        };

        let session_email = user.email.clone().unwrap_or_default();
        match profile {
            Some(profile) => ResolvedIdentity {
                user_id: user.id.clone(),
                display_name: profile.display_name().to_string(),
                email: if profile.email.is_empty() { session_email } else { profile.email.clone() },
                is_admin: profile.is_admin(),
                profile: Some(profile),
            },
            None => ResolvedIdentity {
                user_id: user.id.clone(),
                display_name: UNKNOWN_DISPLAY_NAME.to_string(),
                email: session_email,
                is_admin: false,
                profile: None,
            },
        }
    }

    /// Re-reads the profile so a revoked role takes effect on the next action.
    pub async fn authorize(
        &self,
        user_id: &str,
        access_token: &str,
        capability: Capability,
    ) -> Result<UserProfile, AuthError> {
        let profile = self.directory.fetch_profile(user_id, access_token).await?;
        if !capability.allowed_for(profile.role) {
            debug!("{:?} denied for {} with role {}", capability, user_id, profile.role);
            return Err(AuthError::Forbidden(format!(
                "{:?} requires the ADMIN role",
                capability
            )));
        }
        Ok(profile)
    }

    pub async fn list_profiles(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Vec<UserProfile>, AuthError> {
        self.authorize(user_id, access_token, Capability::ListProfiles).await?;
        self.directory.list_profiles(access_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::profile::StaticProfileDirectory;
    use assert_matches::assert_matches;
    use shared_models::auth::UserRole;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: Some(format!("{}@session.test", id)),
            role: Some("authenticated".to_string()),
            metadata: None,
            created_at: None,
        }
    }

    fn profile(id: &str, role: UserRole) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            email: String::new(),
            full_name: format!("Dr. {}", id),
            role,
        }
    }

    #[tokio::test]
    async fn test_missing_profile_falls_back_to_session() {
        let resolver = IdentityResolver::new(Arc::new(StaticProfileDirectory::default()));
        let identity = resolver.resolve(&user("ghost"), "tok").await;

        assert!(identity.profile.is_none());
        assert_eq!(identity.display_name, UNKNOWN_DISPLAY_NAME);
        assert_eq!(identity.email, "ghost@session.test");
        assert!(!identity.is_admin);
    }

    #[tokio::test]
    async fn test_revoked_admin_is_refused_at_action_time() {
        let directory = Arc::new(StaticProfileDirectory::new(vec![profile("root", UserRole::Admin)]));
        let resolver = IdentityResolver::new(directory.clone());

        let identity = resolver.resolve(&user("root"), "tok").await;
        assert!(identity.is_admin);
        assert!(resolver.authorize("root", "tok", Capability::Impersonate).await.is_ok());

        directory.set_role("root", UserRole::Psychologist).await;
        assert_matches!(
            resolver.authorize("root", "tok", Capability::Impersonate).await,
            Err(AuthError::Forbidden(_))
        );
    }

    #[tokio::test]
    async fn test_profiles_listed_by_name_for_admins_only() {
        let directory = Arc::new(StaticProfileDirectory::new(vec![
            profile("zed", UserRole::Psychologist),
            profile("amy", UserRole::Admin),
        ]));
        let resolver = IdentityResolver::new(directory);

        let listed = resolver.list_profiles("amy", "tok").await.unwrap();
        let names: Vec<&str> = listed.iter().map(|p| p.full_name.as_str()).collect();
        assert_eq!(names, vec!["Dr. amy", "Dr. zed"]);

        assert_matches!(
            resolver.list_profiles("zed", "tok").await,
            Err(AuthError::Forbidden(_))
        );
    }
}
