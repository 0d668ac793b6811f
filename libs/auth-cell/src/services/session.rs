use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::{AuthUser, Session};

use crate::models::{AuthError, SignUpOutcome};

/// Remote identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, AuthError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
    async fn current_user(&self, access_token: &str) -> Result<AuthUser, AuthError>;
}

/// Server-side state tied to a signed-in user, dropped on sign-out before the
/// remote logout so a failing identity service cannot keep it alive.
#[async_trait]
pub trait SignOutHook: Send + Sync {
    async fn signed_out(&self, user_id: &str);
}

pub struct SupabaseIdentityProvider {
    supabase: SupabaseClient,
}

impl SupabaseIdentityProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

fn parse_sign_up(body: Value) -> Result<SignUpOutcome, AuthError> {
    if body.get("access_token").is_some() {
        let session: Session = serde_json::from_value(body)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        return Ok(SignUpOutcome::SignedIn { session });
    }

    // With confirmations enabled GoTrue answers with the bare user (older versions nest it).
    let user_value = body.get("user").cloned().unwrap_or(body);
    let user: AuthUser = serde_json::from_value(user_value)
        .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
    Ok(SignUpOutcome::VerificationPending { user })
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let body = self.supabase.sign_in_with_password(email, password).await?;
        serde_json::from_value(body).map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }

    #[instrument(skip(self, password))]
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let body = self.supabase.sign_up(email, password, full_name).await?;
        parse_sign_up(body)
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.supabase.sign_out(access_token).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn current_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let body = self.supabase.get_user(access_token).await?;
        serde_json::from_value(body).map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }
}

/// Holds the current session and broadcasts every change to subscribers.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    session_tx: watch::Sender<Option<Session>>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            provider,
            session_tx,
        }
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session_tx.borrow().clone()
    }

    /// Receivers observe the latest session; `changed()` wakes on sign-in and sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session_tx.subscribe()
    }

    /// Re-establishes a session from a stored access token. An invalid token leaves no session.
    pub async fn restore(&self, session: Session) -> Option<Session> {
        match self.provider.current_user(&session.access_token).await {
            Ok(user) => {
                let restored = Session { user, ..session };
                self.session_tx.send_replace(Some(restored.clone()));
                Some(restored)
            }
            Err(e) => {
                warn!("Stored session is no longer valid: {}", e);
                self.session_tx.send_replace(None);
                None
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.provider.sign_in(email, password).await?;
        info!("Signed in as {}", session.user.id);
        self.session_tx.send_replace(Some(session.clone()));
        Ok(session)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let outcome = self.provider.sign_up(email, password, full_name).await?;
        match &outcome {
            SignUpOutcome::SignedIn { session } => {
                self.session_tx.send_replace(Some(session.clone()));
            }
            SignUpOutcome::VerificationPending { user } => {
                debug!("Sign-up for {} awaits email verification", user.id);
            }
        }
        Ok(outcome)
    }

    /// The local session is cleared even when the remote logout fails.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let previous = self.session_tx.send_replace(None);
        match previous {
            Some(session) => self.provider.sign_out(&session.access_token).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sign_up_with_session_signs_in() {
        let outcome = parse_sign_up(json!({
            "access_token": "tok",
            "user": { "id": "u1", "email": "a@b.com" }
        }))
        .unwrap();

        assert!(matches!(outcome, SignUpOutcome::SignedIn { session } if session.access_token == "tok"));
    }

    #[test]
    fn test_sign_up_without_session_awaits_verification() {
        let outcome = parse_sign_up(json!({ "id": "u2", "email": "c@d.com" })).unwrap();
        assert!(matches!(outcome, SignUpOutcome::VerificationPending { user } if user.id == "u2"));

        let nested = parse_sign_up(json!({ "user": { "id": "u3", "email": null }, "session": null })).unwrap();
        assert!(matches!(nested, SignUpOutcome::VerificationPending { user } if user.id == "u3"));
    }
}
