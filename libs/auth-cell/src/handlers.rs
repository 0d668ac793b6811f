use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{Session, TokenResponse, User, UserProfile};
use shared_models::error::AppError;
use shared_utils::extractor::{bearer_token, AccessToken};
use shared_utils::jwt::validate_token;

use crate::models::{ResolvedIdentity, SignInRequest, SignUpOutcome, SignUpRequest};
use crate::services::identity::IdentityResolver;
use crate::services::profile::ProfileDirectory;
use crate::services::session::{IdentityProvider, SignOutHook, SupabaseIdentityProvider};

pub struct AuthState {
    pub config: Arc<AppConfig>,
    pub provider: Arc<dyn IdentityProvider>,
    pub resolver: IdentityResolver,
    pub sign_out_hooks: Vec<Arc<dyn SignOutHook>>,
}

impl AuthState {
    pub fn new(config: Arc<AppConfig>, directory: Arc<dyn ProfileDirectory>) -> Self {
        Self {
            provider: Arc::new(SupabaseIdentityProvider::new(&config)),
            resolver: IdentityResolver::new(directory),
            sign_out_hooks: Vec::new(),
            config,
        }
    }

    pub fn with_sign_out_hook(mut self, hook: Arc<dyn SignOutHook>) -> Self {
        self.sign_out_hooks.push(hook);
        self
    }
}

pub async fn sign_in(
    State(state): State<Arc<AuthState>>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<Session>, AppError> {
    debug!("Sign-in attempt for {}", request.email);
    let session = state.provider.sign_in(&request.email, &request.password).await?;
    Ok(Json(session))
}

pub async fn sign_up(
    State(state): State<Arc<AuthState>>,
    Json(request): Json<SignUpRequest>,
) -> Result<Json<SignUpOutcome>, AppError> {
    debug!("Sign-up attempt for {}", request.email);
    let outcome = state
        .provider
        .sign_up(&request.email, &request.password, &request.full_name)
        .await?;
    Ok(Json(outcome))
}

pub async fn sign_out(
    State(state): State<Arc<AuthState>>,
    Extension(user): Extension<User>,
    Extension(AccessToken(token)): Extension<AccessToken>,
) -> Result<Json<Value>, AppError> {
    debug!("Signing out user: {}", user.id);
    for hook in &state.sign_out_hooks {
        hook.signed_out(&user.id).await;
    }
    state.provider.sign_out(&token).await?;
    Ok(Json(json!({ "signed_out": true })))
}

pub async fn validate(
    State(state): State<Arc<AuthState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    let token = bearer_token(&headers)?;

    let user = validate_token(&token, &state.config.supabase_jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

pub async fn get_profile(
    State(state): State<Arc<AuthState>>,
    Extension(user): Extension<User>,
    Extension(AccessToken(token)): Extension<AccessToken>,
) -> Json<ResolvedIdentity> {
    Json(state.resolver.resolve(&user, &token).await)
}

pub async fn list_profiles(
    State(state): State<Arc<AuthState>>,
    Extension(user): Extension<User>,
    Extension(AccessToken(token)): Extension<AccessToken>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    let profiles = state.resolver.list_profiles(&user.id, &token).await?;
    Ok(Json(profiles))
}
