use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use assistant_cell::{assistant_routes, AssistantState};
use auth_cell::handlers::AuthState;
use auth_cell::services::profile::directory_from_config;
use auth_cell::{auth_routes, IdentityResolver, ProfileDirectory};
use practice_cell::{practice_routes, BackendFactory, PracticeState};
use shared_config::AppConfig;

pub fn create_router(config: Arc<AppConfig>) -> Router {
    let directory = directory_from_config(&config);
    build_router(config, directory)
}

// One directory shared by sign-in and the practice capability checks
fn build_router(config: Arc<AppConfig>, directory: Arc<dyn ProfileDirectory>) -> Router {
    let backend = Arc::new(BackendFactory::from_config(config.clone()));
    let practice_state = Arc::new(PracticeState::new(
        config.clone(),
        backend,
        IdentityResolver::new(directory.clone()),
    ));

    // Sign-out closes the caller's workspace, override included
    let auth_state = Arc::new(
        AuthState::new(config.clone(), directory)
            .with_sign_out_hook(practice_state.registry.clone()),
    );
    let assistant_state = Arc::new(AssistantState::new(config));

    Router::new()
        .route("/", get(|| async { "Companion PSI API is running!" }))
        .nest("/auth", auth_routes(auth_state))
        .nest("/practice", practice_routes(practice_state))
        .nest("/assistant", assistant_routes(assistant_state))
}
