use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AuthState};

pub fn auth_routes(state: Arc<AuthState>) -> Router {
    let public_routes = Router::new()
        .route("/sign-in", post(handlers::sign_in))
        .route("/sign-up", post(handlers::sign_up))
        .route("/validate", post(handlers::validate));

    let protected_routes = Router::new()
        .route("/sign-out", post(handlers::sign_out))
        .route("/profile", get(handlers::get_profile))
        .route("/profiles", get(handlers::list_profiles))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
