use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, PracticeState};

pub fn practice_routes(state: Arc<PracticeState>) -> Router {
    // Every practice operation acts on the caller's workspace
    let protected_routes = Router::new()
        .route(
            "/workspace",
            get(handlers::get_workspace).delete(handlers::close_workspace),
        )
        .route("/workspace/reload", post(handlers::reload_workspace))
        .route("/view", get(handlers::get_view).put(handlers::navigate))
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/calendar", get(handlers::get_calendar))
        .route(
            "/patients",
            get(handlers::get_patients).post(handlers::create_patient),
        )
        .route("/appointments", post(handlers::create_appointment))
        .route("/appointments/{appointment_id}", patch(handlers::update_appointment))
        .route(
            "/appointments/{appointment_id}/whatsapp-link",
            get(handlers::reminder_link),
        )
        // Admin only, checked against the profile on each call
        .route(
            "/impersonation",
            post(handlers::start_impersonation).delete(handlers::stop_impersonation),
        )
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}
