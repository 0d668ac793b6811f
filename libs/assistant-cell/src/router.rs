use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AssistantState};

pub fn assistant_routes(state: Arc<AssistantState>) -> Router {
    let protected_routes = Router::new()
        .route("/summary", post(handlers::clinical_summary))
        .route("/reminder-email", post(handlers::reminder_email))
        .route("/questions", post(handlers::therapeutic_questions))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}
