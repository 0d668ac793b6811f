use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;

use crate::models::{GeneratedText, QuestionsRequest, ReminderEmailRequest, SummaryRequest};
use crate::services::assistant::AssistantService;

pub struct AssistantState {
    pub config: Arc<AppConfig>,
    pub service: AssistantService,
}

impl AssistantState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            service: AssistantService::from_config(&config),
            config,
        }
    }
}

// Generation never fails from the caller's point of view, so these handlers
// answer 200 with either text or a placeholder.

pub async fn clinical_summary(
    State(state): State<Arc<AssistantState>>,
    Extension(user): Extension<User>,
    Json(request): Json<SummaryRequest>,
) -> Json<GeneratedText> {
    debug!("Clinical summary requested by {}", user.id);
    Json(
        state
            .service
            .clinical_summary(&request.notes, &request.patient_name)
            .await,
    )
}

pub async fn reminder_email(
    State(state): State<Arc<AssistantState>>,
    Json(request): Json<ReminderEmailRequest>,
) -> Json<GeneratedText> {
    Json(
        state
            .service
            .reminder_email(&request.patient_name, &request.date, &request.time)
            .await,
    )
}

pub async fn therapeutic_questions(
    State(state): State<Arc<AssistantState>>,
    Json(request): Json<QuestionsRequest>,
) -> Json<GeneratedText> {
    Json(
        state
            .service
            .therapeutic_questions(request.context.as_deref())
            .await,
    )
}
