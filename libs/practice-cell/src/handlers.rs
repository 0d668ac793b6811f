use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{Datelike, Local};
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use auth_cell::IdentityResolver;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::practice::{AppointmentChanges, NewAppointment, NewPatient};

use crate::models::{
    CreatedAppointment, CreatedPatient, ImpersonateRequest, LoadResponse, NavigateRequest,
    ReminderLink, ViewQuery, WorkspaceResponse,
};
use crate::repository::RepositoryFactory;
use crate::services::view::{self, CalendarProjection, DashboardProjection, PatientsProjection, Projection, ViewContext};
use crate::services::workspace::{Workspace, WorkspaceRegistry};

pub struct PracticeState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<WorkspaceRegistry>,
}

impl PracticeState {
    pub fn new(
        config: Arc<AppConfig>,
        factory: Arc<dyn RepositoryFactory>,
        resolver: IdentityResolver,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(WorkspaceRegistry::new(factory, resolver)),
        }
    }
}

async fn open_workspace(state: &PracticeState, user: &User, token: &str) -> Arc<Workspace> {
    let workspace = state.registry.workspace_for(&user.id, token).await;
    workspace.ensure_loaded().await;
    workspace
}

fn context_from(query: ViewQuery) -> ViewContext {
    ViewContext {
        today: Local::now().date_naive(),
        month: query.year.zip(query.month),
        search: query.q,
    }
}

async fn workspace_response(workspace: &Workspace) -> WorkspaceResponse {
    WorkspaceResponse {
        authenticated_user: workspace.authenticated_user().to_string(),
        impersonating: workspace.impersonating().await,
        view: workspace.current_view().await,
        snapshot: workspace.snapshot().await,
    }
}

#[axum::debug_handler]
pub async fn get_workspace(
    State(state): State<Arc<PracticeState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<WorkspaceResponse>, AppError> {
    let workspace = open_workspace(&state, &user, auth.token()).await;
    Ok(Json(workspace_response(&workspace).await))
}

#[axum::debug_handler]
pub async fn reload_workspace(
    State(state): State<Arc<PracticeState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<LoadResponse>, AppError> {
    let workspace = state.registry.workspace_for(&user.id, auth.token()).await;
    let outcome = workspace.reload().await;
    Ok(Json(LoadResponse::new(outcome, workspace.snapshot().await)))
}

#[axum::debug_handler]
pub async fn close_workspace(
    State(state): State<Arc<PracticeState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let closed = state.registry.end_session(&user.id).await;
    Ok(Json(json!({ "closed": closed })))
}

#[axum::debug_handler]
pub async fn get_view(
    State(state): State<Arc<PracticeState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<Projection>, AppError> {
    let workspace = open_workspace(&state, &user, auth.token()).await;
    let projection = workspace.render(&context_from(query)).await?;
    Ok(Json(projection))
}

#[axum::debug_handler]
pub async fn navigate(
    State(state): State<Arc<PracticeState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<NavigateRequest>,
) -> Result<Json<Value>, AppError> {
    let workspace = state.registry.workspace_for(&user.id, auth.token()).await;
    let previous = workspace.navigate(request.view).await;
    Ok(Json(json!({ "previous": previous, "current": request.view })))
}

#[axum::debug_handler]
pub async fn get_dashboard(
    State(state): State<Arc<PracticeState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<DashboardProjection>, AppError> {
    let workspace = open_workspace(&state, &user, auth.token()).await;
    let snapshot = workspace.snapshot().await;
    Ok(Json(view::dashboard(&snapshot, Local::now().date_naive())))
}

#[axum::debug_handler]
pub async fn get_patients(
    State(state): State<Arc<PracticeState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<PatientsProjection>, AppError> {
    let workspace = open_workspace(&state, &user, auth.token()).await;
    let snapshot = workspace.snapshot().await;
    Ok(Json(view::patients(&snapshot, query.q.as_deref())))
}

#[axum::debug_handler]
pub async fn get_calendar(
    State(state): State<Arc<PracticeState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<CalendarProjection>, AppError> {
    let workspace = open_workspace(&state, &user, auth.token()).await;
    let snapshot = workspace.snapshot().await;
    let today = Local::now().date_naive();
    let (year, month) = query
        .year
        .zip(query.month)
        .unwrap_or((today.year(), today.month()));

    let grid = view::calendar(&snapshot, year, month, today)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;
    Ok(Json(grid))
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<PracticeState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<NewPatient>,
) -> Result<Json<CreatedPatient>, AppError> {
    let workspace = open_workspace(&state, &user, auth.token()).await;
    let patient = workspace.create_patient(&request).await?;
    let total_patients = workspace.snapshot().await.patients.len();
    Ok(Json(CreatedPatient { patient, total_patients }))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<PracticeState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<NewAppointment>,
) -> Result<Json<CreatedAppointment>, AppError> {
    let workspace = open_workspace(&state, &user, auth.token()).await;
    let appointment = workspace
        .create_appointment(&request, Local::now().naive_local())
        .await?;
    let total_appointments = workspace.snapshot().await.appointments.len();
    Ok(Json(CreatedAppointment { appointment, total_appointments }))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<PracticeState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(changes): Json<AppointmentChanges>,
) -> Result<Json<Value>, AppError> {
    debug!("Updating appointment {} for {}", appointment_id, user.id);
    let workspace = open_workspace(&state, &user, auth.token()).await;
    let appointment = workspace.update_appointment(&appointment_id, &changes).await?;
    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn reminder_link(
    State(state): State<Arc<PracticeState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<ReminderLink>, AppError> {
    let workspace = open_workspace(&state, &user, auth.token()).await;
    let link = workspace.reminder_link(&appointment_id).await?;
    Ok(Json(link))
}

#[axum::debug_handler]
pub async fn start_impersonation(
    State(state): State<Arc<PracticeState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ImpersonateRequest>,
) -> Result<Json<LoadResponse>, AppError> {
    let workspace = state.registry.workspace_for(&user.id, auth.token()).await;
    let outcome = workspace.impersonate(&request.user_id).await?;
    Ok(Json(LoadResponse::new(outcome, workspace.snapshot().await)))
}

#[axum::debug_handler]
pub async fn stop_impersonation(
    State(state): State<Arc<PracticeState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<LoadResponse>, AppError> {
    let workspace = state.registry.workspace_for(&user.id, auth.token()).await;
    let outcome = workspace.stop_impersonating().await;
    Ok(Json(LoadResponse::new(outcome, workspace.snapshot().await)))
}
