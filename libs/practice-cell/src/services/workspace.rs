use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use async_trait::async_trait;
use auth_cell::{IdentityResolver, SignOutHook};
use notification_cell::message::{reminder_text, whatsapp_share_link};
use shared_models::auth::Session;
use shared_models::practice::{
    wall_clock, Appointment, AppointmentChanges, NewAppointment, NewPatient, Patient,
};

use crate::models::{LoadOutcome, PracticeError, ReminderLink, ValidationError};
use crate::repository::{PracticeRepository, RepositoryFactory};
use crate::services::coordinator::MutationCoordinator;
use crate::services::impersonation::ImpersonationOverlay;
use crate::services::store::{CollectionStore, StoreSnapshot};
use crate::services::view::{Projection, View, ViewContext, ViewRouter};

struct RepositoryBinding {
    access_token: String,
    repository: Arc<dyn PracticeRepository>,
}

/// Everything one signed-in clinician works with: the store, the view router
/// and the impersonation overlay, wired to a repository bound to their token.
pub struct Workspace {
    authenticated_user: String,
    factory: Arc<dyn RepositoryFactory>,
    binding: RwLock<RepositoryBinding>,
    resolver: IdentityResolver,
    store: CollectionStore,
    overlay: ImpersonationOverlay,
    router: RwLock<ViewRouter>,
    // Serialises "pick effective user + start load" so the newest switch wins.
    switching: Mutex<()>,
}

impl Workspace {
    pub fn new(
        authenticated_user: &str,
        access_token: &str,
        factory: Arc<dyn RepositoryFactory>,
        resolver: IdentityResolver,
    ) -> Self {
        let binding = RepositoryBinding {
            access_token: access_token.to_string(),
            repository: factory.for_token(access_token),
        };
        Self {
            authenticated_user: authenticated_user.to_string(),
            factory,
            binding: RwLock::new(binding),
            resolver,
            store: CollectionStore::new(),
            overlay: ImpersonationOverlay::new(),
            router: RwLock::new(ViewRouter::new()),
            switching: Mutex::new(()),
        }
    }

    pub fn authenticated_user(&self) -> &str {
        &self.authenticated_user
    }

    /// Rebinds the repository when the caller presents a refreshed token.
    pub async fn bind_token(&self, access_token: &str) {
        let mut binding = self.binding.write().await;
        if binding.access_token != access_token {
            debug!("Rebinding repository for {}", self.authenticated_user);
            *binding = RepositoryBinding {
                access_token: access_token.to_string(),
                repository: self.factory.for_token(access_token),
            };
        }
    }

    async fn repository(&self) -> Arc<dyn PracticeRepository> {
        self.binding.read().await.repository.clone()
    }

    async fn access_token(&self) -> String {
        self.binding.read().await.access_token.clone()
    }

    pub async fn effective_user(&self) -> String {
        self.overlay.effective_user(&self.authenticated_user).await
    }

    pub async fn impersonating(&self) -> Option<String> {
        self.overlay.current().await
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot().await
    }

    pub async fn current_view(&self) -> View {
        self.router.read().await.current()
    }

    pub async fn navigate(&self, view: View) -> View {
        let previous = self.router.write().await.navigate(view);
        debug!("View {:?} -> {:?}", previous, view);
        previous
    }

    pub async fn render(&self, context: &ViewContext) -> Result<Projection, PracticeError> {
        let snapshot = self.store.snapshot().await;
        let projection = self.router.read().await.render(&snapshot, context)?;
        Ok(projection)
    }

    #[instrument(skip(self), fields(user = %self.authenticated_user))]
    pub async fn reload(&self) -> LoadOutcome {
        let ticket = {
            let _switching = self.switching.lock().await;
            let user = self.effective_user().await;
            self.store.begin_load(&user).await
        };
        let repository = self.repository().await;
        self.store.complete_load(ticket, repository.as_ref()).await
    }

    /// Loads on first use; later calls serve what the store holds.
    pub async fn ensure_loaded(&self) -> Option<LoadOutcome> {
        match self.store.effective_user().await {
            Some(_) => None,
            None => Some(self.reload().await),
        }
    }

    #[instrument(skip(self), fields(user = %self.authenticated_user))]
    pub async fn impersonate(&self, target_user_id: &str) -> Result<LoadOutcome, PracticeError> {
        let token = self.access_token().await;
        self.overlay
            .authorize(&self.resolver, &self.authenticated_user, &token)
            .await?;

        let ticket = {
            let _switching = self.switching.lock().await;
            self.overlay.set(&self.authenticated_user, target_user_id).await;
            let user = self.effective_user().await;
            self.store.begin_load(&user).await
        };
        let repository = self.repository().await;
        Ok(self.store.complete_load(ticket, repository.as_ref()).await)
    }

    pub async fn stop_impersonating(&self) -> LoadOutcome {
        let ticket = {
            let _switching = self.switching.lock().await;
            if let Some(previous) = self.overlay.clear().await {
                info!("{} stopped viewing as {}", self.authenticated_user, previous);
            }
            self.store.begin_load(&self.authenticated_user).await
        };
        let repository = self.repository().await;
        self.store.complete_load(ticket, repository.as_ref()).await
    }

    pub async fn create_patient(&self, draft: &NewPatient) -> Result<Patient, PracticeError> {
        let owner = self.effective_user().await;
        let repository = self.repository().await;
        MutationCoordinator::new(&self.store, repository.as_ref())
            .create_patient(&owner, draft)
            .await
    }

    pub async fn create_appointment(
        &self,
        draft: &NewAppointment,
        now: NaiveDateTime,
    ) -> Result<Appointment, PracticeError> {
        let owner = self.effective_user().await;
        let repository = self.repository().await;
        MutationCoordinator::new(&self.store, repository.as_ref())
            .create_appointment(&owner, draft, now)
            .await
    }

    pub async fn update_appointment(
        &self,
        appointment_id: &str,
        changes: &AppointmentChanges,
    ) -> Result<Appointment, PracticeError> {
        let repository = self.repository().await;
        MutationCoordinator::new(&self.store, repository.as_ref())
            .update_appointment(appointment_id, changes)
            .await
    }

    /// Pre-filled WhatsApp chat for reminding the patient of an appointment.
    pub async fn reminder_link(&self, appointment_id: &str) -> Result<ReminderLink, PracticeError> {
        let snapshot = self.store.snapshot().await;
        let appointment = snapshot
            .appointments
            .iter()
            .find(|a| a.id == appointment_id)
            .ok_or_else(|| ValidationError::UnknownAppointment(appointment_id.to_string()))?;

        let phone = snapshot
            .patients
            .iter()
            .find(|p| p.id == appointment.patient_id)
            .map(|p| p.phone.trim())
            .filter(|phone| phone.chars().any(|c| c.is_ascii_digit()))
            .ok_or_else(|| ValidationError::MissingPhone(appointment.patient_name.clone()))?;

        let text = reminder_text(
            &appointment.patient_name,
            &appointment.date.format("%Y-%m-%d").to_string(),
            &wall_clock::format(&appointment.time),
        );
        Ok(ReminderLink {
            appointment_id: appointment.id.clone(),
            url: whatsapp_share_link(phone, &text),
            text,
        })
    }

    /// Sign-out clears the override and the collections. A session for this
    /// user rebinds the repository and reloads.
    pub async fn on_session_change(&self, session: Option<&Session>) -> Option<LoadOutcome> {
        match session {
            None => {
                info!("Session ended for {}", self.authenticated_user);
                self.overlay.clear().await;
                self.store.reset().await;
                None
            }
            Some(session) if session.user.id == self.authenticated_user => {
                self.bind_token(&session.access_token).await;
                Some(self.reload().await)
            }
            Some(session) => {
                warn!(
                    "Ignoring session of {} in workspace of {}",
                    session.user.id, self.authenticated_user
                );
                None
            }
        }
    }

    /// Follows a session channel until its sender is dropped.
    pub fn watch_session(self: Arc<Self>, mut sessions: watch::Receiver<Option<Session>>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while sessions.changed().await.is_ok() {
                let session = sessions.borrow_and_update().clone();
                self.on_session_change(session.as_ref()).await;
            }
        })
    }
}

/// One workspace per authenticated user, created on first request.
pub struct WorkspaceRegistry {
    factory: Arc<dyn RepositoryFactory>,
    resolver: IdentityResolver,
    workspaces: RwLock<HashMap<String, Arc<Workspace>>>,
}

impl WorkspaceRegistry {
    pub fn new(factory: Arc<dyn RepositoryFactory>, resolver: IdentityResolver) -> Self {
        Self {
            factory,
            resolver,
            workspaces: RwLock::new(HashMap::new()),
        }
    }

    pub async fn workspace_for(&self, user_id: &str, access_token: &str) -> Arc<Workspace> {
        let existing = self.workspaces.read().await.get(user_id).cloned();
        if let Some(workspace) = existing {
            workspace.bind_token(access_token).await;
            return workspace;
        }

        let mut workspaces = self.workspaces.write().await;
        let workspace = workspaces
            .entry(user_id.to_string())
            .or_insert_with(|| {
                info!("Opening workspace for {}", user_id);
                Arc::new(Workspace::new(
                    user_id,
                    access_token,
                    self.factory.clone(),
                    self.resolver.clone(),
                ))
            })
            .clone();
        drop(workspaces);

        workspace.bind_token(access_token).await;
        workspace
    }

    /// Drops the user's workspace. Returns whether one was open.
    pub async fn end_session(&self, user_id: &str) -> bool {
        let removed = self.workspaces.write().await.remove(user_id);
        match removed {
            Some(workspace) => {
                workspace.on_session_change(None).await;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SignOutHook for WorkspaceRegistry {
    async fn signed_out(&self, user_id: &str) {
        if self.end_session(user_id).await {
            info!("Closed workspace of {} on sign-out", user_id);
        }
    }
}
