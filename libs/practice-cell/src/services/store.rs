use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::try_join;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use shared_models::practice::{
    sort_appointments, sort_patients, Appointment, AppointmentChanges, Patient,
};

use crate::models::LoadOutcome;
use crate::repository::{PracticeRepository, RepositoryError};

/// What every projection reads from.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StoreSnapshot {
    pub effective_user: Option<String>,
    pub patients: Vec<Patient>,
    pub appointments: Vec<Appointment>,
    pub loading: bool,
    pub pending_writes: usize,
}

#[derive(Default)]
struct StoreState {
    effective_user: Option<String>,
    patients: Vec<Patient>,
    appointments: Vec<Appointment>,
    loading: bool,
    generation: u64,
}

/// Issued by `begin_load`. Only the newest ticket may publish its result.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    user_id: String,
}

impl LoadTicket {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Patients and appointments of the effective user.
#[derive(Default)]
pub struct CollectionStore {
    state: RwLock<StoreState>,
    pending_writes: AtomicUsize,
}

impl CollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read().await;
        StoreSnapshot {
            effective_user: state.effective_user.clone(),
            patients: state.patients.clone(),
            appointments: state.appointments.clone(),
            loading: state.loading,
            pending_writes: self.pending_writes.load(Ordering::SeqCst),
        }
    }

    pub async fn effective_user(&self) -> Option<String> {
        self.state.read().await.effective_user.clone()
    }

    /// Marks a load for `user_id` as in flight and invalidates older ones.
    /// Switching to another user drops the previous user's collections at once.
    pub async fn begin_load(&self, user_id: &str) -> LoadTicket {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.loading = true;

        if state.effective_user.as_deref() != Some(user_id) {
            info!("Effective user changed to {}", user_id);
            state.effective_user = Some(user_id.to_string());
            state.patients.clear();
            state.appointments.clear();
        }

        LoadTicket {
            generation: state.generation,
            user_id: user_id.to_string(),
        }
    }

    /// Fetches both collections concurrently and publishes them if the ticket is still current.
    pub async fn complete_load(
        &self,
        ticket: LoadTicket,
        repository: &dyn PracticeRepository,
    ) -> LoadOutcome {
        let fetched = try_join(
            repository.list_patients(&ticket.user_id),
            repository.list_appointments(&ticket.user_id),
        )
        .await;
        self.finish_load(ticket, fetched).await
    }

    pub async fn load(&self, repository: &dyn PracticeRepository, user_id: &str) -> LoadOutcome {
        let ticket = self.begin_load(user_id).await;
        self.complete_load(ticket, repository).await
    }

    async fn finish_load(
        &self,
        ticket: LoadTicket,
        fetched: Result<(Vec<Patient>, Vec<Appointment>), RepositoryError>,
    ) -> LoadOutcome {
        let mut state = self.state.write().await;
        if ticket.generation != state.generation {
            debug!("Discarding superseded load for {}", ticket.user_id);
            return LoadOutcome::Superseded;
        }
        state.loading = false;

        match fetched {
            Ok((mut patients, mut appointments)) => {
                sort_patients(&mut patients);
                sort_appointments(&mut appointments);
                let outcome = LoadOutcome::Loaded {
                    patients: patients.len(),
                    appointments: appointments.len(),
                };
                state.patients = patients;
                state.appointments = appointments;
                outcome
            }
            Err(e) => {
                warn!("Error loading workspace for {}: {}", ticket.user_id, e);
                LoadOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Forgets everything, including any load still in flight.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        let generation = state.generation + 1;
        *state = StoreState {
            generation,
            ..StoreState::default()
        };
    }

    pub async fn find_appointment(&self, appointment_id: &str) -> Option<Appointment> {
        self.state
            .read()
            .await
            .appointments
            .iter()
            .find(|a| a.id == appointment_id)
            .cloned()
    }

    /// Appends only while `owner_id` is still the effective user. Returns the new length.
    pub(crate) async fn append_patient(&self, owner_id: &str, patient: Patient) -> Option<usize> {
        let mut state = self.state.write().await;
        if state.effective_user.as_deref() != Some(owner_id) {
            return None;
        }
        state.patients.push(patient);
        sort_patients(&mut state.patients);
        Some(state.patients.len())
    }

    pub(crate) async fn append_appointment(
        &self,
        owner_id: &str,
        appointment: Appointment,
    ) -> Option<usize> {
        let mut state = self.state.write().await;
        if state.effective_user.as_deref() != Some(owner_id) {
            return None;
        }
        state.appointments.push(appointment);
        sort_appointments(&mut state.appointments);
        Some(state.appointments.len())
    }

    /// Rewrites the appointment in place and returns `(previous, optimistic)`.
    pub(crate) async fn apply_changes(
        &self,
        appointment_id: &str,
        changes: &AppointmentChanges,
    ) -> Option<(Appointment, Appointment)> {
        let mut state = self.state.write().await;
        let slot = state.appointments.iter_mut().find(|a| a.id == appointment_id)?;
        let previous = slot.clone();
        *slot = previous.with_changes(changes);
        let optimistic = slot.clone();
        sort_appointments(&mut state.appointments);
        Some((previous, optimistic))
    }

    /// Replaces the appointment only if it still equals `expected`.
    pub(crate) async fn compare_and_set(
        &self,
        expected: &Appointment,
        replacement: Appointment,
    ) -> bool {
        let mut state = self.state.write().await;
        let Some(slot) = state.appointments.iter_mut().find(|a| a.id == expected.id) else {
            return false;
        };
        if *slot != *expected {
            return false;
        }
        *slot = replacement;
        sort_appointments(&mut state.appointments);
        true
    }

    pub(crate) fn write_started(&self) {
        self.pending_writes.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn write_settled(&self) {
        self.pending_writes.fetch_sub(1, Ordering::SeqCst);
    }
}
