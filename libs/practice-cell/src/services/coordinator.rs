use chrono::NaiveDateTime;
use tracing::{debug, info, instrument, warn};

use shared_models::practice::{Appointment, AppointmentChanges, NewAppointment, NewPatient, Patient};

use crate::models::{PracticeError, ValidationError};
use crate::repository::PracticeRepository;
use crate::services::store::CollectionStore;
use crate::services::validation::{validate_new_appointment, validate_new_patient};

/// Lifecycle of a single write. There is no retrying phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Idle,
    Submitting,
    Applied,
    Failed,
}

/// Counts a write as pending for as long as it is alive.
struct PendingWrite<'a> {
    store: &'a CollectionStore,
    label: &'static str,
    phase: MutationPhase,
}

impl<'a> PendingWrite<'a> {
    fn submit(store: &'a CollectionStore, label: &'static str) -> Self {
        store.write_started();
        debug!("{}: {:?} -> {:?}", label, MutationPhase::Idle, MutationPhase::Submitting);
        Self {
            store,
            label,
            phase: MutationPhase::Submitting,
        }
    }

    fn settle(mut self, phase: MutationPhase) {
        debug!("{}: {:?} -> {:?}", self.label, self.phase, phase);
        self.phase = phase;
    }
}

impl Drop for PendingWrite<'_> {
    fn drop(&mut self) {
        self.store.write_settled();
    }
}

/// Applies creates and updates to the store and the repository in the order each requires.
pub struct MutationCoordinator<'a> {
    store: &'a CollectionStore,
    repository: &'a dyn PracticeRepository,
}

impl<'a> MutationCoordinator<'a> {
    pub fn new(store: &'a CollectionStore, repository: &'a dyn PracticeRepository) -> Self {
        Self { store, repository }
    }

    /// Remote first; the patient joins the collection only once stored.
    #[instrument(skip(self, draft))]
    pub async fn create_patient(
        &self,
        owner_id: &str,
        draft: &NewPatient,
    ) -> Result<Patient, PracticeError> {
        validate_new_patient(draft)?;

        let write = PendingWrite::submit(self.store, "create_patient");
        match self.repository.create_patient(owner_id, draft).await {
            Ok(patient) => {
                write.settle(MutationPhase::Applied);
                if self.store.append_patient(owner_id, patient.clone()).await.is_none() {
                    debug!("Effective user changed, not showing patient {}", patient.id);
                }
                info!("Created patient {}", patient.id);
                Ok(patient)
            }
            Err(e) => {
                write.settle(MutationPhase::Failed);
                warn!("Error creating patient: {}", e);
                Err(e.into())
            }
        }
    }

    /// Remote first, then appended and re-sorted by (date, time).
    #[instrument(skip(self, draft))]
    pub async fn create_appointment(
        &self,
        owner_id: &str,
        draft: &NewAppointment,
        now: NaiveDateTime,
    ) -> Result<Appointment, PracticeError> {
        validate_new_appointment(draft, now)?;

        let write = PendingWrite::submit(self.store, "create_appointment");
        match self.repository.create_appointment(owner_id, draft).await {
            Ok(appointment) => {
                write.settle(MutationPhase::Applied);
                self.store.append_appointment(owner_id, appointment.clone()).await;
                info!("Created appointment {}", appointment.id);
                Ok(appointment)
            }
            Err(e) => {
                write.settle(MutationPhase::Failed);
                warn!("Error creating appointment: {}", e);
                Err(e.into())
            }
        }
    }

    /// Local first. On completion the stored row replaces the optimistic value,
    /// and on failure the previous value comes back, but only where nothing
    /// newer has been applied locally in the meantime.
    #[instrument(skip(self, changes))]
    pub async fn update_appointment(
        &self,
        appointment_id: &str,
        changes: &AppointmentChanges,
    ) -> Result<Appointment, PracticeError> {
        let (previous, optimistic) = self
            .store
            .apply_changes(appointment_id, changes)
            .await
            .ok_or_else(|| ValidationError::UnknownAppointment(appointment_id.to_string()))?;

        let write = PendingWrite::submit(self.store, "update_appointment");
        match self.repository.update_appointment(&optimistic).await {
            Ok(stored) => {
                write.settle(MutationPhase::Applied);
                if !self.store.compare_and_set(&optimistic, stored.clone()).await {
                    debug!("Newer local edit of {} kept over the stored row", appointment_id);
                }
                Ok(stored)
            }
            Err(e) => {
                write.settle(MutationPhase::Failed);
                warn!("Error updating appointment {}: {}", appointment_id, e);
                if !self.store.compare_and_set(&optimistic, previous).await {
                    debug!("Newer local edit of {} kept after failed write", appointment_id);
                }
                Err(e.into())
            }
        }
    }
}
