use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate, NaiveTime};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::practice::{
    sort_appointments, sort_patients, Appointment, AppointmentStatus, AppointmentType,
    NewAppointment, NewPatient, Patient, UNKNOWN_PATIENT_NAME,
};

use super::{PracticeRepository, RepositoryError};

struct PatientRecord {
    owner_id: String,
    patient: Patient,
}

/// `patient_name` is left empty in storage and filled in on every read.
struct AppointmentRecord {
    owner_id: String,
    appointment: Appointment,
}

#[derive(Default)]
struct MemoryState {
    patients: Vec<PatientRecord>,
    appointments: Vec<AppointmentRecord>,
    seeded_owners: HashSet<String>,
}

impl MemoryState {
    fn patient_name(&self, owner_id: &str, patient_id: &str) -> String {
        self.patients
            .iter()
            .find(|r| r.owner_id == owner_id && r.patient.id == patient_id)
            .map(|r| r.patient.name.clone())
            .unwrap_or_else(|| UNKNOWN_PATIENT_NAME.to_string())
    }

    fn joined(&self, record: &AppointmentRecord) -> Appointment {
        Appointment {
            patient_name: self.patient_name(&record.owner_id, &record.appointment.patient_id),
            ..record.appointment.clone()
        }
    }
}

fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Process-local repository used when no data backend is configured.
#[derive(Default)]
pub struct InMemoryRepository {
    state: RwLock<MemoryState>,
    seed_demo: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every owner sees the three demo patients and their sessions on first access.
    pub fn with_demo_data() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            seed_demo: true,
        }
    }

    fn ensure_seeded(&self, state: &mut MemoryState, owner_id: &str) {
        if !self.seed_demo || !state.seeded_owners.insert(owner_id.to_string()) {
            return;
        }
        debug!("Seeding demo data for {}", owner_id);
        seed_demo(state, owner_id, Local::now().date_naive());
    }
}

fn seed_demo(state: &mut MemoryState, owner_id: &str, today: NaiveDate) {
    let people = [
        ("John Doe", "john.d@example.com", "+1 555 0101", "Anxiety related to work performance."),
        ("Sarah Smith", "sarah.s@example.com", "+1 555 0102", "Processing childhood trauma."),
        ("Michael Brown", "m.brown@example.com", "+1 555 0103", "Relationship counseling."),
    ];
    let slots = [
        (today, (10, 0), AppointmentType::Online, AppointmentStatus::Scheduled),
        (today, (14, 0), AppointmentType::InPerson, AppointmentStatus::Confirmed),
        (today + Duration::days(1), (11, 0), AppointmentType::Online, AppointmentStatus::Scheduled),
    ];

    for ((name, email, phone, notes), (date, (hour, minute), appointment_type, status)) in
        people.into_iter().zip(slots)
    {
        let patient_id = new_id("pat");
        state.patients.push(PatientRecord {
            owner_id: owner_id.to_string(),
            patient: Patient {
                id: patient_id.clone(),
                name: name.to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
                notes: Some(notes.to_string()),
                next_session: Some(date),
            },
        });
        state.appointments.push(AppointmentRecord {
            owner_id: owner_id.to_string(),
            appointment: Appointment {
                id: new_id("apt"),
                patient_id,
                patient_name: String::new(),
                date,
                time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
                duration_minutes: 50,
                appointment_type,
                status,
                notes: None,
                summary: None,
            },
        });
    }
}

#[async_trait]
impl PracticeRepository for InMemoryRepository {
    async fn list_patients(&self, owner_id: &str) -> Result<Vec<Patient>, RepositoryError> {
        let mut state = self.state.write().await;
        self.ensure_seeded(&mut state, owner_id);

        let mut patients: Vec<Patient> = state
            .patients
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .map(|r| r.patient.clone())
            .collect();
        sort_patients(&mut patients);
        Ok(patients)
    }

    async fn list_appointments(&self, owner_id: &str) -> Result<Vec<Appointment>, RepositoryError> {
        let mut state = self.state.write().await;
        self.ensure_seeded(&mut state, owner_id);

        let mut appointments: Vec<Appointment> = state
            .appointments
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .map(|r| state.joined(r))
            .collect();
        sort_appointments(&mut appointments);
        Ok(appointments)
    }

    async fn create_patient(
        &self,
        owner_id: &str,
        patient: &NewPatient,
    ) -> Result<Patient, RepositoryError> {
        let mut state = self.state.write().await;
        self.ensure_seeded(&mut state, owner_id);

        let created = Patient {
            id: new_id("pat"),
            name: patient.name.clone(),
            email: patient.email.clone(),
            phone: patient.phone.clone(),
            notes: patient.notes.clone(),
            // Dated from creation until an appointment is booked
            next_session: Some(Local::now().date_naive()),
        };
        state.patients.push(PatientRecord {
            owner_id: owner_id.to_string(),
            patient: created.clone(),
        });
        Ok(created)
    }

    async fn create_appointment(
        &self,
        owner_id: &str,
        appointment: &NewAppointment,
    ) -> Result<Appointment, RepositoryError> {
        let mut state = self.state.write().await;
        self.ensure_seeded(&mut state, owner_id);

        let record = AppointmentRecord {
            owner_id: owner_id.to_string(),
            appointment: Appointment {
                id: new_id("apt"),
                patient_id: appointment.patient_id.clone(),
                patient_name: String::new(),
                date: appointment.date,
                time: appointment.time,
                duration_minutes: appointment.duration_minutes,
                appointment_type: appointment.appointment_type,
                status: AppointmentStatus::Scheduled,
                notes: None,
                summary: None,
            },
        };
        let created = state.joined(&record);
        state.appointments.push(record);
        Ok(created)
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<Appointment, RepositoryError> {
        let mut state = self.state.write().await;

        let index = state
            .appointments
            .iter()
            .position(|r| r.appointment.id == appointment.id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Appointment",
                id: appointment.id.clone(),
            })?;

        let stored = &mut state.appointments[index].appointment;
        stored.status = appointment.status;
        stored.notes = appointment.notes.clone();
        stored.summary = appointment.summary.clone();
        stored.date = appointment.date;
        stored.time = appointment.time;

        Ok(state.joined(&state.appointments[index]))
    }
}
