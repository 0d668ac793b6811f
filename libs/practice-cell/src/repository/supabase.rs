use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::practice::{
    wall_clock, Appointment, AppointmentStatus, AppointmentType, NewAppointment, NewPatient,
    Patient, UNKNOWN_PATIENT_NAME,
};

use super::{PracticeRepository, RepositoryError};

/// Appointment reads embed the patient's name through the foreign key.
const APPOINTMENT_SELECT: &str = "*,patients(name)";

#[derive(Debug, Deserialize)]
struct PatientRow {
    id: String,
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    next_session: Option<NaiveDate>,
    #[serde(default)]
    created_at: Option<String>,
}

/// Date part of a PostgREST timestamp such as `2024-01-01T00:00:00+00:00`.
fn timestamp_date(raw: &str) -> Option<NaiveDate> {
    raw.get(..10)
        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        // The patients table has no schedule column; creation day stands in
        let next_session = row
            .next_session
            .or_else(|| row.created_at.as_deref().and_then(timestamp_date));
        Patient {
            id: row.id,
            name: row.name,
            email: row.email.unwrap_or_default(),
            phone: row.phone.unwrap_or_default(),
            notes: row.notes,
            next_session,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddedPatient {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppointmentRow {
    id: String,
    patient_id: String,
    date: NaiveDate,
    time: String,
    duration: u32,
    #[serde(rename = "type")]
    appointment_type: AppointmentType,
    status: AppointmentStatus,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    patients: Option<EmbeddedPatient>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = RepositoryError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let time = wall_clock::parse(&row.time)
            .ok_or_else(|| RepositoryError::Decode(format!("invalid time '{}'", row.time)))?;
        let patient_name = row
            .patients
            .and_then(|p| p.name)
            .unwrap_or_else(|| UNKNOWN_PATIENT_NAME.to_string());

        Ok(Appointment {
            id: row.id,
            patient_id: row.patient_id,
            patient_name,
            date: row.date,
            time,
            duration_minutes: row.duration,
            appointment_type: row.appointment_type,
            status: row.status,
            notes: row.notes,
            summary: row.summary,
        })
    }
}

fn decode_rows<T: for<'de> Deserialize<'de>>(rows: Vec<Value>) -> Result<Vec<T>, RepositoryError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| RepositoryError::Decode(e.to_string())))
        .collect()
}

fn first_appointment(rows: Vec<Value>, id: &str) -> Result<Appointment, RepositoryError> {
    decode_rows::<AppointmentRow>(rows)?
        .into_iter()
        .next()
        .ok_or_else(|| RepositoryError::NotFound {
            entity: "Appointment",
            id: id.to_string(),
        })?
        .try_into()
}

/// PostgREST-backed repository acting with the caller's access token, so
/// row-level security scopes every query to the signed-in account.
pub struct SupabaseRepository {
    supabase: SupabaseClient,
    access_token: String,
}

impl SupabaseRepository {
    pub fn new(config: &AppConfig, access_token: &str) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            access_token: access_token.to_string(),
        }
    }

    async fn get_rows(&self, path: &str) -> Result<Vec<Value>, RepositoryError> {
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(&self.access_token), None)
            .await?;
        Ok(rows)
    }

    async fn write_rows(&self, method: Method, path: &str, body: Value) -> Result<Vec<Value>, RepositoryError> {
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                method,
                path,
                Some(&self.access_token),
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl PracticeRepository for SupabaseRepository {
    #[instrument(skip(self))]
    async fn list_patients(&self, owner_id: &str) -> Result<Vec<Patient>, RepositoryError> {
        let path = format!(
            "/rest/v1/patients?user_id=eq.{}&select=*&order=name.asc",
            urlencoding::encode(owner_id)
        );
        let rows = self.get_rows(&path).await?;
        Ok(decode_rows::<PatientRow>(rows)?.into_iter().map(Patient::from).collect())
    }

    #[instrument(skip(self))]
    async fn list_appointments(&self, owner_id: &str) -> Result<Vec<Appointment>, RepositoryError> {
        let path = format!(
            "/rest/v1/appointments?user_id=eq.{}&select={}&order=date.asc,time.asc",
            urlencoding::encode(owner_id),
            APPOINTMENT_SELECT
        );
        let rows = self.get_rows(&path).await?;
        decode_rows::<AppointmentRow>(rows)?
            .into_iter()
            .map(Appointment::try_from)
            .collect()
    }

    #[instrument(skip(self, patient))]
    async fn create_patient(
        &self,
        owner_id: &str,
        patient: &NewPatient,
    ) -> Result<Patient, RepositoryError> {
        debug!("Creating patient for {}", owner_id);

        let body = json!({
            "user_id": owner_id,
            "name": patient.name,
            "email": patient.email,
            "phone": patient.phone,
            "notes": patient.notes,
        });
        let rows = self.write_rows(Method::POST, "/rest/v1/patients", body).await?;

        decode_rows::<PatientRow>(rows)?
            .into_iter()
            .next()
            .map(Patient::from)
            .ok_or_else(|| RepositoryError::Remote("Insert returned no patient row".to_string()))
    }

    #[instrument(skip(self, appointment))]
    async fn create_appointment(
        &self,
        owner_id: &str,
        appointment: &NewAppointment,
    ) -> Result<Appointment, RepositoryError> {
        debug!("Creating appointment for patient {}", appointment.patient_id);

        let body = json!({
            "user_id": owner_id,
            "patient_id": appointment.patient_id,
            "date": appointment.date,
            "time": wall_clock::format(&appointment.time),
            "duration": appointment.duration_minutes,
            "type": appointment.appointment_type,
            "status": AppointmentStatus::Scheduled,
        });
        let path = format!("/rest/v1/appointments?select={}", APPOINTMENT_SELECT);
        let rows = self.write_rows(Method::POST, &path, body).await?;

        first_appointment(rows, "new")
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    async fn update_appointment(&self, appointment: &Appointment) -> Result<Appointment, RepositoryError> {
        let body = json!({
            "status": appointment.status,
            "notes": appointment.notes,
            "summary": appointment.summary,
            "date": appointment.date,
            "time": wall_clock::format(&appointment.time),
        });
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&select={}",
            urlencoding::encode(&appointment.id),
            APPOINTMENT_SELECT
        );
        let rows = self.write_rows(Method::PATCH, &path, body).await?;

        first_appointment(rows, &appointment.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_without_embed_falls_back_to_unknown() {
        let row: AppointmentRow = serde_json::from_value(json!({
            "id": "apt_1",
            "patient_id": "pat_gone",
            "date": "2026-11-02",
            "time": "10:00:00",
            "duration": 50,
            "type": "IN_PERSON",
            "status": "CONFIRMED",
            "patients": null
        }))
        .unwrap();

        let appointment = Appointment::try_from(row).unwrap();
        assert_eq!(appointment.patient_name, UNKNOWN_PATIENT_NAME);
        assert_eq!(wall_clock::format(&appointment.time), "10:00");
        assert_eq!(appointment.appointment_type, AppointmentType::InPerson);
    }

    #[test]
    fn test_bad_time_is_a_decode_error() {
        let row: AppointmentRow = serde_json::from_value(json!({
            "id": "apt_1",
            "patient_id": "pat_1",
            "date": "2026-11-02",
            "time": "noon",
            "duration": 50,
            "type": "ONLINE",
            "status": "SCHEDULED"
        }))
        .unwrap();

        assert!(matches!(Appointment::try_from(row), Err(RepositoryError::Decode(_))));
    }
}
