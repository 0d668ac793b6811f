use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::practice::{wall_clock, AppointmentStatus, UNKNOWN_PATIENT_NAME};

use crate::models::{NotificationError, ReminderTarget};

/// Where the job finds appointments that are due a reminder.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReminderSource: Send + Sync {
    /// Upcoming appointments dated within `[from, to]`, in date/time order.
    async fn upcoming(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ReminderTarget>, NotificationError>;
}

#[derive(Debug, Deserialize)]
struct ContactRow {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReminderRow {
    id: String,
    date: NaiveDate,
    time: String,
    status: AppointmentStatus,
    patients: Option<ContactRow>,
}

impl ReminderRow {
    fn into_target(self) -> Option<ReminderTarget> {
        let Some(time) = wall_clock::parse(&self.time) else {
            warn!("Appointment {} has an unreadable time {:?}", self.id, self.time);
            return None;
        };
        let contact = self.patients.unwrap_or(ContactRow {
            name: None,
            email: None,
            phone: None,
        });
        Some(ReminderTarget {
            appointment_id: self.id,
            patient_name: contact
                .name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_PATIENT_NAME.to_string()),
            email: contact.email,
            phone: contact.phone,
            date: self.date,
            time,
        })
    }
}

/// Reads every clinician's appointments with the service-role key.
pub struct SupabaseReminderSource {
    supabase: SupabaseClient,
}

impl SupabaseReminderSource {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_reminder_source_configured() {
            return Err(NotificationError::NotConfigured("Supabase service role"));
        }
        Ok(Self {
            supabase: SupabaseClient::with_service_role(config),
        })
    }
}

#[async_trait]
impl ReminderSource for SupabaseReminderSource {
    #[instrument(skip(self))]
    async fn upcoming(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ReminderTarget>, NotificationError> {
        let path = format!(
            "/rest/v1/appointments?select=id,date,time,status,patients(name,email,phone)&date=gte.{}&date=lte.{}&status=not.in.(CANCELLED,COMPLETED)&order=date.asc,time.asc",
            from, to
        );
        debug!("Fetching reminder candidates: {}", path);

        let rows: Vec<ReminderRow> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| NotificationError::Source(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter(|row| row.status.is_upcoming())
            .filter_map(ReminderRow::into_target)
            .collect())
    }
}

/// Inclusive end of the reminder window.
pub fn window_end(today: NaiveDate, window_days: i64) -> NaiveDate {
    let days = u64::try_from(window_days.max(0)).unwrap_or(0);
    today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_patient_reads_as_unknown() {
        let row: ReminderRow = serde_json::from_value(json!({
            "id": "apt_9",
            "date": "2026-10-18",
            "time": "09:30:00",
            "status": "CONFIRMED",
            "patients": null
        }))
        .unwrap();

        let target = row.into_target().unwrap();
        assert_eq!(target.patient_name, "Unknown");
        assert_eq!(target.display_time(), "09:30");
        assert_eq!(target.email, None);
    }

    #[test]
    fn test_window_end_is_inclusive_and_clamped() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(window_end(today, 7), NaiveDate::from_ymd_opt(2026, 10, 23).unwrap());
        assert_eq!(window_end(today, -3), today);
    }
}
