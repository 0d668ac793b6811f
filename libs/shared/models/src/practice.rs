use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display name used when an appointment's patient cannot be joined.
pub const UNKNOWN_PATIENT_NAME: &str = "Unknown";

// ==============================================================================
// PATIENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub next_session: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPatient {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: Option<String>,
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentType {
    Online,
    InPerson,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Online => write!(f, "ONLINE"),
            AppointmentType::InPerson => write!(f, "IN_PERSON"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Statuses that still warrant a reminder.
    pub fn is_upcoming(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "SCHEDULED"),
            AppointmentStatus::Confirmed => write!(f, "CONFIRMED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    /// Copied from the patient row when the appointment is read. Not refreshed on rename.
    pub patient_name: String,
    pub date: NaiveDate,
    #[serde(with = "wall_clock")]
    pub time: NaiveTime,
    pub duration_minutes: u32,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Appointment {
    pub fn sort_key(&self) -> (NaiveDate, NaiveTime) {
        (self.date, self.time)
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// Applies the editable fields of a session-detail save.
    pub fn with_changes(&self, changes: &AppointmentChanges) -> Appointment {
        let mut updated = self.clone();
        if let Some(status) = changes.status {
            updated.status = status;
        }
        if let Some(notes) = &changes.notes {
            updated.notes = Some(notes.clone());
        }
        if let Some(summary) = &changes.summary {
            updated.summary = Some(summary.clone());
        }
        if let Some(date) = changes.date {
            updated.date = date;
        }
        if let Some(time) = changes.time {
            updated.time = wall_clock::truncate(time);
        }
        updated
    }
}

/// Sorts by (date, time) ascending. Stable, so equal slots keep insertion order.
pub fn sort_appointments(appointments: &mut [Appointment]) {
    appointments.sort_by_key(Appointment::sort_key);
}

pub fn sort_patients(patients: &mut [Patient]) {
    patients.sort_by(|a, b| a.name.cmp(&b.name));
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewAppointment {
    pub patient_id: String,
    pub date: NaiveDate,
    #[serde(with = "wall_clock")]
    pub time: NaiveTime,
    pub duration_minutes: u32,
    pub appointment_type: AppointmentType,
}

impl NewAppointment {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppointmentChanges {
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
    pub summary: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default, with = "wall_clock::option")]
    pub time: Option<NaiveTime>,
}

/// `HH:MM` wall-clock times. Reads also accept `HH:MM:SS` and drop the seconds.
pub mod wall_clock {
    use chrono::{NaiveTime, Timelike};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn truncate(time: NaiveTime) -> NaiveTime {
        time.with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(time)
    }

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let trimmed = raw.trim();
        let minutes = trimmed.get(..5).unwrap_or(trimmed);
        NaiveTime::parse_from_str(minutes, "%H:%M").ok()
    }

    pub fn format(time: &NaiveTime) -> String {
        time.format("%H:%M").to_string()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid wall-clock time: {}", raw)))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => serializer.serialize_some(&super::format(t)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid wall-clock time: {}", raw))),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn appointment(id: &str, date: &str, time: &str) -> Appointment {
        Appointment {
            id: id.to_string(),
            patient_id: "pat_1".to_string(),
            patient_name: "John Doe".to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            time: wall_clock::parse(time).unwrap(),
            duration_minutes: 50,
            appointment_type: AppointmentType::Online,
            status: AppointmentStatus::Scheduled,
            notes: None,
            summary: None,
        }
    }

    #[test]
    fn test_same_day_sorts_by_time() {
        let mut list = vec![
            appointment("b", "2026-11-02", "14:00"),
            appointment("a", "2026-11-02", "10:00"),
            appointment("c", "2026-11-01", "18:30"),
        ];
        sort_appointments(&mut list);

        let ids: Vec<&str> = list.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_time_with_seconds_is_truncated() {
        let parsed: Appointment = serde_json::from_value(json!({
            "id": "apt_1",
            "patient_id": "pat_1",
            "patient_name": "John Doe",
            "date": "2026-11-02",
            "time": "09:15:00",
            "duration_minutes": 50,
            "appointment_type": "IN_PERSON",
            "status": "CONFIRMED"
        }))
        .unwrap();

        assert_eq!(wall_clock::format(&parsed.time), "09:15");
        assert_eq!(parsed.appointment_type, AppointmentType::InPerson);
        assert_eq!(serde_json::to_value(&parsed).unwrap()["time"], "09:15");
    }

    #[test]
    fn test_changes_only_touch_given_fields() {
        let original = appointment("apt_1", "2026-11-02", "10:00");
        let changes = AppointmentChanges {
            status: Some(AppointmentStatus::Completed),
            summary: Some("Calm session.".to_string()),
            ..AppointmentChanges::default()
        };

        let updated = original.with_changes(&changes);
        assert_eq!(updated.status, AppointmentStatus::Completed);
        assert_eq!(updated.summary.as_deref(), Some("Calm session."));
        assert_eq!(updated.date, original.date);
        assert_eq!(updated.notes, None);
    }

    #[test]
    fn test_only_scheduled_and_confirmed_are_upcoming() {
        assert!(AppointmentStatus::Scheduled.is_upcoming());
        assert!(AppointmentStatus::Confirmed.is_upcoming());
        assert!(!AppointmentStatus::Completed.is_upcoming());
        assert!(!AppointmentStatus::Cancelled.is_upcoming());
    }
}
