use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::practice::wall_clock;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NotificationError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Request to {channel} failed: {message}")]
    Request { channel: &'static str, message: String },

    #[error("{channel} rejected the message ({status}): {message}")]
    Rejected {
        channel: &'static str,
        status: u16,
        message: String,
    },

    #[error("Could not read upcoming appointments: {0}")]
    Source(String),
}

/// An upcoming appointment joined with the contact details of its patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderTarget {
    pub appointment_id: String,
    pub patient_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "wall_clock")]
    pub time: NaiveTime,
}

impl ReminderTarget {
    pub fn display_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn display_time(&self) -> String {
        wall_clock::format(&self.time)
    }
}

/// Per-run tally. A failed send never stops the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ReminderReport {
    pub fn total(&self) -> usize {
        self.sent + self.skipped + self.failed
    }
}
