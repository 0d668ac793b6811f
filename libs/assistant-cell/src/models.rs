use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SUMMARY_KEY_MISSING: &str = "API Key missing. Cannot generate summary.";
pub const KEY_MISSING: &str = "API Key missing.";
pub const SERVICE_ERROR: &str = "Error communicating with AI service.";
pub const EMPTY_SUMMARY: &str = "Could not generate summary.";
pub const EMPTY_EMAIL_DRAFT: &str = "Could not generate email draft.";
pub const EMPTY_SUGGESTIONS: &str = "Could not generate suggestions.";

pub const DEFAULT_QUESTION_CONTEXT: &str = "First session, anxious patient.";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssistantError {
    #[error("Text generation request failed: {0}")]
    Request(String),

    #[error("Text generation service answered {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Unexpected text generation response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        AssistantError::Request(err.to_string())
    }
}

/// Generated text, or the placeholder shown in its place.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeneratedText {
    pub text: String,
    pub degraded: bool,
}

impl GeneratedText {
    pub fn generated(text: String) -> Self {
        Self {
            text,
            degraded: false,
        }
    }

    pub fn placeholder(text: &str) -> Self {
        Self {
            text: text.to_string(),
            degraded: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryRequest {
    pub notes: String,
    pub patient_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderEmailRequest {
    pub patient_name: String,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionsRequest {
    #[serde(default)]
    pub context: Option<String>,
}
