use std::sync::Arc;

use tracing::{error, instrument, warn};

use shared_config::AppConfig;

use crate::models::{
    GeneratedText, DEFAULT_QUESTION_CONTEXT, EMPTY_EMAIL_DRAFT, EMPTY_SUGGESTIONS, EMPTY_SUMMARY,
    KEY_MISSING, SERVICE_ERROR, SUMMARY_KEY_MISSING,
};
use crate::services::gemini::{GeminiClient, TextGenerator};

pub fn clinical_summary_prompt(notes: &str, patient_name: &str) -> String {
    format!(
        "You are an assistant to a psychologist.\n\
         Please rewrite the following raw session notes for patient \"{}\" into a concise, professional clinical summary.\n\
         Maintain a neutral, non-diagnostic tone. Focus on observations and reported feelings.\n\n\
         Raw Notes:\n{}",
        patient_name, notes
    )
}

pub fn reminder_email_prompt(patient_name: &str, date: &str, time: &str) -> String {
    format!(
        "Draft a short, warm, and professional email reminder for a therapy session.\n\
         Patient: {}\nDate: {}\nTime: {}\n\n\
         The tone should be supportive but professional. Do not include subject lines, just the body.",
        patient_name, date, time
    )
}

pub fn therapeutic_questions_prompt(context: &str) -> String {
    format!(
        "Based on the following context, suggest 3 open-ended, non-intrusive questions a therapist might ask to facilitate reflection.\n\
         Context: {}\n\nFormat as a bulleted list.",
        context
    )
}

/// Clinical writing helpers. Every call yields text: an unconfigured or
/// failing service produces a fixed placeholder instead of an error.
#[derive(Clone)]
pub struct AssistantService {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl AssistantService {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        if config.is_ai_configured() {
            Self::new(Some(Arc::new(GeminiClient::new(config))))
        } else {
            warn!("GEMINI_API_KEY not set, assistant answers with placeholders");
            Self::new(None)
        }
    }

    async fn complete(&self, prompt: String, key_missing: &str, empty: &str) -> GeneratedText {
        let Some(generator) = &self.generator else {
            return GeneratedText::placeholder(key_missing);
        };

        match generator.generate(&prompt).await {
            Ok(text) if text.trim().is_empty() => GeneratedText::placeholder(empty),
            Ok(text) => GeneratedText::generated(text),
            Err(e) => {
                error!("Text generation failed: {}", e);
                GeneratedText::placeholder(SERVICE_ERROR)
            }
        }
    }

    #[instrument(skip(self, notes))]
    pub async fn clinical_summary(&self, notes: &str, patient_name: &str) -> GeneratedText {
        self.complete(
            clinical_summary_prompt(notes, patient_name),
            SUMMARY_KEY_MISSING,
            EMPTY_SUMMARY,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn reminder_email(&self, patient_name: &str, date: &str, time: &str) -> GeneratedText {
        self.complete(
            reminder_email_prompt(patient_name, date, time),
            KEY_MISSING,
            EMPTY_EMAIL_DRAFT,
        )
        .await
    }

    /// A blank context falls back to a first-session default.
    #[instrument(skip(self))]
    pub async fn therapeutic_questions(&self, context: Option<&str>) -> GeneratedText {
        let context = context
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_QUESTION_CONTEXT);
        self.complete(
            therapeutic_questions_prompt(context),
            KEY_MISSING,
            EMPTY_SUGGESTIONS,
        )
        .await
    }
}
