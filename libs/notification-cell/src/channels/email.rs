use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use shared_config::AppConfig;

use super::{rejection, ReminderChannel};
use crate::message::{reminder_html, reminder_text, REMINDER_SUBJECT};
use crate::models::{NotificationError, ReminderTarget};

const CHANNEL: &str = "SendGrid";

pub struct SendGridChannel {
    client: Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl SendGridChannel {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_email_configured() {
            return Err(NotificationError::NotConfigured("SendGrid email"));
        }
        Ok(Self {
            client: Client::new(),
            base_url: config.sendgrid_base_url.trim_end_matches('/').to_string(),
            api_key: config.sendgrid_api_key.clone(),
            from: config.email_from.clone(),
        })
    }

    fn payload(&self, recipient: &str, target: &ReminderTarget) -> Value {
        let date = target.display_date();
        let time = target.display_time();
        json!({
            "personalizations": [{ "to": [{ "email": recipient }] }],
            "from": { "email": self.from },
            "subject": REMINDER_SUBJECT,
            "content": [
                { "type": "text/plain", "value": reminder_text(&target.patient_name, &date, &time) },
                { "type": "text/html", "value": reminder_html(&target.patient_name, &date, &time) }
            ]
        })
    }
}

#[async_trait]
impl ReminderChannel for SendGridChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    fn recipient(&self, target: &ReminderTarget) -> Option<String> {
        target
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(str::to_string)
    }

    #[instrument(skip(self, target), fields(appointment = %target.appointment_id))]
    async fn send(&self, recipient: &str, target: &ReminderTarget) -> Result<(), NotificationError> {
        let url = format!("{}/mail/send", self.base_url);
        debug!("Sending reminder email via {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(recipient, target))
            .send()
            .await
            .map_err(|e| NotificationError::Request {
                channel: CHANNEL,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(rejection(CHANNEL, response).await);
        }
        Ok(())
    }
}
