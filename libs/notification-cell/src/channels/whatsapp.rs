use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use shared_config::AppConfig;

use super::{rejection, ReminderChannel};
use crate::message::{reminder_text, whatsapp_address};
use crate::models::{NotificationError, ReminderTarget};

const CHANNEL: &str = "Twilio";

pub struct TwilioWhatsAppChannel {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from: String,
}

impl TwilioWhatsAppChannel {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_whatsapp_configured() {
            return Err(NotificationError::NotConfigured("Twilio WhatsApp"));
        }
        Ok(Self {
            client: Client::new(),
            base_url: config.twilio_base_url.trim_end_matches('/').to_string(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from: config.twilio_whatsapp_from.clone(),
        })
    }
}

#[async_trait]
impl ReminderChannel for TwilioWhatsAppChannel {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    fn recipient(&self, target: &ReminderTarget) -> Option<String> {
        target.phone.as_deref().and_then(whatsapp_address)
    }

    #[instrument(skip(self, target), fields(appointment = %target.appointment_id))]
    async fn send(&self, recipient: &str, target: &ReminderTarget) -> Result<(), NotificationError> {
        let url = format!("{}/Accounts/{}/Messages.json", self.base_url, self.account_sid);
        debug!("Sending WhatsApp reminder via {}", url);

        let body = reminder_text(
            &target.patient_name,
            &target.display_date(),
            &target.display_time(),
        );
        let form = [
            ("From", self.from.as_str()),
            ("To", recipient),
            ("Body", body.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
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
