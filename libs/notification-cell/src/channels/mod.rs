use async_trait::async_trait;

use crate::models::{NotificationError, ReminderTarget};

pub mod email;
pub mod whatsapp;

/// A delivery path for reminders. `recipient` picks the address this channel
/// needs out of the target; `None` means the target cannot be reached here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReminderChannel: Send + Sync {
    fn name(&self) -> &'static str;

    fn recipient(&self, target: &ReminderTarget) -> Option<String>;

    async fn send(&self, recipient: &str, target: &ReminderTarget) -> Result<(), NotificationError>;
}

/// Reads a non-success body into a `Rejected` error.
pub(crate) async fn rejection(channel: &'static str, response: reqwest::Response) -> NotificationError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|e| format!("unreadable response body: {}", e));
    NotificationError::Rejected {
        channel,
        status,
        message,
    }
}
