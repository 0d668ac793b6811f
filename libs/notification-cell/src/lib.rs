pub mod channels;
pub mod job;
pub mod message;
pub mod models;
pub mod source;

pub use channels::{email::SendGridChannel, whatsapp::TwilioWhatsAppChannel, ReminderChannel};
pub use job::ReminderJob;
pub use models::{NotificationError, ReminderReport, ReminderTarget};
pub use source::{ReminderSource, SupabaseReminderSource};
