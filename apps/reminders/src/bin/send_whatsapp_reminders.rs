use std::process::ExitCode;

use tracing::info;

use notification_cell::TwilioWhatsAppChannel;

#[tokio::main]
async fn main() -> ExitCode {
    let config = companion_reminders::init();
    info!("Sending WhatsApp reminders");
    companion_reminders::run(&config, TwilioWhatsAppChannel::new).await
}
