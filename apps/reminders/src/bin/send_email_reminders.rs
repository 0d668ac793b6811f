use std::process::ExitCode;

use tracing::info;

use notification_cell::SendGridChannel;

#[tokio::main]
async fn main() -> ExitCode {
    let config = companion_reminders::init();
    info!("Sending email reminders");
    companion_reminders::run(&config, SendGridChannel::new).await
}
