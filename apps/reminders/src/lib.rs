//! Shared start-up for the reminder binaries.

use std::process::ExitCode;
use std::sync::Arc;

use chrono::Local;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notification_cell::{NotificationError, ReminderChannel, ReminderJob, SupabaseReminderSource};
use shared_config::AppConfig;

pub fn init() -> AppConfig {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    AppConfig::from_env()
}

/// Runs one reminder pass for today. Any unsent reminder makes the exit
/// code non-zero so schedulers can alert on it.
pub async fn run<C, F>(config: &AppConfig, build_channel: F) -> ExitCode
where
    C: ReminderChannel + 'static,
    F: FnOnce(&AppConfig) -> Result<C, NotificationError>,
{
    let job = match build_job(config, build_channel) {
        Ok(job) => job,
        Err(e) => {
            error!("Cannot start reminder job: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match job.run(Local::now().date_naive()).await {
        Ok(report) => {
            info!(
                "Done: {} sent, {} skipped, {} failed",
                report.sent, report.skipped, report.failed
            );
            if report.failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("Reminder job aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_job<C, F>(config: &AppConfig, build_channel: F) -> Result<ReminderJob, NotificationError>
where
    C: ReminderChannel + 'static,
    F: FnOnce(&AppConfig) -> Result<C, NotificationError>,
{
    let source = SupabaseReminderSource::new(config)?;
    let channel = build_channel(config)?;
    Ok(ReminderJob::new(
        Arc::new(source),
        Arc::new(channel),
        config.reminder_window_days,
    ))
}
