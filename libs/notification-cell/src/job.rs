use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info, instrument, warn};

use crate::channels::ReminderChannel;
use crate::models::{NotificationError, ReminderReport, ReminderTarget};
use crate::source::{window_end, ReminderSource};

/// One pass over the upcoming appointments, sending one reminder each
/// through a single channel.
pub struct ReminderJob {
    source: Arc<dyn ReminderSource>,
    channel: Arc<dyn ReminderChannel>,
    window_days: i64,
}

impl ReminderJob {
    pub fn new(
        source: Arc<dyn ReminderSource>,
        channel: Arc<dyn ReminderChannel>,
        window_days: i64,
    ) -> Self {
        Self {
            source,
            channel,
            window_days,
        }
    }

    /// Fails only when the appointments cannot be read. Individual send
    /// failures are logged and counted.
    #[instrument(skip(self), fields(channel = self.channel.name()))]
    pub async fn run(&self, today: NaiveDate) -> Result<ReminderReport, NotificationError> {
        let until = window_end(today, self.window_days);
        let targets = self.source.upcoming(today, until).await?;
        info!("{} appointment(s) between {} and {}", targets.len(), today, until);

        let mut report = ReminderReport::default();
        for target in &targets {
            let Some(recipient) = self.addressable(target) else {
                warn!(
                    "Skipping appointment {}: no {} contact for the patient",
                    target.appointment_id,
                    self.channel.name()
                );
                report.skipped += 1;
                continue;
            };

            match self.channel.send(&recipient, target).await {
                Ok(()) => {
                    info!("Reminder sent for appointment {}", target.appointment_id);
                    report.sent += 1;
                }
                Err(e) => {
                    error!("Reminder for appointment {} failed: {}", target.appointment_id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Reminder run finished: {} sent, {} skipped, {} failed",
            report.sent, report.skipped, report.failed
        );
        Ok(report)
    }

    fn addressable(&self, target: &ReminderTarget) -> Option<String> {
        let name = target.patient_name.trim();
        if name.is_empty() || name == shared_models::practice::UNKNOWN_PATIENT_NAME {
            return None;
        }
        self.channel.recipient(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::MockReminderChannel;
    use crate::source::MockReminderSource;
    use assert_matches::assert_matches;
    use chrono::NaiveTime;
    use mockall::predicate::eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn target(id: &str, name: &str, email: Option<&str>) -> ReminderTarget {
        ReminderTarget {
            appointment_id: id.to_string(),
            patient_name: name.to_string(),
            email: email.map(str::to_string),
            phone: None,
            date: today(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        }
    }

    fn email_channel() -> MockReminderChannel {
        let mut channel = MockReminderChannel::new();
        channel.expect_name().return_const("email");
        channel
            .expect_recipient()
            .returning(|target| target.email.clone());
        channel
    }

    #[tokio::test]
    async fn test_failures_and_skips_do_not_stop_the_run() {
        let mut source = MockReminderSource::new();
        source
            .expect_upcoming()
            .with(eq(today()), eq(NaiveDate::from_ymd_opt(2026, 10, 23).unwrap()))
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    target("apt_1", "John Doe", Some("john@example.com")),
                    target("apt_2", "Sarah Smith", None),
                    target("apt_3", "Unknown", Some("ghost@example.com")),
                    target("apt_4", "Michael Brown", Some("bounce@example.com")),
                    target("apt_5", "Ana Lima", Some("ana@example.com")),
                ])
            });

        let mut channel = email_channel();
        channel.expect_send().times(3).returning(|recipient, _| {
            if recipient == "bounce@example.com" {
                Err(NotificationError::Rejected {
                    channel: "SendGrid",
                    status: 400,
                    message: "invalid address".to_string(),
                })
            } else {
                Ok(())
            }
        });

        let job = ReminderJob::new(Arc::new(source), Arc::new(channel), 7);
        let report = job.run(today()).await.unwrap();

        assert_eq!(
            report,
            ReminderReport {
                sent: 2,
                skipped: 2,
                failed: 1
            }
        );
        assert_eq!(report.total(), 5);
    }

    #[tokio::test]
    async fn test_source_failure_aborts_before_sending() {
        let mut source = MockReminderSource::new();
        source
            .expect_upcoming()
            .returning(|_, _| Err(NotificationError::Source("connection refused".to_string())));

        let mut channel = email_channel();
        channel.expect_send().never();

        let job = ReminderJob::new(Arc::new(source), Arc::new(channel), 7);
        assert_matches!(job.run(today()).await, Err(NotificationError::Source(_)));
    }
}
