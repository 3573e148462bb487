use std::time::Duration as StdDuration;

use chrono::{DateTime, Days, Duration, Utc};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ScheduleConfig;
use crate::record_source::RecordSource;

use super::daily::DailyJob;

/// Fires the daily job once a day at a fixed local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyScheduler {
    config: ScheduleConfig,
}

/// Handle for the running scheduler loop.
#[derive(Debug)]
pub struct DailySchedulerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl DailySchedulerHandle {
    /// Stop the loop. A run already in progress completes first.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.join.await {
            warn!(error = %e, "daily scheduler task ended abnormally");
        }
    }
}

impl DailyScheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    /// First fire instant strictly after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let offset = Duration::seconds(i64::from(self.config.offset.local_minus_utc()));
        let local_now = now.naive_utc() + offset;

        let mut fire = local_now.date().and_time(self.config.fire_at);
        if fire <= local_now {
            fire = fire.checked_add_days(Days::new(1)).unwrap_or(fire);
        }
        (fire - offset).and_utc()
    }

    /// Run `job` at every fire instant until shut down.
    pub fn spawn<S>(self, job: DailyJob<S>) -> DailySchedulerHandle
    where
        S: RecordSource + ?Sized + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let join = tokio::spawn(async move {
            info!(
                fire_at = %self.config.fire_at,
                offset = %self.config.offset,
                "daily scheduler started"
            );
            loop {
                let next = self.next_run_after(Utc::now());
                let wait = (next - Utc::now()).to_std().unwrap_or(StdDuration::ZERO);
                info!(next = %next, "next daily run scheduled");

                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = tokio::time::sleep(wait) => {}
                }

                match job.run_daily(next).await {
                    Ok(report) if report.is_clean() => {}
                    Ok(report) => warn!(
                        run = %report.run_id,
                        failed = report.failed.len(),
                        "daily run had failing sites"
                    ),
                    Err(e) => error!(error = %e, "daily run failed"),
                }
            }
            info!("daily scheduler stopped");
        });

        DailySchedulerHandle {
            shutdown: Some(shutdown_tx),
            join,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 15, h, m, 0).unwrap()
    }

    #[test]
    fn fires_at_seven_local_time() {
        let scheduler = DailyScheduler::default();
        // 03:00Z is 06:00 at UTC+3; 07:00 local is 04:00Z.
        assert_eq!(scheduler.next_run_after(utc(3, 0)), utc(4, 0));
    }

    #[test]
    fn rolls_to_next_day_once_fired() {
        let scheduler = DailyScheduler::default();
        assert_eq!(scheduler.next_run_after(utc(4, 0)), utc(4, 0) + Duration::days(1));
        assert_eq!(scheduler.next_run_after(utc(22, 0)), utc(4, 0) + Duration::days(1));
    }

    #[test]
    fn local_date_boundary_uses_offset() {
        // 21:30Z is already 00:30 on the 16th locally.
        let scheduler = DailyScheduler::default();
        assert_eq!(scheduler.next_run_after(utc(21, 30)), utc(4, 0) + Duration::days(1));
    }

    #[test]
    fn custom_schedule() {
        let config = ScheduleConfig::new(NaiveTime::from_hms_opt(18, 30, 0).unwrap(), 0).unwrap();
        let scheduler = DailyScheduler::new(config);
        assert_eq!(scheduler.next_run_after(utc(9, 0)), utc(18, 30));
    }

    #[tokio::test]
    async fn shutdown_stops_an_idle_loop() {
        use crate::config::ForecastConfig;
        use crate::projections::SupplyDemandProjector;
        use crate::record_source::InMemoryRecordSource;
        use crate::warnings::{LogNotifier, WarningScheduler};
        use std::sync::Arc;

        let job = DailyJob::new(
            Arc::new(InMemoryRecordSource::new()),
            SupplyDemandProjector::default(),
            WarningScheduler::new(ForecastConfig::default(), Arc::new(LogNotifier)),
        );
        let handle = DailyScheduler::default().spawn(job);
        handle.shutdown().await;
    }
}
