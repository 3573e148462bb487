//! The daily job: forecast every site, persist, then warn.

mod daily;
mod schedule;

pub use daily::{persist_forecasts, DailyJob, DailyReport, DailyRunError, SiteFailure, SiteRun};
pub use schedule::{DailyScheduler, DailySchedulerHandle};
