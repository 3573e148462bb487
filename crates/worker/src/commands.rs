use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use charops_infra::config::{ForecastConfig, ScheduleConfig};
use charops_infra::constants::ConstantsStore;
use charops_infra::jobs::{persist_forecasts, DailyJob, DailyScheduler};
use charops_infra::projections::{CarbonAccountant, OnHandLedger, SupplyDemandProjector};
use charops_infra::record_source::InMemoryRecordSource;
use charops_infra::warnings::{LogNotifier, Notifier, WarningScheduler, WebhookNotifier};

use crate::cli::{ApplyArgs, CarbonArgs, Cli, Command, ConstantsCommand, WorkerConfig};
use crate::store;

const DEFAULT_CARBON_WINDOW_DAYS: u64 = 30;

pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.config;
    let source = Arc::new(store::load(&config.store).await?);
    let now = Utc::now();

    match cli.command {
        Command::Project(args) => project(&config, &source, args, now).await,
        Command::OnHand => on_hand(&config, &source).await,
        Command::Warnings(args) => warnings(&config, &source, args, now).await,
        Command::Carbon(args) => carbon(&config, &source, args, now).await,
        Command::Constants(command) => constants(&config, &source, command).await,
        Command::Daily => daily(&config, source, now).await,
        Command::Serve => serve(&config, source).await,
    }
}

/// Webhook delivery when configured, otherwise log only.
fn notifier(config: &WorkerConfig, deliver: bool) -> Arc<dyn Notifier> {
    match (&config.webhook_url, deliver) {
        (Some(url), true) => Arc::new(WebhookNotifier::new(url.clone())),
        (None, true) => {
            warn!("no webhook configured; warnings are only logged");
            Arc::new(LogNotifier)
        }
        (_, false) => Arc::new(LogNotifier),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn project(
    config: &WorkerConfig,
    source: &InMemoryRecordSource,
    args: ApplyArgs,
    now: DateTime<Utc>,
) -> Result<()> {
    let site = config.site()?;
    let forecast = SupplyDemandProjector::default()
        .project(source, &site, now)
        .await
        .with_context(|| format!("projection failed for site {site}"))?;
    print_json(&forecast)?;

    if args.apply {
        let written = persist_forecasts(source, &site, &forecast).await?;
        store::save(source, &config.store).await?;
        info!(site = %site, items = written, "forecasts persisted");
    }
    Ok(())
}

async fn on_hand(config: &WorkerConfig, source: &InMemoryRecordSource) -> Result<()> {
    let site = config.site()?;
    let inventory = OnHandLedger::default()
        .compute(source, &site)
        .await
        .with_context(|| format!("on-hand replay failed for site {site}"))?;
    print_json(&inventory)
}

async fn warnings(
    config: &WorkerConfig,
    source: &InMemoryRecordSource,
    args: ApplyArgs,
    now: DateTime<Utc>,
) -> Result<()> {
    let site = config.site()?;
    let scheduler = WarningScheduler::new(ForecastConfig::default(), notifier(config, args.apply));
    let dispatch = scheduler.evaluate(source, &site, now).await?;
    print_json(&dispatch.warnings)?;

    let failed = dispatch.settle().await;
    if failed > 0 {
        warn!(site = %site, failed, "some warnings were not delivered");
    }
    Ok(())
}

/// Inclusive UTC bounds of the local days `from..=to`.
fn local_window(
    schedule: &ScheduleConfig,
    from: NaiveDate,
    to: NaiveDate,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let offset = chrono::Duration::seconds(i64::from(schedule.offset.local_minus_utc()));
    let start = (from.and_time(NaiveTime::MIN) - offset).and_utc();
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    let end = (to.and_time(end_of_day) - offset).and_utc();
    (start, end)
}

async fn carbon(
    config: &WorkerConfig,
    source: &InMemoryRecordSource,
    args: CarbonArgs,
    now: DateTime<Utc>,
) -> Result<()> {
    let site = config.site()?;
    let schedule = config.schedule()?;
    let today = now.with_timezone(&schedule.offset).date_naive();
    let to = args.to.unwrap_or(today);
    let from = args
        .from
        .or_else(|| to.checked_sub_days(Days::new(DEFAULT_CARBON_WINDOW_DAYS)))
        .unwrap_or(to);
    let (start, end) = local_window(&schedule, from, to);

    let report = CarbonAccountant::new(ForecastConfig::default(), schedule)
        .account(source, &site, start, end)
        .await
        .with_context(|| format!("carbon accounting failed for site {site}"))?;
    info!(
        site = %site,
        %from,
        %to,
        gross_removed = report.gross_removed(),
        released = report.total_released(),
        net_removed = report.net_removed(),
        "carbon report"
    );
    print_json(&report)
}

async fn constants(
    config: &WorkerConfig,
    source: &InMemoryRecordSource,
    command: ConstantsCommand,
) -> Result<()> {
    let admin = ConstantsStore::new(source);
    match command {
        ConstantsCommand::Show => return print_json(&admin.show().await?),
        ConstantsCommand::Set { scope, name, value } => admin
            .set_constant(&scope, &name, value)
            .await
            .with_context(|| format!("failed to set {name} in constants/{scope}"))?,
        ConstantsCommand::AddVehicle { name, kg_co2_per_km } => admin
            .set_vehicle(&name, kg_co2_per_km)
            .await
            .with_context(|| format!("failed to set transport factor of {name}"))?,
    }
    store::save(source, &config.store).await
}

fn daily_job(
    config: &WorkerConfig,
    source: Arc<InMemoryRecordSource>,
) -> DailyJob<InMemoryRecordSource> {
    DailyJob::new(
        source,
        SupplyDemandProjector::default(),
        WarningScheduler::new(ForecastConfig::default(), notifier(config, true)),
    )
}

async fn daily(
    config: &WorkerConfig,
    source: Arc<InMemoryRecordSource>,
    now: DateTime<Utc>,
) -> Result<()> {
    let report = daily_job(config, Arc::clone(&source)).run_daily(now).await?;
    store::save(&source, &config.store).await?;
    print_json(&report)?;
    if !report.is_clean() {
        anyhow::bail!("{} site(s) failed", report.failed.len());
    }
    Ok(())
}

async fn serve(config: &WorkerConfig, source: Arc<InMemoryRecordSource>) -> Result<()> {
    let scheduler = DailyScheduler::new(config.schedule()?);
    let handle = scheduler.spawn(daily_job(config, Arc::clone(&source)));

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    info!("shutdown requested");
    handle.shutdown().await;

    // Forecasts written by the runs live in memory until here.
    store::save(&source, &config.store).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn local_window_covers_whole_local_days() {
        let schedule = ScheduleConfig::default();
        let day = NaiveDate::from_ymd_opt(2024, 4, 15).unwrap();
        let (start, end) = local_window(&schedule, day, day);

        assert_eq!(start, Utc.with_ymd_and_hms(2024, 4, 14, 21, 0, 0).unwrap());
        let last_instant = Utc.with_ymd_and_hms(2024, 4, 15, 20, 59, 59).unwrap()
            + chrono::Duration::milliseconds(999);
        assert_eq!(end, last_instant);
    }
}
