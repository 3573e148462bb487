use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{ArgAction, Args, Parser, Subcommand};

use charops_core::SiteId;
use charops_infra::config::ScheduleConfig;
use charops_infra::site::{Site, TEST_SITE};

#[derive(Debug, Parser)]
#[command(
    name = "charops-worker",
    about = "Biochar supply/demand forecasts, on-hand inventory, carbon reports and order warnings",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub config: WorkerConfig,
    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every command; each flag falls back to the environment.
#[derive(Debug, Clone, Args)]
pub struct WorkerConfig {
    /// Record store snapshot (JSON)
    #[arg(long, global = true, env = "CHAROPS_STORE", default_value = "store.json")]
    pub store: PathBuf,
    /// Site for on-demand commands
    #[arg(long, global = true, env = "CHAROPS_TEST_SITE", default_value = TEST_SITE)]
    pub site: String,
    /// Chat webhook receiving warnings
    #[arg(long, global = true, env = "CHAROPS_WEBHOOK_URL")]
    pub webhook_url: Option<String>,
    /// Local time of the daily run (HH:MM)
    #[arg(
        long,
        global = true,
        env = "CHAROPS_FIRE_AT",
        default_value = "07:00",
        value_parser = parse_time
    )]
    pub fire_at: NaiveTime,
    /// Local UTC offset in hours
    #[arg(
        long,
        global = true,
        env = "CHAROPS_UTC_OFFSET",
        default_value_t = 3,
        allow_hyphen_values = true
    )]
    pub utc_offset: i32,
}

impl WorkerConfig {
    pub fn site(&self) -> Result<Site> {
        let id: SiteId = self
            .site
            .parse()
            .with_context(|| format!("invalid site '{}'", self.site))?;
        Ok(Site::new(id))
    }

    pub fn schedule(&self) -> Result<ScheduleConfig> {
        ScheduleConfig::new(self.fire_at, self.utc_offset)
            .ok_or_else(|| anyhow!("UTC offset out of range: {}", self.utc_offset))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Supply/demand forecast for the site.
    Project(ApplyArgs),
    /// On-hand inventory replayed from the full history (slow on large sites).
    OnHand,
    /// Evaluate order warnings for the site.
    Warnings(ApplyArgs),
    /// Carbon removed and released over a reporting window.
    Carbon(CarbonArgs),
    /// List or edit the emission constants used by carbon accounting.
    #[command(subcommand)]
    Constants(ConstantsCommand),
    /// Run the daily job once for every registered site.
    Daily,
    /// Run the daily job on schedule until interrupted.
    Serve,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Persist forecasts / deliver notifications instead of only logging"
    )]
    pub apply: bool,
}

#[derive(Debug, Args)]
pub struct CarbonArgs {
    #[arg(long, help = "First day of the window, local date (default: 30 days ago)")]
    pub from: Option<NaiveDate>,
    #[arg(long, help = "Last day of the window, local date (default: today)")]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Subcommand)]
pub enum ConstantsCommand {
    /// Global, vehicle and per-site constants.
    Show,
    /// Set a numeric constant in `constants/<scope>`.
    Set {
        #[arg(help = "'global' or a site id")]
        scope: String,
        name: String,
        #[arg(allow_hyphen_values = true)]
        value: f64,
    },
    /// Add a vehicle, or update its transport factor.
    AddVehicle {
        name: String,
        #[arg(value_name = "KG_CO2_PER_KM")]
        kg_co2_per_km: f64,
    },
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|e| format!("expected HH:MM: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_the_test_site() {
        let cli = Cli::try_parse_from(["charops-worker", "project"]).unwrap();
        assert!(matches!(cli.command, Command::Project(ApplyArgs { apply: false })));
        assert!(cli.config.site().unwrap().is_test());
        let schedule = cli.config.schedule().unwrap();
        assert_eq!(schedule, ScheduleConfig::default());
    }

    #[test]
    fn flags_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "charops-worker",
            "warnings",
            "--apply",
            "--site",
            "kisumu",
            "--fire-at",
            "06:30",
            "--utc-offset",
            "-5",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Warnings(ApplyArgs { apply: true })));
        let site = cli.config.site().unwrap();
        assert_eq!(site.id().as_str(), "kisumu");
        assert!(!site.is_test());
        assert_eq!(cli.config.fire_at, NaiveTime::from_hms_opt(6, 30, 0).unwrap());
        assert_eq!(cli.config.schedule().unwrap().offset.local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn carbon_window_dates() {
        let cli = Cli::try_parse_from([
            "charops-worker",
            "carbon",
            "--from",
            "2024-03-01",
            "--to",
            "2024-03-31",
        ])
        .unwrap();
        let Command::Carbon(args) = cli.command else {
            panic!("expected carbon");
        };
        assert_eq!(args.from, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(args.to, NaiveDate::from_ymd_opt(2024, 3, 31));
    }

    #[test]
    fn constants_subcommands() {
        let cli = Cli::try_parse_from([
            "charops-worker",
            "constants",
            "set",
            "kisumu",
            "gramsCO2PerKWh",
            "480",
        ])
        .unwrap();
        let Command::Constants(ConstantsCommand::Set { scope, name, value }) = cli.command else {
            panic!("expected constants set");
        };
        assert_eq!(
            (scope.as_str(), name.as_str(), value),
            ("kisumu", "gramsCO2PerKWh", 480.0)
        );

        let cli =
            Cli::try_parse_from(["charops-worker", "constants", "add-vehicle", "Tractor", "1.4"])
                .unwrap();
        let Command::Constants(ConstantsCommand::AddVehicle { name, kg_co2_per_km }) = cli.command
        else {
            panic!("expected constants add-vehicle");
        };
        assert_eq!((name.as_str(), kg_co2_per_km), ("Tractor", 1.4));

        let missing_factor =
            Cli::try_parse_from(["charops-worker", "constants", "add-vehicle", "Tractor"]);
        assert!(missing_factor.is_err());
    }

    #[test]
    fn rejects_bad_site_and_time() {
        let cli = Cli::try_parse_from(["charops-worker", "on-hand", "--site", "a/b"]).unwrap();
        assert!(cli.config.site().is_err());
        assert!(Cli::try_parse_from(["charops-worker", "daily", "--fire-at", "7pm"]).is_err());
    }
}
