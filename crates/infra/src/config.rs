//! Configuration of the forecasting engines and the daily schedule.

use chrono::{Duration, FixedOffset, NaiveTime, Offset, Utc};

use charops_core::{days, ItemId};

/// Horizons and special keys used by the engines.
///
/// Defaults are the operating values; tests run against the defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    /// Forward window for supply and demand forecasts.
    pub horizon_days: i64,
    /// Extended window for ingredient demand of activated orders.
    pub ingredient_lead_days: i64,
    /// Look-back over production history; production rates are averaged over it.
    pub production_window_days: i64,
    /// Activated orders due within this many days must begin activation.
    pub activation_warning_days: i64,
    /// Orders due within this many days get completion/delivery reminders.
    pub delivery_warning_days: i64,
    /// Activation is expected to finish this many days after it started.
    pub activation_duration_days: i64,
    /// Deliveries to this customer return product to stock.
    pub restocking_customer: String,
    /// Inventory key of raw biochar output.
    pub biochar_item: ItemId,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: 30,
            ingredient_lead_days: 44,
            production_window_days: 14,
            activation_warning_days: 16,
            delivery_warning_days: 2,
            activation_duration_days: 15,
            restocking_customer: "DEC".to_string(),
            biochar_item: ItemId::new("Biochar"),
        }
    }
}

impl ForecastConfig {
    pub fn horizon(&self) -> Duration {
        days(self.horizon_days)
    }

    pub fn ingredient_lead(&self) -> Duration {
        days(self.ingredient_lead_days)
    }

    pub fn production_window(&self) -> Duration {
        days(self.production_window_days)
    }

    /// Forecasts and the ledger pass the customer name; carbon transport
    /// passes the customer id.
    pub fn is_restocking_customer(&self, customer: &str) -> bool {
        customer == self.restocking_customer
    }
}

/// When the daily job fires, and the local offset used for report dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub fire_at: NaiveTime,
    pub offset: FixedOffset,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            fire_at: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN),
            offset: FixedOffset::east_opt(3 * 3600).unwrap_or_else(|| Utc.fix()),
        }
    }
}

impl ScheduleConfig {
    pub fn new(fire_at: NaiveTime, offset_hours: i32) -> Option<Self> {
        Some(Self {
            fire_at,
            offset: FixedOffset::east_opt(offset_hours * 3600)?,
        })
    }
}
