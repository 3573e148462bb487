use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use charops_core::ItemId;

use crate::de::number_or_zero;
use crate::record::{impl_record, Table};
use crate::reference::{self, Reference};

pub mod field {
    pub const END_DATE: &str = "endDate";
}

/// One biochar production run (kiln batch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionLot {
    #[serde(skip)]
    pub id: String,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub quantity_liters: f64,
    #[serde(default)]
    pub quantity_tons: Option<f64>,
    #[serde(default, deserialize_with = "reference::optional")]
    pub feedstock: Option<Reference>,
    #[serde(default)]
    pub biomass_quantity: Option<f64>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl_record!(ProductionLot, Table::BiocharProduction);

impl ProductionLot {
    /// Feedstock item and the biomass consumed, when both were recorded.
    pub fn feedstock_consumption(&self) -> Option<(ItemId, f64)> {
        match (&self.feedstock, self.biomass_quantity) {
            (Some(feedstock), Some(qty)) => Some((ItemId::new(feedstock.id.clone()), qty)),
            _ => None,
        }
    }
}
