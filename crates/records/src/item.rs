use serde::{Deserialize, Serialize};

use charops_core::ItemId;

use crate::de::number_or_zero;
use crate::record::{Record, Table};

pub mod field {
    pub const SUPPLY_FORECAST: &str = "supplyForecast";
    pub const DEMAND_FORECAST: &str = "demandForecast";
}

/// A registered inventory item.
///
/// Items are registered by hand; the forecasts are the only fields written by
/// this workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    #[serde(skip)]
    pub id: ItemId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub supply_forecast: f64,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub demand_forecast: f64,
}

impl Record for InventoryItem {
    const TABLE: Table = Table::Inventory;

    fn assign_id(&mut self, id: String) {
        self.id = ItemId::new(id);
    }
}
