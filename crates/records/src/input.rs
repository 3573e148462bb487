use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use charops_core::ItemId;

use crate::record::{impl_record, Table};
use crate::reference::{self, Reference};

pub mod field {
    pub const STATUS: &str = "status";
    pub const TYPE: &str = "type";
    pub const DELIVERY_DATE: &str = "deliveryDate";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    /// Measured in tons.
    Biomass,
    /// Everything else is measured in liters.
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputStatus {
    Scheduled,
    Obtained,
    #[serde(other)]
    Other,
}

impl InputStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputStatus::Scheduled => "Scheduled",
            InputStatus::Obtained => "Obtained",
            InputStatus::Other => "Other",
        }
    }
}

/// Incoming raw material or biomass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Input {
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: InputKind,
    /// The inventory item this input restocks.
    pub input: Reference,
    #[serde(default)]
    pub quantity_tons: Option<f64>,
    #[serde(default)]
    pub quantity_liters: Option<f64>,
    #[serde(default)]
    pub delivery_date: Option<DateTime<Utc>>,
    pub status: InputStatus,
    #[serde(default, deserialize_with = "reference::optional")]
    pub supplier: Option<Reference>,
    #[serde(default, deserialize_with = "reference::optional")]
    pub vehicle: Option<Reference>,
}

impl_record!(Input, Table::Inputs);

impl Input {
    pub fn item_id(&self) -> ItemId {
        ItemId::new(self.input.id.clone())
    }

    /// Quantity in the unit that matches the input type, if recorded.
    pub fn quantity(&self) -> Option<f64> {
        match self.kind {
            InputKind::Biomass => self.quantity_tons,
            InputKind::Other => self.quantity_liters,
        }
    }
}
