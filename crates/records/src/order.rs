use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use charops_core::FormulationId;

use crate::de::{number_or_zero, opt_string_or_number};
use crate::record::{impl_record, Table};
use crate::reference::{self, Reference};

/// Stored field names.
pub mod field {
    pub const STATUS: &str = "status";
    pub const DELIVERY_DATE: &str = "deliveryDate";
    pub const DELIVERED_DATE: &str = "deliveredDate";
    pub const ACTIVATION_DATE: &str = "activationDate";
    pub const IS_ACTIVATED: &str = "isActivated";
}

/// Order lifecycle as written by the ordering tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Received,
    #[serde(rename = "In Progress")]
    InProgress,
    Complete,
    Delivered,
    Cancelled,
    /// Any status this crate does not act on.
    #[serde(other)]
    Other,
}

impl OrderStatus {
    /// Every status this crate acts on.
    pub const KNOWN: [OrderStatus; 5] = [
        OrderStatus::Received,
        OrderStatus::InProgress,
        OrderStatus::Complete,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Received => "Received",
            OrderStatus::InProgress => "In Progress",
            OrderStatus::Complete => "Complete",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Other => "Other",
        }
    }

    /// Production has started: ingredients have been drawn from stock.
    pub fn consumes_ingredients(&self) -> bool {
        matches!(
            self,
            OrderStatus::InProgress | OrderStatus::Complete | OrderStatus::Delivered
        )
    }
}

/// A customer commitment for a quantity of one formulation.
///
/// Read-only here; orders are created and advanced by the ordering tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(skip)]
    pub id: String,
    pub formulation: Reference,
    pub customer: Reference,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub quantity: f64,
    /// Portion of `quantity` already produced.
    #[serde(default, deserialize_with = "number_or_zero")]
    pub production_quantity: f64,
    pub delivery_date: DateTime<Utc>,
    #[serde(default)]
    pub delivered_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub activation_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_activated: bool,
    pub status: OrderStatus,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub order_number: Option<String>,
    #[serde(default, deserialize_with = "reference::optional")]
    pub vehicle: Option<Reference>,
}

impl_record!(Order, Table::Orders);

impl Order {
    pub fn formulation_id(&self) -> FormulationId {
        FormulationId::new(self.formulation.id.clone())
    }

    pub fn customer_name(&self) -> &str {
        self.customer.display_name()
    }

    /// Committed but not yet produced.
    pub fn unproduced_quantity(&self) -> f64 {
        self.quantity - self.production_quantity
    }

    /// Human-facing order label, falling back to the document id.
    pub fn label(&self) -> &str {
        self.order_number.as_deref().unwrap_or(&self.id)
    }
}
