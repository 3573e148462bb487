use serde::{Deserialize, Serialize};

use charops_core::ItemId;

use crate::de::number_or_zero;
use crate::record::{impl_record, Table};
use crate::reference::Reference;

/// A manual stock correction. Always applied in full, whatever its date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    #[serde(skip)]
    pub id: String,
    pub item: Reference,
    /// Signed delta.
    #[serde(default, deserialize_with = "number_or_zero")]
    pub quantity: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl_record!(Reconciliation, Table::Reconciliations);

impl Reconciliation {
    pub fn item_id(&self) -> ItemId {
        ItemId::new(self.item.id.clone())
    }
}
