use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use charops_core::ItemId;

/// Running quantity per registered inventory item.
///
/// The key set is fixed at construction: every registered item starts at zero
/// and contributions to unregistered keys are dropped, so results always
/// cover exactly the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ItemTotals(BTreeMap<ItemId, f64>);

impl ItemTotals {
    pub fn zeroed(items: impl IntoIterator<Item = ItemId>) -> Self {
        Self(items.into_iter().map(|item| (item, 0.0)).collect())
    }

    /// Add `qty` to `item`. Returns `false` if the item is not registered.
    pub fn add(&mut self, item: &ItemId, qty: f64) -> bool {
        match self.0.get_mut(item) {
            Some(total) => {
                *total += qty;
                true
            }
            None => {
                debug!(item = %item, qty, "item not registered; contribution dropped");
                false
            }
        }
    }

    pub fn subtract(&mut self, item: &ItemId, qty: f64) -> bool {
        self.add(item, -qty)
    }

    /// Round one item's total to the nearest integer.
    pub fn round(&mut self, item: &ItemId) {
        if let Some(total) = self.0.get_mut(item) {
            *total = total.round();
        }
    }

    pub fn get(&self, item: &ItemId) -> Option<f64> {
        self.0.get(item).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, f64)> + '_ {
        self.0.iter().map(|(item, total)| (item, *total))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
