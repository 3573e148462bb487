use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use charops_core::{FormulationId, ItemId};

use crate::record::{Record, Table};

/// Recipe of a finished good: ingredient → quantity per unit produced.
///
/// Formulation documents mix ingredient ratios with descriptive fields; only
/// numeric fields are ingredients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, JsonValue>")]
pub struct Formulation {
    #[serde(skip)]
    pub id: FormulationId,
    pub ingredients: BTreeMap<ItemId, f64>,
}

impl From<BTreeMap<String, JsonValue>> for Formulation {
    fn from(fields: BTreeMap<String, JsonValue>) -> Self {
        let ingredients = fields
            .into_iter()
            .filter_map(|(name, value)| value.as_f64().map(|qty| (ItemId::new(name), qty)))
            .collect();
        Self {
            id: FormulationId::default(),
            ingredients,
        }
    }
}

impl Record for Formulation {
    const TABLE: Table = Table::Formulations;

    fn assign_id(&mut self, id: String) {
        self.id = FormulationId::new(id);
    }
}

impl Formulation {
    pub fn new(id: FormulationId, ingredients: impl IntoIterator<Item = (ItemId, f64)>) -> Self {
        Self {
            id,
            ingredients: ingredients.into_iter().collect(),
        }
    }

    /// Quantity of `ingredient` per unit, if the recipe uses it.
    pub fn ratio(&self, ingredient: &ItemId) -> Option<f64> {
        self.ingredients.get(ingredient).copied()
    }

    /// Ingredient quantities needed to produce `units` of this formulation.
    pub fn expand(&self, units: f64) -> impl Iterator<Item = (&ItemId, f64)> + '_ {
        self.ingredients.iter().map(move |(item, per_unit)| (item, units * per_unit))
    }
}
