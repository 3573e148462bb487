use tracing::info;

use charops_core::ItemId;

use charops_records::order::field as order_field;
use charops_records::{input, Input, InputStatus, Order, OrderStatus, ProductionLot, Reconciliation};

use crate::config::ForecastConfig;
use crate::record_source::{Filter, RecordSource, SiteRecords};
use crate::site::Site;

use super::{FormulationCache, ItemTotals, ProjectionError};

/// On-hand stock per registered item, derived by replaying every order,
/// input, production lot and reconciliation the site has ever recorded.
///
/// Scans whole tables with no date filter: meant for diagnostics and
/// checks, not for routine scheduling.
#[derive(Debug, Clone, Default)]
pub struct OnHandLedger {
    config: ForecastConfig,
}

impl OnHandLedger {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub async fn compute<S>(&self, source: &S, site: &Site) -> Result<ItemTotals, ProjectionError>
    where
        S: RecordSource + ?Sized,
    {
        let records = SiteRecords::new(source, site);
        let mut inventory = ItemTotals::zeroed(records.item_ids().await?);

        let started_orders = Filter::all().is_in(
            order_field::STATUS,
            OrderStatus::KNOWN
                .into_iter()
                .filter(OrderStatus::consumes_ingredients)
                .map(|status| status.as_str()),
        );
        let obtained_inputs =
            Filter::all().eq(input::field::STATUS, InputStatus::Obtained.as_str());
        let everything = Filter::all();

        let (orders, inputs, lots, reconciliations) = tokio::try_join!(
            records.fetch::<Order>(&started_orders),
            records.fetch::<Input>(&obtained_inputs),
            records.fetch::<ProductionLot>(&everything),
            records.fetch::<Reconciliation>(&everything),
        )?;

        let mut formulations = FormulationCache::new(source);
        for order in &orders {
            let formulation_item: ItemId = order.formulation_id().into();

            // Ingredients are drawn as soon as production starts.
            let formulation = formulations.get(&order.formulation_id()).await?;
            for (ingredient, qty) in formulation.expand(order.production_quantity) {
                inventory.subtract(ingredient, qty);
            }

            match order.status {
                OrderStatus::Complete => {
                    inventory.subtract(&formulation_item, order.unproduced_quantity());
                }
                OrderStatus::Delivered
                    if self.config.is_restocking_customer(order.customer_name()) =>
                {
                    inventory.add(&formulation_item, order.quantity);
                }
                _ => {}
            }
        }

        for input in &inputs {
            if let Some(qty) = input.quantity() {
                inventory.add(&input.item_id(), qty);
            }
        }

        for lot in &lots {
            inventory.add(&self.config.biochar_item, lot.quantity_liters);
        }

        for reconciliation in &reconciliations {
            inventory.add(&reconciliation.item_id(), reconciliation.quantity);
        }

        info!(
            site = %site,
            items = inventory.len(),
            orders = orders.len(),
            inputs = inputs.len(),
            lots = lots.len(),
            reconciliations = reconciliations.len(),
            "on-hand inventory replayed"
        );

        Ok(inventory)
    }
}
