use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use charops_core::{round_to, ItemId};
use charops_records::order::field as order_field;
use charops_records::production::field as production_field;
use charops_records::{input, Input, InputStatus, Order, OrderStatus, ProductionLot};

use crate::config::ForecastConfig;
use crate::record_source::{timestamp, Filter, RecordSource, SiteRecords};
use crate::site::Site;

use super::{FormulationCache, ItemTotals, ProjectionError};

/// Forward supply and demand per registered inventory item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Forecast {
    pub supply: ItemTotals,
    pub demand: ItemTotals,
}

/// Computes a site's forecast over the configured horizon.
///
/// Five independent rules each add to either supply or demand:
///
/// 1. open orders for the restocking customer supply their formulation
/// 2. received/in-progress orders demand their unproduced quantity
/// 3. received orders demand ingredients through their formulation, over the
///    longer ingredient lead window (non-activated orders only count inside
///    the regular horizon)
/// 4. scheduled inputs supply their item
/// 5. recent production supplies biochar at its average daily rate and
///    demands the feedstock it burned
///
/// Only the biochar total is rounded (to an integer), after all rules ran.
#[derive(Debug, Clone, Default)]
pub struct SupplyDemandProjector {
    config: ForecastConfig,
}

impl SupplyDemandProjector {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub async fn project<S>(
        &self,
        source: &S,
        site: &Site,
        now: DateTime<Utc>,
    ) -> Result<Forecast, ProjectionError>
    where
        S: RecordSource + ?Sized,
    {
        let cfg = &self.config;
        let records = SiteRecords::new(source, site);

        let items = records.item_ids().await?;
        let mut forecast = Forecast {
            supply: ItemTotals::zeroed(items.iter().cloned()),
            demand: ItemTotals::zeroed(items),
        };

        let horizon = timestamp(now + cfg.horizon());
        let open_orders = Filter::all()
            .lt(order_field::DELIVERY_DATE, horizon.clone())
            .not_in(
                order_field::STATUS,
                [OrderStatus::Delivered.as_str(), OrderStatus::Cancelled.as_str()],
            );
        let unfinished_orders = Filter::all()
            .lt(order_field::DELIVERY_DATE, horizon.clone())
            .is_in(
                order_field::STATUS,
                [OrderStatus::Received.as_str(), OrderStatus::InProgress.as_str()],
            );
        let ingredient_orders = Filter::all()
            .lt(order_field::DELIVERY_DATE, timestamp(now + cfg.ingredient_lead()))
            .eq(order_field::STATUS, OrderStatus::Received.as_str());
        let scheduled_inputs = Filter::all()
            .lt(input::field::DELIVERY_DATE, horizon)
            .eq(input::field::STATUS, InputStatus::Scheduled.as_str());
        let recent_lots = Filter::all()
            .gt(production_field::END_DATE, timestamp(now - cfg.production_window()))
            .lt(production_field::END_DATE, timestamp(now));

        let (open_orders, unfinished_orders, ingredient_orders, scheduled_inputs, recent_lots) =
            tokio::try_join!(
                records.fetch::<Order>(&open_orders),
                records.fetch::<Order>(&unfinished_orders),
                records.fetch::<Order>(&ingredient_orders),
                records.fetch::<Input>(&scheduled_inputs),
                records.fetch::<ProductionLot>(&recent_lots),
            )?;

        self.restocking_supply(&open_orders, &mut forecast.supply);
        self.finished_goods_demand(&unfinished_orders, &mut forecast.demand);

        let mut formulations = FormulationCache::new(source);
        self.ingredient_demand(&ingredient_orders, now, &mut formulations, &mut forecast.demand)
            .await?;

        self.input_supply(&scheduled_inputs, &mut forecast.supply);
        self.production_rates(&recent_lots, &mut forecast);

        forecast.supply.round(&cfg.biochar_item);

        info!(
            site = %site,
            items = forecast.supply.len(),
            orders = open_orders.len() + unfinished_orders.len() + ingredient_orders.len(),
            inputs = scheduled_inputs.len(),
            lots = recent_lots.len(),
            formulation_fetches = formulations.fetches(),
            "supply/demand projection computed"
        );

        Ok(forecast)
    }

    fn restocking_supply(&self, orders: &[Order], supply: &mut ItemTotals) {
        // Customer names are embedded in the order, so this filter cannot be pushed to the store.
        for order in orders
            .iter()
            .filter(|o| self.config.is_restocking_customer(o.customer_name()))
        {
            supply.add(&order.formulation_id().into(), order.quantity);
        }
    }

    fn finished_goods_demand(&self, orders: &[Order], demand: &mut ItemTotals) {
        for order in orders {
            demand.add(&order.formulation_id().into(), order.unproduced_quantity());
        }
    }

    async fn ingredient_demand<S>(
        &self,
        orders: &[Order],
        now: DateTime<Utc>,
        formulations: &mut FormulationCache<'_, S>,
        demand: &mut ItemTotals,
    ) -> Result<(), ProjectionError>
    where
        S: RecordSource + ?Sized,
    {
        let horizon = now + self.config.horizon();
        for order in orders {
            if !order.is_activated && order.delivery_date > horizon {
                debug!(
                    order = %order.label(),
                    "non-activated order beyond horizon; no ingredient demand"
                );
                continue;
            }
            let formulation = formulations.get(&order.formulation_id()).await?;
            for (ingredient, qty) in formulation.expand(order.production_quantity) {
                demand.add(ingredient, qty);
            }
        }
        Ok(())
    }

    fn input_supply(&self, inputs: &[Input], supply: &mut ItemTotals) {
        for input in inputs {
            match input.quantity() {
                Some(qty) => {
                    supply.add(&input.item_id(), qty);
                }
                None => debug!(input = %input.id, "input has no quantity for its type; skipped"),
            }
        }
    }

    fn production_rates(&self, lots: &[ProductionLot], forecast: &mut Forecast) {
        let window = self.config.production_window_days as f64;
        let biochar: &ItemId = &self.config.biochar_item;
        for lot in lots {
            forecast.supply.add(biochar, lot.quantity_liters / window);
            if let Some((feedstock, biomass)) = lot.feedstock_consumption() {
                forecast.demand.add(&feedstock, round_to(biomass / window, 1));
            }
        }
    }
}
