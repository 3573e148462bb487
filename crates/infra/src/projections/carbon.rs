//! Carbon accounting over a reporting window.
//!
//! Carbon is *retired* when biochar leaves the site inside a delivered order,
//! and *released* by transport and on-site energy use.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use charops_records::carbon::{field as carbon_field, GLOBAL_CONSTANTS_ID};
use charops_records::order::field as order_field;
use charops_records::production::field as production_field;
use charops_records::{
    input, CarbonCost, CarbonCostKind, Customer, GlobalConstants, Input, InputKind, InputStatus,
    Order, OrderStatus, ProductionLot, Record, SiteConstants, Supplier,
};

use crate::config::{ForecastConfig, ScheduleConfig};
use crate::record_source::{timestamp, Filter, RecordSource, RecordSourceError, SiteRecords};
use crate::site::Site;

use super::{FormulationCache, ProjectionError};

/// Mass ratio of CO2 to carbon.
const CO2_PER_CARBON: f64 = 44.0 / 12.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarbonRetired {
    pub order: String,
    pub date: NaiveDate,
    pub tons_carbon: f64,
    pub tons_co2eq: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarbonReleased {
    pub row_id: String,
    pub source: String,
    pub date: NaiveDate,
    pub tons_co2eq: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CarbonReport {
    pub retired: Vec<CarbonRetired>,
    pub released: Vec<CarbonReleased>,
    /// Sum of `quantityTons` over production lots ending in the window.
    pub biochar_produced_tons: f64,
}

impl CarbonReport {
    pub fn gross_removed(&self) -> f64 {
        self.retired.iter().map(|r| r.tons_co2eq).sum()
    }

    pub fn total_released(&self) -> f64 {
        self.released.iter().map(|r| r.tons_co2eq).sum()
    }

    pub fn net_removed(&self) -> f64 {
        self.gross_removed() - self.total_released()
    }
}

/// Records that carry a transport distance.
trait Located: Record {
    fn distance(&self) -> Option<f64>;
}

impl Located for Customer {
    fn distance(&self) -> Option<f64> {
        self.distance
    }
}

impl Located for Supplier {
    fn distance(&self) -> Option<f64> {
        self.distance
    }
}

/// Per-invocation memo of customer/supplier distances.
struct DistanceCache<T> {
    entries: HashMap<String, Option<f64>>,
    _record: std::marker::PhantomData<T>,
}

impl<T: Located> DistanceCache<T> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            _record: std::marker::PhantomData,
        }
    }

    async fn get<S>(
        &mut self,
        records: &SiteRecords<'_, S>,
        id: &str,
    ) -> Result<Option<f64>, RecordSourceError>
    where
        S: RecordSource + ?Sized,
    {
        if let Some(distance) = self.entries.get(id) {
            return Ok(*distance);
        }
        let distance = records.get::<T>(id).await?.and_then(|r| r.distance());
        self.entries.insert(id.to_string(), distance);
        Ok(distance)
    }
}

/// Produces carbon reports for a site.
#[derive(Debug, Clone, Default)]
pub struct CarbonAccountant {
    config: ForecastConfig,
    schedule: ScheduleConfig,
}

impl CarbonAccountant {
    pub fn new(config: ForecastConfig, schedule: ScheduleConfig) -> Self {
        Self { config, schedule }
    }

    fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.schedule.offset).date_naive()
    }

    /// Account for the inclusive window `[start, end]`.
    pub async fn account<S>(
        &self,
        source: &S,
        site: &Site,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CarbonReport, ProjectionError>
    where
        S: RecordSource + ?Sized,
    {
        let records = SiteRecords::new(source, site);
        let (start_ts, end_ts) = (timestamp(start), timestamp(end));

        let delivered = Filter::all()
            .eq(order_field::STATUS, OrderStatus::Delivered.as_str())
            .ge(order_field::DELIVERED_DATE, start_ts.clone())
            .le(order_field::DELIVERED_DATE, end_ts.clone());
        let biomass = Filter::all()
            .ge(input::field::DELIVERY_DATE, start_ts.clone())
            .le(input::field::DELIVERY_DATE, end_ts.clone())
            .eq(input::field::TYPE, "Biomass")
            .eq(input::field::STATUS, InputStatus::Obtained.as_str());
        let costs = Filter::all()
            .ge(carbon_field::DATE, start_ts.clone())
            .le(carbon_field::DATE, end_ts.clone());
        let produced = Filter::all()
            .ge(production_field::END_DATE, start_ts)
            .le(production_field::END_DATE, end_ts);

        let (global, local, orders, inputs, costs, lots) = tokio::try_join!(
            records.get::<GlobalConstants>(GLOBAL_CONSTANTS_ID),
            records.get::<SiteConstants>(site.id().as_str()),
            records.fetch::<Order>(&delivered),
            records.fetch::<Input>(&biomass),
            records.fetch::<CarbonCost>(&costs),
            records.fetch::<ProductionLot>(&produced),
        )?;
        let global = global.unwrap_or_default();
        let local = local.unwrap_or_default();
        let scope = site.id().to_string();

        let mut report = CarbonReport::default();
        let mut formulations = FormulationCache::new(source);
        let mut customers = DistanceCache::<Customer>::new();
        let mut suppliers = DistanceCache::<Supplier>::new();

        for order in &orders {
            let date = self.local_date(order.delivered_date.unwrap_or(order.delivery_date));

            let formulation = formulations.get(&order.formulation_id()).await?;
            // Formulations without biochar retire nothing.
            let biochar_ratio = formulation.ratio(&self.config.biochar_item).unwrap_or(0.0);
            let liters_biochar = order.production_quantity * biochar_ratio;
            if liters_biochar > 0.0 {
                let density =
                    required(local.biochar_density_kg_per_l, &scope, "biocharDensityKgPerL")?;
                let carbon_content =
                    required(local.biochar_carbon_content, &scope, "biocharCarbonContent")?;
                let tons_carbon = liters_biochar * density / 1000.0 * carbon_content;
                let tons_co2eq = tons_carbon * CO2_PER_CARBON;
                if tons_co2eq > 0.0 {
                    report.retired.push(CarbonRetired {
                        order: order.label().to_string(),
                        date,
                        tons_carbon,
                        tons_co2eq,
                    });
                }
            }

            // Activated product and restocking deliveries travel on the customer's account.
            // Keyed on the customer id: the stored name is free text.
            if !order.is_activated && !self.config.is_restocking_customer(&order.customer.id) {
                let distance = customers.get(&records, &order.customer.id).await?;
                let factor = order
                    .vehicle
                    .as_ref()
                    .and_then(|v| global.transport_kg_co2_per_km.get(&v.id).copied());
                let (Some(factor), Some(distance)) = (factor, distance) else {
                    return Err(ProjectionError::MissingTransportData(format!(
                        "order {} is missing a vehicle, its transport factor, \
                         or the customer distance",
                        order.label()
                    )));
                };
                report.released.push(CarbonReleased {
                    row_id: order.label().to_string(),
                    source: "Raw Biochar Transport".to_string(),
                    date,
                    tons_co2eq: factor * distance / 1000.0,
                });
            }
        }

        for input in inputs.iter().filter(|i| i.kind == InputKind::Biomass) {
            let supplier = input.supplier.as_ref().ok_or_else(|| {
                ProjectionError::MissingTransportData(format!("input {} has no supplier", input.id))
            })?;
            let distance = suppliers.get(&records, &supplier.id).await?;
            let factor = input
                .vehicle
                .as_ref()
                .and_then(|v| global.transport_kg_co2_per_km.get(&v.id).copied());
            let (Some(factor), Some(distance)) = (factor, distance) else {
                return Err(ProjectionError::MissingTransportData(format!(
                    "input {} is missing a vehicle, its transport factor, or the supplier distance",
                    input.id
                )));
            };
            report.released.push(CarbonReleased {
                row_id: input.id.clone(),
                source: "Biomass Transport".to_string(),
                date: self.local_date(input.delivery_date.unwrap_or(start)),
                tons_co2eq: factor * distance / 1000.0,
            });
        }

        for cost in &costs {
            let (label, tons_co2eq) = match cost.kind {
                CarbonCostKind::Electricity => {
                    let grams = required(local.grams_co2_per_kwh, &scope, "gramsCO2PerKWh")?;
                    ("Electricity", cost.value * grams / 1_000_000.0)
                }
                CarbonCostKind::Diesel => {
                    let kg = required(
                        global.diesel_kg_co2_per_l,
                        GLOBAL_CONSTANTS_ID,
                        "dieselKgCO2PerL",
                    )?;
                    ("Diesel", cost.value * kg / 1000.0)
                }
                CarbonCostKind::Other => {
                    warn!(site = %site, cost = %cost.id, "carbon cost of unknown type; skipped");
                    continue;
                }
            };
            report.released.push(CarbonReleased {
                row_id: cost.id.clone(),
                source: format!("{label}: {}", cost.notes.as_deref().unwrap_or_default()),
                date: self.local_date(cost.date),
                tons_co2eq,
            });
        }

        report.biochar_produced_tons = lots.iter().filter_map(|l| l.quantity_tons).sum();

        info!(
            site = %site,
            retired = report.retired.len(),
            released = report.released.len(),
            gross_removed = report.gross_removed(),
            net_removed = report.net_removed(),
            "carbon accounted"
        );

        Ok(report)
    }
}

fn required(value: Option<f64>, scope: &str, name: &'static str) -> Result<f64, ProjectionError> {
    value.ok_or_else(|| ProjectionError::MissingConstant {
        scope: scope.to_string(),
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::CollectionPath;
    use crate::test_support::{at, at_hours, now, Fixture};
    use charops_core::days;
    use charops_records::Table;
    use serde_json::json;

    fn fixture() -> Fixture {
        let fx = Fixture::test_site();
        let constants = CollectionPath::global(Table::Constants);
        fx.source
            .insert(
                &constants,
                "global",
                json!({
                    "dieselKgCO2PerL": 2.5,
                    "transportKgCO2PerKm": {"Lorry": 1.2, "Pickup": 0.3},
                }),
            )
            .unwrap();
        fx.source
            .insert(
                &constants,
                "mock-site",
                json!({
                    "biocharDensityKgPerL": 0.4,
                    "biocharCarbonContent": 0.75,
                    "gramsCO2PerKWh": 500,
                }),
            )
            .unwrap();
        fx.formulation("F1", json!({"Biochar": 0.5, "Compost": 0.5}));
        fx.insert(Table::Customers, "c-1", json!({"name": "Coop", "distance": 40}));
        fx.insert(Table::Suppliers, "s-1", json!({"name": "Mill", "distance": 10}));
        fx
    }

    async fn account(fx: &Fixture) -> Result<CarbonReport, ProjectionError> {
        CarbonAccountant::default()
            .account(&fx.source, &fx.site, now() - days(7), now())
            .await
    }

    fn delivered(
        customer: serde_json::Value,
        activated: bool,
        vehicle: Option<&str>,
    ) -> serde_json::Value {
        json!({
            "formulation": "F1",
            "customer": customer,
            "quantity": 1000,
            "productionQuantity": 1000,
            "deliveryDate": at(-3),
            "deliveredDate": at(-2),
            "isActivated": activated,
            "status": "Delivered",
            "orderNumber": 17,
            "vehicle": vehicle.map(|v| json!([{"id": v}])),
        })
    }

    #[tokio::test]
    async fn delivered_biochar_is_retired() {
        let fx = fixture();
        fx.order("o-1", delivered(json!("DEC"), false, None));

        let report = account(&fx).await.unwrap();

        // 500 L * 0.4 kg/L = 0.2 t biochar, * 0.75 = 0.15 t carbon
        assert_eq!(report.retired.len(), 1);
        let retired = &report.retired[0];
        assert_eq!(retired.order, "17");
        assert!((retired.tons_carbon - 0.15).abs() < 1e-9);
        assert!((retired.tons_co2eq - 0.55).abs() < 1e-9);
        assert!(report.released.is_empty());
    }

    #[tokio::test]
    async fn raw_biochar_transport_is_released() {
        let fx = fixture();
        fx.order("o-1", delivered(json!([{"id": "c-1", "name": "Coop"}]), false, Some("Lorry")));

        let report = account(&fx).await.unwrap();

        assert_eq!(report.released.len(), 1);
        assert_eq!(report.released[0].source, "Raw Biochar Transport");
        // 1.2 kg/km * 40 km
        assert!((report.released[0].tons_co2eq - 0.048).abs() < 1e-9);
        assert!((report.net_removed() - (0.55 - 0.048)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn activated_orders_carry_no_transport() {
        let fx = fixture();
        fx.order("o-1", delivered(json!("c-1"), true, None));

        let report = account(&fx).await.unwrap();
        assert!(report.released.is_empty());
    }

    #[tokio::test]
    async fn restocking_customer_is_matched_by_id_not_name() {
        let fx = fixture();
        fx.insert(Table::Customers, "c-2", json!({"name": "DEC", "distance": 5}));
        // The restocking customer under its full name: no transport, no vehicle needed.
        fx.order(
            "o-1",
            delivered(json!([{"id": "DEC", "name": "Dark Earth Carbon"}]), false, None),
        );
        // A different customer that happens to be named "DEC" is charged transport.
        let mut lookalike = delivered(json!([{"id": "c-2", "name": "DEC"}]), false, Some("Lorry"));
        lookalike["orderNumber"] = json!(18);
        fx.order("o-2", lookalike);

        let report = account(&fx).await.unwrap();

        assert_eq!(report.retired.len(), 2);
        assert_eq!(report.released.len(), 1);
        assert_eq!(report.released[0].row_id, "18");
        // 1.2 kg/km * 5 km
        assert!((report.released[0].tons_co2eq - 0.006).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_vehicle_is_an_error() {
        let fx = fixture();
        fx.order("o-1", delivered(json!("c-1"), false, None));

        let err = account(&fx).await.unwrap_err();
        assert!(matches!(err, ProjectionError::MissingTransportData(msg) if msg.contains("17")));
    }

    #[tokio::test]
    async fn biomass_inputs_release_transport() {
        let fx = fixture();
        fx.input(
            "i-1",
            json!({
                "type": "Biomass",
                "input": "Biomass1",
                "quantityTons": 5,
                "status": "Obtained",
                "deliveryDate": at(-1),
                "supplier": [{"id": "s-1"}],
                "vehicle": [{"id": "Pickup"}],
            }),
        )
        .input(
            "i-2",
            json!({
                "type": "Biomass",
                "input": "Biomass1",
                "quantityTons": 5,
                "status": "Obtained",
                "deliveryDate": at(-30),
                "supplier": "s-1",
                "vehicle": "Pickup",
            }),
        );

        let report = account(&fx).await.unwrap();

        assert_eq!(report.released.len(), 1);
        assert_eq!(report.released[0].row_id, "i-1");
        assert!((report.released[0].tons_co2eq - 0.003).abs() < 1e-9);
    }

    #[tokio::test]
    async fn biomass_input_without_supplier_is_an_error() {
        let fx = fixture();
        fx.input(
            "i-1",
            json!({
                "type": "Biomass",
                "input": "Biomass1",
                "status": "Obtained",
                "deliveryDate": at(-1),
                "vehicle": "Pickup",
            }),
        );

        let err = account(&fx).await.unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::MissingTransportData(msg) if msg.contains("supplier")
        ));
    }

    #[tokio::test]
    async fn energy_costs_use_constants() {
        let fx = fixture();
        fx.insert(
            Table::CarbonCosts,
            "e-1",
            json!({"type": "Electricity", "value": 2000, "notes": "kiln fans", "date": at(-1)}),
        )
        .insert(Table::CarbonCosts, "d-1", json!({"type": "Diesel", "value": 100, "date": at(-2)}))
        .insert(Table::CarbonCosts, "x-1", json!({
            "type": "Methane",
            "value": 100,
            "date": at(-2),
        }));

        let report = account(&fx).await.unwrap();

        assert_eq!(report.released.len(), 2);
        let electricity = report.released.iter().find(|r| r.row_id == "e-1").unwrap();
        assert_eq!(electricity.source, "Electricity: kiln fans");
        assert!((electricity.tons_co2eq - 1.0).abs() < 1e-9);
        let diesel = report.released.iter().find(|r| r.row_id == "d-1").unwrap();
        assert!((diesel.tons_co2eq - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn production_in_window_is_totalled() {
        let fx = fixture();
        fx.lot("p-1", json!({"quantityTons": 1.5, "endDate": at(-1)}))
            .lot("p-2", json!({"quantityTons": 2.0, "endDate": at(-6)}))
            .lot("p-3", json!({"quantityTons": 9.0, "endDate": at(-8)}));

        let report = account(&fx).await.unwrap();
        assert!((report.biochar_produced_tons - 3.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn dates_are_reported_in_local_time() {
        let fx = fixture();
        // 23:00Z on the 14th is 02:00 on the 15th at UTC+3.
        fx.insert(Table::CarbonCosts, "e-1", json!({
            "type": "Diesel",
            "value": 1,
            "date": at_hours(-5),
        }));

        let report = account(&fx).await.unwrap();
        assert_eq!(report.released[0].date, NaiveDate::from_ymd_opt(2024, 4, 15).unwrap());
    }

    #[tokio::test]
    async fn missing_site_constants_fail_retirement() {
        let fx = Fixture::test_site();
        fx.formulation("F1", json!({"Biochar": 1.0}));
        fx.order("o-1", delivered(json!("DEC"), true, None));

        let err = account(&fx).await.unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::MissingConstant { name: "biocharDensityKgPerL", .. }
        ));
    }
}
