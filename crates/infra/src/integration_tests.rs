//! End-to-end run of the daily job over an in-memory store.
//!
//! Verifies:
//! - forecasts are persisted onto each site's inventory items
//! - warnings reach the assignee through the notifier
//! - sites are isolated from each other
//! - the on-hand ledger and the forecast agree on the same records

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use charops_core::{ItemId, SiteId};
    use charops_records::{InventoryItem, Table};

    use crate::config::ForecastConfig;
    use crate::jobs::DailyJob;
    use crate::projections::{OnHandLedger, SupplyDemandProjector};
    use crate::record_source::{InMemoryRecordSource, SiteRecords};
    use crate::site::{CollectionPath, Site};
    use crate::test_support::{at, now};
    use crate::warnings::{RecordingNotifier, WarningKind, WarningScheduler};

    fn site(id: &str) -> Site {
        Site::new(id.parse::<SiteId>().unwrap())
    }

    fn seed(source: &InMemoryRecordSource) {
        let formulations = CollectionPath::global(Table::Formulations);
        source
            .insert(&formulations, "BCF", json!({"Biochar": 0.6, "Compost": 0.4}))
            .unwrap();

        let sites = CollectionPath::global(Table::Sites);
        source.insert(&sites, "kisumu", json!({"name": "Kisumu"})).unwrap();
        source.insert(&sites, "nakuru", json!({"name": "Nakuru"})).unwrap();

        let kisumu = site("kisumu");
        for item in ["Biochar", "Compost", "BCF", "Maize Cobs"] {
            source
                .insert(&kisumu.collection(Table::Inventory), item, json!({"name": item}))
                .unwrap();
        }
        source
            .insert(
                &kisumu.collection(Table::Orders),
                "o-1",
                json!({
                    "formulation": [{"id": "BCF", "name": "BCF"}],
                    "customer": [{"id": "c-1", "name": "Coop"}],
                    "quantity": 100,
                    "productionQuantity": 50,
                    "deliveryDate": at(10),
                    "isActivated": true,
                    "status": "Received",
                    "assignee": "jane.doe@x.com",
                    "orderNumber": 42,
                }),
            )
            .unwrap();
        source
            .insert(
                &kisumu.collection(Table::BiocharProduction),
                "p-1",
                json!({
                    "quantityLiters": 280,
                    "endDate": at(-3),
                    "feedstock": "Maize Cobs",
                    "biomassQuantity": 14,
                }),
            )
            .unwrap();

        let nakuru = site("nakuru");
        source
            .insert(&nakuru.collection(Table::Inventory), "Biochar", json!({"name": "Biochar"}))
            .unwrap();
    }

    #[tokio::test]
    async fn daily_run_persists_forecasts_and_warns() {
        let source = Arc::new(InMemoryRecordSource::new());
        seed(&source);
        let notifier = Arc::new(RecordingNotifier::new());
        let job = DailyJob::new(
            source.clone(),
            SupplyDemandProjector::default(),
            WarningScheduler::new(ForecastConfig::default(), notifier.clone()),
        );

        let report = job.run_daily(now()).await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.completed[0].site.as_str(), "kisumu");
        assert_eq!(report.completed[0].items_written, 4);
        assert_eq!(report.completed[0].warnings, 1);
        assert_eq!(report.completed[1].items_written, 1);

        let kisumu = site("kisumu");
        let records = SiteRecords::new(source.as_ref(), &kisumu);
        let biochar = records.get::<InventoryItem>("Biochar").await.unwrap().unwrap();
        // 280 L over the 14-day window: 20 L a day.
        assert_eq!(biochar.supply_forecast, 20.0);
        // 50 produced units of BCF draw 30 L of biochar.
        assert_eq!(biochar.demand_forecast, 30.0);

        let bcf = records.get::<InventoryItem>("BCF").await.unwrap().unwrap();
        assert_eq!(bcf.demand_forecast, 50.0);
        assert_eq!(bcf.supply_forecast, 0.0);

        let cobs = records.get::<InventoryItem>("Maize Cobs").await.unwrap().unwrap();
        assert_eq!(cobs.demand_forecast, 1.0);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "jane.doe@x.com");
        assert_eq!(sent[0].recipient_name(), "Jane");
        assert!(sent[0].title.contains("42"));
    }

    #[tokio::test]
    async fn sites_do_not_see_each_other() {
        let source = Arc::new(InMemoryRecordSource::new());
        seed(&source);

        let projector = SupplyDemandProjector::default();
        let forecast = projector.project(source.as_ref(), &site("nakuru"), now()).await.unwrap();
        assert_eq!(forecast.supply.len(), 1);
        assert_eq!(forecast.supply.get(&ItemId::new("Biochar")), Some(0.0));
        assert_eq!(forecast.demand.get(&ItemId::new("Biochar")), Some(0.0));
    }

    #[tokio::test]
    async fn on_hand_replays_production_and_started_orders() {
        let source = Arc::new(InMemoryRecordSource::new());
        seed(&source);
        let kisumu = site("kisumu");
        source
            .insert(
                &kisumu.collection(Table::Orders),
                "o-2",
                json!({
                    "formulation": "BCF",
                    "customer": "c-2",
                    "quantity": 50,
                    "productionQuantity": 50,
                    "deliveryDate": at(-1),
                    "status": "Delivered",
                }),
            )
            .unwrap();

        let on_hand = OnHandLedger::default().compute(source.as_ref(), &kisumu).await.unwrap();
        // 280 L produced, 30 L drawn into 50 units of BCF.
        assert_eq!(on_hand.get(&ItemId::new("Biochar")), Some(250.0));
        assert_eq!(on_hand.get(&ItemId::new("Compost")), Some(-20.0));
        assert_eq!(on_hand.get(&ItemId::new("BCF")), Some(0.0));
    }

    #[tokio::test]
    async fn warnings_match_the_activation_window() {
        let source = Arc::new(InMemoryRecordSource::new());
        seed(&source);
        let notifier = Arc::new(RecordingNotifier::new());
        let scheduler = WarningScheduler::new(ForecastConfig::default(), notifier.clone());

        let dispatch = scheduler.evaluate(source.as_ref(), &site("kisumu"), now()).await.unwrap();
        assert_eq!(dispatch.warnings.len(), 1);
        assert_eq!(dispatch.warnings[0].kind, WarningKind::ActivationNeeded);
        assert_eq!(dispatch.settle().await, 0);
    }
}
