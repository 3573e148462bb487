use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

use charops_infra::projections::{OnHandLedger, SupplyDemandProjector};
use charops_infra::record_source::{timestamp, InMemoryRecordSource};
use charops_infra::site::{CollectionPath, Site};
use charops_records::Table;

const ITEMS: [&str; 4] = ["Biochar", "Compost", "BCF", "Maize Cobs"];

/// A test site carrying `orders` historical orders plus matching production.
fn seeded_source(orders: usize) -> (InMemoryRecordSource, Site) {
    let source = InMemoryRecordSource::new();
    let site = Site::test();
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();

    source
        .insert(
            &CollectionPath::global(Table::Formulations),
            "BCF",
            json!({"Biochar": 0.6, "Compost": 0.4}),
        )
        .unwrap();
    for item in ITEMS {
        source
            .insert(&site.collection(Table::Inventory), item, json!({"name": item}))
            .unwrap();
    }

    let statuses = ["Received", "In Progress", "Complete", "Delivered"];
    for i in 0..orders {
        let day = base + Duration::hours(i as i64 * 6);
        source
            .insert(
                &site.collection(Table::Orders),
                &format!("o-{i}"),
                json!({
                    "formulation": "BCF",
                    "customer": if i % 5 == 0 { "DEC" } else { "c-1" },
                    "quantity": 100,
                    "productionQuantity": 60,
                    "deliveryDate": timestamp(day),
                    "status": statuses[i % statuses.len()],
                    "isActivated": i % 2 == 0,
                }),
            )
            .unwrap();
        source
            .insert(
                &site.collection(Table::BiocharProduction),
                &format!("p-{i}"),
                json!({
                    "quantityLiters": 140,
                    "endDate": timestamp(day),
                    "feedstock": "Maize Cobs",
                    "biomassQuantity": 7,
                }),
            )
            .unwrap();
    }
    (source, site)
}

fn bench_on_hand_replay(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let ledger = OnHandLedger::default();

    let mut group = c.benchmark_group("on_hand_replay");
    for orders in [100usize, 1_000, 5_000] {
        let (source, site) = seeded_source(orders);
        group.throughput(Throughput::Elements(orders as u64));
        group.bench_with_input(BenchmarkId::from_parameter(orders), &orders, |b, _| {
            b.iter(|| {
                let totals = rt.block_on(ledger.compute(&source, &site)).expect("replay");
                black_box(totals)
            })
        });
    }
    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let projector = SupplyDemandProjector::default();
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 4, 0, 0).unwrap();

    let mut group = c.benchmark_group("supply_demand_projection");
    for orders in [100usize, 1_000, 5_000] {
        let (source, site) = seeded_source(orders);
        group.bench_with_input(BenchmarkId::from_parameter(orders), &orders, |b, _| {
            b.iter(|| {
                let forecast = rt.block_on(projector.project(&source, &site, now));
                black_box(forecast.expect("projection"))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_on_hand_replay, bench_projection);
criterion_main!(benches);
