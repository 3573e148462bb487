//! Fixtures shared by the engine tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value as JsonValue};

use charops_core::days;
use charops_records::Table;

use crate::record_source::{timestamp, InMemoryRecordSource};
use crate::site::{CollectionPath, Site};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 15, 4, 0, 0).unwrap()
}

/// RFC 3339 string `offset_days` from `now()`.
pub fn at(offset_days: i64) -> JsonValue {
    timestamp(now() + days(offset_days))
}

pub fn at_hours(offset_hours: i64) -> JsonValue {
    timestamp(now() + Duration::hours(offset_hours))
}

pub struct Fixture {
    pub source: InMemoryRecordSource,
    pub site: Site,
}

impl Fixture {
    pub fn new(site: Site) -> Self {
        Self {
            source: InMemoryRecordSource::new(),
            site,
        }
    }

    pub fn test_site() -> Self {
        Self::new(Site::test())
    }

    pub fn insert(&self, table: Table, id: &str, fields: JsonValue) -> &Self {
        self.source
            .insert(&self.site.collection(table), id, fields)
            .unwrap();
        self
    }

    pub fn register(&self, items: &[&str]) -> &Self {
        for item in items {
            self.insert(Table::Inventory, item, json!({ "name": item }));
        }
        self
    }

    pub fn formulation(&self, id: &str, fields: JsonValue) -> &Self {
        self.source
            .insert(&CollectionPath::global(Table::Formulations), id, fields)
            .unwrap();
        self
    }

    pub fn order(&self, id: &str, fields: JsonValue) -> &Self {
        self.insert(Table::Orders, id, fields)
    }

    pub fn input(&self, id: &str, fields: JsonValue) -> &Self {
        self.insert(Table::Inputs, id, fields)
    }

    pub fn lot(&self, id: &str, fields: JsonValue) -> &Self {
        self.insert(Table::BiocharProduction, id, fields)
    }

    pub fn reconciliation(&self, id: &str, fields: JsonValue) -> &Self {
        self.insert(Table::Reconciliations, id, fields)
    }
}
