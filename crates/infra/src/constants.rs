//! Emission constants maintained by operators.
//!
//! Carbon accounting reads these; this module lists and edits them. All
//! writes are merge-updates of existing `constants/<scope>` documents.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::info;

use charops_core::SiteId;
use charops_records::carbon::{GLOBAL_CONSTANTS_ID, TRANSPORT_TABLE};
use charops_records::Table;

use crate::record_source::{RecordSource, RecordSourceError};
use crate::site::{CollectionPath, TEST_SITE};

#[derive(Debug, thiserror::Error)]
pub enum ConstantsError {
    #[error(transparent)]
    Source(#[from] RecordSourceError),

    #[error("invalid constant name '{0}'")]
    InvalidName(String),

    #[error("invalid constants scope '{0}' (expected 'global' or a site id)")]
    InvalidScope(String),

    #[error("'{}' holds vehicle factors; set them per vehicle", TRANSPORT_TABLE)]
    VehicleTable,
}

/// Numeric constants as currently stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConstantsOverview {
    pub global: BTreeMap<String, f64>,
    /// kgCO2 per km, by vehicle.
    pub transport: BTreeMap<String, f64>,
    /// Per-site constants, including the test site.
    pub sites: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Reads and edits `constants/*`.
pub struct ConstantsStore<'a, S: ?Sized> {
    source: &'a S,
}

impl<'a, S> ConstantsStore<'a, S>
where
    S: RecordSource + ?Sized,
{
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    fn collection() -> CollectionPath {
        CollectionPath::global(Table::Constants)
    }

    async fn fields(&self, id: &str) -> Result<Map<String, JsonValue>, RecordSourceError> {
        Ok(self
            .source
            .get(&Self::collection(), id)
            .await?
            .map(|doc| doc.fields)
            .unwrap_or_default())
    }

    pub async fn show(&self) -> Result<ConstantsOverview, ConstantsError> {
        let global = self.fields(GLOBAL_CONSTANTS_ID).await?;
        let transport = global
            .get(TRANSPORT_TABLE)
            .and_then(JsonValue::as_object)
            .map(numbers)
            .unwrap_or_default();

        let mut site_ids = self
            .source
            .list_ids(&CollectionPath::global(Table::Sites))
            .await?;
        site_ids.push(TEST_SITE.to_string());

        let mut sites = BTreeMap::new();
        for id in site_ids {
            let fields = self.fields(&id).await?;
            sites.insert(id, numbers(&fields));
        }

        Ok(ConstantsOverview {
            global: numbers(&global),
            transport,
            sites,
        })
    }

    /// Set one numeric constant in `constants/<scope>`.
    pub async fn set_constant(
        &self,
        scope: &str,
        name: &str,
        value: f64,
    ) -> Result<(), ConstantsError> {
        let scope = constants_scope(scope)?;
        check_name(name)?;
        if name == TRANSPORT_TABLE {
            return Err(ConstantsError::VehicleTable);
        }

        let mut fields = Map::new();
        fields.insert(name.to_string(), JsonValue::from(value));
        self.source.update(&Self::collection(), &scope, fields).await?;
        info!(scope = %scope, constant = name, value, "constant updated");
        Ok(())
    }

    /// Add or update one vehicle's emission factor, leaving the others intact.
    pub async fn set_vehicle(
        &self,
        vehicle: &str,
        kg_co2_per_km: f64,
    ) -> Result<(), ConstantsError> {
        check_name(vehicle)?;

        let mut fields = Map::new();
        fields.insert(format!("{TRANSPORT_TABLE}.{vehicle}"), JsonValue::from(kg_co2_per_km));
        self.source
            .update(&Self::collection(), GLOBAL_CONSTANTS_ID, fields)
            .await?;
        info!(vehicle, kg_co2_per_km, "vehicle transport factor updated");
        Ok(())
    }
}

/// Numeric fields only; nested tables are listed separately.
fn numbers(fields: &Map<String, JsonValue>) -> BTreeMap<String, f64> {
    fields
        .iter()
        .filter_map(|(name, value)| value.as_f64().map(|v| (name.clone(), v)))
        .collect()
}

fn check_name(name: &str) -> Result<(), ConstantsError> {
    if name.trim().is_empty() || name.contains('.') {
        return Err(ConstantsError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn constants_scope(scope: &str) -> Result<String, ConstantsError> {
    if scope == GLOBAL_CONSTANTS_ID {
        return Ok(scope.to_string());
    }
    scope
        .parse::<SiteId>()
        .map(|id| id.to_string())
        .map_err(|_| ConstantsError::InvalidScope(scope.to_string()))
}
