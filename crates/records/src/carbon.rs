//! Records feeding carbon accounting: emission sources, transport distances
//! and the emission constants.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::de::number_or_zero;
use crate::record::{impl_record, Table};

pub mod field {
    pub const DATE: &str = "date";
}

/// Document id of the constants shared by all sites.
pub const GLOBAL_CONSTANTS_ID: &str = "global";

/// Field of the global constants holding the per-vehicle emission factors.
pub const TRANSPORT_TABLE: &str = "transportKgCO2PerKm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarbonCostKind {
    /// Grid electricity, in kWh.
    Electricity,
    /// Diesel burned on site, in liters.
    Diesel,
    #[serde(other)]
    Other,
}

/// An on-site emission source logged by operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbonCost {
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CarbonCostKind,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub value: f64,
    #[serde(default)]
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

impl_record!(CarbonCost, Table::CarbonCosts);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Road distance from the site, in km.
    #[serde(default)]
    pub distance: Option<f64>,
}

impl_record!(Customer, Table::Customers);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Road distance to the site, in km.
    #[serde(default)]
    pub distance: Option<f64>,
}

impl_record!(Supplier, Table::Suppliers);

/// Constants shared by every site (`constants/global`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConstants {
    #[serde(skip)]
    pub id: String,
    #[serde(default, rename = "dieselKgCO2PerL")]
    pub diesel_kg_co2_per_l: Option<f64>,
    /// Emission factor per vehicle, kgCO2 per km.
    #[serde(default, rename = "transportKgCO2PerKm")]
    pub transport_kg_co2_per_km: BTreeMap<String, f64>,
}

impl_record!(GlobalConstants, Table::Constants);

/// Site-specific constants (`constants/<site>`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConstants {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub biochar_density_kg_per_l: Option<f64>,
    #[serde(default)]
    pub biochar_carbon_content: Option<f64>,
    #[serde(default, rename = "gramsCO2PerKWh")]
    pub grams_co2_per_kwh: Option<f64>,
}

impl_record!(SiteConstants, Table::Constants);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::decode;
    use serde_json::json;

    #[test]
    fn global_constants_keep_vehicle_table() {
        let fields = json!({
            "dieselKgCO2PerL": 2.68,
            "transportKgCO2PerKm": {"Pickup": 0.25, "Lorry": 0.9}
        });
        let c: GlobalConstants = decode(GLOBAL_CONSTANTS_ID, fields.as_object().unwrap()).unwrap();
        assert_eq!(c.diesel_kg_co2_per_l, Some(2.68));
        assert_eq!(c.transport_kg_co2_per_km.get("Lorry"), Some(&0.9));
    }

    #[test]
    fn site_constants_use_stored_names() {
        let fields = json!({
            "biocharDensityKgPerL": 0.3,
            "biocharCarbonContent": 0.75,
            "gramsCO2PerKWh": 120.0
        });
        let c: SiteConstants = decode("kisumu", fields.as_object().unwrap()).unwrap();
        assert_eq!(c.biochar_density_kg_per_l, Some(0.3));
        assert_eq!(c.grams_co2_per_kwh, Some(120.0));
    }
}
