use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// Tables of the record store.
///
/// Site tables live under a per-site prefix; global tables are shared by
/// every site.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Table {
    Orders,
    Inputs,
    BiocharProduction,
    Reconciliations,
    Inventory,
    CarbonCosts,
    Customers,
    Suppliers,
    Formulations,
    Constants,
    Sites,
}

impl Table {
    /// Collection name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Orders => "orders",
            Table::Inputs => "inputs",
            Table::BiocharProduction => "biochar-prod",
            Table::Reconciliations => "reconciliations",
            Table::Inventory => "inventory",
            Table::CarbonCosts => "carbon-costs",
            Table::Customers => "customers",
            Table::Suppliers => "suppliers",
            Table::Formulations => "formulations",
            Table::Constants => "constants",
            Table::Sites => "sites",
        }
    }

    pub fn is_site_scoped(&self) -> bool {
        !matches!(self, Table::Formulations | Table::Constants | Table::Sites)
    }
}

impl core::fmt::Display for Table {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("failed to decode {table} record '{id}': {source}")]
pub struct RecordDecodeError {
    pub table: Table,
    pub id: String,
    #[source]
    pub source: serde_json::Error,
}

/// A typed record stored in one table.
pub trait Record: DeserializeOwned + Sized {
    const TABLE: Table;

    /// Document ids are not part of the field map; they are attached after decoding.
    fn assign_id(&mut self, id: String);
}

/// Decode a stored document into its typed record.
pub fn decode<T: Record>(
    id: &str,
    fields: &Map<String, JsonValue>,
) -> Result<T, RecordDecodeError> {
    let mut record: T = serde_json::from_value(JsonValue::Object(fields.clone())).map_err(
        |source| RecordDecodeError {
            table: T::TABLE,
            id: id.to_string(),
            source,
        },
    )?;
    record.assign_id(id.to_string());
    Ok(record)
}

macro_rules! impl_record {
    ($t:ty, $table:expr) => {
        impl $crate::record::Record for $t {
            const TABLE: $crate::record::Table = $table;

            fn assign_id(&mut self, id: String) {
                self.id = id;
            }
        }
    };
}

pub(crate) use impl_record;
