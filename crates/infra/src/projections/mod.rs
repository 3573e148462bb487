//! Forecasting engines over the record store.
//!
//! All engines are read-only with respect to transactional tables. Each call
//! takes an explicit `now` and builds its own formulation cache, so
//! concurrent runs for different sites share nothing.
//!
//! - `SupplyDemandProjector`: 30-day supply and demand per inventory item
//! - `OnHandLedger`: on-hand stock by replaying the full history (expensive)
//! - `CarbonAccountant`: carbon removed and released over a reporting window

pub mod carbon;
pub mod formulation_cache;
pub mod on_hand;
pub mod supply_demand;
pub mod totals;

use thiserror::Error;

use charops_core::FormulationId;

use crate::record_source::RecordSourceError;

pub use carbon::{CarbonAccountant, CarbonReleased, CarbonReport, CarbonRetired};
pub use formulation_cache::FormulationCache;
pub use on_hand::OnHandLedger;
pub use supply_demand::{Forecast, SupplyDemandProjector};
pub use totals::ItemTotals;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Source(#[from] RecordSourceError),

    /// An order references a formulation with no stored recipe. Treating it
    /// as "no ingredients" would understate demand, so the run fails.
    #[error("formulation '{0}' not found")]
    FormulationNotFound(FormulationId),

    #[error("constant '{name}' missing from constants/{scope}")]
    MissingConstant { scope: String, name: &'static str },

    #[error("missing transport data: {0}")]
    MissingTransportData(String),
}
