//! `charops-core` — shared building blocks.
//!
//! This crate contains **pure** primitives (no IO, no storage): identifiers,
//! the domain error model and calendar arithmetic used by the forecasting
//! engines.

pub mod error;
pub mod id;
pub mod time;

pub use error::DomainError;
pub use id::{FormulationId, ItemId, SiteId};
pub use time::{days, days_between, round_to};
