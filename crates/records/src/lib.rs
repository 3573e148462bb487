//! Typed records of the per-site document store.
//!
//! Every table gets an explicit struct with required and optional fields
//! spelled out; nothing downstream pokes at untyped documents. Decoding is
//! pure (no IO): callers hand over a document id and its field map.

mod de;

pub mod carbon;
pub mod formulation;
pub mod input;
pub mod item;
pub mod order;
pub mod production;
pub mod reconciliation;
pub mod record;
pub mod reference;

pub use carbon::{CarbonCost, CarbonCostKind, Customer, GlobalConstants, SiteConstants, Supplier};
pub use formulation::Formulation;
pub use input::{Input, InputKind, InputStatus};
pub use item::InventoryItem;
pub use order::{Order, OrderStatus};
pub use production::ProductionLot;
pub use reconciliation::Reconciliation;
pub use record::{decode, Record, RecordDecodeError, Table};
pub use reference::Reference;
