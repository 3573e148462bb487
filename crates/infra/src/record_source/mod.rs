//! Queryable record store abstraction.
//!
//! ## Components
//!
//! - `RecordSource`: async trait over a document store (list, query, get, merge-update)
//! - `Filter`/`Predicate`: conjunctions of simple field predicates pushed to the store
//! - `InMemoryRecordSource`: tests/dev and snapshot-backed runs
//! - `SiteRecords`: typed reads scoped to one site

pub mod filter;
pub mod in_memory;
pub mod reader;
pub mod source;

pub use filter::{timestamp, Filter, Op, Predicate};
pub use in_memory::InMemoryRecordSource;
pub use reader::SiteRecords;
pub use source::{Document, RecordSource, RecordSourceError};
