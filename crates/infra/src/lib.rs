//! Infrastructure layer: record store access, forecasting engines, warnings
//! and the daily job.

pub mod config;
pub mod constants;
pub mod jobs;
pub mod projections;
pub mod record_source;
pub mod site;
pub mod warnings;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
mod test_support;
