use std::collections::HashMap;

use tracing::debug;

use charops_core::FormulationId;
use charops_records::{Formulation, Table};

use crate::record_source::{RecordSource, RecordSourceError};
use crate::site::CollectionPath;

use super::ProjectionError;

/// Per-invocation memo of formulation lookups.
///
/// Populated on miss, never evicted or invalidated: formulations are treated
/// as immutable for the duration of one computation. Create one per call;
/// never share one across concurrent invocations.
pub struct FormulationCache<'a, S: ?Sized> {
    source: &'a S,
    entries: HashMap<FormulationId, Formulation>,
    fetches: usize,
}

impl<'a, S> FormulationCache<'a, S>
where
    S: RecordSource + ?Sized,
{
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            entries: HashMap::new(),
            fetches: 0,
        }
    }

    /// Formulation `id`, fetched from the store on first request.
    pub async fn get(&mut self, id: &FormulationId) -> Result<&Formulation, ProjectionError> {
        if !self.entries.contains_key(id) {
            self.fetches += 1;
            let doc = self
                .source
                .get(&CollectionPath::global(Table::Formulations), id.as_str())
                .await?
                .ok_or_else(|| ProjectionError::FormulationNotFound(id.clone()))?;
            let formulation = doc.decode::<Formulation>().map_err(RecordSourceError::from)?;
            debug!(
                formulation = %id,
                ingredients = formulation.ingredients.len(),
                "formulation cached"
            );
            self.entries.insert(id.clone(), formulation);
        }

        self.entries
            .get(id)
            .ok_or_else(|| ProjectionError::FormulationNotFound(id.clone()))
    }

    /// Number of store round trips made so far.
    pub fn fetches(&self) -> usize {
        self.fetches
    }
}
