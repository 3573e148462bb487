use charops_core::ItemId;
use charops_records::{Record, Table};

use crate::site::Site;

use super::filter::Filter;
use super::source::{RecordSource, RecordSourceError};

/// Typed reads for one site.
///
/// Global tables (formulations, constants) resolve to their shared
/// collection, so the same reader serves both.
pub struct SiteRecords<'a, S: ?Sized> {
    source: &'a S,
    site: &'a Site,
}

impl<'a, S> SiteRecords<'a, S>
where
    S: RecordSource + ?Sized,
{
    pub fn new(source: &'a S, site: &'a Site) -> Self {
        Self { source, site }
    }

    pub async fn fetch<T: Record>(&self, filter: &Filter) -> Result<Vec<T>, RecordSourceError> {
        let collection = self.site.collection(T::TABLE);
        let docs = self.source.query(&collection, filter).await?;
        docs.iter()
            .map(|doc| doc.decode::<T>().map_err(RecordSourceError::from))
            .collect()
    }

    pub async fn get<T: Record>(&self, id: &str) -> Result<Option<T>, RecordSourceError> {
        let collection = self.site.collection(T::TABLE);
        match self.source.get(&collection, id).await? {
            Some(doc) => Ok(Some(doc.decode::<T>()?)),
            None => Ok(None),
        }
    }

    /// Ids of every registered inventory item.
    pub async fn item_ids(&self) -> Result<Vec<ItemId>, RecordSourceError> {
        let ids = self
            .source
            .list_ids(&self.site.collection(Table::Inventory))
            .await?;
        Ok(ids.into_iter().map(ItemId::new).collect())
    }
}
