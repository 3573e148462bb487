//! Site partitioning of the record store.

use charops_core::SiteId;
use charops_records::Table;

/// The site used for on-demand and test invocations.
pub const TEST_SITE: &str = "mock-site";

/// Full path of a collection in the record store (e.g. `sites/kisumu/orders`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// A collection shared by every site.
    pub fn global(table: Table) -> Self {
        Self(table.as_str().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A production site and where its tables live.
///
/// Real sites live under `sites/<id>`; the test site is kept apart under
/// `test/<id>` so test data never mixes with production collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Site {
    id: SiteId,
}

impl Site {
    pub fn new(id: SiteId) -> Self {
        Self { id }
    }

    pub fn test() -> Self {
        Self::new(SiteId::new(TEST_SITE))
    }

    pub fn id(&self) -> &SiteId {
        &self.id
    }

    pub fn is_test(&self) -> bool {
        self.id.as_str() == TEST_SITE
    }

    pub fn prefix(&self) -> String {
        if self.is_test() {
            format!("test/{}", self.id)
        } else {
            format!("sites/{}", self.id)
        }
    }

    /// Collection holding `table` for this site; global tables resolve to
    /// their shared collection.
    pub fn collection(&self, table: Table) -> CollectionPath {
        if table.is_site_scoped() {
            CollectionPath(format!("{}/{}", self.prefix(), table.as_str()))
        } else {
            CollectionPath::global(table)
        }
    }
}

impl core::fmt::Display for Site {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.id, f)
    }
}
