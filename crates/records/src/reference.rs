//! References from one record to another.
//!
//! Linked-record fields are written in three shapes depending on which tool
//! created the document: a bare id, an object `{ "id", "name" }`, or a list of
//! such objects of which only the first is meaningful.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawReference")]
pub struct Reference {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Reference {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    /// The denormalised name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Deserialize)]
struct ReferenceObject {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawReference {
    Id(String),
    Object(ReferenceObject),
    List(Vec<ReferenceObject>),
}

impl RawReference {
    fn into_reference(self) -> Option<Reference> {
        let obj = match self {
            RawReference::Id(id) => return Some(Reference::new(id)),
            RawReference::Object(obj) => obj,
            RawReference::List(list) => list.into_iter().next()?,
        };
        Some(Reference {
            id: obj.id,
            name: obj.name,
        })
    }
}

impl TryFrom<RawReference> for Reference {
    type Error = String;

    fn try_from(raw: RawReference) -> Result<Self, Self::Error> {
        raw.into_reference()
            .ok_or_else(|| "empty reference list".to_string())
    }
}

/// Optional reference: absent, null and empty lists all decode to `None`.
pub(crate) fn optional<'de, D>(deserializer: D) -> Result<Option<Reference>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawReference>::deserialize(deserializer)?.and_then(RawReference::into_reference))
}
