//! Document filters understood by [`DocumentStore::find`](crate::DocumentStore::find).

use folio_core::{Document, Value};

/// Selects documents from a collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// Every document.
    #[default]
    All,
    /// Documents whose top-level `field` equals `value`.
    Eq { field: String, value: Value },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => doc.get(field) == Some(value),
        }
    }
}
