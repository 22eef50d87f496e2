//! The metadata collection holding every [`CollectionDefinition`].

use folio_core::Value;
use folio_store::{DocumentStore, Filter};
use tracing::debug;

use crate::bounded::Bounded;
use crate::error::EngineResult;
use crate::schema::CollectionDefinition;

/// Name of the metadata collection.
pub const METADATA_COLLECTION: &str = "__collections";

#[derive(Clone)]
pub struct DefinitionTable {
    store: Bounded<dyn DocumentStore>,
    collection: String,
}

impl DefinitionTable {
    pub fn new(store: Bounded<dyn DocumentStore>) -> Self {
        Self {
            store,
            collection: METADATA_COLLECTION.to_string(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the metadata collection if needed.
    pub async fn ensure(&self) -> EngineResult<()> {
        let collection = self.collection.clone();
        self.store
            .run("create metadata collection", move |store| {
                store.create_collection(&collection)
            })
            .await?;
        Ok(())
    }

    /// Definitions matching `filter`, in creation order.
    pub async fn find(&self, filter: Filter) -> EngineResult<Vec<CollectionDefinition>> {
        let collection = self.collection.clone();
        let docs = self
            .store
            .run("find definitions", move |store| store.find(&collection, &filter))
            .await?;
        docs.iter().map(CollectionDefinition::from_document).collect()
    }

    pub async fn all(&self) -> EngineResult<Vec<CollectionDefinition>> {
        self.find(Filter::All).await
    }

    /// The first definition whose `field` equals `value`.
    pub async fn find_by(
        &self,
        field: &str,
        value: impl Into<Value>,
    ) -> EngineResult<Option<CollectionDefinition>> {
        let mut found = self.find(Filter::eq(field, value)).await?;
        Ok((!found.is_empty()).then(|| found.swap_remove(0)))
    }

    pub async fn by_path(&self, path: &str) -> EngineResult<Option<CollectionDefinition>> {
        self.find_by("path", path).await
    }

    pub async fn insert(&self, def: &CollectionDefinition) -> EngineResult<()> {
        let collection = self.collection.clone();
        let doc = def.to_document();
        self.store
            .run("insert definition", move |store| store.insert_one(&collection, &doc))
            .await?;
        debug!(path = %def.path, id = %def.id, "definition inserted");
        Ok(())
    }

    /// Overwrite a stored definition. Returns false if it no longer exists.
    pub async fn replace(&self, def: &CollectionDefinition) -> EngineResult<bool> {
        let collection = self.collection.clone();
        let id = def.id;
        let doc = def.to_document();
        let updated = self
            .store
            .run("update definition", move |store| {
                store.update_one(&collection, &id, &doc)
            })
            .await?;
        debug!(path = %def.path, id = %def.id, matched = updated.is_some(), "definition replaced");
        Ok(updated.is_some())
    }

    /// Returns false if nothing was deleted.
    pub async fn delete(&self, def: &CollectionDefinition) -> EngineResult<bool> {
        let collection = self.collection.clone();
        let id = def.id;
        let deleted = self
            .store
            .run("delete definition", move |store| store.delete_one(&collection, &id))
            .await?;
        debug!(path = %def.path, id = %def.id, deleted, "definition deleted");
        Ok(deleted)
    }
}
