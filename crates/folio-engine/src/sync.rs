//! Backing store synchronizer: keeps one physical collection per logical
//! collection, named after the definition's path.

use folio_store::DocumentStore;
use tracing::{debug, info};

use crate::bounded::Bounded;
use crate::error::EngineResult;

#[derive(Clone)]
pub struct Synchronizer {
    store: Bounded<dyn DocumentStore>,
}

impl Synchronizer {
    pub fn new(store: Bounded<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create the physical collection. An existing one counts as success.
    pub async fn create(&self, path: &str) -> EngineResult<()> {
        let name = path.to_string();
        let created = self
            .store
            .run("create collection", move |store| store.create_collection(&name))
            .await?;
        if created {
            info!(%path, "physical collection created");
        } else {
            debug!(%path, "physical collection already existed");
        }
        Ok(())
    }

    pub async fn rename(&self, from: &str, to: &str) -> EngineResult<()> {
        let (source, target) = (from.to_string(), to.to_string());
        self.store
            .run("rename collection", move |store| {
                store.rename_collection(&source, &target)
            })
            .await?;
        info!(%from, %to, "physical collection renamed");
        Ok(())
    }

    /// Drop the physical collection. Returns whether it existed.
    pub async fn drop(&self, path: &str) -> EngineResult<bool> {
        let name = path.to_string();
        let existed = self
            .store
            .run("drop collection", move |store| store.drop_collection(&name))
            .await?;
        info!(%path, existed, "physical collection dropped");
        Ok(existed)
    }

    pub async fn exists(&self, path: &str) -> EngineResult<bool> {
        let name = path.to_string();
        self.store
            .run("check collection", move |store| store.collection_exists(&name))
            .await
    }

    /// Every physical collection, sorted.
    pub async fn list(&self) -> EngineResult<Vec<String>> {
        self.store
            .run("list collections", |store| store.list_collections())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use folio_store::RedbDocumentStore;

    fn synchronizer() -> Synchronizer {
        let store: Arc<dyn DocumentStore> = Arc::new(RedbDocumentStore::open_in_memory().unwrap());
        Synchronizer::new(Bounded::new(store, Duration::from_secs(5)))
    }

    #[tokio::test]
    async fn create_rename_drop() {
        let sync = synchronizer();
        sync.create("blog").await.unwrap();
        sync.create("blog").await.unwrap();
        assert!(sync.exists("blog").await.unwrap());

        sync.rename("blog", "blog!").await.unwrap();
        assert_eq!(sync.list().await.unwrap(), vec!["blog!"]);

        assert!(sync.drop("blog!").await.unwrap());
        assert!(!sync.drop("blog!").await.unwrap());
        assert!(sync.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rename_of_missing_collection_is_a_storage_error() {
        let sync = synchronizer();
        let err = sync.rename("ghost", "other").await.unwrap_err();
        assert!(matches!(err, crate::EngineError::Storage(_)));
    }
}
