//! The engine facade wiring registry, dispatcher, and media handling
//! over one document store and one blob store.

use std::sync::Arc;
use std::time::Duration;

use folio_media::BlobStore;
use folio_store::DocumentStore;

use crate::bounded::Bounded;
use crate::dispatcher::RecordDispatcher;
use crate::error::EngineResult;
use crate::media::MediaInterceptor;
use crate::registry::Registry;

#[derive(Clone)]
pub struct Engine {
    registry: Registry,
    records: RecordDispatcher,
}

impl Engine {
    /// Every store call is bounded by `timeout`.
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>, timeout: Duration) -> Self {
        let store = Bounded::new(store, timeout);
        let registry = Registry::new(store.clone());
        let media = MediaInterceptor::new(Bounded::new(blobs, timeout));
        let records = RecordDispatcher::new(registry.definitions().clone(), store, media);
        Self { registry, records }
    }

    /// Prepare the metadata collection. Call once before serving.
    pub async fn init(&self) -> EngineResult<()> {
        self.registry.init().await
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn records(&self) -> &RecordDispatcher {
        &self.records
    }
}
