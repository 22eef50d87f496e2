//! Test fixtures: a fault-injecting document store.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use folio_core::{Document, DocumentId};
use folio_media::MemoryBlobStore;
use folio_store::{DocumentStore, Filter, RedbDocumentStore, StoreError, StoreResult};

use crate::Engine;

pub const BASE_URL: &str = "https://cdn.test/media";

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wraps an in-memory redb store, records every call, and can be told to
/// fail or stall specific operations.
pub struct FaultyStore {
    inner: RedbDocumentStore,
    failing: Mutex<HashSet<&'static str>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<(&'static str, String)>>,
}

impl FaultyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: RedbDocumentStore::open_in_memory().unwrap(),
            failing: Mutex::new(HashSet::new()),
            delay: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn inner(&self) -> &RedbDocumentStore {
        &self.inner
    }

    /// Make every call of `op` fail (`create`, `rename`, `drop`, `find`,
    /// `insert`, `update`, `delete`).
    pub fn fail(&self, op: &'static str) {
        locked(&self.failing).insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        locked(&self.failing).remove(op);
    }

    pub fn stall(&self, delay: Duration) {
        *locked(&self.delay) = Some(delay);
    }

    /// Operations issued against `collection`, in call order.
    pub fn calls_on(&self, collection: &str) -> Vec<&'static str> {
        locked(&self.calls)
            .iter()
            .filter(|(_, name)| name == collection)
            .map(|(op, _)| *op)
            .collect()
    }

    pub fn clear_calls(&self) {
        locked(&self.calls).clear();
    }

    fn enter(&self, op: &'static str, collection: &str) -> StoreResult<()> {
        locked(&self.calls).push((op, collection.to_string()));
        let delay = *locked(&self.delay);
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if locked(&self.failing).contains(op) {
            return Err(StoreError::Write(format!("injected {op} failure")));
        }
        Ok(())
    }
}

impl DocumentStore for FaultyStore {
    fn create_collection(&self, name: &str) -> StoreResult<bool> {
        self.enter("create", name)?;
        self.inner.create_collection(name)
    }

    fn rename_collection(&self, from: &str, to: &str) -> StoreResult<()> {
        self.enter("rename", from)?;
        self.inner.rename_collection(from, to)
    }

    fn drop_collection(&self, name: &str) -> StoreResult<bool> {
        self.enter("drop", name)?;
        self.inner.drop_collection(name)
    }

    fn collection_exists(&self, name: &str) -> StoreResult<bool> {
        self.enter("exists", name)?;
        self.inner.collection_exists(name)
    }

    fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.enter("list", "")?;
        self.inner.list_collections()
    }

    fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        self.enter("find", collection)?;
        self.inner.find(collection, filter)
    }

    fn find_one(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>> {
        self.enter("find", collection)?;
        self.inner.find_one(collection, id)
    }

    fn insert_one(&self, collection: &str, doc: &Document) -> StoreResult<DocumentId> {
        self.enter("insert", collection)?;
        self.inner.insert_one(collection, doc)
    }

    fn update_one(
        &self,
        collection: &str,
        id: &DocumentId,
        changes: &Document,
    ) -> StoreResult<Option<Document>> {
        self.enter("update", collection)?;
        self.inner.update_one(collection, id, changes)
    }

    fn delete_one(&self, collection: &str, id: &DocumentId) -> StoreResult<bool> {
        self.enter("delete", collection)?;
        self.inner.delete_one(collection, id)
    }
}

/// An initialized engine over a fault-injecting store and in-memory blobs.
pub async fn engine() -> (Engine, Arc<FaultyStore>, Arc<MemoryBlobStore>) {
    engine_with_timeout(Duration::from_secs(5)).await
}

pub async fn engine_with_timeout(
    timeout: Duration,
) -> (Engine, Arc<FaultyStore>, Arc<MemoryBlobStore>) {
    let store = FaultyStore::new();
    let blobs = Arc::new(MemoryBlobStore::new(BASE_URL));
    let engine = Engine::new(store.clone(), blobs.clone(), timeout);
    engine.init().await.unwrap();
    store.clear_calls();
    (engine, store, blobs)
}
