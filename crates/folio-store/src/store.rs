//! DocumentStore: per-collection document persistence.
//!
//! [`DocumentStore`] is the capability the engine talks to; it mirrors the
//! handful of document-database calls the engine needs. [`RedbDocumentStore`]
//! implements it on top of redb, one table per collection, and supports both
//! on-disk and in-memory backends (the latter for testing and `--in-memory`).
//!
//! Reads, updates, and deletes against a collection that does not exist
//! behave like an empty collection. Inserts require the collection to exist.

use std::path::Path;
use std::sync::Arc;

use folio_core::{Document, DocumentId, ID_FIELD};
use redb::{
    Database, ReadOnlyTable, ReadTransaction, ReadableDatabase, ReadableTable, TableError,
    TableHandle, WriteTransaction,
};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::tables::{check_collection_name, collection_table, decode, encode};

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// Document database capability used by the engine.
///
/// Implementations are synchronous and internally synchronized; callers
/// that need a deadline run them on a blocking thread.
pub trait DocumentStore: Send + Sync + 'static {
    /// Create a collection. Returns false if it already existed.
    fn create_collection(&self, name: &str) -> StoreResult<bool>;

    /// Move every document of `from` into a new collection `to` and remove `from`.
    fn rename_collection(&self, from: &str, to: &str) -> StoreResult<()>;

    /// Drop a collection and its documents. Returns true if it existed.
    fn drop_collection(&self, name: &str) -> StoreResult<bool>;

    fn collection_exists(&self, name: &str) -> StoreResult<bool>;

    /// Names of every collection, sorted.
    fn list_collections(&self) -> StoreResult<Vec<String>>;

    /// Documents matching `filter`, in insertion order, each with `_id` first.
    fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>>;

    fn find_one(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>>;

    /// Insert a document. A well-formed `_id` in `doc` is kept, otherwise a
    /// fresh one is assigned.
    fn insert_one(&self, collection: &str, doc: &Document) -> StoreResult<DocumentId>;

    /// Overwrite the fields present in `changes`, keeping all others.
    /// Returns the updated document, or `None` when nothing matched.
    fn update_one(
        &self,
        collection: &str,
        id: &DocumentId,
        changes: &Document,
    ) -> StoreResult<Option<Document>>;

    /// Returns true if a document was deleted.
    fn delete_one(&self, collection: &str, id: &DocumentId) -> StoreResult<bool>;
}

/// Thread-safe document store backed by redb.
#[derive(Clone)]
pub struct RedbDocumentStore {
    db: Arc<Database>,
}

impl RedbDocumentStore {
    /// Open (or create) a persistent document store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        debug!(?path, "document store opened");
        Ok(Self { db: Arc::new(db) })
    }

    /// Create an ephemeral in-memory document store.
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        debug!("in-memory document store opened");
        Ok(Self { db: Arc::new(db) })
    }

    fn begin_read(&self) -> StoreResult<ReadTransaction> {
        self.db.begin_read().map_err(map_err!(Transaction))
    }

    fn begin_write(&self) -> StoreResult<WriteTransaction> {
        self.db.begin_write().map_err(map_err!(Transaction))
    }
}

/// Open a collection for reading, or `None` if it was never created.
fn open_existing(
    txn: &ReadTransaction,
    name: &str,
) -> StoreResult<Option<ReadOnlyTable<&'static str, &'static [u8]>>> {
    match txn.open_table(collection_table(name)) {
        Ok(table) => Ok(Some(table)),
        Err(TableError::TableDoesNotExist(_)) => Ok(None),
        Err(e) => Err(StoreError::Table(e.to_string())),
    }
}

/// Opening a table in a write transaction creates it, so existence has to
/// be checked against the table list first.
fn has_table(txn: &WriteTransaction, name: &str) -> StoreResult<bool> {
    let mut tables = txn.list_tables().map_err(map_err!(Table))?;
    Ok(tables.any(|handle| handle.name() == name))
}

impl DocumentStore for RedbDocumentStore {
    fn create_collection(&self, name: &str) -> StoreResult<bool> {
        check_collection_name(name)?;
        let txn = self.begin_write()?;
        let created = !has_table(&txn, name)?;
        txn.open_table(collection_table(name))
            .map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(collection = %name, created, "collection ensured");
        Ok(created)
    }

    fn rename_collection(&self, from: &str, to: &str) -> StoreResult<()> {
        check_collection_name(to)?;
        let txn = self.begin_write()?;
        if !has_table(&txn, from)? {
            return Err(StoreError::CollectionNotFound(from.to_string()));
        }
        if has_table(&txn, to)? {
            return Err(StoreError::CollectionExists(to.to_string()));
        }
        let moved;
        {
            let source = txn
                .open_table(collection_table(from))
                .map_err(map_err!(Table))?;
            let mut target = txn
                .open_table(collection_table(to))
                .map_err(map_err!(Table))?;
            let mut count = 0usize;
            for entry in source.iter().map_err(map_err!(Read))? {
                let (key, value) = entry.map_err(map_err!(Read))?;
                target
                    .insert(key.value(), value.value())
                    .map_err(map_err!(Write))?;
                count += 1;
            }
            moved = count;
        }
        txn.delete_table(collection_table(from))
            .map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%from, %to, moved, "collection renamed");
        Ok(())
    }

    fn drop_collection(&self, name: &str) -> StoreResult<bool> {
        let txn = self.begin_write()?;
        let existed = txn
            .delete_table(collection_table(name))
            .map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(collection = %name, existed, "collection dropped");
        Ok(existed)
    }

    fn collection_exists(&self, name: &str) -> StoreResult<bool> {
        let txn = self.begin_read()?;
        Ok(open_existing(&txn, name)?.is_some())
    }

    fn list_collections(&self) -> StoreResult<Vec<String>> {
        let txn = self.begin_read()?;
        let mut names: Vec<String> = txn
            .list_tables()
            .map_err(map_err!(Table))?
            .map(|handle| handle.name().to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let txn = self.begin_read()?;
        let Some(table) = open_existing(&txn, collection)? else {
            return Ok(Vec::new());
        };
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let doc = decode(key.value(), value.value())?;
            if filter.matches(&doc) {
                results.push(doc);
            }
        }
        Ok(results)
    }

    fn find_one(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>> {
        let key = id.to_string();
        let txn = self.begin_read()?;
        let Some(table) = open_existing(&txn, collection)? else {
            return Ok(None);
        };
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => Ok(Some(decode(&key, guard.value())?)),
            None => Ok(None),
        }
    }

    fn insert_one(&self, collection: &str, doc: &Document) -> StoreResult<DocumentId> {
        let id = match doc.get_str(ID_FIELD) {
            Some(raw) => DocumentId::parse(raw)?,
            None => DocumentId::generate(),
        };
        let key = id.to_string();
        let value = encode(doc)?;

        let txn = self.begin_write()?;
        if !has_table(&txn, collection)? {
            return Err(StoreError::CollectionNotFound(collection.to_string()));
        }
        {
            let mut table = txn
                .open_table(collection_table(collection))
                .map_err(map_err!(Table))?;
            if table.get(key.as_str()).map_err(map_err!(Read))?.is_some() {
                return Err(StoreError::DuplicateId {
                    collection: collection.to_string(),
                    id: key,
                });
            }
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%collection, id = %key, "document inserted");
        Ok(id)
    }

    fn update_one(
        &self,
        collection: &str,
        id: &DocumentId,
        changes: &Document,
    ) -> StoreResult<Option<Document>> {
        let key = id.to_string();
        let txn = self.begin_write()?;
        if !has_table(&txn, collection)? {
            return Ok(None);
        }
        let updated;
        {
            let mut table = txn
                .open_table(collection_table(collection))
                .map_err(map_err!(Table))?;
            let current = table
                .get(key.as_str())
                .map_err(map_err!(Read))?
                .map(|guard| decode(&key, guard.value()))
                .transpose()?;
            let Some(mut doc) = current else {
                return Ok(None);
            };
            let mut changes = changes.clone();
            changes.remove(ID_FIELD);
            doc.merge(changes);
            let value = encode(&doc)?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
            updated = doc;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%collection, id = %key, "document updated");
        Ok(Some(updated))
    }

    fn delete_one(&self, collection: &str, id: &DocumentId) -> StoreResult<bool> {
        let key = id.to_string();
        let txn = self.begin_write()?;
        if !has_table(&txn, collection)? {
            return Ok(false);
        }
        let existed;
        {
            let mut table = txn
                .open_table(collection_table(collection))
                .map_err(map_err!(Table))?;
            existed = table.remove(key.as_str()).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%collection, id = %key, existed, "document deleted");
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::doc;

    fn store_with(collection: &str) -> RedbDocumentStore {
        let store = RedbDocumentStore::open_in_memory().unwrap();
        store.create_collection(collection).unwrap();
        store
    }

    // ── Collections ────────────────────────────────────────────────

    #[test]
    fn create_collection_is_idempotent() {
        let store = RedbDocumentStore::open_in_memory().unwrap();
        assert!(store.create_collection("posts").unwrap());
        assert!(!store.create_collection("posts").unwrap());
        assert!(store.collection_exists("posts").unwrap());
        assert_eq!(store.list_collections().unwrap(), vec!["posts"]);
    }

    #[test]
    fn list_collections_is_sorted() {
        let store = RedbDocumentStore::open_in_memory().unwrap();
        for name in ["zines", "authors", "posts"] {
            store.create_collection(name).unwrap();
        }
        assert_eq!(
            store.list_collections().unwrap(),
            vec!["authors", "posts", "zines"]
        );
    }

    #[test]
    fn rename_moves_documents() {
        let store = store_with("blog");
        let id = store.insert_one("blog", &doc! { "title" => "Hi" }).unwrap();

        store.rename_collection("blog", "blog!").unwrap();

        assert!(!store.collection_exists("blog").unwrap());
        let moved = store.find_one("blog!", &id).unwrap().unwrap();
        assert_eq!(moved.get_str("title"), Some("Hi"));
    }

    #[test]
    fn rename_requires_source_and_free_target() {
        let store = store_with("blog");
        store.create_collection("news").unwrap();

        assert!(matches!(
            store.rename_collection("missing", "other"),
            Err(StoreError::CollectionNotFound(name)) if name == "missing"
        ));
        assert!(matches!(
            store.rename_collection("blog", "news"),
            Err(StoreError::CollectionExists(name)) if name == "news"
        ));
        assert!(store.collection_exists("blog").unwrap());
    }

    #[test]
    fn drop_reports_whether_collection_existed() {
        let store = store_with("blog");
        store.insert_one("blog", &doc! { "title" => "x" }).unwrap();

        assert!(store.drop_collection("blog").unwrap());
        assert!(!store.drop_collection("blog").unwrap());
        assert!(store.find("blog", &Filter::All).unwrap().is_empty());
    }

    // ── Documents ──────────────────────────────────────────────────

    #[test]
    fn insert_and_find_one() {
        let store = store_with("posts");
        let id = store
            .insert_one("posts", &doc! { "title" => "Hello", "body" => "World" })
            .unwrap();

        let found = store.find_one("posts", &id).unwrap().unwrap();
        let keys: Vec<_> = found.keys().collect();
        assert_eq!(keys, vec![ID_FIELD, "title", "body"]);
        assert_eq!(found.get_str(ID_FIELD), Some(id.to_string().as_str()));
    }

    #[test]
    fn insert_keeps_supplied_id_and_rejects_duplicates() {
        let store = store_with("posts");
        let id = DocumentId::generate();
        let doc = doc! { ID_FIELD => id.to_string(), "title" => "x" };

        assert_eq!(store.insert_one("posts", &doc).unwrap(), id);
        assert!(matches!(
            store.insert_one("posts", &doc),
            Err(StoreError::DuplicateId { .. })
        ));
    }

    #[test]
    fn insert_rejects_malformed_id() {
        let store = store_with("posts");
        let err = store
            .insert_one("posts", &doc! { ID_FIELD => "nope" })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));
    }

    #[test]
    fn insert_requires_existing_collection() {
        let store = RedbDocumentStore::open_in_memory().unwrap();
        let err = store.insert_one("ghost", &doc! { "a" => "b" }).unwrap_err();
        assert!(matches!(err, StoreError::CollectionNotFound(_)));
        assert!(!store.collection_exists("ghost").unwrap());
    }

    #[test]
    fn find_applies_filter_in_insertion_order() {
        let store = store_with("posts");
        store.insert_one("posts", &doc! { "tag" => "a", "n" => 1i64 }).unwrap();
        store.insert_one("posts", &doc! { "tag" => "b", "n" => 2i64 }).unwrap();
        store.insert_one("posts", &doc! { "tag" => "a", "n" => 3i64 }).unwrap();

        let all = store.find("posts", &Filter::All).unwrap();
        assert_eq!(all.len(), 3);

        let tagged = store.find("posts", &Filter::eq("tag", "a")).unwrap();
        let ns: Vec<_> = tagged.iter().map(|d| d.get("n").cloned()).collect();
        assert_eq!(ns, vec![Some(1i64.into()), Some(3i64.into())]);
    }

    #[test]
    fn update_merges_fields() {
        let store = store_with("posts");
        let id = store
            .insert_one("posts", &doc! { "title" => "old", "cover" => "a.png" })
            .unwrap();

        let updated = store
            .update_one("posts", &id, &doc! { "title" => "new", ID_FIELD => "ignored" })
            .unwrap()
            .unwrap();
        assert_eq!(updated.get_str("title"), Some("new"));
        assert_eq!(updated.get_str("cover"), Some("a.png"));
        assert_eq!(updated.get_str(ID_FIELD), Some(id.to_string().as_str()));

        let stored = store.find_one("posts", &id).unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[test]
    fn update_and_delete_of_missing_documents_match_nothing() {
        let store = store_with("posts");
        let id = DocumentId::generate();
        assert!(store.update_one("posts", &id, &doc! { "a" => "b" }).unwrap().is_none());
        assert!(!store.delete_one("posts", &id).unwrap());
        assert!(store.update_one("ghost", &id, &doc! { "a" => "b" }).unwrap().is_none());
        assert!(!store.delete_one("ghost", &id).unwrap());
    }

    #[test]
    fn delete_removes_document() {
        let store = store_with("posts");
        let id = store.insert_one("posts", &doc! { "title" => "x" }).unwrap();
        assert!(store.delete_one("posts", &id).unwrap());
        assert!(store.find_one("posts", &id).unwrap().is_none());
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("folio.redb");

        let id = {
            let store = RedbDocumentStore::open(&db_path).unwrap();
            store.create_collection("posts").unwrap();
            store.insert_one("posts", &doc! { "title" => "kept" }).unwrap()
        };

        let store = RedbDocumentStore::open(&db_path).unwrap();
        let doc = store.find_one("posts", &id).unwrap().unwrap();
        assert_eq!(doc.get_str("title"), Some("kept"));
    }
}
