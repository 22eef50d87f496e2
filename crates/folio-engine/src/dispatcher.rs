//! Record CRUD dispatcher.
//!
//! Every operation resolves the collection definition first and fails with
//! not-found before touching the collection's own storage. Writes are
//! validated against the definition's attributes and pass through the
//! media interceptor.

use folio_core::{Document, DocumentId};
use folio_store::{DocumentStore, Filter};
use tracing::{debug, info, warn};

use crate::bounded::Bounded;
use crate::definitions::DefinitionTable;
use crate::error::{EngineError, EngineResult};
use crate::media::{FieldFailure, MediaInterceptor};
use crate::schema::CollectionDefinition;
use crate::validate::validate_record;

/// A written record, plus any image fields that had to stay inline.
#[derive(Debug)]
pub struct RecordWrite {
    pub record: Document,
    pub media_failures: Vec<FieldFailure>,
}

fn not_found(id: &str, path: &str) -> EngineError {
    EngineError::NotFound(format!("Couldn't find ({id}) in collection ({path})"))
}

fn parse_id(raw: &str) -> EngineResult<DocumentId> {
    DocumentId::parse(raw).map_err(|e| EngineError::invalid("id", e.to_string()))
}

#[derive(Clone)]
pub struct RecordDispatcher {
    definitions: DefinitionTable,
    records: Bounded<dyn DocumentStore>,
    media: MediaInterceptor,
}

impl RecordDispatcher {
    pub fn new(
        definitions: DefinitionTable,
        records: Bounded<dyn DocumentStore>,
        media: MediaInterceptor,
    ) -> Self {
        Self {
            definitions,
            records,
            media,
        }
    }

    pub fn media(&self) -> &MediaInterceptor {
        &self.media
    }

    async fn resolve(&self, path: &str) -> EngineResult<CollectionDefinition> {
        self.definitions
            .by_path(path)
            .await?
            .ok_or_else(EngineError::collection_not_found)
    }

    async fn fetch(&self, path: &str, id: DocumentId) -> EngineResult<Option<Document>> {
        let collection = path.to_string();
        self.records
            .run("find document", move |store| store.find_one(&collection, &id))
            .await
    }

    /// Every record of the collection.
    pub async fn list(&self, path: &str) -> EngineResult<Vec<Document>> {
        let def = self.resolve(path).await?;
        self.records
            .run("find documents", move |store| store.find(&def.path, &Filter::All))
            .await
    }

    pub async fn get(&self, path: &str, id: &str) -> EngineResult<Document> {
        let def = self.resolve(path).await?;
        let doc_id = parse_id(id)?;
        self.fetch(&def.path, doc_id)
            .await?
            .ok_or_else(|| not_found(id, path))
    }

    /// Validate, externalize images, and insert. The returned record
    /// carries its new `_id`.
    pub async fn create(&self, path: &str, body: Document) -> EngineResult<RecordWrite> {
        let def = self.resolve(path).await?;
        validate_record(&body, &def.attributes).map_err(EngineError::validation)?;

        let externalized = self.media.externalize(body).await;
        let record = externalized.document;
        let collection = def.path.clone();
        let to_insert = record.clone();
        let inserted = self
            .records
            .run("insert document", move |store| {
                store.insert_one(&collection, &to_insert)
            })
            .await;
        let id = match inserted {
            Ok(id) => id,
            Err(e) => {
                self.media.discard(externalized.stored).await;
                return Err(e);
            }
        };

        info!(%path, %id, "record created");
        Ok(RecordWrite {
            record: record.with_id(id),
            media_failures: externalized.failures,
        })
    }

    /// Validate, externalize images, and `$set`-merge `body` into the
    /// record. Blobs the previous version referenced and the merged one
    /// does not are deleted afterwards.
    pub async fn update(&self, path: &str, id: &str, body: Document) -> EngineResult<RecordWrite> {
        let def = self.resolve(path).await?;
        let doc_id = parse_id(id)?;
        validate_record(&body, &def.attributes).map_err(EngineError::validation)?;

        let current = self
            .fetch(&def.path, doc_id)
            .await?
            .ok_or_else(|| not_found(id, path))?;

        let externalized = self.media.externalize(body).await;
        let collection = def.path.clone();
        let changes = externalized.document;
        let updated = self
            .records
            .run("update document", move |store| {
                store.update_one(&collection, &doc_id, &changes)
            })
            .await;
        let record = match updated {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.media.discard(externalized.stored).await;
                return Err(not_found(id, path));
            }
            Err(e) => {
                self.media.discard(externalized.stored).await;
                return Err(e);
            }
        };

        let purged = self.media.purge_orphans(&current, Some(&record)).await;
        info!(%path, %id, purged, "record updated");
        Ok(RecordWrite {
            record,
            media_failures: externalized.failures,
        })
    }

    /// Delete a record after deleting every blob it references.
    pub async fn delete(&self, path: &str, id: &str) -> EngineResult<()> {
        let def = self.resolve(path).await?;
        let doc_id = parse_id(id)?;
        let current = self
            .fetch(&def.path, doc_id)
            .await?
            .ok_or_else(|| not_found(id, path))?;

        let purged = self.media.purge_orphans(&current, None).await;
        debug!(%path, %id, purged, "record blobs purged");

        let collection = def.path.clone();
        let deleted = self
            .records
            .run("delete document", move |store| store.delete_one(&collection, &doc_id))
            .await?;
        if !deleted {
            warn!(%path, %id, "record vanished before delete");
            return Err(not_found(id, path));
        }
        info!(%path, %id, "record deleted");
        Ok(())
    }
}
