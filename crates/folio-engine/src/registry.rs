//! Collection registry: the set of collection definitions and the
//! operations that create, change, and remove them.
//!
//! Every mutation keeps the definition's `path` equal to the name of its
//! physical collection. Mutations that touch both run as a [`Saga`]:
//!
//! - define: insert definition, then create storage
//! - update with a new path: rename storage, then replace definition
//! - remove: delete definition, then drop storage (best effort)
//!
//! The physical rename happens first so that a failed rename leaves the
//! definition untouched.

use std::collections::BTreeSet;

use folio_core::{Document, DocumentId, doc};
use folio_store::{DocumentStore, Filter};
use serde::Serialize;
use tracing::{info, warn};

use crate::bounded::Bounded;
use crate::definitions::{DefinitionTable, METADATA_COLLECTION};
use crate::error::{EngineError, EngineResult};
use crate::saga::{Participants, Saga, SagaStep};
use crate::schema::{CollectionDefinition, now};
use crate::slug::slugify;
use crate::sync::Synchronizer;
use crate::validate::{NewDefinition, validate_definition, validate_new_definition};

/// Paths no collection may use: the metadata collection itself and the
/// fixed route segments of the HTTP surface.
pub const RESERVED_PATHS: [&str; 3] = [METADATA_COLLECTION, "collections", "login"];

/// Differences between the registry and the physical collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    /// Paths of definitions whose physical collection is missing.
    pub missing_storage: Vec<String>,
    /// Physical collections no definition points to.
    pub orphaned_storage: Vec<String>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.missing_storage.is_empty() && self.orphaned_storage.is_empty()
    }
}

#[derive(Clone)]
pub struct Registry {
    definitions: DefinitionTable,
    sync: Synchronizer,
}

impl Registry {
    pub fn new(store: Bounded<dyn DocumentStore>) -> Self {
        Self {
            definitions: DefinitionTable::new(store.clone()),
            sync: Synchronizer::new(store),
        }
    }

    pub fn definitions(&self) -> &DefinitionTable {
        &self.definitions
    }

    fn participants(&self) -> Participants<'_> {
        Participants {
            definitions: &self.definitions,
            sync: &self.sync,
        }
    }

    /// Create the metadata collection.
    pub async fn init(&self) -> EngineResult<()> {
        self.definitions.ensure().await?;
        info!(collection = %self.definitions.collection(), "collection registry ready");
        Ok(())
    }

    /// Every definition, in creation order.
    pub async fn list(&self) -> EngineResult<Vec<CollectionDefinition>> {
        self.definitions.all().await
    }

    /// The definition stored under `path`, if any.
    pub async fn find(&self, path: &str) -> EngineResult<Option<CollectionDefinition>> {
        self.definitions.by_path(path).await
    }

    pub async fn get(&self, path: &str) -> EngineResult<CollectionDefinition> {
        self.find(path)
            .await?
            .ok_or_else(EngineError::collection_not_found)
    }

    /// Full validation of a create request, including name uniqueness.
    pub async fn validate_new_definition(&self, candidate: &Document) -> EngineResult<NewDefinition> {
        let new = validate_new_definition(candidate).map_err(EngineError::validation)?;
        if self.definitions.find_by("name", new.name.as_str()).await?.is_some() {
            return Err(EngineError::conflict("name", "must be unique"));
        }
        Ok(new)
    }

    async fn ensure_path_available(&self, path: &str, owner: Option<DocumentId>) -> EngineResult<()> {
        if RESERVED_PATHS.contains(&path) {
            return Err(EngineError::conflict("path", format!("{path:?} is reserved")));
        }
        let taken = self
            .definitions
            .find(Filter::eq("path", path))
            .await?
            .into_iter()
            .find(|def| Some(def.id) != owner);
        match taken {
            Some(def) => Err(EngineError::conflict(
                "path",
                format!("{path:?} is already used by collection {:?}", def.name),
            )),
            None => Ok(()),
        }
    }

    /// Define a new collection and create its physical storage.
    pub async fn define(&self, candidate: &Document) -> EngineResult<CollectionDefinition> {
        let NewDefinition { name, attributes } = self.validate_new_definition(candidate).await?;
        let path = slugify(&name);
        self.ensure_path_available(&path, None).await?;

        let def = CollectionDefinition {
            id: DocumentId::generate(),
            name,
            path: path.clone(),
            attributes,
            modified_at: now(),
        };
        Saga::new("define")
            .then(SagaStep::InsertDefinition(def.clone()))
            .then(SagaStep::CreateStorage(path))
            .execute(self.participants())
            .await?;

        info!(path = %def.path, id = %def.id, "collection defined");
        Ok(def)
    }

    /// Apply a `{name?, attributes?}` change set to the definition at
    /// `path`. A new name that derives a new path renames the physical
    /// collection first.
    pub async fn update(&self, path: &str, changes: &Document) -> EngineResult<CollectionDefinition> {
        let input = validate_definition(changes).map_err(EngineError::validation)?;
        let current = self.get(path).await?;

        let mut next = current.clone();
        if let Some(name) = input.name {
            if name != current.name {
                let clash = self
                    .definitions
                    .find(Filter::eq("name", name.as_str()))
                    .await?
                    .into_iter()
                    .any(|def| def.id != current.id);
                if clash {
                    return Err(EngineError::conflict("name", "must be unique"));
                }
            }
            next.path = slugify(&name);
            next.name = name;
        }
        if let Some(attributes) = input.attributes {
            next.attributes = attributes;
        }
        next.modified_at = now();

        let mut saga = Saga::new("update");
        if next.path != current.path {
            self.ensure_path_available(&next.path, Some(current.id)).await?;
            saga = saga.then(SagaStep::RenameStorage {
                from: current.path.clone(),
                to: next.path.clone(),
            });
        }
        saga.then(SagaStep::ReplaceDefinition {
            previous: current,
            next: next.clone(),
        })
        .execute(self.participants())
        .await?;

        info!(%path, new_path = %next.path, "collection updated");
        Ok(next)
    }

    /// Rename the collection at `path`.
    pub async fn rename(&self, path: &str, new_name: &str) -> EngineResult<CollectionDefinition> {
        self.update(path, &doc! { "name" => new_name }).await
    }

    /// Remove the definition at `path` and drop its physical collection.
    ///
    /// Without a matching definition the drop is still attempted, to clean
    /// up storage left behind by an earlier partial removal, and the call
    /// reports not-found.
    pub async fn remove(&self, path: &str) -> EngineResult<()> {
        if RESERVED_PATHS.contains(&path) {
            return Err(EngineError::collection_not_found());
        }
        let Some(def) = self.find(path).await? else {
            if let Err(e) = self.sync.drop(path).await {
                warn!(%path, error = %e, "cleanup drop of undefined collection failed");
            }
            return Err(EngineError::collection_not_found());
        };

        let report = Saga::new("remove")
            .then(SagaStep::DeleteDefinition(def))
            .then_best_effort(SagaStep::DropStorage(path.to_string()))
            .execute(self.participants())
            .await?;
        info!(%path, storage_left = !report.skipped.is_empty(), "collection removed");
        Ok(())
    }

    /// Compare definitions with the physical collections.
    pub async fn reconcile(&self) -> EngineResult<DriftReport> {
        let definitions = self.definitions.all().await?;
        let physical: BTreeSet<String> = self.sync.list().await?.into_iter().collect();
        let defined: BTreeSet<&str> = definitions.iter().map(|def| def.path.as_str()).collect();

        let report = DriftReport {
            missing_storage: definitions
                .iter()
                .filter(|def| !physical.contains(&def.path))
                .map(|def| def.path.clone())
                .collect(),
            orphaned_storage: physical
                .iter()
                .filter(|name| name.as_str() != self.definitions.collection())
                .filter(|name| !defined.contains(name.as_str()))
                .cloned()
                .collect(),
        };
        if !report.is_clean() {
            warn!(
                missing = ?report.missing_storage,
                orphaned = ?report.orphaned_storage,
                "registry drift detected"
            );
        }
        Ok(report)
    }
}
