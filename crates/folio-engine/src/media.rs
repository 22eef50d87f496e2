//! Media field interceptor.
//!
//! Inline `data:image/...;base64,...` values are moved into the blob store
//! and replaced by the blob's URL before a record is written. When a
//! record changes or goes away, blobs it no longer references are deleted.

use std::collections::HashSet;

use folio_core::{Document, Value};
use folio_media::{BlobStore, InlineImage, is_inline_image};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::bounded::Bounded;
use crate::error::EngineResult;

/// A field whose inline image could not be externalized. The field keeps
/// its original inline value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldFailure {
    pub field: String,
    pub error: String,
}

/// Outcome of [`MediaInterceptor::externalize`].
#[derive(Debug, Default)]
pub struct Externalized {
    pub document: Document,
    /// URLs of the blobs stored for this document.
    pub stored: Vec<String>,
    pub failures: Vec<FieldFailure>,
}

#[derive(Clone)]
pub struct MediaInterceptor {
    blobs: Bounded<dyn BlobStore>,
}

impl MediaInterceptor {
    pub fn new(blobs: Bounded<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub fn base_url(&self) -> &str {
        self.blobs.inner().base_url()
    }

    /// Replace every top-level inline image in `doc` with a blob URL.
    pub async fn externalize(&self, doc: Document) -> Externalized {
        let mut out = Externalized::default();
        for (field, value) in doc {
            let value = match value {
                Value::String(raw) if is_inline_image(&raw) => match self.store_inline(&raw).await {
                    Ok(url) => {
                        debug!(%field, %url, "inline image externalized");
                        out.stored.push(url.clone());
                        Value::String(url)
                    }
                    Err(error) => {
                        warn!(%field, %error, "inline image kept inline");
                        out.failures.push(FieldFailure {
                            field: field.clone(),
                            error,
                        });
                        Value::String(raw)
                    }
                },
                other => other,
            };
            out.document.insert(field, value);
        }
        out
    }

    async fn store_inline(&self, raw: &str) -> Result<String, String> {
        let image = InlineImage::parse(raw).map_err(|e| e.to_string())?;
        // Blob names are random so that they never reveal the record id.
        let name = image.file_name(&Uuid::new_v4().simple().to_string());
        self.blobs
            .run("store blob", move |blobs| {
                blobs.store(&name, &image.data, &image.mime_type)
            })
            .await
            .map_err(|e| e.to_string())
    }

    /// Blob URLs of this store referenced anywhere in `doc`.
    pub fn referenced_urls<'a>(&self, doc: &'a Document) -> HashSet<&'a str> {
        let blobs = self.blobs.inner();
        let mut urls = HashSet::new();
        for value in doc.values() {
            value.visit_strings(&mut |s| {
                if blobs.owns(s) {
                    urls.insert(s);
                }
            });
        }
        urls
    }

    /// Delete blobs referenced by `old` that `new` no longer references.
    /// With no `new` document, every blob of `old` goes. Returns the
    /// number of blobs deleted; failures are logged.
    pub async fn purge_orphans(&self, old: &Document, new: Option<&Document>) -> usize {
        let kept = new.map(|doc| self.referenced_urls(doc)).unwrap_or_default();
        let mut orphans: Vec<String> = self
            .referenced_urls(old)
            .into_iter()
            .filter(|url| !kept.contains(url))
            .map(str::to_string)
            .collect();
        orphans.sort();
        self.discard(orphans).await
    }

    /// Delete the given blob URLs. Returns how many were deleted.
    pub async fn discard(&self, urls: Vec<String>) -> usize {
        let mut deleted = 0;
        for url in urls {
            match self.delete(url.clone()).await {
                Ok(()) => {
                    debug!(%url, "blob deleted");
                    deleted += 1;
                }
                Err(e) => warn!(%url, error = %e, "failed to delete blob"),
            }
        }
        deleted
    }

    async fn delete(&self, url: String) -> EngineResult<()> {
        self.blobs
            .run("delete blob", move |blobs| blobs.delete(&url))
            .await
    }
}
