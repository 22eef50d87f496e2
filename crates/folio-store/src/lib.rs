//! folio-store: document persistence for Folio.
//!
//! Backed by [redb](https://docs.rs/redb). Each logical collection maps to
//! one physical redb table named after the collection's path; documents are
//! JSON-serialized into `&[u8]` value columns keyed by their id.
//!
//! `RedbDocumentStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod filter;
pub mod store;
pub mod tables;

pub use error::{StoreError, StoreResult};
pub use filter::Filter;
pub use store::{DocumentStore, RedbDocumentStore};
