//! folio-engine: the dynamic collection and schema engine.
//!
//! Operators define collections at runtime; the engine stores their
//! definitions, keeps one physical collection per definition, validates
//! records against the declared attributes, and moves inline images into
//! the blob store.
//!
//! # Architecture
//!
//! - [`validate`] and [`slug`] are pure.
//! - [`Registry`] owns definitions and drives the [`Synchronizer`] through
//!   compensating [`saga`]s.
//! - [`RecordDispatcher`] serves record CRUD on top of the registry and the
//!   [`MediaInterceptor`].
//! - Every store call goes through [`Bounded`], which runs it on the
//!   blocking pool under a deadline.

pub mod bounded;
pub mod definitions;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod media;
pub mod registry;
pub mod saga;
pub mod schema;
pub mod slug;
pub mod sync;
pub mod validate;

#[cfg(test)]
mod testing;

pub use bounded::Bounded;
pub use definitions::{DefinitionTable, METADATA_COLLECTION};
pub use dispatcher::{RecordDispatcher, RecordWrite};
pub use engine::Engine;
pub use error::{EngineError, EngineResult, FieldErrors, GENERAL_OTHER, TOO_MANY_ARGUMENTS};
pub use media::{Externalized, FieldFailure, MediaInterceptor};
pub use registry::{DriftReport, RESERVED_PATHS, Registry};
pub use saga::{Saga, SagaReport, SagaStep};
pub use schema::{Attribute, AttributeType, CollectionDefinition, DefinitionInput};
pub use slug::slugify;
pub use sync::Synchronizer;
pub use validate::{
    NewDefinition, validate_definition, validate_keys, validate_new_definition, validate_record,
};
