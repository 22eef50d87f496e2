//! Core types shared by every Folio crate.
//!
//! - [`value`]: dynamic [`Value`]/[`Document`] model for records and metadata
//! - [`id`]: time-ordered [`DocumentId`]
//! - [`config`]: `folio.toml` parsing and environment overrides

pub mod config;
pub mod id;
pub mod value;

pub use config::{ConfigError, FolioConfig};
pub use id::{DocumentId, InvalidId};
pub use value::{DATE_MARKER, Document, ID_FIELD, NotAnObject, Value};
