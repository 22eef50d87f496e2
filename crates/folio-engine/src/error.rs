//! Engine error taxonomy.
//!
//! Every engine operation fails with one of five kinds. Validation and
//! conflict errors carry a field → message map that is returned to the
//! caller as-is.

use std::collections::BTreeMap;

use thiserror::Error;

/// Field-level error messages, keyed by field path (`name`, `attributes.1`,
/// `general.too_many_arguments`, ...).
pub type FieldErrors = BTreeMap<String, String>;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Key for the aggregated unknown-keys error.
pub const TOO_MANY_ARGUMENTS: &str = "general.too_many_arguments";

/// Key for errors that are not tied to a single field.
pub const GENERAL_OTHER: &str = "general.other";

#[derive(Debug, Error)]
pub enum EngineError {
    /// The request is malformed or violates the collection schema.
    #[error("{message}")]
    Validation { message: String, fields: FieldErrors },

    /// The request collides with an existing definition.
    #[error("{message}")]
    Conflict { message: String, fields: FieldErrors },

    #[error("{0}")]
    NotFound(String),

    /// The document store or blob store failed or timed out.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Schema violations with field-level detail.
    pub fn validation(fields: FieldErrors) -> Self {
        EngineError::Validation {
            message: "Invalid Syntax".to_string(),
            fields,
        }
    }

    /// A single invalid field.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::validation(FieldErrors::from([(field.to_string(), message.into())]))
    }

    pub fn conflict(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        EngineError::Conflict {
            message: format!("{field}: {message}"),
            fields: FieldErrors::from([(field.to_string(), message)]),
        }
    }

    pub fn collection_not_found() -> Self {
        EngineError::NotFound("collection not found".to_string())
    }

    /// Field-level detail, for the error kinds that carry it.
    pub fn fields(&self) -> Option<&FieldErrors> {
        match self {
            EngineError::Validation { fields, .. } | EngineError::Conflict { fields, .. } => {
                Some(fields)
            }
            _ => None,
        }
    }
}

impl From<folio_core::ConfigError> for EngineError {
    fn from(e: folio_core::ConfigError) -> Self {
        EngineError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_names_the_field() {
        let err = EngineError::conflict("name", "must be unique");
        assert_eq!(err.to_string(), "name: must be unique");
        assert_eq!(
            err.fields().and_then(|f| f.get("name")).map(String::as_str),
            Some("must be unique")
        );
    }

    #[test]
    fn only_validation_and_conflict_carry_fields() {
        assert!(EngineError::invalid("id", "bad").fields().is_some());
        assert!(EngineError::collection_not_found().fields().is_none());
        assert!(EngineError::Storage("down".into()).fields().is_none());
    }
}
