//! Schema validation for collection definitions and records.
//!
//! Validation is closed-world on keys: anything not declared is rejected
//! as one aggregated `general.too_many_arguments` error, reported before
//! (and instead of) any other finding. Record values are not checked
//! against their declared attribute type.

use std::collections::{BTreeSet, HashSet};

use folio_core::{Document, ID_FIELD, Value};

use crate::error::{FieldErrors, TOO_MANY_ARGUMENTS};
use crate::schema::{Attribute, AttributeType, DefinitionInput};

const ATTRIBUTE_SHAPE: &str = "Must be an array of {name: string, type string}";

const DEFINITION_KEYS: [&str; 2] = ["name", "attributes"];

/// The aggregated unknown-keys message, if `doc` has keys outside `allowed`.
fn unknown_keys_message(doc: &Document, allowed: &BTreeSet<&str>) -> Option<String> {
    let unknown = doc.unknown_keys(allowed);
    if unknown.is_empty() {
        return None;
    }
    Some(format!(
        "The following keys are not in scope: {}",
        unknown.join(", ")
    ))
}

/// `{name: string, type: string}` with exactly those two keys.
fn attribute_shape(item: &Value) -> Option<(&str, &str)> {
    let attr = item.as_object()?;
    if attr.len() != 2 {
        return None;
    }
    Some((attr.get_str("name")?, attr.get_str("type")?))
}

/// Validate a definition body (create or update).
///
/// Only `name` and `attributes` are accepted, both optional here. Each
/// attribute problem is reported against its position (`attributes.{i}`)
/// and validation carries on with the next element. The first occurrence
/// of a name is kept; later ones are flagged as duplicates.
pub fn validate_definition(candidate: &Document) -> Result<DefinitionInput, FieldErrors> {
    let mut errors = FieldErrors::new();

    let allowed = BTreeSet::from(DEFINITION_KEYS);
    if let Some(message) = unknown_keys_message(candidate, &allowed) {
        errors.insert(TOO_MANY_ARGUMENTS.to_string(), message);
        return Err(errors);
    }

    let mut input = DefinitionInput::default();

    match candidate.get("name") {
        None => {}
        Some(Value::String(name)) if !name.trim().is_empty() => input.name = Some(name.clone()),
        Some(_) => {
            errors.insert("name".to_string(), "Must be a non-empty string".to_string());
        }
    }

    if let Some(raw) = candidate.get("attributes") {
        match raw.as_array() {
            None => {
                errors.insert("attributes".to_string(), ATTRIBUTE_SHAPE.to_string());
            }
            Some(items) => {
                let mut seen = HashSet::new();
                let mut attributes = Vec::with_capacity(items.len());
                for (pos, item) in items.iter().enumerate() {
                    let key = format!("attributes.{pos}");
                    let Some((name, ty)) = attribute_shape(item) else {
                        errors.insert(key, ATTRIBUTE_SHAPE.to_string());
                        continue;
                    };
                    if name == ID_FIELD {
                        errors.insert(key, format!("Attribute name {ID_FIELD:?} is reserved"));
                        continue;
                    }
                    if !seen.insert(name) {
                        errors.insert(key, format!("Attribute {name:?} at pos {pos} must be unique"));
                        continue;
                    }
                    let Some(ty) = AttributeType::parse(ty) else {
                        errors.insert(key, format!("Attribute {name:?} must be of a valid type"));
                        continue;
                    };
                    attributes.push(Attribute::new(name, ty));
                }
                input.attributes = Some(attributes);
            }
        }
    }

    if errors.is_empty() {
        Ok(input)
    } else {
        Err(errors)
    }
}

/// A definition body that is complete enough to create a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDefinition {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

/// Validate a body for a brand new collection: [`validate_definition`],
/// plus `name` is required. Name uniqueness needs the registry and is
/// checked there.
pub fn validate_new_definition(candidate: &Document) -> Result<NewDefinition, FieldErrors> {
    let (input, mut errors) = match validate_definition(candidate) {
        Ok(input) => (Some(input), FieldErrors::new()),
        Err(errors) if errors.contains_key(TOO_MANY_ARGUMENTS) => return Err(errors),
        Err(errors) => (None, errors),
    };
    if !candidate.contains_key("name") {
        errors.insert("name".to_string(), "Is required".to_string());
    }
    match input {
        Some(DefinitionInput {
            name: Some(name),
            attributes,
        }) if errors.is_empty() => Ok(NewDefinition {
            name,
            attributes: attributes.unwrap_or_default(),
        }),
        _ => Err(errors),
    }
}

/// Reject any key of `candidate` outside `allowed`.
pub fn validate_keys<'a>(
    candidate: &Document,
    allowed: impl IntoIterator<Item = &'a str>,
) -> Result<(), FieldErrors> {
    let allowed: BTreeSet<&str> = allowed.into_iter().collect();
    match unknown_keys_message(candidate, &allowed) {
        Some(message) => Err(FieldErrors::from([(TOO_MANY_ARGUMENTS.to_string(), message)])),
        None => Ok(()),
    }
}

/// Validate a record body against a collection's declared attributes.
/// Absent attributes are fine; undeclared keys are not.
pub fn validate_record(candidate: &Document, attributes: &[Attribute]) -> Result<(), FieldErrors> {
    validate_keys(candidate, attributes.iter().map(|attr| attr.name.as_str()))
}
