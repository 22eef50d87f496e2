//! Collection definitions and their attribute schema.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use folio_core::{Document, DocumentId, ID_FIELD, Value};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Type tag of a collection attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Date,
    Image,
    Mdx,
}

impl AttributeType {
    pub const ALL: [AttributeType; 4] = [
        AttributeType::String,
        AttributeType::Date,
        AttributeType::Image,
        AttributeType::Mdx,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Date => "date",
            AttributeType::Image => "image",
            AttributeType::Mdx => "mdx",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.as_str() == raw)
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared field of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: AttributeType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, ty: AttributeType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    fn to_value(&self) -> Value {
        let mut doc = Document::new();
        doc.insert("name", self.name.as_str());
        doc.insert("type", self.ty.as_str());
        Value::Object(doc)
    }
}

/// A stored collection definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionDefinition {
    pub id: DocumentId,
    pub name: String,
    /// Physical collection name, always `slugify(name)`.
    pub path: String,
    pub attributes: Vec<Attribute>,
    pub modified_at: DateTime<Utc>,
}

// Field names in the metadata collection.
const NAME: &str = "name";
const PATH: &str = "path";
const ATTRIBUTES: &str = "attributes";
const MODIFIED_AT: &str = "modifiedAt";
const CREATED_AT: &str = "createdAt";

impl CollectionDefinition {
    /// Names of the declared attributes, in declaration order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|attr| attr.name.as_str())
    }

    /// Stored form: `_id`, `name`, `path`, `attributes`, `modifiedAt`.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(ID_FIELD, self.id.to_string());
        doc.insert(NAME, self.name.as_str());
        doc.insert(PATH, self.path.as_str());
        doc.insert(
            ATTRIBUTES,
            self.attributes
                .iter()
                .map(Attribute::to_value)
                .collect::<Vec<_>>(),
        );
        doc.insert(MODIFIED_AT, self.modified_at);
        doc
    }

    /// Public listing view: the stored form plus `createdAt`, which is
    /// recovered from the time-ordered id.
    pub fn view(&self) -> Document {
        let mut doc = self.to_document();
        if let Some(created_at) = self.id.created_at() {
            doc.insert(CREATED_AT, created_at);
        }
        doc
    }

    /// Read a definition back from the metadata collection.
    pub fn from_document(doc: &Document) -> EngineResult<Self> {
        let corrupt = |what: &str| {
            EngineError::Storage(format!("corrupt collection definition: {what}"))
        };

        let id = doc
            .get_str(ID_FIELD)
            .ok_or_else(|| corrupt("missing _id"))
            .and_then(|raw| DocumentId::parse(raw).map_err(|e| corrupt(&e.to_string())))?;
        let name = doc.get_str(NAME).ok_or_else(|| corrupt("missing name"))?;
        let path = doc.get_str(PATH).ok_or_else(|| corrupt("missing path"))?;
        let modified_at = match doc.get(MODIFIED_AT) {
            Some(Value::Timestamp(ts)) => *ts,
            _ => return Err(corrupt("missing modifiedAt")),
        };

        let mut attributes = Vec::new();
        for item in doc.get(ATTRIBUTES).and_then(Value::as_array).unwrap_or_default() {
            let attr = item.as_object().ok_or_else(|| corrupt("attribute is not an object"))?;
            let attr_name = attr
                .get_str(NAME)
                .ok_or_else(|| corrupt("attribute without name"))?;
            let ty = attr
                .get_str("type")
                .and_then(AttributeType::parse)
                .ok_or_else(|| corrupt("attribute without valid type"))?;
            attributes.push(Attribute::new(attr_name, ty));
        }

        Ok(Self {
            id,
            name: name.to_string(),
            path: path.to_string(),
            attributes,
            modified_at,
        })
    }
}

/// Current time at the precision timestamps are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// A definition candidate that passed shape validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionInput {
    pub name: Option<String>,
    pub attributes: Option<Vec<Attribute>>,
}
