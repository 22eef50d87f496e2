//! Dynamic document values.
//!
//! Collection metadata and records are open-ended JSON maps. Instead of
//! passing `serde_json::Value` around, the engine works on a tagged
//! [`Value`] union and an insertion-ordered [`Document`] map that offers
//! explicit closed-world key checks.
//!
//! Timestamps have no JSON representation of their own, so they travel as
//! `{"$date": "<rfc3339>"}` objects and are recognised on the way back in.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Key under which a document's identifier is exposed.
pub const ID_FIELD: &str = "_id";

/// Marker key used to encode a timestamp inside JSON.
pub const DATE_MARKER: &str = "$date";

/// A single dynamically typed value inside a [`Document`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<Value>),
    Object(Document),
}

impl Value {
    /// Short type label, used in validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Document> {
        match self {
            Value::Object(doc) => Some(doc),
            _ => None,
        }
    }

    /// Visit every string reachable from this value, depth first.
    pub fn visit_strings<'a>(&'a self, visit: &mut impl FnMut(&'a str)) {
        match self {
            Value::String(s) => visit(s),
            Value::Array(items) => {
                for item in items {
                    item.visit_strings(&mut *visit);
                }
            }
            Value::Object(doc) => {
                for item in doc.values() {
                    item.visit_strings(&mut *visit);
                }
            }
            _ => {}
        }
    }

    /// Convert to plain JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            // Non-finite floats have no JSON form.
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(ts) => {
                let mut map = serde_json::Map::new();
                map.insert(
                    DATE_MARKER.to_string(),
                    serde_json::Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
                );
                serde_json::Value::Object(map)
            }
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(doc) => doc.to_json(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => match decode_timestamp(&map) {
                Some(ts) => Value::Timestamp(ts),
                None => Value::Object(Document::from(map)),
            },
        }
    }
}

fn decode_timestamp(map: &serde_json::Map<String, serde_json::Value>) -> Option<DateTime<Utc>> {
    if map.len() != 1 {
        return None;
    }
    let raw = map.get(DATE_MARKER)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

// ── Document ──────────────────────────────────────────────────────

/// An open, insertion-ordered map of field name to [`Value`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: IndexMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Insert or overwrite a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Remove a field, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys of this document that are not in `allowed`, in document order.
    pub fn unknown_keys(&self, allowed: &BTreeSet<&str>) -> Vec<String> {
        self.keys()
            .filter(|key| !allowed.contains(key))
            .map(str::to_string)
            .collect()
    }

    /// Apply `$set`-style changes: every field of `changes` overwrites (or
    /// adds) the field of the same name; other fields are kept.
    pub fn merge(&mut self, changes: Document) {
        for (key, value) in changes.fields {
            self.fields.insert(key, value);
        }
    }

    /// Return a copy of this document with `_id` as its first field.
    pub fn with_id(&self, id: impl fmt::Display) -> Document {
        let mut fields = IndexMap::with_capacity(self.fields.len() + 1);
        fields.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        for (key, value) in &self.fields {
            if key != ID_FIELD {
                fields.insert(key.clone(), value.clone());
            }
        }
        Document { fields }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    /// Build a document from arbitrary JSON, which must be an object.
    pub fn from_json(json: serde_json::Value) -> Result<Self, NotAnObject> {
        match json {
            serde_json::Value::Object(map) => Ok(Document::from(map)),
            other => Err(NotAnObject(json_kind(&other))),
        }
    }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Returned when a JSON value that should be a document is not an object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected a JSON object, found {0}")]
pub struct NotAnObject(pub &'static str);

impl From<serde_json::Map<String, serde_json::Value>> for Document {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Document {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(&self.fields)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Document::from_json(json).map_err(D::Error::custom)
    }
}

/// Build a [`Document`] from `key => value` pairs.
///
/// ```
/// let doc = folio_core::doc! { "title" => "Hello", "draft" => true };
/// assert_eq!(doc.len(), 2);
/// ```
#[macro_export]
macro_rules! doc {
    () => { $crate::Document::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut doc = $crate::Document::new();
        $( doc.insert($key, $crate::Value::from($value)); )+
        doc
    }};
}
