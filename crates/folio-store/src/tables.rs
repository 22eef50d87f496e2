//! redb table layout for the document store.
//!
//! Every collection is its own table with `&str` keys (the document id in
//! simple hex form) and `&[u8]` values (the JSON-serialized document with
//! `_id` stripped). Ids are time-ordered, so table order is creation order.

use folio_core::{Document, ID_FIELD};
use redb::TableDefinition;

use crate::error::{StoreError, StoreResult};

/// Table definition for the collection named `name`.
pub fn collection_table(name: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}

/// Reject names that cannot identify a collection.
pub fn check_collection_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

pub(crate) fn encode(doc: &Document) -> StoreResult<Vec<u8>> {
    let mut body = doc.clone();
    body.remove(ID_FIELD);
    serde_json::to_vec(&body).map_err(|e| StoreError::Serialize(e.to_string()))
}

pub(crate) fn decode(key: &str, bytes: &[u8]) -> StoreResult<Document> {
    let body: Document =
        serde_json::from_slice(bytes).map_err(|e| StoreError::Deserialize(e.to_string()))?;
    Ok(body.with_id(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::doc;

    #[test]
    fn encoded_body_omits_id_and_decode_restores_it() {
        let doc = doc! { ID_FIELD => "abc", "title" => "Hello" };
        let bytes = encode(&doc).unwrap();
        assert_eq!(bytes, br#"{"title":"Hello"}"#);

        let decoded = decode("abc", &bytes).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn only_empty_names_are_rejected() {
        assert!(check_collection_name("blog_posts").is_ok());
        assert!(check_collection_name(&"x".repeat(300)).is_ok());
        assert!(check_collection_name("").is_err());
    }
}
