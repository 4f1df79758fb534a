//! Collection naming conventions shared by the ingestion and retrieval paths

use std::fmt;

use super::DomainError;

const SEMANTIC_SUFFIX: &str = "_semantic";
const RAW_DOCUMENTS_MARKER: &str = "raw_documents";

/// Name of the semantic (vector) collection derived from an origin collection.
///
/// Idempotent: an already suffixed name is returned unchanged.
pub fn get_semantic_collection_name(origin_collection: &str) -> String {
    if is_semantic_collection(origin_collection) {
        return origin_collection.to_string();
    }
    format!("{}{}", origin_collection, SEMANTIC_SUFFIX)
}

/// Inverse of [`get_semantic_collection_name`]; names without the suffix are
/// returned unchanged.
pub fn get_origin_collection_name(semantic_collection: &str) -> String {
    semantic_collection
        .strip_suffix(SEMANTIC_SUFFIX)
        .unwrap_or(semantic_collection)
        .to_string()
}

pub fn is_semantic_collection(name: &str) -> bool {
    name.ends_with(SEMANTIC_SUFFIX)
}

/// Semantic collections hold derived chunks and are refused as origins
pub fn ensure_origin_collection(name: &str) -> Result<(), DomainError> {
    if is_semantic_collection(name) {
        return Err(DomainError::validation(format!(
            "Collection '{}' is a semantic collection. Origin source must use origin collections, not semantic collections.",
            name
        )));
    }
    Ok(())
}

/// Raw document stores hold unembedded text and must never be vector-searched.
pub fn is_raw_document_collection(name: &str) -> bool {
    name.contains(RAW_DOCUMENTS_MARKER)
}

/// A fully qualified `database.collection` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionNamespace {
    pub database: String,
    pub collection: String,
}

impl CollectionNamespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Parse `db.coll`, falling back to `default_database` for a bare name.
    ///
    /// Only the first dot separates the database; collection names may
    /// themselves contain dots.
    pub fn parse(spec: &str, default_database: &str) -> Self {
        match spec.split_once('.') {
            Some((db, coll)) if !db.is_empty() && !coll.is_empty() => Self::new(db, coll),
            _ => Self::new(default_database, spec),
        }
    }

    pub fn semantic(&self) -> Self {
        Self::new(
            self.database.clone(),
            get_semantic_collection_name(&self.collection),
        )
    }
}

impl fmt::Display for CollectionNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}
