//! Content-repository interface
//!
//! The import pipeline talks to the CMS only through [`ContentRepository`]:
//! paginated listing/search, fetch by id, create, update, media upload,
//! bulk-import submission and the composite legislation-structure route.
//! [`CmsClient`] implements it over the WordPress REST API;
//! An in-memory implementation backs the tests (`test-util` feature).

pub mod client;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use client::CmsClient;
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryRepository;

use async_trait::async_trait;
use lexi_common::AuthContext;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{ImportEndpoint, NodeType};

/// Stop paging after this many pages even if the server keeps answering
const MAX_PAGES: u32 = 500;

/// CMS client errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CmsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// CMS collections used by the import pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Article,
    Legislation,
    Decision,
    Commentaire,
    Titre,
    Chapitre,
    Section,
    ImportHistory,
}

impl ContentType {
    /// REST collection name
    pub const fn endpoint(&self) -> &'static str {
        match self {
            ContentType::Article => "articles",
            ContentType::Legislation => "legislations",
            ContentType::Decision => "decisions",
            ContentType::Commentaire => "commentaires",
            ContentType::Titre => "titres",
            ContentType::Chapitre => "chapitres",
            ContentType::Section => "sections",
            ContentType::ImportHistory => "import_history",
        }
    }
}

/// A CMS record reduced to what the importer needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmsRecord {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    /// Custom fields (opaque attribute bag)
    #[serde(default)]
    pub acf: Map<String, Value>,
}

impl CmsRecord {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: None,
            acf: Map::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.acf.insert(name.to_string(), value);
        self
    }

    /// Custom field as text (numbers are stringified)
    pub fn field_str(&self, name: &str) -> Option<String> {
        match self.acf.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Custom field as a list of record ids
    ///
    /// Relationship fields come back as ids, numeric strings, objects with an
    /// `ID`/`id` key, or arrays of any of those.
    pub fn field_ids(&self, name: &str) -> Vec<u64> {
        fn id_of(value: &Value) -> Option<u64> {
            match value {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                Value::Object(o) => o.get("ID").or_else(|| o.get("id")).and_then(id_of),
                _ => None,
            }
        }

        match self.acf.get(name) {
            Some(Value::Array(items)) => items.iter().filter_map(id_of).collect(),
            Some(other) => id_of(other).into_iter().collect(),
            None => Vec::new(),
        }
    }
}

/// Listing parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    /// Custom filter fields, e.g. `("legislation", "7")`
    pub filters: Vec<(String, String)>,
    pub page: u32,
    pub per_page: u32,
}

impl ListQuery {
    pub fn new(per_page: u32) -> Self {
        Self {
            search: None,
            filters: Vec::new(),
            page: 1,
            per_page: per_page.max(1),
        }
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push((field.into(), value.to_string()));
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }
}

/// File sent to the media library or an import endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn csv(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: "text/csv".to_string(),
            bytes: content.into().into_bytes(),
        }
    }
}

/// Node of a legislation structure as returned by the CMS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteNode {
    pub id: u64,
    pub node_type: NodeType,
    pub title: String,
    #[serde(default)]
    pub position: Option<u32>,
}

/// Legislation plus its ordered structure nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteStructure {
    pub legislation: CmsRecord,
    pub nodes: Vec<RemoteNode>,
}

/// Content repository operations consumed by the import pipeline
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Paginated listing/search of a collection
    async fn list_by_type(
        &self,
        content_type: ContentType,
        query: &ListQuery,
    ) -> Result<Vec<CmsRecord>, CmsError>;

    /// Single record, `None` when it does not exist
    async fn get_by_id(
        &self,
        content_type: ContentType,
        id: u64,
    ) -> Result<Option<CmsRecord>, CmsError>;

    /// Create a record, returning its id
    async fn create_record(
        &self,
        content_type: ContentType,
        payload: &Value,
        auth: &AuthContext,
    ) -> Result<u64, CmsError>;

    async fn update_record(
        &self,
        content_type: ContentType,
        id: u64,
        payload: &Value,
        auth: &AuthContext,
    ) -> Result<CmsRecord, CmsError>;

    /// Upload a file to the media library, returning the media id
    async fn upload_media(
        &self,
        file: &MediaFile,
        title: &str,
        auth: &AuthContext,
    ) -> Result<u64, CmsError>;

    /// Post a CSV to a bulk-import endpoint
    async fn submit_import(
        &self,
        endpoint: ImportEndpoint,
        file: &MediaFile,
        auth: &AuthContext,
    ) -> Result<(), CmsError>;

    /// Legislation plus its ordered structure (composite route)
    async fn fetch_structure(&self, legislation_id: u64) -> Result<RemoteStructure, CmsError>;
}

/// Fetch every page of a listing
pub async fn list_all(
    repo: &dyn ContentRepository,
    content_type: ContentType,
    query: ListQuery,
) -> Result<Vec<CmsRecord>, CmsError> {
    let mut records = Vec::new();
    let mut query = query;

    for page in 1..=MAX_PAGES {
        query.page = page;
        let batch = repo.list_by_type(content_type, &query).await?;
        let short_page = (batch.len() as u32) < query.per_page;
        records.extend(batch);
        if short_page {
            break;
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_ids_shapes() {
        let record = CmsRecord::new(1, "Article 5")
            .with_field("legislation", json!([7, "8", {"ID": 9}, {"id": 10}, null]))
            .with_field("single", json!(3))
            .with_field("text", json!("12"));

        assert_eq!(record.field_ids("legislation"), vec![7, 8, 9, 10]);
        assert_eq!(record.field_ids("single"), vec![3]);
        assert_eq!(record.field_ids("text"), vec![12]);
        assert!(record.field_ids("missing").is_empty());
    }

    #[test]
    fn test_field_str() {
        let record = CmsRecord::new(1, "x")
            .with_field("date_entree", json!("20200101"))
            .with_field("numeric", json!(20200101));
        assert_eq!(record.field_str("date_entree").as_deref(), Some("20200101"));
        assert_eq!(record.field_str("numeric").as_deref(), Some("20200101"));
        assert_eq!(record.field_str("absent"), None);
    }

    #[tokio::test]
    async fn test_list_all_pages_until_short_page() {
        let repo = MemoryRepository::new();
        for i in 0..5 {
            repo.insert(ContentType::Decision, CmsRecord::new(100 + i, format!("Décision {}", i)));
        }

        let all = list_all(&repo, ContentType::Decision, ListQuery::new(2))
            .await
            .unwrap();
        assert_eq!(all.len(), 5);
    }
}
