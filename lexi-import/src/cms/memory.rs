//! In-memory content repository
//!
//! Behaves like the REST API closely enough for the import pipeline:
//! case-insensitive title search, custom-field filters, paging, token checks
//! on writes. Every write is recorded so callers can inspect what was sent.
//! Failures can be injected per search term, per collection, or for
//! submissions.

use async_trait::async_trait;
use lexi_common::AuthContext;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{
    CmsError, CmsRecord, ContentRepository, ContentType, ListQuery, MediaFile, RemoteStructure,
};
use crate::models::ImportEndpoint;

const FIRST_GENERATED_ID: u64 = 10_000;

/// Media item uploaded through [`ContentRepository::upload_media`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub id: u64,
    pub title: String,
    pub file: MediaFile,
}

/// Record update sent through [`ContentRepository::update_record`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpdate {
    pub content_type: ContentType,
    pub id: u64,
    pub payload: Value,
}

#[derive(Default)]
struct MemoryState {
    records: HashMap<ContentType, Vec<CmsRecord>>,
    structures: HashMap<u64, RemoteStructure>,
    next_id: u64,
    media: Vec<StoredMedia>,
    submissions: Vec<(ImportEndpoint, MediaFile)>,
    updates: Vec<RecordedUpdate>,
    failing_searches: HashSet<String>,
    failing_listings: HashSet<ContentType>,
    failing_creates: HashSet<ContentType>,
    fail_submissions: bool,
}

/// In-memory [`ContentRepository`]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_id: FIRST_GENERATED_ID,
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock only happens in a failing test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a record with its own id
    pub fn insert(&self, content_type: ContentType, record: CmsRecord) {
        self.lock().records.entry(content_type).or_default().push(record);
    }

    /// Register the structure returned for a legislation
    pub fn insert_structure(&self, structure: RemoteStructure) {
        let mut state = self.lock();
        let legislation = structure.legislation.clone();
        let records = state.records.entry(ContentType::Legislation).or_default();
        if !records.iter().any(|r| r.id == legislation.id) {
            records.push(legislation.clone());
        }
        state.structures.insert(legislation.id, structure);
    }

    /// Searches for `term` (case-insensitive) fail with a network error
    pub fn fail_search(&self, term: &str) {
        self.lock().failing_searches.insert(term.to_lowercase());
    }

    /// Every listing of `content_type` fails
    pub fn fail_listing(&self, content_type: ContentType) {
        self.lock().failing_listings.insert(content_type);
    }

    /// Creating records in `content_type` fails
    pub fn fail_create(&self, content_type: ContentType) {
        self.lock().failing_creates.insert(content_type);
    }

    pub fn set_fail_submissions(&self, fail: bool) {
        self.lock().fail_submissions = fail;
    }

    pub fn record(&self, content_type: ContentType, id: u64) -> Option<CmsRecord> {
        self.lock()
            .records
            .get(&content_type)
            .and_then(|records| records.iter().find(|r| r.id == id).cloned())
    }

    pub fn records(&self, content_type: ContentType) -> Vec<CmsRecord> {
        self.lock()
            .records
            .get(&content_type)
            .cloned()
            .unwrap_or_default()
    }

    pub fn media(&self) -> Vec<StoredMedia> {
        self.lock().media.clone()
    }

    pub fn submissions(&self) -> Vec<(ImportEndpoint, MediaFile)> {
        self.lock().submissions.clone()
    }

    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.lock().updates.clone()
    }

    fn allocate_id(state: &mut MemoryState) -> u64 {
        let id = state.next_id;
        state.next_id += 1;
        id
    }

    fn require_token(auth: &AuthContext) -> Result<(), CmsError> {
        if auth.is_authenticated() {
            Ok(())
        } else {
            Err(CmsError::Unauthorized("no CMS token available".to_string()))
        }
    }

    fn matches_filter(record: &CmsRecord, field: &str, value: &str) -> bool {
        match record.acf.get(field) {
            Some(Value::Array(_)) | Some(Value::Object(_)) => record
                .field_ids(field)
                .iter()
                .any(|id| id.to_string() == value),
            Some(_) => record.field_str(field).as_deref() == Some(value),
            None => false,
        }
    }
}

#[async_trait]
impl ContentRepository for MemoryRepository {
    async fn list_by_type(
        &self,
        content_type: ContentType,
        query: &ListQuery,
    ) -> Result<Vec<CmsRecord>, CmsError> {
        let state = self.lock();

        if state.failing_listings.contains(&content_type) {
            return Err(CmsError::Network(format!(
                "listing {} unavailable",
                content_type.endpoint()
            )));
        }
        let search = query.search.as_ref().map(|s| s.to_lowercase());
        if let Some(term) = &search {
            if state.failing_searches.contains(term) {
                return Err(CmsError::Network(format!("search '{}' failed", term)));
            }
        }

        let per_page = query.per_page.max(1) as usize;
        let skip = (query.page.max(1) as usize - 1) * per_page;

        Ok(state
            .records
            .get(&content_type)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| match &search {
                        Some(term) => r.title.to_lowercase().contains(term.as_str()),
                        None => true,
                    })
                    .filter(|r| {
                        query
                            .filters
                            .iter()
                            .all(|(field, value)| Self::matches_filter(r, field, value))
                    })
                    .skip(skip)
                    .take(per_page)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_by_id(
        &self,
        content_type: ContentType,
        id: u64,
    ) -> Result<Option<CmsRecord>, CmsError> {
        Ok(self.record(content_type, id))
    }

    async fn create_record(
        &self,
        content_type: ContentType,
        payload: &Value,
        auth: &AuthContext,
    ) -> Result<u64, CmsError> {
        Self::require_token(auth)?;
        let mut state = self.lock();
        if state.failing_creates.contains(&content_type) {
            return Err(CmsError::Api(500, "create failed".to_string()));
        }

        let id = Self::allocate_id(&mut state);
        let mut record = CmsRecord::new(
            id,
            payload.get("title").and_then(Value::as_str).unwrap_or_default(),
        );
        record.content = payload
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(Value::Object(acf)) = payload.get("acf") {
            record.acf = acf.clone();
        }
        state.records.entry(content_type).or_default().push(record);
        Ok(id)
    }

    async fn update_record(
        &self,
        content_type: ContentType,
        id: u64,
        payload: &Value,
        auth: &AuthContext,
    ) -> Result<CmsRecord, CmsError> {
        Self::require_token(auth)?;
        let mut state = self.lock();
        state.updates.push(RecordedUpdate {
            content_type,
            id,
            payload: payload.clone(),
        });

        let record = state
            .records
            .get_mut(&content_type)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| CmsError::NotFound(format!("{}/{}", content_type.endpoint(), id)))?;

        if let Some(title) = payload.get("title").and_then(Value::as_str) {
            record.title = title.to_string();
        }
        if let Some(Value::Object(acf)) = payload.get("acf") {
            for (key, value) in acf {
                record.acf.insert(key.clone(), value.clone());
            }
        }
        Ok(record.clone())
    }

    async fn upload_media(
        &self,
        file: &MediaFile,
        title: &str,
        auth: &AuthContext,
    ) -> Result<u64, CmsError> {
        Self::require_token(auth)?;
        let mut state = self.lock();
        let id = Self::allocate_id(&mut state);
        state.media.push(StoredMedia {
            id,
            title: title.to_string(),
            file: file.clone(),
        });
        Ok(id)
    }

    async fn submit_import(
        &self,
        endpoint: ImportEndpoint,
        file: &MediaFile,
        auth: &AuthContext,
    ) -> Result<(), CmsError> {
        Self::require_token(auth)?;
        let mut state = self.lock();
        if state.fail_submissions {
            return Err(CmsError::Api(500, "import endpoint rejected the file".to_string()));
        }
        state.submissions.push((endpoint, file.clone()));
        Ok(())
    }

    async fn fetch_structure(&self, legislation_id: u64) -> Result<RemoteStructure, CmsError> {
        self.lock()
            .structures
            .get(&legislation_id)
            .cloned()
            .ok_or_else(|| CmsError::NotFound(format!("legislations/{}/structure", legislation_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_search_and_filter() {
        let repo = MemoryRepository::new();
        repo.insert(
            ContentType::Article,
            CmsRecord::new(1, "Article 5").with_field("legislation", json!([7])),
        );
        repo.insert(
            ContentType::Article,
            CmsRecord::new(2, "Article 50").with_field("legislation", json!([8])),
        );

        let query = ListQuery::new(10).search("article 5");
        let found = repo.list_by_type(ContentType::Article, &query).await.unwrap();
        assert_eq!(found.len(), 2);

        let query = ListQuery::new(10).search("article 5").filter("legislation", 7);
        let found = repo.list_by_type(ContentType::Article, &query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }

    #[tokio::test]
    async fn test_writes_require_token() {
        let repo = MemoryRepository::new();
        let result = repo
            .create_record(ContentType::ImportHistory, &json!({"title": "x"}), &AuthContext::anonymous())
            .await;
        assert!(matches!(result, Err(CmsError::Unauthorized(_))));

        let auth = AuthContext::new(Some("t".to_string()), None);
        let id = repo
            .create_record(ContentType::ImportHistory, &json!({"title": "x", "acf": {"statut": "Brouillon"}}), &auth)
            .await
            .unwrap();
        let stored = repo.record(ContentType::ImportHistory, id).unwrap();
        assert_eq!(stored.field_str("statut").as_deref(), Some("Brouillon"));
    }

    #[tokio::test]
    async fn test_update_merges_custom_fields() {
        let repo = MemoryRepository::new();
        let auth = AuthContext::new(Some("t".to_string()), None);
        let id = repo
            .create_record(ContentType::ImportHistory, &json!({"title": "x", "acf": {"statut": "Brouillon", "fichier_entrant": 3}}), &auth)
            .await
            .unwrap();

        let updated = repo
            .update_record(ContentType::ImportHistory, id, &json!({"acf": {"statut": "En-cours"}}), &auth)
            .await
            .unwrap();
        assert_eq!(updated.field_str("statut").as_deref(), Some("En-cours"));
        assert_eq!(updated.field_ids("fichier_entrant"), vec![3]);
        assert_eq!(repo.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_search_failure() {
        let repo = MemoryRepository::new();
        repo.fail_search("Article 9");
        let query = ListQuery::new(10).search("article 9");
        assert!(repo.list_by_type(ContentType::Article, &query).await.is_err());
    }
}
