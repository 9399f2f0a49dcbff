//! Existing-record detection
//!
//! Every parsed row is looked up in the CMS by its normalized title (and the
//! target legislation when the import has one). The lookups run concurrently;
//! a failed lookup leaves its row classified as new without affecting the
//! others.

use futures::future::join_all;
use std::sync::Arc;

use crate::cms::{CmsError, CmsRecord, ContentRepository, ContentType, ListQuery};
use crate::models::{ImportProfile, ImportRow, RowStatus};
use crate::services::normalize::{canonical_date, normalize_title, titles_match};

/// Custom field linking a record to its legislations
pub const LEGISLATION_FIELD: &str = "legislation";

/// Classifies rows against records already in the CMS
pub struct RecordMatcher {
    repo: Arc<dyn ContentRepository>,
    page_size: u32,
}

impl RecordMatcher {
    pub fn new(repo: Arc<dyn ContentRepository>, page_size: u32) -> Self {
        Self { repo, page_size }
    }

    /// Classify every row, preserving order
    pub async fn annotate(
        &self,
        profile: &ImportProfile,
        rows: Vec<ImportRow>,
        legislation: Option<u64>,
    ) -> Vec<ImportRow> {
        let lookups = rows
            .into_iter()
            .map(|row| self.match_row(profile, row, legislation));
        let rows = join_all(lookups).await;

        let exists = rows.iter().filter(|r| r.status == RowStatus::Exists).count();
        let new_versions = rows.iter().filter(|r| r.status == RowStatus::NewVersion).count();
        tracing::info!(
            kind = ?profile.kind,
            rows = rows.len(),
            exists,
            new_versions,
            "Existing-record matching complete"
        );

        rows
    }

    async fn match_row(
        &self,
        profile: &ImportProfile,
        mut row: ImportRow,
        legislation: Option<u64>,
    ) -> ImportRow {
        row.reset_match();

        let title = normalize_title(row.get(profile.title_column));
        if title.is_empty() {
            return row;
        }

        let mut query = ListQuery::new(self.page_size).search(title.as_str());
        if let Some(id) = legislation {
            query = query.filter(LEGISLATION_FIELD, id);
        }

        match self.repo.list_by_type(profile.content_type, &query).await {
            Ok(candidates) => {
                let (status, original_id) = classify(profile, &row, &candidates, legislation);
                tracing::debug!(
                    row = row.index,
                    title = %title,
                    candidates = candidates.len(),
                    status = status.as_str(),
                    "Row classified"
                );
                row.status = status;
                row.original_id = original_id;
            }
            Err(e) => {
                tracing::warn!(
                    row = row.index,
                    title = %title,
                    error = %e,
                    "Existing-record lookup failed, treating row as new"
                );
            }
        }

        row
    }

    /// Id of a legislation whose normalized title equals `title`
    pub async fn find_existing_legislation(&self, title: &str) -> Result<Option<u64>, CmsError> {
        let wanted = normalize_title(title);
        if wanted.is_empty() {
            return Ok(None);
        }

        let query = ListQuery::new(self.page_size).search(wanted.as_str());
        let candidates = self
            .repo
            .list_by_type(ContentType::Legislation, &query)
            .await?;

        Ok(candidates
            .iter()
            .find(|c| normalize_title(&c.title) == wanted)
            .map(|c| c.id))
    }
}

/// Classify one row against the lookup candidates
///
/// A candidate qualifies when its title matches and, with a target
/// legislation, it is linked to that legislation. A qualifying candidate with
/// the same canonical date makes the row `Exists`; otherwise the first
/// qualifying candidate makes it a `NewVersion`.
pub fn classify(
    profile: &ImportProfile,
    row: &ImportRow,
    candidates: &[CmsRecord],
    legislation: Option<u64>,
) -> (RowStatus, Option<u64>) {
    let title = row.get(profile.title_column);
    let row_date = profile
        .date_column
        .and_then(|column| canonical_date(row.get(column)));

    let mut new_version = None;
    for candidate in candidates {
        if !titles_match(title, &candidate.title) {
            continue;
        }
        if let Some(id) = legislation {
            if !candidate.field_ids(LEGISLATION_FIELD).contains(&id) {
                continue;
            }
        }

        let remote_date = profile
            .remote_date_field
            .and_then(|field| candidate.field_str(field))
            .and_then(|value| canonical_date(&value));

        if remote_date == row_date {
            return (RowStatus::Exists, Some(candidate.id));
        }
        new_version.get_or_insert(candidate.id);
    }

    match new_version {
        Some(id) => (RowStatus::NewVersion, Some(id)),
        None => (RowStatus::New, None),
    }
}
