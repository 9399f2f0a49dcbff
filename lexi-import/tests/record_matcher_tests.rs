//! Row classification against the in-memory CMS

mod helpers;

use helpers::*;
use lexi_import::models::{ImportKind, RowStatus};
use lexi_import::services::{parse_csv, RecordMatcher};

fn article_rows() -> Vec<lexi_import::models::ImportRow> {
    let profile = ImportKind::Article.profile();
    parse_csv(ARTICLE_CSV, profile.required_columns).unwrap().rows
}

#[tokio::test]
async fn test_annotate_classifies_each_row() {
    let repo = seeded_repo();
    let matcher = RecordMatcher::new(as_repo(&repo), 50);

    let rows = matcher
        .annotate(ImportKind::Article.profile(), article_rows(), Some(CODE_CIVIL))
        .await;

    let statuses: Vec<_> = rows.iter().map(|r| (r.status, r.original_id)).collect();
    assert_eq!(
        statuses,
        vec![
            (RowStatus::Exists, Some(41)),
            (RowStatus::NewVersion, Some(42)),
            (RowStatus::New, None),
        ]
    );
}

#[tokio::test]
async fn test_other_legislation_makes_every_row_new() {
    let repo = seeded_repo();
    let matcher = RecordMatcher::new(as_repo(&repo), 50);

    let rows = matcher
        .annotate(ImportKind::Article.profile(), article_rows(), Some(LOI_PRESSE))
        .await;

    assert!(rows.iter().all(|r| r.status == RowStatus::New && r.original_id.is_none()));
}

#[tokio::test]
async fn test_failed_lookup_leaves_only_that_row_new() {
    let repo = seeded_repo();
    repo.fail_search("article 6");
    let matcher = RecordMatcher::new(as_repo(&repo), 50);

    let rows = matcher
        .annotate(ImportKind::Article.profile(), article_rows(), Some(CODE_CIVIL))
        .await;

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].status, RowStatus::Exists);
    assert_eq!(rows[1].status, RowStatus::New);
    assert_eq!(rows[1].original_id, None);
    assert_eq!(rows.iter().map(|r| r.index).collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_existing_legislation_found_by_normalized_title() {
    let repo = seeded_repo();
    let matcher = RecordMatcher::new(as_repo(&repo), 50);

    assert_eq!(
        matcher.find_existing_legislation("  CODE   Civil ").await.unwrap(),
        Some(CODE_CIVIL)
    );
    assert_eq!(matcher.find_existing_legislation("Code pénal").await.unwrap(), None);
    assert_eq!(matcher.find_existing_legislation("   ").await.unwrap(), None);
}
