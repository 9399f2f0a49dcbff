//! Links between imported rows and existing CMS records

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::cms::{list_all, ContentRepository, ListQuery};
use crate::models::{ImportProfile, ImportRow, LinkedTextRef, RelationType};

/// Parse an ID cell (`12, 13;14|15`), skipping anything that is not an id
pub fn parse_id_list(cell: &str) -> Vec<u64> {
    let mut seen = BTreeSet::new();
    cell.split(&[',', ';', '|'][..])
        .filter_map(|part| part.trim().parse::<u64>().ok())
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Candidate records per relation type, keyed by remote id
#[derive(Debug, Clone, Default)]
pub struct LinkCatalog {
    entries: BTreeMap<RelationType, BTreeMap<u64, LinkedTextRef>>,
}

impl LinkCatalog {
    /// Fetch every candidate of the given relation types
    ///
    /// A relation whose listing fails ends up with no candidates.
    pub async fn fetch(
        repo: &dyn ContentRepository,
        relations: &[RelationType],
        page_size: u32,
    ) -> Self {
        let fetches = relations.iter().map(|relation| async move {
            let result =
                list_all(repo, relation.content_type(), ListQuery::new(page_size)).await;
            (*relation, result)
        });

        let mut catalog = Self::default();
        for (relation, result) in join_all(fetches).await {
            match result {
                Ok(records) => {
                    tracing::debug!(
                        relation = relation.label(),
                        candidates = records.len(),
                        "Link catalog loaded"
                    );
                    for record in records {
                        catalog.insert(LinkedTextRef::new(relation, record.id, record.title));
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        relation = relation.label(),
                        error = %e,
                        "Link catalog fetch failed, no candidates available"
                    );
                    catalog.entries.entry(relation).or_default();
                }
            }
        }
        catalog
    }

    pub fn insert(&mut self, candidate: LinkedTextRef) {
        self.entries
            .entry(candidate.record_type)
            .or_default()
            .insert(candidate.remote_id, candidate);
    }

    pub fn resolve(&self, relation: RelationType, id: u64) -> Option<&LinkedTextRef> {
        self.entries.get(&relation).and_then(|m| m.get(&id))
    }

    pub fn candidates(&self, relation: RelationType) -> Vec<&LinkedTextRef> {
        self.entries
            .get(&relation)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, relation: RelationType) -> usize {
        self.entries.get(&relation).map_or(0, BTreeMap::len)
    }
}

/// Per-row links, grouped by relation type
///
/// A (row, relation) entry, even an empty one, records that the links of
/// that type were chosen explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkBoard {
    links: BTreeMap<usize, BTreeMap<RelationType, Vec<LinkedTextRef>>>,
}

impl LinkBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace one row's links of one type, keeping its other types
    pub fn assign(&mut self, row: usize, relation: RelationType, refs: Vec<LinkedTextRef>) {
        self.links.entry(row).or_default().insert(relation, refs);
    }

    /// Apply the same links of one type to every given row
    pub fn bulk_assign(
        &mut self,
        rows: impl IntoIterator<Item = usize>,
        relation: RelationType,
        refs: &[LinkedTextRef],
    ) -> usize {
        let mut count = 0;
        for row in rows {
            self.assign(row, relation, refs.to_vec());
            count += 1;
        }
        count
    }

    pub fn is_assigned(&self, row: usize, relation: RelationType) -> bool {
        self.links
            .get(&row)
            .map_or(false, |by_type| by_type.contains_key(&relation))
    }

    pub fn links(&self, row: usize, relation: RelationType) -> &[LinkedTextRef] {
        self.links
            .get(&row)
            .and_then(|by_type| by_type.get(&relation))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn ids_for(&self, row: usize, relation: RelationType) -> Vec<u64> {
        self.links(row, relation).iter().map(|r| r.remote_id).collect()
    }

    /// Fill links from the ID columns of the file
    ///
    /// Only (row, relation) pairs with no explicit choice are filled. Ids
    /// missing from the catalog are skipped. Returns the number of pairs
    /// filled.
    pub fn prepopulate<'a>(
        &mut self,
        profile: &ImportProfile,
        rows: impl IntoIterator<Item = &'a ImportRow>,
        catalog: &LinkCatalog,
    ) -> usize {
        let mut filled = 0;
        for row in rows {
            for &(relation, column) in profile.link_columns {
                if self.is_assigned(row.index, relation) {
                    continue;
                }

                let ids = parse_id_list(row.get(column));
                let refs: Vec<LinkedTextRef> = ids
                    .iter()
                    .filter_map(|id| {
                        let found = catalog.resolve(relation, *id).cloned();
                        if found.is_none() {
                            tracing::debug!(
                                row = row.index,
                                relation = relation.label(),
                                id,
                                "Linked id not in catalog, skipped"
                            );
                        }
                        found
                    })
                    .collect();

                if !refs.is_empty() {
                    self.assign(row.index, relation, refs);
                    filled += 1;
                }
            }
        }
        filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImportKind;

    fn decision(id: u64) -> LinkedTextRef {
        LinkedTextRef::new(RelationType::Decision, id, format!("Décision {}", id))
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("12, 13;14|15"), vec![12, 13, 14, 15]);
        assert_eq!(parse_id_list(" 7 ,x, ,7"), vec![7]);
        assert!(parse_id_list("").is_empty());
    }

    #[test]
    fn test_bulk_then_override_one_row() {
        let mut board = LinkBoard::new();
        board.bulk_assign([0, 1, 2], RelationType::Decision, &[decision(1), decision(2)]);
        board.assign(1, RelationType::Decision, vec![decision(3)]);

        assert_eq!(board.ids_for(0, RelationType::Decision), vec![1, 2]);
        assert_eq!(board.ids_for(1, RelationType::Decision), vec![3]);
        assert_eq!(board.ids_for(2, RelationType::Decision), vec![1, 2]);
    }

    #[test]
    fn test_reassigning_a_type_keeps_other_types() {
        let mut board = LinkBoard::new();
        board.assign(0, RelationType::Decision, vec![decision(1)]);
        board.assign(
            0,
            RelationType::Commentaire,
            vec![LinkedTextRef::new(RelationType::Commentaire, 5, "Commentaire")],
        );
        board.assign(0, RelationType::Decision, vec![decision(2)]);

        assert_eq!(board.ids_for(0, RelationType::Decision), vec![2]);
        assert_eq!(board.ids_for(0, RelationType::Commentaire), vec![5]);
    }

    #[test]
    fn test_prepopulate_resolves_known_ids_and_keeps_user_choices() {
        let profile = ImportKind::Article.profile();
        let mut catalog = LinkCatalog::default();
        catalog.insert(decision(1));
        catalog.insert(decision(2));

        let mut fields = BTreeMap::new();
        fields.insert("Title".to_string(), "Article 1".to_string());
        fields.insert("ID_decisions".to_string(), "1;2;99".to_string());
        let first = ImportRow::new(0, fields.clone());
        let second = ImportRow::new(1, fields);

        let mut board = LinkBoard::new();
        board.assign(1, RelationType::Decision, Vec::new());
        let filled = board.prepopulate(profile, [&first, &second], &catalog);

        assert_eq!(filled, 1);
        assert_eq!(board.ids_for(0, RelationType::Decision), vec![1, 2]);
        assert!(board.ids_for(1, RelationType::Decision).is_empty());
        assert!(!board.is_assigned(0, RelationType::Commentaire));
    }
}
