//! CSV export of the wizard state
//!
//! The export is both the audit snapshot and the file posted to the import
//! endpoint. It starts with a UTF-8 BOM, uses commas and quotes fields only
//! when needed.

use csv::{Terminator, WriterBuilder};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::cms::CmsRecord;
use crate::models::{HierarchyNode, ImportKind, ImportProfile, ImportRow, RelationType};
use crate::services::hierarchy_builder::LegislationDraft;
use crate::services::linker::LinkBoard;
use crate::services::normalize::canonical_date;
use crate::services::structure_editor::StructureBoard;

const BOM: &str = "\u{feff}";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Export buffer error: {0}")]
    Buffer(String),
}

/// Everything an export reads
pub struct ExportSnapshot<'a> {
    pub profile: &'static ImportProfile,
    pub rows: &'a [ImportRow],
    pub selected: &'a BTreeSet<usize>,
    pub legislation: Option<&'a CmsRecord>,
    pub links: &'a LinkBoard,
    /// Structure of an article import, once built
    pub board: Option<&'a StructureBoard>,
    /// Legislations of a combined import
    pub drafts: &'a [LegislationDraft],
}

impl<'a> ExportSnapshot<'a> {
    fn selected_rows(&self) -> impl Iterator<Item = &'a ImportRow> + '_ {
        self.rows.iter().filter(|r| self.selected.contains(&r.index))
    }

    fn row(&self, index: usize) -> Option<&'a ImportRow> {
        self.rows.iter().find(|r| r.index == index)
    }

    fn legislation_id(&self) -> String {
        self.legislation.map(|l| l.id.to_string()).unwrap_or_default()
    }

    fn id_list(&self, row: usize, relation: RelationType) -> String {
        join_ids(self.links.ids_for(row, relation))
    }
}

fn join_ids(ids: impl IntoIterator<Item = u64>) -> String {
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn opt_id(id: Option<u64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}

/// Date cell: canonical YYYYMMDD when recognised, else as written
fn date_cell(value: &str) -> String {
    canonical_date(value).unwrap_or_else(|| value.trim().to_string())
}

/// Serialize the snapshot with the column schema of its import kind
pub fn export_csv(snapshot: &ExportSnapshot<'_>) -> Result<String, ExportError> {
    let records = match snapshot.profile.kind {
        ImportKind::Article => article_records(snapshot),
        ImportKind::Commentaire => commentaire_records(snapshot),
        ImportKind::Decision => decision_records(snapshot),
        ImportKind::Legislation => legislation_records(snapshot),
        ImportKind::ImportComplet => complet_records(snapshot),
    };

    let terminator = if snapshot.profile.crlf {
        Terminator::CRLF
    } else {
        Terminator::Any(b'\n')
    };
    let mut writer = WriterBuilder::new()
        .terminator(terminator)
        .from_writer(Vec::new());

    writer.write_record(snapshot.profile.export_columns)?;
    for record in &records {
        writer.write_record(record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))?;
    let body = String::from_utf8(bytes).map_err(|e| ExportError::Buffer(e.to_string()))?;

    tracing::debug!(
        kind = ?snapshot.profile.kind,
        records = records.len(),
        "CSV export generated"
    );

    Ok(format!("{}{}", BOM, body))
}

fn article_row_record(
    snapshot: &ExportSnapshot<'_>,
    row: &ImportRow,
    title: &str,
    position: Option<usize>,
) -> Vec<String> {
    vec![
        "Article".to_string(),
        title.to_string(),
        row.get("Content").to_string(),
        date_cell(row.get("Date_entree")),
        snapshot.legislation_id(),
        position.map(|p| p.to_string()).unwrap_or_default(),
        row.status.as_str().to_string(),
        opt_id(row.original_id),
        String::new(),
        snapshot.id_list(row.index, RelationType::Decision),
        snapshot.id_list(row.index, RelationType::Commentaire),
    ]
}

fn structure_node_record(snapshot: &ExportSnapshot<'_>, node: &HierarchyNode) -> Vec<String> {
    vec![
        node.node_type.label().to_string(),
        node.content.clone(),
        String::new(),
        String::new(),
        snapshot.legislation_id(),
        node.position.to_string(),
        String::new(),
        opt_id(node.remote_id),
        opt_id(node.linked_text_id),
        String::new(),
        String::new(),
    ]
}

/// Structure order when the structure exists, row order before that
fn article_records(snapshot: &ExportSnapshot<'_>) -> Vec<Vec<String>> {
    let Some(board) = snapshot.board else {
        return snapshot
            .selected_rows()
            .map(|row| article_row_record(snapshot, row, row.get("Title").trim(), None))
            .collect();
    };

    let mut records = Vec::new();
    for node in &board.structure {
        match node.row_index.and_then(|i| snapshot.row(i)) {
            Some(row) => {
                records.push(article_row_record(snapshot, row, &node.content, Some(node.position)))
            }
            None => records.push(structure_node_record(snapshot, node)),
        }
    }
    // Only row articles carry data worth exporting while unplaced
    for node in &board.unstructured {
        match node.row_index.and_then(|i| snapshot.row(i)) {
            Some(row) => records.push(article_row_record(snapshot, row, &node.content, None)),
            None => tracing::debug!(
                node_type = node.node_type.label(),
                content = %node.content,
                "Unplaced non-row node left out of export"
            ),
        }
    }
    records
}

fn commentaire_records(snapshot: &ExportSnapshot<'_>) -> Vec<Vec<String>> {
    snapshot
        .selected_rows()
        .map(|row| {
            vec![
                row.get("Title").trim().to_string(),
                row.get("Content").to_string(),
                snapshot.legislation_id(),
                row.status.as_str().to_string(),
                opt_id(row.original_id),
                snapshot.id_list(row.index, RelationType::Article),
                snapshot.id_list(row.index, RelationType::Decision),
            ]
        })
        .collect()
}

fn decision_records(snapshot: &ExportSnapshot<'_>) -> Vec<Vec<String>> {
    snapshot
        .selected_rows()
        .map(|row| {
            vec![
                row.get("Title").trim().to_string(),
                row.get("Content").to_string(),
                date_cell(row.get("Date_decision")),
                row.status.as_str().to_string(),
                opt_id(row.original_id),
                snapshot.id_list(row.index, RelationType::Article),
                snapshot.id_list(row.index, RelationType::Commentaire),
            ]
        })
        .collect()
}

fn legislation_records(snapshot: &ExportSnapshot<'_>) -> Vec<Vec<String>> {
    snapshot
        .selected_rows()
        .map(|row| {
            vec![
                row.get("Title").trim().to_string(),
                date_cell(row.get("Date_entree")),
                row.status.as_str().to_string(),
                opt_id(row.original_id),
            ]
        })
        .collect()
}

fn complet_records(snapshot: &ExportSnapshot<'_>) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    for draft in snapshot.drafts {
        for node in &draft.board.structure {
            records.push(vec![
                draft.title.clone(),
                date_cell(&draft.date_entree),
                draft.code_visee.clone(),
                opt_id(draft.existing_id),
                node.node_type.label().to_string(),
                node.content.clone(),
                node.position.to_string(),
                node.contenu_article.clone().unwrap_or_default(),
                node.contenu_article2.clone().unwrap_or_default(),
            ]);
        }
    }
    records
}
