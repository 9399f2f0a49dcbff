//! Legislation structure reconstruction
//!
//! Two sources: the flat rows of a combined import (one legislation per
//! distinct `Titre_legislation`), or the structure of an existing legislation
//! fetched from the CMS.

use serde::{Deserialize, Serialize};

use crate::cms::RemoteStructure;
use crate::models::hierarchy::renumber;
use crate::models::{HierarchyNode, ImportProfile, ImportRow, NodeType};
use crate::services::structure_editor::StructureBoard;

pub const LEGISLATION_TITLE: &str = "Titre_legislation";
pub const DATE_ENTREE: &str = "Date_entree";
pub const CODE_VISEE: &str = "Code_visee";
pub const TITRE: &str = "Titre";
pub const CHAPITRE: &str = "Chapitre";
pub const SECTION: &str = "Section";
pub const ARTICLE: &str = "Article";
pub const CONTENU_ARTICLE: &str = "Contenu_article";
pub const CONTENU_ARTICLE2: &str = "Contenu_article2";

/// One legislation rebuilt from a combined import file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegislationDraft {
    pub title: String,
    pub date_entree: String,
    pub code_visee: String,
    /// Id of a legislation with the same normalized title, if one exists
    pub existing_id: Option<u64>,
    pub board: StructureBoard,
}

/// Running heading values of one legislation
#[derive(Default)]
struct Cursor {
    title: Option<String>,
    chapter: Option<String>,
    section: Option<String>,
}

/// Emit a heading node when `value` is non-empty and differs from the cursor
fn advance(
    cursor: &mut Option<String>,
    value: &str,
    node_type: NodeType,
    nodes: &mut Vec<HierarchyNode>,
) {
    let value = value.trim();
    if value.is_empty() || cursor.as_deref() == Some(value) {
        return;
    }
    *cursor = Some(value.to_string());
    nodes.push(HierarchyNode::new(node_type, value));
}

/// Group rows by legislation title and rebuild each hierarchy
///
/// Grouping uses the exact cell value; groups keep the order of their first
/// row. Heading cursors are independent per level, so a new title does not
/// reset the chapter cursor.
pub fn build_from_rows<'a>(rows: impl IntoIterator<Item = &'a ImportRow>) -> Vec<LegislationDraft> {
    let mut groups: Vec<(LegislationDraft, Cursor, Vec<HierarchyNode>)> = Vec::new();

    for row in rows {
        let legislation = row.get(LEGISLATION_TITLE);
        if legislation.trim().is_empty() {
            tracing::warn!(row = row.index, "Row without legislation title skipped");
            continue;
        }

        let position = match groups.iter().position(|(d, _, _)| d.title == legislation) {
            Some(position) => position,
            None => {
                groups.push((
                    LegislationDraft {
                        title: legislation.to_string(),
                        date_entree: row.get(DATE_ENTREE).trim().to_string(),
                        code_visee: row.get(CODE_VISEE).trim().to_string(),
                        existing_id: None,
                        board: StructureBoard::new(),
                    },
                    Cursor::default(),
                    Vec::new(),
                ));
                groups.len() - 1
            }
        };
        let (_, cursor, nodes) = &mut groups[position];

        advance(&mut cursor.title, row.get(TITRE), NodeType::Title, nodes);
        advance(&mut cursor.chapter, row.get(CHAPITRE), NodeType::Chapter, nodes);
        advance(&mut cursor.section, row.get(SECTION), NodeType::Section, nodes);

        let article = row.get(ARTICLE).trim();
        if !article.is_empty() {
            let mut node = HierarchyNode::article(
                article,
                row.get(CONTENU_ARTICLE),
                row.get(CONTENU_ARTICLE2),
            );
            node.row_index = Some(row.index);
            nodes.push(node);
        }
    }

    groups
        .into_iter()
        .map(|(mut draft, _, nodes)| {
            tracing::debug!(
                legislation = %draft.title,
                nodes = nodes.len(),
                "Legislation structure rebuilt from rows"
            );
            draft.board = StructureBoard::with_structure(nodes);
            draft
        })
        .collect()
}

/// Nodes of an existing legislation, ordered by their stored position
pub fn build_from_remote(structure: &RemoteStructure) -> Vec<HierarchyNode> {
    let mut remote: Vec<_> = structure.nodes.iter().collect();
    // Stable: nodes without a stored position keep their listed order at the end
    remote.sort_by_key(|n| n.position.unwrap_or(u32::MAX));

    let mut nodes: Vec<HierarchyNode> = remote
        .into_iter()
        .map(|n| {
            let mut node = HierarchyNode::remote(n.node_type, n.id, n.title.clone());
            if node.is_article() {
                node.linked_text_id = Some(n.id);
            }
            node
        })
        .collect();
    renumber(&mut nodes);
    nodes
}

/// Unplaced article nodes for the given rows
pub fn row_nodes<'a>(
    profile: &ImportProfile,
    rows: impl IntoIterator<Item = &'a ImportRow>,
) -> Vec<HierarchyNode> {
    rows.into_iter()
        .map(|row| {
            HierarchyNode::from_row(
                row.index,
                row.get(profile.title_column).trim(),
                row.get("Content"),
            )
        })
        .collect()
}
