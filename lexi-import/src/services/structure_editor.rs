//! Interactive editing of a legislation structure
//!
//! A [`StructureBoard`] holds two ordered pools: the structure itself and the
//! rows selected for import that have not been placed yet. Every mutation
//! renumbers the pools it touched so positions stay `1..=len`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::models::hierarchy::renumber;
use crate::models::{HierarchyNode, LinkedTextRef, NodeType};
use crate::services::normalize::same_content;

/// One of the two pools of a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    Structure,
    Unstructured,
}

/// Position inside a pool (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub pool: Pool,
    pub index: usize,
}

impl Slot {
    pub fn structure(index: usize) -> Self {
        Self { pool: Pool::Structure, index }
    }

    pub fn unstructured(index: usize) -> Self {
        Self { pool: Pool::Unstructured, index }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropOutcome {
    Inserted,
    /// An article with the same content is already in the structure
    Duplicate,
}

/// Result of a [`StructureCommand`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    Applied,
    /// Duplicate drop, board unchanged
    DuplicateIgnored,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("Index {index} out of range for {pool:?} pool of {len} nodes")]
    IndexOutOfRange { pool: Pool, index: usize, len: usize },

    #[error("No structure board {0}")]
    UnknownBoard(usize),

    #[error("Unknown article candidate {0}")]
    UnknownCandidate(u64),

    #[error("Operation not allowed: {0}")]
    NotAllowed(String),
}

/// Edit command addressed to one board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StructureCommand {
    Move {
        #[serde(default)]
        board: usize,
        from: Slot,
        to: Slot,
    },
    /// Insert an existing article from the candidate catalog
    DropLinked {
        #[serde(default)]
        board: usize,
        candidate: u64,
        index: usize,
    },
    InsertNode {
        #[serde(default)]
        board: usize,
        node_type: NodeType,
        content: String,
        index: usize,
    },
    Edit {
        #[serde(default)]
        board: usize,
        pool: Pool,
        index: usize,
        content: String,
    },
    Delete {
        #[serde(default)]
        board: usize,
        pool: Pool,
        index: usize,
    },
}

impl StructureCommand {
    pub fn board(&self) -> usize {
        match self {
            StructureCommand::Move { board, .. }
            | StructureCommand::DropLinked { board, .. }
            | StructureCommand::InsertNode { board, .. }
            | StructureCommand::Edit { board, .. }
            | StructureCommand::Delete { board, .. } => *board,
        }
    }
}

/// Structure plus the pool of rows still to place
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureBoard {
    pub structure: Vec<HierarchyNode>,
    pub unstructured: Vec<HierarchyNode>,
}

impl StructureBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Board whose structure is `nodes`, all marked as placed
    pub fn with_structure(nodes: Vec<HierarchyNode>) -> Self {
        let mut board = Self {
            structure: nodes,
            unstructured: Vec::new(),
        };
        for node in &mut board.structure {
            node.dropped_to_structure = true;
        }
        renumber(&mut board.structure);
        board
    }

    pub fn pool(&self, pool: Pool) -> &[HierarchyNode] {
        match pool {
            Pool::Structure => &self.structure,
            Pool::Unstructured => &self.unstructured,
        }
    }

    fn pool_mut(&mut self, pool: Pool) -> &mut Vec<HierarchyNode> {
        match pool {
            Pool::Structure => &mut self.structure,
            Pool::Unstructured => &mut self.unstructured,
        }
    }

    fn check_index(&self, pool: Pool, index: usize, allow_end: bool) -> Result<(), StructureError> {
        let len = self.pool(pool).len();
        let in_range = if allow_end { index <= len } else { index < len };
        if in_range {
            Ok(())
        } else {
            Err(StructureError::IndexOutOfRange { pool, index, len })
        }
    }

    fn renumber_all(&mut self) {
        renumber(&mut self.structure);
        renumber(&mut self.unstructured);
    }

    /// All selected rows have been placed
    pub fn is_fully_structured(&self) -> bool {
        self.unstructured.is_empty()
    }

    /// Move a node within a pool or across pools
    ///
    /// `to.index` is interpreted after the node has been removed from its
    /// source position.
    pub fn move_node(&mut self, from: Slot, to: Slot) -> Result<(), StructureError> {
        self.check_index(from.pool, from.index, false)?;

        let mut node = self.pool_mut(from.pool).remove(from.index);
        if let Err(e) = self.check_index(to.pool, to.index, true) {
            self.pool_mut(from.pool).insert(from.index, node);
            return Err(e);
        }

        node.dropped_to_structure = to.pool == Pool::Structure;
        self.pool_mut(to.pool).insert(to.index, node);
        self.renumber_all();
        Ok(())
    }

    /// Insert an existing article at `index`, unless an article with the same
    /// content is already in the structure
    pub fn drop_linked(
        &mut self,
        candidate: &LinkedTextRef,
        index: usize,
    ) -> Result<DropOutcome, StructureError> {
        self.check_index(Pool::Structure, index, true)?;

        let duplicate = self
            .structure
            .iter()
            .any(|n| n.is_article() && same_content(&n.content, &candidate.label));
        if duplicate {
            tracing::info!(
                candidate = candidate.remote_id,
                content = %candidate.label,
                "Article already present in structure, drop ignored"
            );
            return Ok(DropOutcome::Duplicate);
        }

        let mut node = HierarchyNode::new(NodeType::Article, candidate.label.clone());
        node.linked_text_id = Some(candidate.remote_id);
        node.dropped_to_structure = true;
        self.structure.insert(index, node);
        renumber(&mut self.structure);
        Ok(DropOutcome::Inserted)
    }

    /// Insert a new heading (title, chapter or section)
    pub fn insert_node(
        &mut self,
        node_type: NodeType,
        content: &str,
        index: usize,
    ) -> Result<(), StructureError> {
        if node_type == NodeType::Article {
            return Err(StructureError::NotAllowed(
                "articles come from the imported rows or the article catalog".to_string(),
            ));
        }
        self.check_index(Pool::Structure, index, true)?;

        let mut node = HierarchyNode::new(node_type, content.trim());
        node.dropped_to_structure = true;
        self.structure.insert(index, node);
        renumber(&mut self.structure);
        Ok(())
    }

    /// Replace the content of a node
    pub fn edit(&mut self, slot: Slot, content: &str) -> Result<(), StructureError> {
        self.check_index(slot.pool, slot.index, false)?;
        self.pool_mut(slot.pool)[slot.index].content = content.trim().to_string();
        Ok(())
    }

    /// Remove a node
    ///
    /// Nodes backed by an imported row go back to the unstructured pool; they
    /// leave the board only when the row is deselected.
    pub fn delete(&mut self, slot: Slot) -> Result<HierarchyNode, StructureError> {
        self.check_index(slot.pool, slot.index, false)?;

        let is_row = self.pool(slot.pool)[slot.index].row_index.is_some();
        if is_row && slot.pool == Pool::Unstructured {
            return Err(StructureError::NotAllowed(
                "deselect the row to remove it from the import".to_string(),
            ));
        }

        let mut node = self.pool_mut(slot.pool).remove(slot.index);
        if is_row {
            node.dropped_to_structure = false;
            self.unstructured.push(node.clone());
        }
        self.renumber_all();
        Ok(node)
    }

    /// Align the row-backed nodes with the current selection
    ///
    /// Nodes for deselected rows are removed from both pools, newly selected
    /// rows are appended to the unstructured pool. Placed nodes keep their
    /// position.
    pub fn sync_rows(&mut self, selected: Vec<HierarchyNode>) {
        let wanted: BTreeSet<usize> = selected.iter().filter_map(|n| n.row_index).collect();
        let keep = |n: &HierarchyNode| n.row_index.map_or(true, |i| wanted.contains(&i));
        self.structure.retain(keep);
        self.unstructured.retain(keep);

        let present: BTreeSet<usize> = self
            .structure
            .iter()
            .chain(self.unstructured.iter())
            .filter_map(|n| n.row_index)
            .collect();
        for mut node in selected {
            if node.row_index.map_or(false, |i| !present.contains(&i)) {
                node.dropped_to_structure = false;
                self.unstructured.push(node);
            }
        }

        self.renumber_all();
    }

    /// Run one command; `resolve` looks up article candidates for drops
    pub fn apply(
        &mut self,
        command: &StructureCommand,
        resolve: impl FnOnce(u64) -> Option<LinkedTextRef>,
    ) -> Result<CommandOutcome, StructureError> {
        match command {
            StructureCommand::Move { from, to, .. } => {
                self.move_node(*from, *to)?;
            }
            StructureCommand::DropLinked { candidate, index, .. } => {
                let linked =
                    resolve(*candidate).ok_or(StructureError::UnknownCandidate(*candidate))?;
                if self.drop_linked(&linked, *index)? == DropOutcome::Duplicate {
                    return Ok(CommandOutcome::DuplicateIgnored);
                }
            }
            StructureCommand::InsertNode { node_type, content, index, .. } => {
                self.insert_node(*node_type, content, *index)?;
            }
            StructureCommand::Edit { pool, index, content, .. } => {
                self.edit(Slot { pool: *pool, index: *index }, content)?;
            }
            StructureCommand::Delete { pool, index, .. } => {
                self.delete(Slot { pool: *pool, index: *index })?;
            }
        }
        Ok(CommandOutcome::Applied)
    }

    pub fn contains_row(&self, row_index: usize) -> bool {
        self.structure
            .iter()
            .chain(self.unstructured.iter())
            .any(|n| n.row_index == Some(row_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RelationType;

    fn positions(nodes: &[HierarchyNode]) -> Vec<usize> {
        nodes.iter().map(|n| n.position).collect()
    }

    fn contiguous(nodes: &[HierarchyNode]) -> bool {
        positions(nodes) == (1..=nodes.len()).collect::<Vec<_>>()
    }

    fn sample_board() -> StructureBoard {
        let mut board = StructureBoard::with_structure(vec![
            HierarchyNode::remote(NodeType::Title, 1, "Titre I"),
            HierarchyNode::remote(NodeType::Chapter, 2, "Chapitre I"),
            HierarchyNode::remote(NodeType::Article, 3, "Article 1"),
        ]);
        board.sync_rows(vec![
            HierarchyNode::from_row(0, "Article 2", "a"),
            HierarchyNode::from_row(1, "Article 3", "b"),
        ]);
        board
    }

    #[test]
    fn test_move_across_pools_renumbers_both() {
        let mut board = sample_board();
        board
            .move_node(Slot::unstructured(1), Slot::structure(3))
            .unwrap();

        assert_eq!(board.structure.len(), 4);
        assert_eq!(board.structure[3].content, "Article 3");
        assert!(board.structure[3].dropped_to_structure);
        assert_eq!(board.unstructured.len(), 1);
        assert!(contiguous(&board.structure));
        assert!(contiguous(&board.unstructured));
    }

    #[test]
    fn test_move_within_pool_only_reorders() {
        let mut board = sample_board();
        board.move_node(Slot::structure(0), Slot::structure(2)).unwrap();

        let contents: Vec<&str> = board.structure.iter().map(|n| n.content.as_str()).collect();
        assert_eq!(contents, vec!["Chapitre I", "Article 1", "Titre I"]);
        assert!(contiguous(&board.structure));
    }

    #[test]
    fn test_move_out_of_range_leaves_board_unchanged() {
        let mut board = sample_board();
        let before = board.clone();

        assert!(board.move_node(Slot::structure(5), Slot::structure(0)).is_err());
        assert!(board.move_node(Slot::structure(0), Slot::unstructured(9)).is_err());
        assert_eq!(board, before);
    }

    #[test]
    fn test_duplicate_drop_is_rejected() {
        let mut board = sample_board();
        let before = board.clone();
        let candidate = LinkedTextRef::new(RelationType::Article, 99, "  ARTICLE 1 ");

        assert_eq!(board.drop_linked(&candidate, 0).unwrap(), DropOutcome::Duplicate);
        assert_eq!(board, before);
    }

    #[test]
    fn test_drop_inserts_linked_article() {
        let mut board = sample_board();
        let candidate = LinkedTextRef::new(RelationType::Article, 99, "Article 9");

        assert_eq!(board.drop_linked(&candidate, 1).unwrap(), DropOutcome::Inserted);
        assert_eq!(board.structure[1].linked_text_id, Some(99));
        assert!(contiguous(&board.structure));
    }

    #[test]
    fn test_insert_heading_and_reject_article() {
        let mut board = sample_board();
        board.insert_node(NodeType::Section, " Section 1 ", 2).unwrap();
        assert_eq!(board.structure[2].content, "Section 1");
        assert!(contiguous(&board.structure));

        assert!(matches!(
            board.insert_node(NodeType::Article, "Article 4", 0),
            Err(StructureError::NotAllowed(_))
        ));
    }

    #[test]
    fn test_delete_row_node_returns_it_to_pool() {
        let mut board = sample_board();
        board.move_node(Slot::unstructured(0), Slot::structure(3)).unwrap();
        board.delete(Slot::structure(3)).unwrap();

        assert_eq!(board.structure.len(), 3);
        assert_eq!(board.unstructured.len(), 2);
        assert!(!board.unstructured[1].dropped_to_structure);
        assert!(board.delete(Slot::unstructured(0)).is_err());
    }

    #[test]
    fn test_delete_heading() {
        let mut board = sample_board();
        let removed = board.delete(Slot::structure(0)).unwrap();
        assert_eq!(removed.content, "Titre I");
        assert_eq!(board.structure.len(), 2);
        assert!(contiguous(&board.structure));
    }

    #[test]
    fn test_sync_rows_keeps_placed_nodes() {
        let mut board = sample_board();
        board.move_node(Slot::unstructured(0), Slot::structure(1)).unwrap();

        // Row 1 deselected, row 2 newly selected
        board.sync_rows(vec![
            HierarchyNode::from_row(0, "Article 2", "a"),
            HierarchyNode::from_row(2, "Article 4", "c"),
        ]);

        assert_eq!(board.structure[1].row_index, Some(0));
        assert_eq!(board.unstructured.len(), 1);
        assert_eq!(board.unstructured[0].row_index, Some(2));
        assert!(!board.contains_row(1));
        assert!(!board.is_fully_structured());
    }

    #[test]
    fn test_positions_stay_contiguous_over_mixed_edits() {
        let mut board = sample_board();
        board.insert_node(NodeType::Chapter, "Chapitre II", 3).unwrap();
        board.move_node(Slot::unstructured(0), Slot::structure(4)).unwrap();
        board.move_node(Slot::unstructured(0), Slot::structure(0)).unwrap();
        board.delete(Slot::structure(2)).unwrap();
        board.move_node(Slot::structure(4), Slot::structure(1)).unwrap();

        assert!(contiguous(&board.structure));
        assert!(contiguous(&board.unstructured));
        assert!(board.is_fully_structured());
    }

    #[test]
    fn test_apply_drop_with_unknown_candidate() {
        let mut board = sample_board();
        let command = StructureCommand::DropLinked { board: 0, candidate: 5, index: 0 };
        assert_eq!(
            board.apply(&command, |_| None),
            Err(StructureError::UnknownCandidate(5))
        );

        let outcome = board
            .apply(&command, |id| Some(LinkedTextRef::new(RelationType::Article, id, "Article 1")))
            .unwrap();
        assert_eq!(outcome, CommandOutcome::DuplicateIgnored);
    }

    #[test]
    fn test_command_deserialization() {
        let command: StructureCommand = serde_json::from_str(
            r#"{"action":"move","from":{"pool":"unstructured","index":0},"to":{"pool":"structure","index":2}}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            StructureCommand::Move {
                board: 0,
                from: Slot::unstructured(0),
                to: Slot::structure(2),
            }
        );

        let command: StructureCommand = serde_json::from_str(
            r#"{"action":"insert_node","board":1,"node_type":"section","content":"Section 2","index":0}"#,
        )
        .unwrap();
        assert_eq!(command.board(), 1);
    }
}
