//! Legal hierarchy nodes (Titre → Chapitre → Section → Article)

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::cms::ContentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Title,
    Chapter,
    Section,
    Article,
}

impl NodeType {
    /// Label written to exports ("Titre", "Chapitre", ...)
    pub fn label(&self) -> &'static str {
        match self {
            NodeType::Title => "Titre",
            NodeType::Chapter => "Chapitre",
            NodeType::Section => "Section",
            NodeType::Article => "Article",
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            NodeType::Title => ContentType::Titre,
            NodeType::Chapter => ContentType::Chapitre,
            NodeType::Section => ContentType::Section,
            NodeType::Article => ContentType::Article,
        }
    }

    /// REST collection of this node type (pluralized)
    pub fn endpoint(&self) -> &'static str {
        self.content_type().endpoint()
    }
}

impl FromStr for NodeType {
    type Err = String;

    /// Accepts CMS post types and labels, French or English, any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title" | "titre" | "titres" => Ok(NodeType::Title),
            "chapter" | "chapitre" | "chapitres" => Ok(NodeType::Chapter),
            "section" | "sections" => Ok(NodeType::Section),
            "article" | "articles" => Ok(NodeType::Article),
            other => Err(format!("Unknown hierarchy node type: {}", other)),
        }
    }
}

/// One element of a legislation's structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub node_type: NodeType,
    /// Display text (heading or article title)
    pub content: String,
    /// 1-based order inside its pool, recomputed after every change
    pub position: usize,
    /// Id of the node when it already exists in the CMS
    pub remote_id: Option<u64>,
    /// Collection the node belongs to, for remote nodes
    pub endpoint: Option<String>,
    /// Pre-existing article dragged into the structure
    pub linked_text_id: Option<u64>,
    /// Originating CSV row, for rows selected in this import
    pub row_index: Option<usize>,
    pub contenu_article: Option<String>,
    pub contenu_article2: Option<String>,
    pub dropped_to_structure: bool,
}

impl HierarchyNode {
    pub fn new(node_type: NodeType, content: impl Into<String>) -> Self {
        Self {
            node_type,
            content: content.into(),
            position: 0,
            remote_id: None,
            endpoint: None,
            linked_text_id: None,
            row_index: None,
            contenu_article: None,
            contenu_article2: None,
            dropped_to_structure: false,
        }
    }

    /// Article node carrying its two body fields
    pub fn article(
        content: impl Into<String>,
        contenu_article: impl Into<String>,
        contenu_article2: impl Into<String>,
    ) -> Self {
        let mut node = Self::new(NodeType::Article, content);
        node.contenu_article = Some(contenu_article.into());
        node.contenu_article2 = Some(contenu_article2.into());
        node
    }

    /// Node backed by an existing CMS record
    pub fn remote(node_type: NodeType, id: u64, content: impl Into<String>) -> Self {
        let mut node = Self::new(node_type, content);
        node.remote_id = Some(id);
        node.endpoint = Some(node_type.endpoint().to_string());
        node.dropped_to_structure = true;
        node
    }

    /// Article node for a selected CSV row (starts unplaced)
    pub fn from_row(row_index: usize, title: impl Into<String>, body: impl Into<String>) -> Self {
        let mut node = Self::new(NodeType::Article, title);
        node.row_index = Some(row_index);
        node.contenu_article = Some(body.into());
        node
    }

    pub fn is_article(&self) -> bool {
        self.node_type == NodeType::Article
    }
}

/// Recompute 1-based positions in list order
pub fn renumber(nodes: &mut [HierarchyNode]) {
    for (i, node) in nodes.iter_mut().enumerate() {
        node.position = i + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_type_parsing() {
        assert_eq!("Titre".parse::<NodeType>().unwrap(), NodeType::Title);
        assert_eq!("chapitres".parse::<NodeType>().unwrap(), NodeType::Chapter);
        assert_eq!(" SECTION ".parse::<NodeType>().unwrap(), NodeType::Section);
        assert_eq!("article".parse::<NodeType>().unwrap(), NodeType::Article);
        assert!("annexe".parse::<NodeType>().is_err());
    }

    #[test]
    fn test_endpoint_is_pluralized() {
        assert_eq!(NodeType::Title.endpoint(), "titres");
        assert_eq!(NodeType::Chapter.endpoint(), "chapitres");
        assert_eq!(NodeType::Section.endpoint(), "sections");
        assert_eq!(NodeType::Article.endpoint(), "articles");
    }

    #[test]
    fn test_renumber() {
        let mut nodes = vec![
            HierarchyNode::new(NodeType::Title, "Titre I"),
            HierarchyNode::new(NodeType::Chapter, "Chapitre I"),
            HierarchyNode::article("Article 1", "a", ""),
        ];
        nodes[0].position = 7;
        renumber(&mut nodes);
        let positions: Vec<usize> = nodes.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }
}
