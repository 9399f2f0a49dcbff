//! Relations between an import row and pre-existing CMS records

use serde::{Deserialize, Serialize};

use crate::cms::ContentType;

/// Kind of record a row can be linked to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Decision,
    Commentaire,
    Article,
    Legislation,
}

impl RelationType {
    /// Display label used in the back-office
    pub fn label(&self) -> &'static str {
        match self {
            RelationType::Decision => "Décision",
            RelationType::Commentaire => "Commentaire",
            RelationType::Article => "Article",
            RelationType::Legislation => "Législation",
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            RelationType::Decision => ContentType::Decision,
            RelationType::Commentaire => ContentType::Commentaire,
            RelationType::Article => ContentType::Article,
            RelationType::Legislation => ContentType::Legislation,
        }
    }
}

/// Reference to a remote record attached to a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedTextRef {
    pub record_type: RelationType,
    pub remote_id: u64,
    pub label: String,
}

impl LinkedTextRef {
    pub fn new(record_type: RelationType, remote_id: u64, label: impl Into<String>) -> Self {
        Self {
            record_type,
            remote_id,
            label: label.into(),
        }
    }
}
