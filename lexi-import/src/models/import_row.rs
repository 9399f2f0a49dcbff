//! Parsed CSV rows

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Existing-record classification of a row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowStatus {
    /// No matching remote record
    #[default]
    New,
    /// Same title, legislation and entry date already in the CMS
    Exists,
    /// Same title and legislation, different entry date
    NewVersion,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::New => "new",
            RowStatus::Exists => "exists",
            RowStatus::NewVersion => "newVersion",
        }
    }
}

/// One parsed CSV record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    /// 0-based position in the uploaded file
    pub index: usize,
    /// Cell values keyed by trimmed header name
    pub fields: BTreeMap<String, String>,
    pub status: RowStatus,
    /// Remote id of the matched record (exists / newVersion)
    pub original_id: Option<u64>,
}

impl ImportRow {
    pub fn new(index: usize, fields: BTreeMap<String, String>) -> Self {
        Self {
            index,
            fields,
            status: RowStatus::New,
            original_id: None,
        }
    }

    /// Cell value, empty string when the column is absent
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    /// Rows already present in the CMS cannot be selected for import
    pub fn is_selectable(&self) -> bool {
        self.status != RowStatus::Exists
    }

    /// Drop any previous matching result
    pub fn reset_match(&mut self) {
        self.status = RowStatus::New;
        self.original_id = None;
    }
}
