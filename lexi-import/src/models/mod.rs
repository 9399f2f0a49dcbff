//! Data models for the import pipeline
//!
//! - Import profiles (per-kind column schema, step list, endpoints)
//! - Parsed CSV rows and their existing-record classification
//! - Linked-text references, hierarchy nodes, audit-trail entries

pub mod hierarchy;
pub mod history;
pub mod import_row;
pub mod linked_text;
pub mod profile;

pub use hierarchy::{HierarchyNode, NodeType};
pub use history::{HistoryStatus, ImportHistoryEntry};
pub use import_row::{ImportRow, RowStatus};
pub use linked_text::{LinkedTextRef, RelationType};
pub use profile::{ImportEndpoint, ImportKind, ImportProfile, StepEffect, StepSpec, WizardStep};
