//! In-memory state of one import wizard

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::cms::CmsRecord;
use crate::models::{ImportKind, ImportProfile, ImportRow, WizardStep};
use crate::services::{LegislationDraft, LinkBoard, LinkCatalog, StructureBoard};
use crate::wizard::WizardState;

#[derive(Debug, Clone, Serialize)]
pub struct WizardSession {
    pub session_id: Uuid,
    pub kind: ImportKind,
    pub state: WizardState,
    /// Name of the uploaded file
    pub file_name: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<ImportRow>,
    pub parse_error: Option<String>,
    /// Target legislation (article and commentaire imports)
    pub legislation: Option<CmsRecord>,
    /// Indices of the rows selected for import
    pub selected: BTreeSet<usize>,
    pub links: LinkBoard,
    /// Structure of an article import, built on entering Structure
    pub board: Option<StructureBoard>,
    /// Legislations of a combined import
    pub drafts: Vec<LegislationDraft>,
    /// Whether each step currently allows moving forward
    pub validity: BTreeMap<WizardStep, bool>,
    /// Audit record id, once created
    pub import_history_id: Option<u64>,
    /// Generated name of the audit record and its files
    pub history_file_name: Option<String>,
    /// Last user-visible error
    pub banner: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub catalog: LinkCatalog,
}

impl WizardSession {
    pub fn new(kind: ImportKind, catalog: LinkCatalog) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            kind,
            state: WizardState::Active(kind.profile().first_step()),
            file_name: None,
            headers: Vec::new(),
            rows: Vec::new(),
            parse_error: None,
            legislation: None,
            selected: BTreeSet::new(),
            links: LinkBoard::new(),
            board: None,
            drafts: Vec::new(),
            validity: BTreeMap::new(),
            import_history_id: None,
            history_file_name: None,
            banner: None,
            started_at: Utc::now(),
            completed_at: None,
            catalog,
        }
    }

    pub fn profile(&self) -> &'static ImportProfile {
        self.kind.profile()
    }

    pub fn current_step(&self) -> Option<WizardStep> {
        match self.state {
            WizardState::Active(step) => Some(step),
            WizardState::Completed => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == WizardState::Completed
    }

    pub fn row(&self, index: usize) -> Option<&ImportRow> {
        self.rows.iter().find(|r| r.index == index)
    }

    pub fn selected_rows(&self) -> impl Iterator<Item = &ImportRow> + '_ {
        self.rows.iter().filter(|r| self.selected.contains(&r.index))
    }

    /// Drop everything derived from the previous file
    pub fn clear_rows(&mut self) {
        self.headers.clear();
        self.rows.clear();
        self.parse_error = None;
        self.selected.clear();
        self.links = LinkBoard::new();
        self.board = None;
        self.drafts.clear();
    }
}
