//! Import wizard engine
//!
//! Owns one [`WizardSession`] and runs every operation on it: file
//! selection, target choice, row selection, linking, structure editing,
//! navigation and the final submission. Remote failures are reported to the
//! caller and mirrored in the session banner; the session stays usable.

use chrono::Utc;
use futures::future::join_all;
use lexi_common::AuthContext;
use std::sync::Arc;
use uuid::Uuid;

use crate::cms::{ContentRepository, ContentType, MediaFile};
use crate::models::{
    HistoryStatus, ImportEndpoint, ImportKind, ImportProfile, LinkedTextRef, RelationType,
    StepEffect, WizardStep,
};
use crate::services::hierarchy_builder::row_nodes;
use crate::services::{
    build_from_remote, build_from_rows, export_csv, parse_csv, AuditTrail, CommandOutcome,
    ExportSnapshot, LinkCatalog, RecordMatcher, StructureBoard, StructureCommand, StructureError,
};
use crate::wizard::{
    step_is_valid, transition, NavigationError, WizardAction, WizardError, WizardSession,
    WizardState,
};

/// Message of the submission error raised without a CMS token
pub const AUTH_REQUIRED_MESSAGE: &str = "Authentication required: no CMS token available";

pub struct ImportWizard {
    repo: Arc<dyn ContentRepository>,
    auth: AuthContext,
    matcher: RecordMatcher,
    audit: AuditTrail,
    session: WizardSession,
}

impl ImportWizard {
    /// Create a wizard and load the link candidates its import kind uses
    pub async fn start(
        kind: ImportKind,
        repo: Arc<dyn ContentRepository>,
        auth: AuthContext,
        page_size: u32,
    ) -> Self {
        let profile = kind.profile();
        let catalog =
            LinkCatalog::fetch(repo.as_ref(), profile.catalog_relations, page_size).await;
        let session = WizardSession::new(kind, catalog);

        tracing::info!(
            session_id = %session.session_id,
            kind = ?kind,
            authenticated = auth.is_authenticated(),
            "Import wizard started"
        );

        let mut wizard = Self {
            matcher: RecordMatcher::new(repo.clone(), page_size),
            audit: AuditTrail::new(repo.clone(), auth.clone(), kind),
            repo,
            auth,
            session,
        };
        wizard.refresh_validity();
        wizard
    }

    pub fn session(&self) -> &WizardSession {
        &self.session
    }

    pub fn id(&self) -> Uuid {
        self.session.session_id
    }

    /// Records of one type the rows can be linked to, in id order
    pub fn candidates(&self, relation: RelationType) -> Result<Vec<LinkedTextRef>, WizardError> {
        if !self.profile().catalog_relations.contains(&relation) {
            return Err(WizardError::InvalidOperation(format!(
                "{} imports do not link to {} records",
                self.session.kind.slug(),
                relation.label()
            )));
        }
        Ok(self
            .session
            .catalog
            .candidates(relation)
            .into_iter()
            .cloned()
            .collect())
    }

    fn profile(&self) -> &'static ImportProfile {
        self.session.profile()
    }

    fn refresh_validity(&mut self) {
        let validity = self
            .profile()
            .step_list()
            .into_iter()
            .map(|step| (step, step_is_valid(&self.session, step)))
            .collect();
        self.session.validity = validity;
    }

    fn require_step(&self, step: WizardStep) -> Result<(), WizardError> {
        match self.session.state {
            WizardState::Active(current) if current == step => Ok(()),
            WizardState::Active(current) => Err(WizardError::InvalidOperation(format!(
                "only allowed on the {:?} step (current step: {:?})",
                step, current
            ))),
            WizardState::Completed => Err(NavigationError::Completed.into()),
        }
    }

    /// Parse an uploaded file, open the audit record and classify the rows
    ///
    /// A parse failure clears the previous rows and is reported inline.
    pub async fn select_file(&mut self, file_name: &str, content: &str) -> Result<(), WizardError> {
        self.require_step(WizardStep::Load)?;
        let profile = self.profile();
        let session_id = self.id();

        self.session.clear_rows();
        self.session.file_name = Some(file_name.to_string());

        let parsed = match parse_csv(content, profile.required_columns) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(session_id = %session_id, file = %file_name, error = %e, "Import file rejected");
                self.session.parse_error = Some(e.to_string());
                self.session.banner = Some(e.to_string());
                self.refresh_validity();
                return Err(e.into());
            }
        };
        self.session.headers = parsed.headers;
        self.session.rows = parsed.rows;
        self.session.banner = None;

        match self
            .audit
            .open(self.session.import_history_id, content)
            .await
        {
            Ok((id, name)) => {
                self.session.import_history_id = Some(id);
                self.session.history_file_name = Some(name);
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Audit record could not be created");
            }
        }

        self.run_matching().await;

        if !profile.has_step(WizardStep::Preview) {
            self.session.selected = self.session.rows.iter().map(|r| r.index).collect();
        }

        tracing::info!(
            session_id = %session_id,
            file = %file_name,
            rows = self.session.rows.len(),
            "Import file loaded"
        );
        self.refresh_validity();
        Ok(())
    }

    /// Choose the target legislation; rows are classified again against it
    pub async fn select_legislation(&mut self, legislation_id: u64) -> Result<(), WizardError> {
        self.require_step(WizardStep::Load)?;
        if !self.profile().requires_legislation {
            return Err(WizardError::InvalidOperation(format!(
                "{:?} imports have no target legislation",
                self.session.kind
            )));
        }

        let record = self
            .repo
            .get_by_id(ContentType::Legislation, legislation_id)
            .await?
            .ok_or_else(|| {
                WizardError::InvalidOperation(format!("Unknown legislation {}", legislation_id))
            })?;

        tracing::info!(
            session_id = %self.id(),
            legislation_id,
            title = %record.title,
            "Target legislation selected"
        );
        self.session.legislation = Some(record);
        self.session.board = None;

        self.run_matching().await;
        self.refresh_validity();
        Ok(())
    }

    /// Classify the rows once they and the target (when needed) are known
    async fn run_matching(&mut self) {
        let profile = self.profile();
        if !profile.row_matching || self.session.rows.is_empty() {
            return;
        }
        let legislation = self.session.legislation.as_ref().map(|l| l.id);
        if profile.requires_legislation && legislation.is_none() {
            return;
        }

        let rows = std::mem::take(&mut self.session.rows);
        self.session.rows = self.matcher.annotate(profile, rows, legislation).await;

        let rows = &self.session.rows;
        self.session
            .selected
            .retain(|i| rows.iter().any(|r| r.index == *i && r.is_selectable()));
    }

    fn require_selection_step(&self) -> Result<(), WizardError> {
        if !self.profile().has_step(WizardStep::Preview) {
            return Err(WizardError::InvalidOperation(
                "every row of this import is always selected".to_string(),
            ));
        }
        self.require_step(WizardStep::Preview)
    }

    /// Select or deselect rows; rows that already exist cannot be selected
    pub fn set_row_selected(&mut self, rows: &[usize], selected: bool) -> Result<(), WizardError> {
        self.require_selection_step()?;

        for &index in rows {
            let row = self
                .session
                .row(index)
                .ok_or_else(|| WizardError::InvalidOperation(format!("No row {}", index)))?;
            if selected && !row.is_selectable() {
                return Err(WizardError::InvalidOperation(format!(
                    "Row {} already exists in the CMS",
                    index
                )));
            }
        }

        for &index in rows {
            if selected {
                self.session.selected.insert(index);
            } else {
                self.session.selected.remove(&index);
            }
        }
        self.refresh_validity();
        Ok(())
    }

    /// Select every selectable row, or clear the selection
    pub fn select_all(&mut self, selected: bool) -> Result<(), WizardError> {
        self.require_selection_step()?;

        self.session.selected = if selected {
            self.session
                .rows
                .iter()
                .filter(|r| r.is_selectable())
                .map(|r| r.index)
                .collect()
        } else {
            Default::default()
        };
        self.refresh_validity();
        Ok(())
    }

    fn resolve_links(
        &self,
        relation: RelationType,
        ids: &[u64],
    ) -> Result<Vec<LinkedTextRef>, WizardError> {
        self.require_step(WizardStep::Link)?;
        if !self.profile().link_relations().any(|r| r == relation) {
            return Err(WizardError::InvalidOperation(format!(
                "{} links are not used by {:?} imports",
                relation.label(),
                self.session.kind
            )));
        }

        ids.iter()
            .map(|id| {
                self.session
                    .catalog
                    .resolve(relation, *id)
                    .cloned()
                    .ok_or_else(|| {
                        WizardError::InvalidOperation(format!(
                            "Unknown {} {}",
                            relation.label(),
                            id
                        ))
                    })
            })
            .collect()
    }

    /// Replace one row's links of one relation type
    pub fn assign_links(
        &mut self,
        row: usize,
        relation: RelationType,
        ids: &[u64],
    ) -> Result<(), WizardError> {
        let refs = self.resolve_links(relation, ids)?;
        if !self.session.selected.contains(&row) {
            return Err(WizardError::InvalidOperation(format!("Row {} is not selected", row)));
        }

        self.session.links.assign(row, relation, refs);
        tracing::debug!(session_id = %self.id(), row, relation = relation.label(), "Row links assigned");
        self.refresh_validity();
        Ok(())
    }

    /// Apply the same links of one relation type to every selected row
    pub fn bulk_assign_links(
        &mut self,
        relation: RelationType,
        ids: &[u64],
    ) -> Result<usize, WizardError> {
        let refs = self.resolve_links(relation, ids)?;
        let rows: Vec<usize> = self.session.selected.iter().copied().collect();

        let count = self.session.links.bulk_assign(rows, relation, &refs);
        tracing::info!(
            session_id = %self.id(),
            relation = relation.label(),
            rows = count,
            links = refs.len(),
            "Links applied to all selected rows"
        );
        self.refresh_validity();
        Ok(count)
    }

    /// Run a structure editing command on one board
    pub fn apply_structure(
        &mut self,
        command: &StructureCommand,
    ) -> Result<CommandOutcome, WizardError> {
        self.require_step(WizardStep::Structure)?;

        let index = command.board();
        let catalog = &self.session.catalog;
        let board = match self.session.kind {
            ImportKind::ImportComplet => self
                .session
                .drafts
                .get_mut(index)
                .map(|draft| &mut draft.board),
            _ if index == 0 => self.session.board.as_mut(),
            _ => None,
        };
        let board = board.ok_or(StructureError::UnknownBoard(index))?;

        let outcome = board.apply(command, |id| {
            catalog.resolve(RelationType::Article, id).cloned()
        })?;
        self.refresh_validity();
        Ok(outcome)
    }

    /// Move forward, running the effects of the entered step
    ///
    /// Building the structure happens before the move and aborts it on
    /// failure; the export checkpoint runs after it and never blocks it.
    pub async fn next(&mut self) -> Result<WizardState, WizardError> {
        let profile = self.profile();
        let valid = self
            .session
            .current_step()
            .map_or(false, |step| step_is_valid(&self.session, step));
        let t = transition(profile, self.session.state, WizardAction::Next, valid)?;

        let mut checkpoint = false;
        for effect in t.effects {
            match effect {
                StepEffect::PrepopulateLinks => self.prepopulate_links(),
                StepEffect::BuildStructure => {
                    if let Err(e) = self.build_structure().await {
                        tracing::warn!(session_id = %self.id(), error = %e, "Structure could not be built");
                        self.session.banner = Some(e.to_string());
                        self.refresh_validity();
                        return Err(e);
                    }
                }
                StepEffect::CheckpointExport => checkpoint = true,
            }
        }

        self.session.state = t.to;
        self.session.banner = None;
        tracing::info!(session_id = %self.id(), from = ?t.from, to = ?t.to, "Wizard step changed");

        if checkpoint {
            self.checkpoint().await;
        }
        self.refresh_validity();
        Ok(self.session.state)
    }

    pub fn previous(&mut self) -> Result<WizardState, WizardError> {
        let t = transition(
            self.profile(),
            self.session.state,
            WizardAction::Previous,
            true,
        )?;
        self.session.state = t.to;
        tracing::info!(session_id = %self.id(), from = ?t.from, to = ?t.to, "Wizard step changed");
        self.refresh_validity();
        Ok(self.session.state)
    }

    fn prepopulate_links(&mut self) {
        let profile = self.profile();
        let session = &mut self.session;
        let selected = &session.selected;
        let filled = session.links.prepopulate(
            profile,
            session.rows.iter().filter(|r| selected.contains(&r.index)),
            &session.catalog,
        );
        tracing::debug!(session_id = %session.session_id, filled, "Links pre-populated from file");
    }

    async fn build_structure(&mut self) -> Result<(), WizardError> {
        let profile = self.profile();

        if profile.kind == ImportKind::ImportComplet {
            if self.session.drafts.is_empty() {
                let mut drafts = build_from_rows(self.session.selected_rows());
                let lookups = drafts
                    .iter()
                    .map(|d| self.matcher.find_existing_legislation(&d.title));
                let results = join_all(lookups).await;

                for (draft, result) in drafts.iter_mut().zip(results) {
                    draft.existing_id = result.unwrap_or_else(|e| {
                        tracing::warn!(legislation = %draft.title, error = %e, "Legislation lookup failed, treating as new");
                        None
                    });
                }
                self.session.drafts = drafts;
            }
            return Ok(());
        }

        let legislation_id = self
            .session
            .legislation
            .as_ref()
            .map(|l| l.id)
            .ok_or_else(|| WizardError::InvalidOperation("No target legislation".to_string()))?;

        if self.session.board.is_none() {
            let structure = self.repo.fetch_structure(legislation_id).await?;
            self.session.board = Some(StructureBoard::with_structure(build_from_remote(&structure)));
        }

        let nodes = row_nodes(profile, self.session.selected_rows());
        if let Some(board) = self.session.board.as_mut() {
            board.sync_rows(nodes);
        }
        Ok(())
    }

    fn outgoing_file_name(&self) -> String {
        let base = self
            .session
            .history_file_name
            .clone()
            .unwrap_or_else(|| format!("import-{}.csv", self.session.kind.slug()));
        match base.strip_suffix(".csv") {
            Some(stem) => format!("{}-sortant.csv", stem),
            None => format!("{}-sortant", base),
        }
    }

    async fn checkpoint(&mut self) {
        let export = match self.export() {
            Ok(export) => export,
            Err(e) => {
                tracing::warn!(session_id = %self.id(), error = %e, "Export snapshot failed");
                return;
            }
        };
        let name = self.outgoing_file_name();
        if let Err(e) = self
            .audit
            .checkpoint(self.session.import_history_id, &name, &export)
            .await
        {
            tracing::warn!(session_id = %self.id(), error = %e, "Audit checkpoint failed");
        }
    }

    /// Current state as CSV, in the column schema of the import kind
    pub fn export(&self) -> Result<String, WizardError> {
        let session = &self.session;
        let pending_drafts;
        let drafts = if session.kind == ImportKind::ImportComplet && session.drafts.is_empty() {
            pending_drafts = build_from_rows(session.selected_rows());
            &pending_drafts
        } else {
            &session.drafts
        };

        let snapshot = ExportSnapshot {
            profile: self.profile(),
            rows: &session.rows,
            selected: &session.selected,
            legislation: session.legislation.as_ref(),
            links: &session.links,
            board: session.board.as_ref(),
            drafts,
        };
        Ok(export_csv(&snapshot)?)
    }

    fn endpoint(&self) -> ImportEndpoint {
        let profile = self.profile();
        let drafts = &self.session.drafts;
        if profile.kind == ImportKind::ImportComplet
            && !drafts.is_empty()
            && drafts.iter().all(|d| d.existing_id.is_some())
        {
            ImportEndpoint::CompletEdit
        } else {
            profile.endpoint
        }
    }

    /// Upload the export, post it to the import endpoint and close the audit record
    ///
    /// On failure the wizard stays on Confirm and the audit record is marked
    /// as failed; confirming again retries.
    pub async fn confirm(&mut self) -> Result<(), WizardError> {
        self.require_step(WizardStep::Confirm)?;
        let session_id = self.id();

        if !self.auth.is_authenticated() {
            tracing::error!(session_id = %session_id, "Import submission without CMS token");
            self.session.banner = Some(AUTH_REQUIRED_MESSAGE.to_string());
            return Err(WizardError::Submission(AUTH_REQUIRED_MESSAGE.to_string()));
        }

        let export = self.export()?;
        let name = self.outgoing_file_name();
        let file = MediaFile::csv(name.clone(), export);
        let history_id = self.session.import_history_id;

        let media_id = match self.repo.upload_media(&file, &name, &self.auth).await {
            Ok(id) => id,
            Err(e) => return Err(self.submission_failed(format!("upload failed: {}", e)).await),
        };
        if let Err(e) = self.audit.attach_outgoing(history_id, media_id).await {
            tracing::warn!(session_id = %session_id, error = %e, "Outgoing file not recorded");
        }

        let endpoint = self.endpoint();
        if let Err(e) = self.repo.submit_import(endpoint, &file, &self.auth).await {
            return Err(self.submission_failed(e.to_string()).await);
        }

        for status in [HistoryStatus::DemandeEnvoye, HistoryStatus::EnCours] {
            if let Err(e) = self.audit.set_status(history_id, status).await {
                tracing::warn!(session_id = %session_id, status = status.as_str(), error = %e, "Audit status update failed");
            }
        }

        self.session.state = WizardState::Completed;
        self.session.completed_at = Some(Utc::now());
        self.session.banner = None;
        self.refresh_validity();

        tracing::info!(
            session_id = %session_id,
            endpoint = endpoint.path(),
            rows = self.session.selected.len(),
            "Import submitted"
        );
        Ok(())
    }

    async fn submission_failed(&mut self, message: String) -> WizardError {
        tracing::error!(session_id = %self.id(), error = %message, "Import submission failed");
        if let Err(e) = self
            .audit
            .set_status(self.session.import_history_id, HistoryStatus::Echec)
            .await
        {
            tracing::warn!(session_id = %self.id(), error = %e, "Audit status update failed");
        }
        self.session.banner = Some(message.clone());
        WizardError::Submission(message)
    }
}
