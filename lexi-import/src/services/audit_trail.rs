//! Import audit trail
//!
//! Each import attempt owns one `import_history` record in the CMS. It is
//! created when the first file is selected; every later update needs its id
//! and is skipped with an error log when the creation never succeeded.

use chrono::{DateTime, Local};
use lexi_common::AuthContext;
use std::sync::Arc;

use crate::cms::{CmsError, ContentRepository, ContentType, MediaFile};
use crate::models::{HistoryStatus, ImportHistoryEntry, ImportKind};

/// `import-<kind>-<YYYYMMDD-HHMMSS>.csv`
pub fn history_file_name(kind: ImportKind, at: &DateTime<Local>) -> String {
    format!("import-{}-{}.csv", kind.slug(), at.format("%Y%m%d-%H%M%S"))
}

/// Writes the audit record of one wizard
pub struct AuditTrail {
    repo: Arc<dyn ContentRepository>,
    auth: AuthContext,
    kind: ImportKind,
}

impl AuditTrail {
    pub fn new(repo: Arc<dyn ContentRepository>, auth: AuthContext, kind: ImportKind) -> Self {
        Self { repo, auth, kind }
    }

    /// Upload the incoming file and create (or refresh) the audit record
    ///
    /// With an existing record only `fichier_entrant` is replaced. Returns the
    /// record id and the generated file name.
    pub async fn open(
        &self,
        existing: Option<u64>,
        content: &str,
    ) -> Result<(u64, String), CmsError> {
        let now = Local::now();
        let file_name = history_file_name(self.kind, &now);
        let media = MediaFile::csv(file_name.clone(), content);
        let media_id = self.repo.upload_media(&media, &file_name, &self.auth).await?;

        if let Some(id) = existing {
            let payload = ImportHistoryEntry::file_payload("fichier_entrant", media_id);
            self.repo
                .update_record(ContentType::ImportHistory, id, &payload, &self.auth)
                .await?;
            tracing::info!(history_id = id, media_id, "Audit record incoming file replaced");
            return Ok((id, file_name));
        }

        let entry = ImportHistoryEntry {
            title: file_name.clone(),
            type_import: self.kind.audit_label().to_string(),
            date: now.format("%Y%m%d").to_string(),
            statut: HistoryStatus::Brouillon,
            fichier_entrant: Some(media_id),
            fichier_sortant: None,
            auteur: self.auth.user_id,
        };
        let id = self
            .repo
            .create_record(ContentType::ImportHistory, &entry.to_create_payload(), &self.auth)
            .await?;

        tracing::info!(history_id = id, file = %file_name, "Audit record created");
        Ok((id, file_name))
    }

    /// Upload an export snapshot as the outgoing file
    pub async fn checkpoint(
        &self,
        history_id: Option<u64>,
        file_name: &str,
        export: &str,
    ) -> Result<(), CmsError> {
        let Some(id) = history_id else {
            tracing::error!(kind = ?self.kind, "Audit checkpoint skipped: audit record was never created");
            return Ok(());
        };

        let media = MediaFile::csv(file_name, export);
        let media_id = self.repo.upload_media(&media, file_name, &self.auth).await?;
        self.attach_outgoing(Some(id), media_id).await
    }

    /// Point `fichier_sortant` at an already uploaded media item
    pub async fn attach_outgoing(
        &self,
        history_id: Option<u64>,
        media_id: u64,
    ) -> Result<(), CmsError> {
        let Some(id) = history_id else {
            tracing::error!(kind = ?self.kind, "Outgoing file not recorded: audit record was never created");
            return Ok(());
        };

        let payload = ImportHistoryEntry::file_payload("fichier_sortant", media_id);
        self.repo
            .update_record(ContentType::ImportHistory, id, &payload, &self.auth)
            .await?;
        tracing::debug!(history_id = id, media_id, "Audit record outgoing file attached");
        Ok(())
    }

    pub async fn set_status(
        &self,
        history_id: Option<u64>,
        status: HistoryStatus,
    ) -> Result<(), CmsError> {
        let Some(id) = history_id else {
            tracing::error!(
                kind = ?self.kind,
                status = status.as_str(),
                "Audit status not recorded: audit record was never created"
            );
            return Ok(());
        };

        self.repo
            .update_record(
                ContentType::ImportHistory,
                id,
                &ImportHistoryEntry::status_payload(status),
                &self.auth,
            )
            .await?;
        tracing::info!(history_id = id, status = status.as_str(), "Audit record status updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::MemoryRepository;
    use chrono::TimeZone;

    fn authed() -> AuthContext {
        AuthContext::new(Some("token".to_string()), Some(3))
    }

    #[test]
    fn test_history_file_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            history_file_name(ImportKind::ImportComplet, &at),
            "import-import-complet-20240309-140507.csv"
        );
    }

    #[tokio::test]
    async fn test_open_creates_draft_record() {
        let repo = Arc::new(MemoryRepository::new());
        let audit = AuditTrail::new(repo.clone(), authed(), ImportKind::Article);

        let (id, file_name) = audit.open(None, "Title\nA\n").await.unwrap();
        let record = repo.record(ContentType::ImportHistory, id).unwrap();

        assert_eq!(record.title, file_name);
        assert_eq!(record.field_str("statut").as_deref(), Some("Brouillon"));
        assert_eq!(record.field_str("type_import").as_deref(), Some("Article"));
        assert_eq!(record.field_ids("auteur"), vec![3]);
        assert_eq!(record.field_ids("fichier_entrant"), vec![repo.media()[0].id]);
    }

    #[tokio::test]
    async fn test_reopen_replaces_incoming_file() {
        let repo = Arc::new(MemoryRepository::new());
        let audit = AuditTrail::new(repo.clone(), authed(), ImportKind::Article);

        let (id, _) = audit.open(None, "first").await.unwrap();
        let (again, _) = audit.open(Some(id), "second").await.unwrap();

        assert_eq!(id, again);
        assert_eq!(repo.records(ContentType::ImportHistory).len(), 1);
        let record = repo.record(ContentType::ImportHistory, id).unwrap();
        assert_eq!(record.field_ids("fichier_entrant"), vec![repo.media()[1].id]);
    }

    #[tokio::test]
    async fn test_updates_without_record_make_no_remote_call() {
        let repo = Arc::new(MemoryRepository::new());
        let audit = AuditTrail::new(repo.clone(), authed(), ImportKind::Commentaire);

        audit.checkpoint(None, "out.csv", "x").await.unwrap();
        audit.set_status(None, HistoryStatus::EnCours).await.unwrap();

        assert!(repo.media().is_empty());
        assert!(repo.updates().is_empty());
    }

    #[tokio::test]
    async fn test_checkpoint_attaches_outgoing_file() {
        let repo = Arc::new(MemoryRepository::new());
        let audit = AuditTrail::new(repo.clone(), authed(), ImportKind::Commentaire);

        let (id, _) = audit.open(None, "in").await.unwrap();
        audit.checkpoint(Some(id), "out.csv", "out").await.unwrap();

        let record = repo.record(ContentType::ImportHistory, id).unwrap();
        assert_eq!(record.field_ids("fichier_sortant"), vec![repo.media()[1].id]);
        assert_eq!(record.field_str("statut").as_deref(), Some("Brouillon"));
    }
}
