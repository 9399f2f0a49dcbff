//! Import audit-trail entries (stored in the CMS `import_history` collection)

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Lifecycle of an import attempt as recorded in the CMS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryStatus {
    #[serde(rename = "Brouillon")]
    Brouillon,
    #[serde(rename = "En-cours")]
    EnCours,
    #[serde(rename = "Demande-envoyé")]
    DemandeEnvoye,
    #[serde(rename = "Terminé")]
    Termine,
    #[serde(rename = "Echec")]
    Echec,
}

impl HistoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryStatus::Brouillon => "Brouillon",
            HistoryStatus::EnCours => "En-cours",
            HistoryStatus::DemandeEnvoye => "Demande-envoyé",
            HistoryStatus::Termine => "Terminé",
            HistoryStatus::Echec => "Echec",
        }
    }
}

/// One audit row per import attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportHistoryEntry {
    /// Generated file name
    pub title: String,
    /// Article / Commentaire / Decision / Legislation / Import_Complet
    pub type_import: String,
    /// YYYYMMDD
    pub date: String,
    pub statut: HistoryStatus,
    pub fichier_entrant: Option<u64>,
    pub fichier_sortant: Option<u64>,
    pub auteur: Option<u64>,
}

impl ImportHistoryEntry {
    /// Payload for `createRecord(import_history, ...)`
    pub fn to_create_payload(&self) -> Value {
        let mut acf = Map::new();
        acf.insert("type_import".into(), json!(self.type_import));
        acf.insert("date".into(), json!(self.date));
        acf.insert("statut".into(), json!(self.statut.as_str()));
        if let Some(id) = self.fichier_entrant {
            acf.insert("fichier_entrant".into(), json!(id));
        }
        if let Some(id) = self.fichier_sortant {
            acf.insert("fichier_sortant".into(), json!(id));
        }
        if let Some(id) = self.auteur {
            acf.insert("auteur".into(), json!(id));
        }

        json!({
            "title": self.title,
            "status": "publish",
            "acf": Value::Object(acf),
        })
    }

    /// Partial update payload setting only the status
    pub fn status_payload(status: HistoryStatus) -> Value {
        json!({ "acf": { "statut": status.as_str() } })
    }

    /// Partial update payload attaching a media id to one of the file fields
    pub fn file_payload(field: &str, media_id: u64) -> Value {
        let mut acf = Map::new();
        acf.insert(field.to_string(), json!(media_id));
        json!({ "acf": Value::Object(acf) })
    }
}
