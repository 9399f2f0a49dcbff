//! Import profiles
//!
//! Every import kind runs through the same wizard engine; the differences
//! (required columns, step list, link columns, export schema, endpoint) are
//! captured here as static configuration.

use serde::{Deserialize, Serialize};

use crate::cms::ContentType;
use crate::models::RelationType;

/// Kind of spreadsheet import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Article,
    Commentaire,
    Decision,
    Legislation,
    /// Combined legislation + hierarchy + articles from one flat file
    ImportComplet,
}

impl ImportKind {
    pub fn profile(self) -> &'static ImportProfile {
        match self {
            ImportKind::Article => &ARTICLE_PROFILE,
            ImportKind::Commentaire => &COMMENTAIRE_PROFILE,
            ImportKind::Decision => &DECISION_PROFILE,
            ImportKind::Legislation => &LEGISLATION_PROFILE,
            ImportKind::ImportComplet => &IMPORT_COMPLET_PROFILE,
        }
    }

    /// `type_import` value of the audit record
    pub fn audit_label(self) -> &'static str {
        match self {
            ImportKind::Article => "Article",
            ImportKind::Commentaire => "Commentaire",
            ImportKind::Decision => "Decision",
            ImportKind::Legislation => "Legislation",
            ImportKind::ImportComplet => "Import_Complet",
        }
    }

    /// Lowercase identifier used in generated file names
    pub fn slug(self) -> &'static str {
        match self {
            ImportKind::Article => "article",
            ImportKind::Commentaire => "commentaire",
            ImportKind::Decision => "decision",
            ImportKind::Legislation => "legislation",
            ImportKind::ImportComplet => "import-complet",
        }
    }
}

/// Wizard stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Load,
    Preview,
    Link,
    Structure,
    Confirm,
}

/// Side effect run when a step is entered moving forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepEffect {
    /// Fill per-row links from the ID columns of the file
    PrepopulateLinks,
    /// Build (or resynchronise) the legislation structure
    BuildStructure,
    /// Upload the current export as the audit record's outgoing file
    CheckpointExport,
}

/// A step and the effects declared for entering it
#[derive(Debug, Clone, Copy)]
pub struct StepSpec {
    pub step: WizardStep,
    pub on_enter: &'static [StepEffect],
}

/// Bulk-import ingestion endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportEndpoint {
    Articles,
    Commentaires,
    Decisions,
    Legislations,
    Complet,
    /// Combined import replacing legislations that already exist
    CompletEdit,
}

impl ImportEndpoint {
    /// Route relative to the import namespace
    pub fn path(&self) -> &'static str {
        match self {
            ImportEndpoint::Articles => "import/articles",
            ImportEndpoint::Commentaires => "import/commentaires",
            ImportEndpoint::Decisions => "import/decisions",
            ImportEndpoint::Legislations => "import/legislations",
            ImportEndpoint::Complet => "import/complet",
            ImportEndpoint::CompletEdit => "import/complet/edit",
        }
    }
}

/// Static configuration of one import kind
#[derive(Debug)]
pub struct ImportProfile {
    pub kind: ImportKind,
    /// Collection the imported rows end up in
    pub content_type: ContentType,
    /// Columns that must be present in the first row
    pub required_columns: &'static [&'static str],
    pub title_column: &'static str,
    /// Row column holding the entry date, if the kind carries one
    pub date_column: Option<&'static str>,
    /// Matching field on the remote record
    pub remote_date_field: Option<&'static str>,
    /// Optional ID-list columns pre-populating links
    pub link_columns: &'static [(RelationType, &'static str)],
    /// Relation types fetched into the candidate catalog when the wizard starts
    pub catalog_relations: &'static [RelationType],
    pub steps: &'static [StepSpec],
    /// A target legislation must be chosen before leaving Load
    pub requires_legislation: bool,
    /// Rows are classified against existing records
    pub row_matching: bool,
    pub export_columns: &'static [&'static str],
    /// Export uses CRLF line endings
    pub crlf: bool,
    pub endpoint: ImportEndpoint,
}

impl ImportProfile {
    pub fn step_list(&self) -> Vec<WizardStep> {
        self.steps.iter().map(|s| s.step).collect()
    }

    pub fn first_step(&self) -> WizardStep {
        self.steps.first().map(|s| s.step).unwrap_or(WizardStep::Load)
    }

    pub fn step_index(&self, step: WizardStep) -> Option<usize> {
        self.steps.iter().position(|s| s.step == step)
    }

    pub fn has_step(&self, step: WizardStep) -> bool {
        self.step_index(step).is_some()
    }

    /// Effects declared for entering `step`
    pub fn effects_on_enter(&self, step: WizardStep) -> &'static [StepEffect] {
        self.steps
            .iter()
            .find(|s| s.step == step)
            .map(|s| s.on_enter)
            .unwrap_or(&[])
    }

    pub fn link_relations(&self) -> impl Iterator<Item = RelationType> + '_ {
        self.link_columns.iter().map(|(r, _)| *r)
    }
}

const ON_NOTHING: &[StepEffect] = &[];
const ON_LINK: &[StepEffect] = &[StepEffect::PrepopulateLinks];
const ON_BUILD_AND_CHECKPOINT: &[StepEffect] =
    &[StepEffect::BuildStructure, StepEffect::CheckpointExport];
const ON_BUILD: &[StepEffect] = &[StepEffect::BuildStructure];
const ON_CHECKPOINT: &[StepEffect] = &[StepEffect::CheckpointExport];

static ARTICLE_PROFILE: ImportProfile = ImportProfile {
    kind: ImportKind::Article,
    content_type: ContentType::Article,
    required_columns: &["Title", "Content", "Date_entree"],
    title_column: "Title",
    date_column: Some("Date_entree"),
    remote_date_field: Some("date_entree"),
    link_columns: &[
        (RelationType::Decision, "ID_decisions"),
        (RelationType::Commentaire, "ID_commentaires"),
    ],
    catalog_relations: &[
        RelationType::Decision,
        RelationType::Commentaire,
        RelationType::Article,
    ],
    steps: &[
        StepSpec { step: WizardStep::Load, on_enter: ON_NOTHING },
        StepSpec { step: WizardStep::Preview, on_enter: ON_NOTHING },
        StepSpec { step: WizardStep::Link, on_enter: ON_LINK },
        StepSpec { step: WizardStep::Structure, on_enter: ON_BUILD_AND_CHECKPOINT },
        StepSpec { step: WizardStep::Confirm, on_enter: ON_NOTHING },
    ],
    requires_legislation: true,
    row_matching: true,
    export_columns: &[
        "Type",
        "Title",
        "Content",
        "Date_entree",
        "Legislation",
        "Position",
        "Statut",
        "ID_original",
        "ID_article_lie",
        "ID_decisions",
        "ID_commentaires",
    ],
    crlf: false,
    endpoint: ImportEndpoint::Articles,
};

static COMMENTAIRE_PROFILE: ImportProfile = ImportProfile {
    kind: ImportKind::Commentaire,
    content_type: ContentType::Commentaire,
    required_columns: &["Title", "Content"],
    title_column: "Title",
    date_column: None,
    remote_date_field: None,
    link_columns: &[
        (RelationType::Article, "ID_articles"),
        (RelationType::Decision, "ID_decisions"),
    ],
    catalog_relations: &[RelationType::Article, RelationType::Decision],
    steps: &[
        StepSpec { step: WizardStep::Load, on_enter: ON_NOTHING },
        StepSpec { step: WizardStep::Preview, on_enter: ON_NOTHING },
        StepSpec { step: WizardStep::Link, on_enter: ON_LINK },
        StepSpec { step: WizardStep::Confirm, on_enter: ON_CHECKPOINT },
    ],
    requires_legislation: true,
    row_matching: true,
    export_columns: &[
        "Title",
        "Content",
        "Legislation",
        "Statut",
        "ID_original",
        "ID_articles",
        "ID_decisions",
    ],
    crlf: false,
    endpoint: ImportEndpoint::Commentaires,
};

static DECISION_PROFILE: ImportProfile = ImportProfile {
    kind: ImportKind::Decision,
    content_type: ContentType::Decision,
    required_columns: &["Title", "Content"],
    title_column: "Title",
    date_column: Some("Date_decision"),
    remote_date_field: Some("date_decision"),
    link_columns: &[
        (RelationType::Article, "ID_articles"),
        (RelationType::Commentaire, "ID_commentaires"),
    ],
    catalog_relations: &[RelationType::Article, RelationType::Commentaire],
    steps: &[
        StepSpec { step: WizardStep::Load, on_enter: ON_NOTHING },
        StepSpec { step: WizardStep::Preview, on_enter: ON_NOTHING },
        StepSpec { step: WizardStep::Link, on_enter: ON_LINK },
        StepSpec { step: WizardStep::Confirm, on_enter: ON_CHECKPOINT },
    ],
    requires_legislation: false,
    row_matching: true,
    export_columns: &[
        "Title",
        "Content",
        "Date_decision",
        "Statut",
        "ID_original",
        "ID_articles",
        "ID_commentaires",
    ],
    crlf: false,
    endpoint: ImportEndpoint::Decisions,
};

static LEGISLATION_PROFILE: ImportProfile = ImportProfile {
    kind: ImportKind::Legislation,
    content_type: ContentType::Legislation,
    required_columns: &["Title", "Date_entree"],
    title_column: "Title",
    date_column: Some("Date_entree"),
    remote_date_field: Some("date_entree"),
    link_columns: &[],
    catalog_relations: &[],
    steps: &[
        StepSpec { step: WizardStep::Load, on_enter: ON_NOTHING },
        StepSpec { step: WizardStep::Preview, on_enter: ON_NOTHING },
        StepSpec { step: WizardStep::Confirm, on_enter: ON_CHECKPOINT },
    ],
    requires_legislation: false,
    row_matching: true,
    export_columns: &["Title", "Date_entree", "Statut", "ID_original"],
    crlf: false,
    endpoint: ImportEndpoint::Legislations,
};

static IMPORT_COMPLET_PROFILE: ImportProfile = ImportProfile {
    kind: ImportKind::ImportComplet,
    content_type: ContentType::Legislation,
    required_columns: &[
        "Titre_legislation",
        "Date_entree",
        "Code_visee",
        "Titre",
        "Chapitre",
        "Section",
        "Article",
        "Contenu_article",
        "Contenu_article2",
    ],
    title_column: "Titre_legislation",
    date_column: Some("Date_entree"),
    remote_date_field: Some("date_entree"),
    link_columns: &[],
    catalog_relations: &[],
    steps: &[
        StepSpec { step: WizardStep::Load, on_enter: ON_NOTHING },
        StepSpec { step: WizardStep::Structure, on_enter: ON_BUILD },
        StepSpec { step: WizardStep::Confirm, on_enter: ON_CHECKPOINT },
    ],
    requires_legislation: false,
    row_matching: false,
    export_columns: &[
        "Titre_legislation",
        "Date_entree",
        "Code_visee",
        "ID_legislation",
        "Type",
        "Contenu",
        "Position",
        "Contenu_article",
        "Contenu_article2",
    ],
    crlf: true,
    endpoint: ImportEndpoint::Complet,
};
