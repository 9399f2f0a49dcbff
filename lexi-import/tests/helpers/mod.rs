//! Test helper utilities
//!
//! Seeded in-memory CMS and sample import files shared by the integration
//! suites.

#![allow(dead_code)]

use lexi_common::AuthContext;
use lexi_import::cms::{
    CmsRecord, ContentRepository, ContentType, MemoryRepository, RemoteNode, RemoteStructure,
};
use lexi_import::models::NodeType;
use serde_json::json;
use std::sync::Arc;

pub const CODE_CIVIL: u64 = 7;
pub const LOI_PRESSE: u64 = 8;

/// Three articles: one already imported, one with a different entry date, one new
pub const ARTICLE_CSV: &str = "\u{feff}Title,Content,Date_entree,ID_decisions,ID_commentaires\n\
Article 5,Texte de l'article 5,01/01/2020,,\n\
Article 6,\"Texte, modifié\",01/01/2020,,\n\
Article 7,Texte de l'article 7,15/03/2021,100;101|999,200\n";

pub const COMMENTAIRE_CSV: &str = "Title,Content,ID_articles,ID_decisions\n\
Commentaire sur l'article 5,Analyse,41,100\n\
Commentaire général,Vue d'ensemble,,\n";

pub const LEGISLATION_CSV: &str = "Title,Date_entree\n\
Loi sur le numérique,01/06/2024\n";

pub const COMPLET_CSV: &str = "Titre_legislation,Date_entree,Code_visee,Titre,Chapitre,Section,Article,Contenu_article,Contenu_article2\n\
Code civil,01/01/1804,CC,Titre I,Chapitre I,,Article 1,Les lois sont exécutoires,\n\
Code civil,01/01/1804,CC,Titre I,Chapitre I,,Article 2,La loi ne dispose que pour l'avenir,\n\
Code civil,01/01/1804,CC,Titre II,Chapitre I,,Article 3,Les lois de police,Second alinéa\n\
Loi nouvelle,01/01/2024,LN,Titre unique,,,Article 1,Objet de la loi,\n";

pub fn authed() -> AuthContext {
    AuthContext::new(Some("test-token".to_string()), Some(3))
}

pub fn as_repo(repo: &Arc<MemoryRepository>) -> Arc<dyn ContentRepository> {
    repo.clone()
}

/// CMS with two legislations, articles, decisions, commentaires and the
/// structure of the Code civil
pub fn seeded_repo() -> Arc<MemoryRepository> {
    let repo = MemoryRepository::new();

    repo.insert(
        ContentType::Legislation,
        CmsRecord::new(LOI_PRESSE, "Loi sur la presse").with_field("date_entree", json!("18810729")),
    );

    repo.insert(
        ContentType::Article,
        CmsRecord::new(41, "Article 5")
            .with_field("date_entree", json!("20200101"))
            .with_field("legislation", json!([CODE_CIVIL])),
    );
    repo.insert(
        ContentType::Article,
        CmsRecord::new(42, "Article 6")
            .with_field("date_entree", json!("20190101"))
            .with_field("legislation", json!([CODE_CIVIL])),
    );

    for (id, title) in [(100, "Décision 100"), (101, "Décision 101"), (102, "Décision 102")] {
        repo.insert(ContentType::Decision, CmsRecord::new(id, title));
    }
    for (id, title) in [(200, "Commentaire 200"), (201, "Commentaire 201")] {
        repo.insert(ContentType::Commentaire, CmsRecord::new(id, title));
    }

    repo.insert_structure(RemoteStructure {
        legislation: CmsRecord::new(CODE_CIVIL, "Code civil")
            .with_field("date_entree", json!("18040321")),
        nodes: vec![
            RemoteNode { id: 10, node_type: NodeType::Title, title: "Titre I".to_string(), position: Some(1) },
            RemoteNode { id: 11, node_type: NodeType::Chapter, title: "Chapitre I".to_string(), position: Some(2) },
            RemoteNode { id: 41, node_type: NodeType::Article, title: "Article 5".to_string(), position: Some(3) },
        ],
    });

    Arc::new(repo)
}
