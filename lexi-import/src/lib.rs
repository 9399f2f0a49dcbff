//! lexi-import library interface
//!
//! CSV import pipeline for legal content (articles, commentaires,
//! décisions, legislations) and the HTTP service driving its wizards.

pub mod api;
pub mod cms;
pub mod error;
pub mod models;
pub mod services;
pub mod wizard;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use lexi_common::AuthContext;
use std::sync::Arc;

use crate::cms::ContentRepository;
pub use crate::wizard::WizardRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Content repository all wizards talk to
    pub repo: Arc<dyn ContentRepository>,
    pub wizards: WizardRegistry,
    /// Credentials used when a request carries none
    pub default_auth: AuthContext,
    /// Page size for CMS listings
    pub page_size: u32,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(repo: Arc<dyn ContentRepository>, default_auth: AuthContext, page_size: u32) -> Self {
        Self {
            repo,
            wizards: WizardRegistry::new(),
            default_auth,
            page_size,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::wizard_routes())
        .merge(api::health_routes())
        .with_state(state)
}
