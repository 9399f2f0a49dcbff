//! Parameterised import wizard
//!
//! One engine drives every import kind. The kind's [`ImportProfile`] supplies
//! the step list, the effects run when a step is entered and the columns and
//! endpoints; navigation is an explicit state plus a pure transition function.
//!
//! [`ImportProfile`]: crate::models::ImportProfile

pub mod engine;
pub mod registry;
pub mod session;
pub mod transitions;

pub use engine::{ImportWizard, AUTH_REQUIRED_MESSAGE};
pub use registry::WizardRegistry;
pub use session::WizardSession;
pub use transitions::{
    step_is_valid, transition, NavigationError, StateTransition, WizardAction, WizardState,
};

use thiserror::Error;

use crate::cms::CmsError;
use crate::services::{ExportError, ParseError, StructureError};

/// Wizard operation failure
///
/// None of these end the session; the user can correct the input, navigate
/// back or retry.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error("Remote error: {0}")]
    Remote(#[from] CmsError),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error(transparent)]
    Export(#[from] ExportError),
}
