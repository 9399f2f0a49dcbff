//! # Lexi Common Library
//!
//! Shared code for the Lexi import tooling:
//! - Error type shared across crates
//! - Configuration loading (CLI → ENV → TOML → compiled defaults)
//! - Explicit authentication context for CMS calls
//! - Logging initialisation

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;

pub use auth::AuthContext;
pub use error::{Error, Result};
