//! HTTP API handlers for lexi-import

pub mod health;
pub mod wizards;

pub use health::health_routes;
pub use wizards::wizard_routes;
