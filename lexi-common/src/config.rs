//! Configuration loading
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and defaults are
//! used. A TOML file that exists but does not parse is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// ENV: explicit config file path
pub const CONFIG_PATH_ENV: &str = "LEXI_CONFIG";
/// ENV: HTTP bind address
pub const BIND_ENV: &str = "LEXI_BIND";
/// ENV: CMS base URL
pub const CMS_URL_ENV: &str = "LEXI_CMS_URL";

const CONFIG_FILE_NAME: &str = "lexi-import.toml";

/// Compiled fallback values
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub bind_address: String,
    pub cms_base_url: String,
    pub import_namespace: String,
    pub page_size: u32,
    pub log_level: String,
    pub wizard_idle_timeout_secs: u64,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5780".to_string(),
            cms_base_url: "http://localhost:8080".to_string(),
            import_namespace: "lexi/v1".to_string(),
            page_size: 100,
            log_level: "info".to_string(),
            wizard_idle_timeout_secs: 3600,
        }
    }
}

/// `[logging]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    CompiledDefaults::default().log_level
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `[cms]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmsTomlConfig {
    pub base_url: Option<String>,
    pub import_namespace: Option<String>,
    /// Absent means no client-side timeout
    pub request_timeout_secs: Option<u64>,
    pub page_size: Option<u32>,
}

/// `[wizards]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardsTomlConfig {
    /// Unused wizards are dropped after this many seconds
    pub idle_timeout_secs: Option<u64>,
}

/// On-disk TOML configuration (every field optional)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub bind_address: Option<String>,
    #[serde(default)]
    pub cms: CmsTomlConfig,
    #[serde(default)]
    pub wizards: WizardsTomlConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub cms_base_url: Option<String>,
}

/// Resolved CMS connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmsSettings {
    /// Site root, without trailing slash (e.g. `https://cms.example.org`)
    pub base_url: String,
    /// REST namespace of the custom import/structure routes
    pub import_namespace: String,
    pub request_timeout: Option<Duration>,
    /// Page size used for listings and catalog fetches
    pub page_size: u32,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub cms: CmsSettings,
    pub wizard_idle_timeout: Duration,
    pub log_level: String,
}

/// Resolves [`ServiceConfig`] from CLI, ENV, TOML and defaults
pub struct ConfigResolver {
    overrides: CliOverrides,
    defaults: CompiledDefaults,
}

impl ConfigResolver {
    pub fn new(overrides: CliOverrides) -> Self {
        Self {
            overrides,
            defaults: CompiledDefaults::default(),
        }
    }

    /// Locate the TOML file: CLI → `LEXI_CONFIG` → `<config_dir>/lexi/lexi-import.toml`
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.overrides.config_path {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        dirs::config_dir().map(|d| d.join("lexi").join(CONFIG_FILE_NAME))
    }

    /// Resolve the configuration
    pub fn resolve(&self) -> Result<ServiceConfig> {
        let toml_config = match self.config_path() {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                load_toml_config(&path)?
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using defaults",
                    path.display()
                );
                TomlConfig::default()
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                TomlConfig::default()
            }
        };

        Ok(self.merge(toml_config))
    }

    /// Apply priority order over an already loaded TOML config
    pub fn merge(&self, toml_config: TomlConfig) -> ServiceConfig {
        let bind_address = pick(
            self.overrides.bind_address.clone(),
            BIND_ENV,
            toml_config.bind_address,
            &self.defaults.bind_address,
        );
        let base_url = pick(
            self.overrides.cms_base_url.clone(),
            CMS_URL_ENV,
            toml_config.cms.base_url,
            &self.defaults.cms_base_url,
        );

        ServiceConfig {
            bind_address,
            cms: CmsSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                import_namespace: toml_config
                    .cms
                    .import_namespace
                    .map(|ns| ns.trim_matches('/').to_string())
                    .unwrap_or_else(|| self.defaults.import_namespace.clone()),
                request_timeout: toml_config
                    .cms
                    .request_timeout_secs
                    .map(Duration::from_secs),
                page_size: toml_config
                    .cms
                    .page_size
                    .filter(|n| *n > 0)
                    .unwrap_or(self.defaults.page_size),
            },
            wizard_idle_timeout: Duration::from_secs(
                toml_config
                    .wizards
                    .idle_timeout_secs
                    .filter(|n| *n > 0)
                    .unwrap_or(self.defaults.wizard_idle_timeout_secs),
            ),
            log_level: toml_config.logging.level,
        }
    }
}

fn pick(cli: Option<String>, env_name: &str, toml: Option<String>, default: &str) -> String {
    cli.filter(|v| !v.trim().is_empty())
        .or_else(|| std::env::var(env_name).ok().filter(|v| !v.trim().is_empty()))
        .or(toml.filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| default.to_string())
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Write a TOML config file, creating parent directories
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}
