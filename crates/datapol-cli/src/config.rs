//! TOML configuration for the `datapol` binary
//!
//! The file is located through `--config`, then `DATAPOL_CONFIG`, then
//! `datapol.toml` in the working directory. With none of these present the
//! built-in defaults apply.

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use datapol_analysis::PERMITTED_MODALS;
use datapol_ast::{Schema, Theories};
use serde::Deserialize;
use tracing::debug;

const DEFAULT_CONFIG_NAME: &str = "datapol.toml";
/// Environment variable used to override the config path
pub const CONFIG_ENV_VAR: &str = "DATAPOL_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub compiler: CompilerConfig,
    pub theories: BTreeMap<String, TheoryConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Split `service:table` names into service and table
    pub use_modules: bool,
    pub permitted_modals: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            use_modules: true,
            permitted_modals: PERMITTED_MODALS.iter().map(|m| (*m).to_string()).collect(),
        }
    }
}

/// Known tables of one theory
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TheoryConfig {
    pub complete: bool,
    pub tables: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io error: {path}: {message}")]
    Io { path: String, message: String },
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Load the configuration, falling back to defaults when no file is found
    ///
    /// An explicit path or `DATAPOL_CONFIG` must name a readable file. The
    /// default file name is only read when it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the file cannot be read, parsed or validated
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match resolve_path(path) {
            Some(resolved) => Self::from_file(&resolved),
            None => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Io` when the file cannot be read, otherwise as
    /// [`Config::from_toml`]
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        debug!(path = %path.display(), "loading config");
        Self::from_toml(&content)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and
    /// `ConfigError::Invalid` for inconsistent values
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for empty modal names and duplicate
    /// column names
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .compiler
            .permitted_modals
            .iter()
            .any(|modal| modal.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "permitted_modals may not contain empty names".to_string(),
            ));
        }
        for (theory, config) in &self.theories {
            for (table, columns) in &config.tables {
                let mut seen = BTreeSet::new();
                if let Some(column) = columns.iter().find(|column| !seen.insert(column.as_str())) {
                    return Err(ConfigError::Invalid(format!(
                        "duplicate column '{column}' in {theory}:{table}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Schemas handed to the compiler and the checks
    #[must_use]
    pub fn theories(&self) -> Theories {
        self.theories
            .iter()
            .map(|(name, theory)| {
                (
                    name.clone(),
                    Schema::new(theory.tables.clone(), theory.complete),
                )
            })
            .collect()
    }
}

fn resolve_path(path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = path {
        return Some(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(env_path));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_NAME);
    default.is_file().then_some(default)
}
