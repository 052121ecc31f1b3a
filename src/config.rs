use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::state::phases::{default_phases, WorkflowPhase};

/// Application configuration, persisted as config.toml.
///
/// Loaded once at startup and handed to the components that need it;
/// never mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub export: ExportConfig,
    pub signature: SignatureConfig,
    pub phases: Vec<WorkflowPhase>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            export: ExportConfig::default(),
            signature: SignatureConfig::default(),
            phases: default_phases(),
        }
    }
}

impl AppConfig {
    /// Default config file location, e.g. ~/.config/photo-signoff/config.toml
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("photo-signoff");
        path.push("config.toml");
        Some(path)
    }

    /// Loads config from a TOML file. Returns default config if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Returns a list of problems; empty when the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.store.backend == StoreBackend::Rest {
            if self.store.rest_url.trim().is_empty() {
                errors.push("store.rest_url is required for the rest backend".to_string());
            }
            if self.store.api_key.trim().is_empty() {
                errors.push("store.api_key is required for the rest backend".to_string());
            }
        }
        if self.export.request_timeout_secs == 0 {
            errors.push("export.request_timeout_secs must be at least 1".to_string());
        }
        if !(self.signature.width > 0.0 && self.signature.height > 0.0) {
            errors.push("signature.width and signature.height must be positive".to_string());
        }
        if !(self.signature.stroke_width > 0.0) {
            errors.push("signature.stroke_width must be positive".to_string());
        }
        if self.phases.is_empty() {
            errors.push("at least one workflow phase is required".to_string());
        }

        errors
    }

    /// Returns a copy with invalid numeric values and an empty phase table
    /// replaced by defaults. Store settings are left as they are.
    pub fn with_defaults_for_invalid(&self) -> Self {
        let defaults = Self::default();
        let mut fixed = self.clone();

        if fixed.export.request_timeout_secs == 0 {
            fixed.export.request_timeout_secs = defaults.export.request_timeout_secs;
        }
        if !(fixed.signature.width > 0.0 && fixed.signature.height > 0.0) {
            fixed.signature.width = defaults.signature.width;
            fixed.signature.height = defaults.signature.height;
        }
        if !(fixed.signature.stroke_width > 0.0) {
            fixed.signature.stroke_width = defaults.signature.stroke_width;
        }
        if fixed.phases.is_empty() {
            fixed.phases = defaults.phases;
        }

        fixed
    }
}

/// Which share store to talk to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Rest,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Base URL of the hosted project, e.g. https://xyz.supabase.co
    pub rest_url: String,
    pub api_key: String,
    pub table: String,
    /// Overrides the SQLite file location
    pub sqlite_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            rest_url: String::new(),
            api_key: String::new(),
            table: "photo_shares".to_string(),
            sqlite_path: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub request_timeout_secs: u64,
    /// Directory the save dialog opens in
    pub download_dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            download_dir: None,
        }
    }
}

impl ExportConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn download_dir(&self) -> Option<PathBuf> {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .or_else(dirs::home_dir)
    }
}

/// Logical size of the signature surface and pen width
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    pub width: f32,
    pub height: f32,
    pub stroke_width: f32,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            width: 560.0,
            height: 200.0,
            stroke_width: 2.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.phases, default_phases());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[store]
backend = "rest"
rest_url = "https://project.supabase.co"
api_key = "anon"

[[phases]]
id = "first-fix"
label = "First Fix"
photo_types = ["first_fix"]
"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Rest);
        assert_eq!(config.store.table, "photo_shares");
        assert_eq!(config.export.request_timeout_secs, 30);
        assert_eq!(config.phases.len(), 1);
        assert_eq!(config.phases[0].photo_types, vec!["first_fix"]);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_invalid_values_are_reported_and_repaired() {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Rest;
        config.export.request_timeout_secs = 0;
        config.signature.stroke_width = -1.0;
        config.phases.clear();

        assert_eq!(config.validate().len(), 5);

        let fixed = config.with_defaults_for_invalid();
        assert_eq!(fixed.export.request_timeout_secs, 30);
        assert_eq!(fixed.signature.stroke_width, 2.5);
        assert_eq!(fixed.phases, default_phases());
        // Missing rest credentials cannot be defaulted
        assert_eq!(fixed.validate().len(), 2);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "store = 3").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse(_))));
    }
}
