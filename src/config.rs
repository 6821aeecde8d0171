//! Configuration loading for `depsaurus.toml` and the process-wide
//! [`AppConfig`].
//!
//! The application config is assembled once in `main` from CLI arguments
//! overlaying the optional file config, then passed by reference into every
//! collaborator. It is never mutated afterwards.
use derive_builder::Builder;
use log::*;
use secrecy::SecretString;
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::{
    advisor::Model,
    audit::Severity,
    error::{DepsaurusError, Result},
};

/// Default configuration filename, looked up at the repository root.
pub const DEFAULT_CONFIG_FILE: &str = "depsaurus.toml";
/// Base branch pull requests are opened against.
pub const DEFAULT_BASE_BRANCH: &str = "main";
/// Maximum number of code snippets handed to the advisor.
pub const DEFAULT_MAX_SNIPPETS: usize = 10;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PROCESS_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_NPM_REGISTRY: &str = "https://registry.npmjs.org";
pub const DEFAULT_PYPI_REGISTRY: &str = "https://pypi.org";
pub const DEFAULT_MAVEN_SEARCH: &str = "https://search.maven.org";

/// Registry base URLs queried for latest versions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// npm registry base URL
    pub npm: String,
    /// Python package index base URL
    pub pypi: String,
    /// Maven Central search base URL
    pub maven_search: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            npm: DEFAULT_NPM_REGISTRY.into(),
            pypi: DEFAULT_PYPI_REGISTRY.into(),
            maven_search: DEFAULT_MAVEN_SEARCH.into(),
        }
    }
}

/// Root structure of `depsaurus.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub base_branch: String,
    pub max_snippets: usize,
    pub http_timeout_secs: u64,
    pub process_timeout_secs: u64,
    pub registries: RegistryConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            base_branch: DEFAULT_BASE_BRANCH.into(),
            max_snippets: DEFAULT_MAX_SNIPPETS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            process_timeout_secs: DEFAULT_PROCESS_TIMEOUT_SECS,
            registries: RegistryConfig::default(),
        }
    }
}

impl FileConfig {
    /// Load `depsaurus.toml` from the repository root, falling back to
    /// defaults when the file does not exist.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let path = repo_root.join(DEFAULT_CONFIG_FILE);

        if !path.exists() {
            debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
            return Ok(Self::default());
        }

        info!("loading configuration from {}", path.display());
        let content = fs::read_to_string(&path)?;
        let config: FileConfig = toml::from_str(&content)?;

        if config.max_snippets == 0 {
            return Err(DepsaurusError::invalid_config(
                "max_snippets must be greater than zero",
            ));
        }

        Ok(config)
    }
}

/// Credentials consumed by collaborators. Never logged.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// Source-control hosting token used for pushes and pull requests
    pub github_token: Option<SecretString>,
    pub anthropic_api_key: Option<SecretString>,
    pub openai_api_key: Option<SecretString>,
}

/// Immutable process-wide configuration.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(private, name = "_build"))]
pub struct AppConfig {
    /// Repository to upgrade
    pub repo_path: PathBuf,
    /// Specific dependency to upgrade instead of the top candidate
    #[builder(default)]
    pub dependency: Option<String>,
    /// Minimum vulnerability severity that forces high priority
    #[builder(default = "Severity::Medium")]
    pub min_severity: Severity,
    #[builder(default)]
    pub model: Model,
    /// Stop after analysis without touching the repository
    #[builder(default)]
    pub dry_run: bool,
    #[builder(default = "DEFAULT_BASE_BRANCH.into()")]
    pub base_branch: String,
    #[builder(default = "DEFAULT_MAX_SNIPPETS")]
    pub max_snippets: usize,
    #[builder(default = "Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)")]
    pub http_timeout: Duration,
    #[builder(default = "Duration::from_secs(DEFAULT_PROCESS_TIMEOUT_SECS)")]
    pub process_timeout: Duration,
    #[builder(default)]
    pub registries: RegistryConfig,
    #[builder(default)]
    pub secrets: Secrets,
}

impl AppConfig {
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

impl AppConfigBuilder {
    /// Seed the builder from a loaded file config. Values set afterwards
    /// take precedence.
    pub fn file_config(&mut self, file: &FileConfig) -> &mut Self {
        self.base_branch(file.base_branch.clone())
            .max_snippets(file.max_snippets)
            .http_timeout(Duration::from_secs(file.http_timeout_secs))
            .process_timeout(Duration::from_secs(file.process_timeout_secs))
            .registries(file.registries.clone())
    }

    pub fn build(&self) -> Result<AppConfig> {
        let config = self._build().map_err(|e| {
            DepsaurusError::invalid_config(format!(
                "Failed to build application config: {}",
                e
            ))
        })?;

        if !config.repo_path.is_dir() {
            return Err(DepsaurusError::InvalidArgs(format!(
                "repository path does not exist: {}",
                config.repo_path.display()
            )));
        }

        if config.max_snippets == 0 {
            return Err(DepsaurusError::invalid_config(
                "max_snippets must be greater than zero",
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_defaults_when_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let config = FileConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.base_branch, "main");
        assert_eq!(config.registries.npm, DEFAULT_NPM_REGISTRY);
    }

    #[test]
    fn loads_partial_file_config() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(DEFAULT_CONFIG_FILE),
            r#"
base_branch = "develop"
max_snippets = 3

[registries]
npm = "http://localhost:4873"
"#,
        )
        .unwrap();

        let config = FileConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.base_branch, "develop");
        assert_eq!(config.max_snippets, 3);
        assert_eq!(config.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
        assert_eq!(config.registries.npm, "http://localhost:4873");
        assert_eq!(config.registries.pypi, DEFAULT_PYPI_REGISTRY);
    }

    #[test]
    fn rejects_malformed_file_config() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(DEFAULT_CONFIG_FILE), "max_snippets = [")
            .unwrap();
        assert!(FileConfig::load(temp_dir.path()).is_err());
    }

    #[test]
    fn builder_applies_defaults_and_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let file = FileConfig {
            base_branch: "trunk".into(),
            ..FileConfig::default()
        };

        let config = AppConfig::builder()
            .repo_path(temp_dir.path())
            .file_config(&file)
            .max_snippets(4usize)
            .build()
            .unwrap();

        assert_eq!(config.base_branch, "trunk");
        assert_eq!(config.max_snippets, 4);
        assert_eq!(config.min_severity, Severity::Medium);
        assert!(!config.dry_run);
        assert!(config.secrets.github_token.is_none());
    }

    #[test]
    fn builder_requires_existing_repo_path() {
        let result = AppConfig::builder()
            .repo_path("/definitely/not/a/real/repo")
            .build();
        assert!(result.is_err());

        let result = AppConfig::builder().build();
        assert!(result.is_err());
    }
}
