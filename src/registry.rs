//! Latest published versions from public package registries.
use async_trait::async_trait;
use log::*;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;

use crate::{
    config::{AppConfig, RegistryConfig},
    ecosystem::Ecosystem,
    error::{DepsaurusError, Result},
    manifest::{Dependency, UNKNOWN_VERSION, split_coordinates},
    result::Outcome,
};

pub mod maven_central;
pub mod npm;
pub mod pypi;

pub const USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Source of published version information.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionSource {
    /// Latest published version. Soft failures carry [`UNKNOWN_VERSION`];
    /// a dependency name or registry URL that cannot form a request is a
    /// hard failure.
    async fn latest_version(&self, dependency: &Dependency) -> Outcome<String>;

    /// Every version published to the npm registry for `name`.
    async fn npm_versions(&self, name: &str) -> Outcome<Vec<String>>;
}

/// HTTP client over the configured registries. One request per lookup, no
/// caching and no retries.
pub struct RegistryClient {
    client: Client,
    registries: RegistryConfig,
}

impl RegistryClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Self::with_registries(config.registries.clone(), config.http_timeout)
    }

    pub fn with_registries(
        registries: RegistryConfig,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, registries })
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        debug!("GET {url}");
        let request = self.client.get(url).build()?;
        let response = self.client.execute(request).await?;
        let result = response.error_for_status()?;
        let doc: Value = result.json().await?;
        Ok(doc)
    }

    async fn lookup(&self, dependency: &Dependency) -> Result<Option<String>> {
        match dependency.ecosystem {
            Ecosystem::Npm => {
                let url =
                    npm::document_url(&self.registries.npm, &dependency.name)?;
                let doc = self.get_json(url).await?;
                Ok(npm::latest_from_document(&doc))
            }
            Ecosystem::Pip => {
                let url = pypi::document_url(
                    &self.registries.pypi,
                    &dependency.name,
                )?;
                let doc = self.get_json(url).await?;
                Ok(pypi::latest_from_document(&doc))
            }
            Ecosystem::Maven | Ecosystem::Gradle => {
                let (group, artifact) = split_coordinates(&dependency.name)
                    .ok_or_else(|| {
                        DepsaurusError::InvalidArgs(format!(
                            "expected group:artifact, got {}",
                            dependency.name
                        ))
                    })?;
                let url = maven_central::search_url(
                    &self.registries.maven_search,
                    group,
                    artifact,
                )?;
                let doc = self.get_json(url).await?;
                Ok(maven_central::latest_from_search(&doc))
            }
            Ecosystem::Unknown => Ok(None),
        }
    }
}

#[async_trait]
impl VersionSource for RegistryClient {
    async fn latest_version(&self, dependency: &Dependency) -> Outcome<String> {
        match self.lookup(dependency).await {
            Ok(Some(version)) => {
                debug!("latest {} is {version}", dependency.name);
                Outcome::Success(version)
            }
            Ok(None) => {
                warn!("registry has no latest version for {}", dependency.name);
                Outcome::degraded(
                    UNKNOWN_VERSION.to_string(),
                    format!(
                        "no latest version published for {}",
                        dependency.name
                    ),
                )
            }
            Err(
                err @ (DepsaurusError::InvalidArgs(_)
                | DepsaurusError::UrlError(_)),
            ) => {
                error!("cannot look up {}: {err}", dependency.name);
                Outcome::Failed(err)
            }
            Err(err) if err.is_transient() => {
                warn!("registry unreachable for {}: {err}", dependency.name);
                Outcome::degraded(UNKNOWN_VERSION.to_string(), err.to_string())
            }
            Err(err) => {
                warn!("version lookup for {} failed: {err}", dependency.name);
                Outcome::degraded(UNKNOWN_VERSION.to_string(), err.to_string())
            }
        }
    }

    async fn npm_versions(&self, name: &str) -> Outcome<Vec<String>> {
        let url = match npm::document_url(&self.registries.npm, name) {
            Ok(url) => url,
            Err(err) => {
                error!("cannot list versions of {name}: {err}");
                return Outcome::Failed(err);
            }
        };

        match self.get_json(url).await {
            Ok(doc) => Outcome::Success(npm::versions_from_document(&doc)),
            Err(err) => {
                warn!("listing versions of {name} failed: {err}");
                Outcome::degraded(vec![], err.to_string())
            }
        }
    }
}

/// Join a registry base URL and a path without doubling slashes.
fn registry_url(base: &str, path: &str) -> Result<Url> {
    let url = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&url)?)
}
