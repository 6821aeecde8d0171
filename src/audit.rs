//! Best-effort vulnerability lookup for declared dependencies.
use async_trait::async_trait;
use clap::ValueEnum;
use log::*;
use serde_json::{Map, Value, json};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use strum::{Display, EnumString};
use tempfile::TempDir;

use crate::{
    ecosystem::Ecosystem,
    error::Result,
    manifest::Dependency,
    process::run_command,
    result::Outcome,
};

const NO_DESCRIPTION: &str = "No description available";

/// Advisory severity. `Unknown` never satisfies a minimum severity.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    ValueEnum,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
    Low,
    #[strum(to_string = "medium", serialize = "moderate")]
    Medium,
    High,
    Critical,
    #[default]
    #[value(skip)]
    Unknown,
}

impl Severity {
    fn rank(&self) -> Option<u8> {
        match self {
            Severity::Low => Some(0),
            Severity::Medium => Some(1),
            Severity::High => Some(2),
            Severity::Critical => Some(3),
            Severity::Unknown => None,
        }
    }

    /// True when this severity is at or above `minimum`.
    pub fn meets(&self, minimum: Severity) -> bool {
        match (self.rank(), minimum.rank()) {
            (Some(rank), Some(min)) => rank >= min,
            _ => false,
        }
    }
}

/// A known vulnerability affecting a declared version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vulnerability {
    pub severity: Severity,
    pub description: String,
    /// First version carrying a fix, when the advisory names one
    pub fixed_in: Option<String>,
}

/// Source of vulnerability data for a dependency.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VulnerabilitySource {
    async fn check(
        &self,
        dependency: &Dependency,
    ) -> Outcome<Vec<Vulnerability>>;
}

/// Program invoked for audits unless overridden.
pub const NPM_PROGRAM: &str = "npm";

/// Vulnerability lookup through `npm audit --json` in a scratch project.
///
/// Only npm dependencies are audited; every other ecosystem reports no
/// vulnerabilities.
pub struct NpmAudit {
    program: String,
    scratch_parent: PathBuf,
    process_timeout: Duration,
}

impl NpmAudit {
    pub fn new(process_timeout: Duration) -> Self {
        Self {
            program: NPM_PROGRAM.into(),
            scratch_parent: std::env::temp_dir(),
            process_timeout,
        }
    }

    /// Run `program` instead of `npm`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Create scratch projects under `parent` instead of the system temp
    /// directory.
    pub fn with_scratch_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.scratch_parent = parent.into();
        self
    }

    /// Write a one-dependency package.json into a fresh scratch directory.
    /// The directory is removed when the returned guard drops.
    fn scratch_project(&self, dependency: &Dependency) -> Result<TempDir> {
        let scratch = TempDir::new_in(&self.scratch_parent)?;

        let mut pinned = Map::new();
        pinned.insert(
            dependency.name.clone(),
            json!(dependency.current_version),
        );
        let manifest = json!({
            "name": "temp-audit",
            "version": "1.0.0",
            "dependencies": pinned,
        });
        fs::write(
            scratch.path().join("package.json"),
            serde_json::to_string_pretty(&manifest)?,
        )?;

        Ok(scratch)
    }

    async fn run_audit(
        &self,
        scratch: &Path,
        name: &str,
    ) -> Result<Vec<Vulnerability>> {
        let output = run_command(
            &self.program,
            &["audit", "--json"],
            scratch,
            self.process_timeout,
        )
        .await?;

        if output.success {
            return Ok(vec![]);
        }

        parse_audit_report(&output.stdout, name)
    }
}

#[async_trait]
impl VulnerabilitySource for NpmAudit {
    async fn check(
        &self,
        dependency: &Dependency,
    ) -> Outcome<Vec<Vulnerability>> {
        if dependency.ecosystem != Ecosystem::Npm {
            return Outcome::Success(vec![]);
        }

        let scratch = match self.scratch_project(dependency) {
            Ok(scratch) => scratch,
            Err(err) => {
                error!("cannot prepare audit of {}: {err}", dependency.name);
                return Outcome::Failed(err);
            }
        };

        match self.run_audit(scratch.path(), &dependency.name).await {
            Ok(vulnerabilities) => {
                if !vulnerabilities.is_empty() {
                    info!(
                        "{} has {} known vulnerabilities",
                        dependency.name,
                        vulnerabilities.len()
                    );
                }
                Outcome::Success(vulnerabilities)
            }
            Err(err) => {
                warn!(
                    "vulnerability check for {} failed: {err}",
                    dependency.name
                );
                Outcome::degraded(vec![], err.to_string())
            }
        }
    }
}

/// Extract the advisories recorded for `name` from `npm audit --json`
/// output.
pub fn parse_audit_report(
    stdout: &str,
    name: &str,
) -> Result<Vec<Vulnerability>> {
    let report: Value = serde_json::from_str(stdout)?;

    let Some(entries) =
        report.get("vulnerabilities").and_then(Value::as_object)
    else {
        return Ok(vec![]);
    };

    let vulnerabilities = entries
        .iter()
        .filter(|(key, _)| key.as_str() == name)
        .map(|(_, entry)| Vulnerability {
            severity: entry
                .get("severity")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<Severity>().ok())
                .unwrap_or_default(),
            description: describe(entry),
            fixed_in: entry
                .get("fixAvailable")
                .and_then(Value::as_object)
                .and_then(|fix| fix.get("version"))
                .and_then(Value::as_str)
                .map(String::from),
        })
        .collect();

    Ok(vulnerabilities)
}

fn describe(entry: &Value) -> String {
    if let Some(title) = entry.get("title").and_then(Value::as_str) {
        return title.to_string();
    }

    entry
        .get("via")
        .and_then(Value::as_array)
        .and_then(|via| {
            via.iter()
                .find_map(|v| v.get("title").and_then(Value::as_str))
        })
        .unwrap_or(NO_DESCRIPTION)
        .to_string()
}
