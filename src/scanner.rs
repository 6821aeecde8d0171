//! Dependency discovery: detect, parse, resolve, audit and classify.
use log::*;
use std::path::{Path, PathBuf};

use crate::{
    audit::VulnerabilitySource,
    ecosystem::{Ecosystem, detection},
    manifest::{Dependency, UNKNOWN_VERSION, parse_manifest},
    registry::VersionSource,
    result::Outcome,
    version::classify,
};

/// Enriched dependency list of one repository scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub ecosystem: Ecosystem,
    /// Marker file that selected the ecosystem
    pub evidence: Option<String>,
    pub dependencies: Vec<Dependency>,
    /// Number of registry or audit lookups that fell back to a sentinel
    pub degraded_lookups: usize,
    /// Number of lookups that could not be attempted at all
    pub failed_lookups: usize,
}

#[derive(Default)]
struct LookupTally {
    degraded: usize,
    failed: usize,
}

impl LookupTally {
    fn record<T>(&mut self, outcome: &Outcome<T>) {
        match outcome {
            Outcome::Success(_) => {}
            Outcome::Degraded { .. } => self.degraded += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Runs the discovery pipeline over a repository. Lookups are awaited one
/// dependency at a time.
pub struct DependencyScanner {
    root: PathBuf,
    versions: Box<dyn VersionSource>,
    vulnerabilities: Box<dyn VulnerabilitySource>,
}

impl DependencyScanner {
    pub fn new(
        root: &Path,
        versions: Box<dyn VersionSource>,
        vulnerabilities: Box<dyn VulnerabilitySource>,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            versions,
            vulnerabilities,
        }
    }

    pub fn versions(&self) -> &dyn VersionSource {
        self.versions.as_ref()
    }

    pub async fn scan(&self) -> ScanReport {
        let detection = detection::detect(&self.root);
        info!(
            "scanning {} project at {}",
            detection.ecosystem,
            self.root.display()
        );

        let mut dependencies = parse_manifest(&self.root, detection.ecosystem);
        info!("found {} declared dependencies", dependencies.len());

        let mut tally = LookupTally::default();

        for dep in dependencies.iter_mut() {
            let latest = self.versions.latest_version(dep).await;
            tally.record(&latest);
            dep.latest_version = latest.value_or(UNKNOWN_VERSION.into());
            dep.update_type = classify(
                dep.ecosystem,
                &dep.current_version,
                &dep.latest_version,
            );

            let vulnerabilities = self.vulnerabilities.check(dep).await;
            tally.record(&vulnerabilities);
            dep.vulnerabilities = vulnerabilities.into_value();

            debug!(
                "{} {} -> {} ({}), {} vulnerabilities",
                dep.name,
                dep.current_version,
                dep.latest_version,
                dep.update_type,
                dep.vulnerabilities.len()
            );
        }

        ScanReport {
            ecosystem: detection.ecosystem,
            evidence: detection.evidence,
            dependencies,
            degraded_lookups: tally.degraded,
            failed_lookups: tally.failed,
        }
    }
}
