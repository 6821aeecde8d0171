//! Upgrade candidate ranking and selection.
use strum::Display;

use crate::{
    audit::{Severity, Vulnerability},
    ecosystem::Ecosystem,
    error::{DepsaurusError, Result},
    manifest::Dependency,
    version::UpdateClassification,
};

/// Urgency of an upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

/// Read-only view of a dependency that has a newer version available.
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeCandidate {
    pub name: String,
    pub ecosystem: Ecosystem,
    pub current_version: String,
    pub latest_version: String,
    pub update_type: UpdateClassification,
    pub vulnerabilities: Vec<Vulnerability>,
    pub priority: Priority,
}

impl UpgradeCandidate {
    pub fn from_dependency(
        dependency: &Dependency,
        min_severity: Severity,
    ) -> Self {
        let vulnerable = dependency
            .vulnerabilities
            .iter()
            .any(|v| v.severity.meets(min_severity));

        let priority = if vulnerable {
            Priority::High
        } else if dependency.update_type == UpdateClassification::Patch {
            Priority::Medium
        } else {
            Priority::Low
        };

        Self {
            name: dependency.name.clone(),
            ecosystem: dependency.ecosystem,
            current_version: dependency.current_version.clone(),
            latest_version: dependency.latest_version.clone(),
            update_type: dependency.update_type,
            vulnerabilities: dependency.vulnerabilities.clone(),
            priority,
        }
    }

    /// `Upgrade <name> from <current> to <target>`
    pub fn title(&self) -> String {
        format!(
            "Upgrade {} from {} to {}",
            self.name, self.current_version, self.latest_version
        )
    }
}

/// Candidates for every dependency with a known newer version, most urgent
/// first. Ties keep scan order.
pub fn rank(
    dependencies: &[Dependency],
    min_severity: Severity,
) -> Vec<UpgradeCandidate> {
    let mut candidates = dependencies
        .iter()
        .filter(|dep| dep.has_update())
        .map(|dep| UpgradeCandidate::from_dependency(dep, min_severity))
        .collect::<Vec<UpgradeCandidate>>();

    candidates.sort_by_key(|c| c.priority.rank());
    candidates
}

pub fn select_highest(
    candidates: &[UpgradeCandidate],
) -> Option<&UpgradeCandidate> {
    candidates.first()
}

/// Exact-name lookup.
pub fn select_by_name<'a>(
    candidates: &'a [UpgradeCandidate],
    name: &str,
) -> Result<&'a UpgradeCandidate> {
    candidates
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| DepsaurusError::not_found(name))
}
