//! Project type detection from marker files at the repository root.
use log::*;
use std::path::Path;

use crate::ecosystem::Ecosystem;

/// Marker files that identify an ecosystem.
#[derive(Debug, Clone)]
pub struct DetectionPattern<'a> {
    pub ecosystem: Ecosystem,
    /// Any of these files at the root selects the ecosystem
    pub manifest_files: Vec<&'a str>,
}

/// Detection result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDetection {
    pub ecosystem: Ecosystem,
    /// Marker file that triggered the detection
    pub evidence: Option<String>,
}

/// Fixed, first-match-wins detection order. Polyglot repositories resolve to
/// the earliest matching ecosystem.
fn detection_patterns() -> Vec<DetectionPattern<'static>> {
    vec![
        DetectionPattern {
            ecosystem: Ecosystem::Npm,
            manifest_files: vec!["package.json"],
        },
        DetectionPattern {
            ecosystem: Ecosystem::Maven,
            manifest_files: vec!["pom.xml"],
        },
        DetectionPattern {
            ecosystem: Ecosystem::Pip,
            manifest_files: vec!["requirements.txt", "setup.py"],
        },
        DetectionPattern {
            ecosystem: Ecosystem::Gradle,
            manifest_files: vec!["build.gradle", "build.gradle.kts"],
        },
    ]
}

/// Detect the project type of the repository at `root`.
pub fn detect(root: &Path) -> ProjectDetection {
    for pattern in detection_patterns() {
        for manifest_file in pattern.manifest_files.iter() {
            if root.join(manifest_file).exists() {
                debug!(
                    "detected {} project: found {}",
                    pattern.ecosystem, manifest_file
                );
                return ProjectDetection {
                    ecosystem: pattern.ecosystem,
                    evidence: Some(format!("found {manifest_file}")),
                };
            }
        }
    }

    debug!("no known manifest found in {}", root.display());

    ProjectDetection {
        ecosystem: Ecosystem::Unknown,
        evidence: None,
    }
}

/// Convenience wrapper returning only the ecosystem tag.
pub fn detect_project_type(root: &Path) -> Ecosystem {
    detect(root).ecosystem
}
