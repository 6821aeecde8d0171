//! Declared dependencies: per-ecosystem manifest parsing and updating.
use log::*;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};
use strum::Display;

use crate::{
    audit::Vulnerability,
    ecosystem::Ecosystem,
    error::Result,
    manifest::{
        gradle::GradleBuild, maven::MavenPom, package_json::PackageJson,
        requirements::Requirements,
    },
    version::UpdateClassification,
};

pub mod gradle;
pub mod maven;
pub mod package_json;
pub mod requirements;

/// Latest-version sentinel used until a registry lookup succeeds.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Whether a dependency ships with the project or is only used to build it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DependencyKind {
    #[default]
    Production,
    Development,
}

/// A dependency declared in a project manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    /// Bare package name, or `group:artifact` for Maven and Gradle
    pub name: String,
    /// Declared version with range prefixes removed
    pub current_version: String,
    /// Latest published version, [`UNKNOWN_VERSION`] when unresolved
    pub latest_version: String,
    pub ecosystem: Ecosystem,
    pub kind: DependencyKind,
    pub update_type: UpdateClassification,
    pub vulnerabilities: Vec<Vulnerability>,
}

impl Dependency {
    pub fn new(
        name: impl Into<String>,
        current_version: impl Into<String>,
        ecosystem: Ecosystem,
        kind: DependencyKind,
    ) -> Self {
        Self {
            name: name.into(),
            current_version: current_version.into(),
            latest_version: UNKNOWN_VERSION.into(),
            ecosystem,
            kind,
            update_type: UpdateClassification::Unknown,
            vulnerabilities: vec![],
        }
    }

    /// True when the latest version resolved and differs from the declared
    /// one.
    pub fn has_update(&self) -> bool {
        self.latest_version != UNKNOWN_VERSION
            && self.latest_version != self.current_version
    }
}

/// Manifest reader/writer with static dispatch over ecosystems.
pub enum ManifestHandler {
    /// package.json, updated through `npm install`
    Npm(PackageJson),
    /// requirements.txt pinned with `==`
    Pip(Requirements),
    /// pom.xml dependency blocks
    Maven(MavenPom),
    /// build.gradle or build.gradle.kts implementation declarations
    Gradle(GradleBuild),
    /// Nothing to read or write
    Unsupported,
}

impl ManifestHandler {
    pub fn new(ecosystem: Ecosystem) -> Self {
        match ecosystem {
            Ecosystem::Npm => ManifestHandler::Npm(PackageJson::new()),
            Ecosystem::Pip => ManifestHandler::Pip(Requirements::new()),
            Ecosystem::Maven => ManifestHandler::Maven(MavenPom::new()),
            Ecosystem::Gradle => ManifestHandler::Gradle(GradleBuild::new()),
            Ecosystem::Unknown => ManifestHandler::Unsupported,
        }
    }

    /// Read declared dependencies. A missing or unreadable manifest yields
    /// an empty list.
    pub fn parse(&self, root: &Path) -> Vec<Dependency> {
        match self {
            ManifestHandler::Npm(handler) => handler.parse(root),
            ManifestHandler::Pip(handler) => handler.parse(root),
            ManifestHandler::Maven(handler) => handler.parse(root),
            ManifestHandler::Gradle(handler) => handler.parse(root),
            ManifestHandler::Unsupported => vec![],
        }
    }

    /// Pin `name` to `version`. Returns `Ok(false)` when nothing changed.
    pub async fn update(
        &self,
        root: &Path,
        name: &str,
        version: &str,
        process_timeout: Duration,
    ) -> Result<bool> {
        match self {
            ManifestHandler::Npm(handler) => {
                handler.update(root, name, version, process_timeout).await
            }
            ManifestHandler::Pip(handler) => {
                handler.update(root, name, version)
            }
            ManifestHandler::Maven(handler) => {
                handler.update(root, name, version)
            }
            ManifestHandler::Gradle(handler) => {
                handler.update(root, name, version)
            }
            ManifestHandler::Unsupported => {
                warn!("no manifest updater for unknown project type");
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for ManifestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestHandler::Npm(_) => write!(f, "ManifestHandler::Npm"),
            ManifestHandler::Pip(_) => write!(f, "ManifestHandler::Pip"),
            ManifestHandler::Maven(_) => write!(f, "ManifestHandler::Maven"),
            ManifestHandler::Gradle(_) => write!(f, "ManifestHandler::Gradle"),
            ManifestHandler::Unsupported => {
                write!(f, "ManifestHandler::Unsupported")
            }
        }
    }
}

/// Parse the manifest of `ecosystem` under `root`, keeping the first
/// declaration of each name.
pub fn parse_manifest(root: &Path, ecosystem: Ecosystem) -> Vec<Dependency> {
    let declared = ManifestHandler::new(ecosystem).parse(root);
    dedupe(declared)
}

fn dedupe(dependencies: Vec<Dependency>) -> Vec<Dependency> {
    let mut seen = HashSet::new();
    dependencies
        .into_iter()
        .filter(|dep| {
            let first = seen.insert(dep.name.clone());
            if !first {
                debug!(
                    "dropping duplicate declaration of {} ({})",
                    dep.name, dep.current_version
                );
            }
            first
        })
        .collect()
}

/// Manifest of `ecosystem` relative to `root`, when it exists.
pub fn manifest_path(root: &Path, ecosystem: Ecosystem) -> Option<PathBuf> {
    let file = match ecosystem {
        Ecosystem::Npm => PathBuf::from(package_json::MANIFEST_FILE),
        Ecosystem::Pip => PathBuf::from(requirements::MANIFEST_FILE),
        Ecosystem::Maven => PathBuf::from(maven::MANIFEST_FILE),
        Ecosystem::Gradle => {
            let build_file = GradleBuild::new().build_file(root)?;
            PathBuf::from(build_file.file_name()?)
        }
        Ecosystem::Unknown => return None,
    };

    root.join(&file).exists().then_some(file)
}

/// Split a `group:artifact` name.
pub fn split_coordinates(name: &str) -> Option<(&str, &str)> {
    let (group, artifact) = name.split_once(':')?;
    if group.is_empty() || artifact.is_empty() || artifact.contains(':') {
        return None;
    }
    Some((group, artifact))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_manifest_is_empty_for_every_ecosystem() {
        let temp_dir = TempDir::new().unwrap();
        for ecosystem in [
            Ecosystem::Npm,
            Ecosystem::Pip,
            Ecosystem::Maven,
            Ecosystem::Gradle,
            Ecosystem::Unknown,
        ] {
            assert!(
                parse_manifest(temp_dir.path(), ecosystem).is_empty(),
                "{ecosystem}"
            );
        }
    }

    #[test]
    fn first_declaration_wins() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("package.json"),
            r#"{
  "dependencies": { "react": "^18.2.0" },
  "devDependencies": { "react": "^17.0.0", "jest": "~29.0.0" }
}"#,
        )
        .unwrap();

        let deps = parse_manifest(temp_dir.path(), Ecosystem::Npm);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "react");
        assert_eq!(deps[0].current_version, "18.2.0");
        assert_eq!(deps[0].kind, DependencyKind::Production);
        assert_eq!(deps[1].name, "jest");
        assert_eq!(deps[1].kind, DependencyKind::Development);
    }

    #[test]
    fn parsing_twice_is_identical() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("requirements.txt"),
            "flask==2.0.1\nrequests==2.28.0\n",
        )
        .unwrap();

        let first = parse_manifest(temp_dir.path(), Ecosystem::Pip);
        let second = parse_manifest(temp_dir.path(), Ecosystem::Pip);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn new_dependency_starts_unresolved() {
        let dep = Dependency::new(
            "flask",
            "2.0.1",
            Ecosystem::Pip,
            DependencyKind::default(),
        );
        assert_eq!(dep.latest_version, UNKNOWN_VERSION);
        assert_eq!(dep.update_type, UpdateClassification::Unknown);
        assert!(!dep.has_update());
    }

    #[test]
    fn locates_manifest_files() {
        let temp_dir = TempDir::new().unwrap();
        assert!(manifest_path(temp_dir.path(), Ecosystem::Gradle).is_none());

        fs::write(temp_dir.path().join("build.gradle.kts"), "").unwrap();
        assert_eq!(
            manifest_path(temp_dir.path(), Ecosystem::Gradle),
            Some(PathBuf::from("build.gradle.kts"))
        );
        assert!(manifest_path(temp_dir.path(), Ecosystem::Unknown).is_none());
    }

    #[test]
    fn splits_coordinates() {
        assert_eq!(
            split_coordinates("org.springframework:spring-core"),
            Some(("org.springframework", "spring-core"))
        );
        assert_eq!(split_coordinates("left-pad"), None);
        assert_eq!(split_coordinates("a:b:c"), None);
    }

    #[tokio::test]
    async fn unsupported_handler_never_updates() {
        let temp_dir = TempDir::new().unwrap();
        let handler = ManifestHandler::new(Ecosystem::Unknown);
        let updated = handler
            .update(temp_dir.path(), "x", "1.0.0", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(!updated);
    }
}
