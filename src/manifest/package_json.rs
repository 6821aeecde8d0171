use log::*;
use serde_json::Value;
use std::{fs, path::Path, time::Duration};

use crate::{
    ecosystem::Ecosystem,
    error::Result,
    manifest::{Dependency, DependencyKind},
    process::run_command,
};

pub const MANIFEST_FILE: &str = "package.json";

/// Dependency sections of package.json and the kind they declare.
const SECTIONS: [(&str, DependencyKind); 2] = [
    ("dependencies", DependencyKind::Production),
    ("devDependencies", DependencyKind::Development),
];

/// Handles package.json parsing and npm-driven dependency updates.
pub struct PackageJson {}

impl PackageJson {
    pub fn new() -> Self {
        Self {}
    }

    /// Read dependencies from `<root>/package.json`.
    pub fn parse(&self, root: &Path) -> Vec<Dependency> {
        let path = root.join(MANIFEST_FILE);
        if !path.exists() {
            return vec![];
        }

        match fs::read_to_string(&path) {
            Ok(content) => self.parse_content(&content),
            Err(err) => {
                warn!("failed to read {}: {err}", path.display());
                vec![]
            }
        }
    }

    /// Parse package.json content. Malformed JSON yields an empty list.
    pub fn parse_content(&self, content: &str) -> Vec<Dependency> {
        let doc: Value = match serde_json::from_str(content) {
            Ok(doc) => doc,
            Err(err) => {
                warn!("malformed {MANIFEST_FILE}: {err}");
                return vec![];
            }
        };

        let mut dependencies = vec![];

        for (section, kind) in SECTIONS {
            let Some(entries) = doc.get(section).and_then(|v| v.as_object())
            else {
                continue;
            };

            for (name, version) in entries {
                let Some(version) = version.as_str() else {
                    debug!("skipping {name}: non-string version in {section}");
                    continue;
                };

                dependencies.push(Dependency::new(
                    name,
                    strip_range_prefixes(version),
                    Ecosystem::Npm,
                    kind,
                ));
            }
        }

        dependencies
    }

    /// Pin a dependency by running `npm install <name>@<version>`.
    pub async fn update(
        &self,
        root: &Path,
        name: &str,
        version: &str,
        process_timeout: Duration,
    ) -> Result<bool> {
        let spec = format!("{name}@{version}");
        info!("running npm install {spec}");

        let output =
            run_command("npm", &["install", &spec], root, process_timeout)
                .await?;

        if !output.success {
            warn!(
                "npm install {spec} exited with {:?}: {}",
                output.code,
                output.stderr.trim()
            );
        }

        Ok(output.success)
    }
}

/// Remove every caret and tilde from a declared npm version.
fn strip_range_prefixes(version: &str) -> String {
    version.replace(['^', '~'], "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_caret_and_tilde() {
        let deps = PackageJson::new().parse_content(
            r#"{ "dependencies": { "left-pad": "^1.2.3", "lodash": "~4.17.21" } }"#,
        );
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "left-pad");
        assert_eq!(deps[0].current_version, "1.2.3");
        assert_eq!(deps[1].current_version, "4.17.21");
        assert_eq!(deps[0].ecosystem, Ecosystem::Npm);
    }

    #[test]
    fn keeps_declaration_order_and_kind() {
        let deps = PackageJson::new().parse_content(
            r#"{
  "name": "app",
  "devDependencies": { "typescript": "5.4.0" },
  "dependencies": { "zod": "3.22.0", "axios": "1.6.0" }
}"#,
        );
        let names = deps.iter().map(|d| d.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["zod", "axios", "typescript"]);
        assert_eq!(deps[2].kind, DependencyKind::Development);
    }

    #[test]
    fn malformed_json_is_empty() {
        assert!(PackageJson::new().parse_content("{ not json").is_empty());
    }

    #[test]
    fn skips_non_string_versions() {
        let deps = PackageJson::new().parse_content(
            r#"{ "dependencies": { "weird": { "version": "1.0.0" }, "ok": "1.0.0" } }"#,
        );
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "ok");
    }
}
