use log::*;
use regex::Regex;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use crate::{
    ecosystem::Ecosystem,
    error::{DepsaurusError, Result},
    manifest::{Dependency, DependencyKind, split_coordinates},
};

pub const GROOVY_BUILD_FILE: &str = "build.gradle";
pub const KOTLIN_BUILD_FILE: &str = "build.gradle.kts";

/// `implementation "group:artifact:version"` in Groovy or Kotlin DSL.
static IMPLEMENTATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"implementation\s*\(?\s*['"](?<group>[^:'"\s]+):(?<artifact>[^:'"\s]+):(?<version>[^'"]+)['"]"#,
    )
    .unwrap()
});

/// Handles build.gradle / build.gradle.kts implementation declarations.
pub struct GradleBuild {}

impl GradleBuild {
    pub fn new() -> Self {
        Self {}
    }

    /// build.gradle takes precedence over build.gradle.kts.
    pub fn build_file(&self, root: &Path) -> Option<PathBuf> {
        [GROOVY_BUILD_FILE, KOTLIN_BUILD_FILE]
            .iter()
            .map(|file| root.join(file))
            .find(|path| path.exists())
    }

    pub fn parse(&self, root: &Path) -> Vec<Dependency> {
        let Some(path) = self.build_file(root) else {
            return vec![];
        };

        match fs::read_to_string(&path) {
            Ok(content) => self.parse_content(&content),
            Err(err) => {
                warn!("failed to read {}: {err}", path.display());
                vec![]
            }
        }
    }

    pub fn parse_content(&self, content: &str) -> Vec<Dependency> {
        IMPLEMENTATION_REGEX
            .captures_iter(content)
            .map(|caps| {
                Dependency::new(
                    format!("{}:{}", &caps["group"], &caps["artifact"]),
                    &caps["version"],
                    Ecosystem::Gradle,
                    DependencyKind::Production,
                )
            })
            .collect()
    }

    pub fn update(
        &self,
        root: &Path,
        name: &str,
        version: &str,
    ) -> Result<bool> {
        let Some(path) = self.build_file(root) else {
            warn!("no gradle build file in {}", root.display());
            return Ok(false);
        };

        let content = fs::read_to_string(&path)?;
        let updated = update_content(&content, name, version)?;

        if updated == content {
            info!("no implementation declaration for {name} changed");
            return Ok(false);
        }

        fs::write(&path, updated)?;
        info!("updated {name} to {version} in {}", path.display());
        Ok(true)
    }
}

/// Rewrite the version of every matching implementation declaration,
/// preserving the quote style.
pub fn update_content(
    content: &str,
    name: &str,
    version: &str,
) -> Result<String> {
    let Some((group, artifact)) = split_coordinates(name) else {
        return Err(DepsaurusError::InvalidArgs(format!(
            "gradle dependency must be group:artifact, got {name}"
        )));
    };

    // $1 = prefix through coordinates, $2 = quote
    let pattern = Regex::new(&format!(
        r#"(implementation\s*\(?\s*(['"]){}:{}:)[^'"]+(['"])"#,
        regex::escape(group),
        regex::escape(artifact),
    ))?;

    Ok(pattern
        .replace_all(content, |caps: &regex::Captures| {
            format!("{}{}{}", &caps[1], version, &caps[3])
        })
        .into_owned())
}
