use log::*;
use std::{fs, path::Path};

use crate::{
    ecosystem::Ecosystem,
    error::Result,
    manifest::{Dependency, DependencyKind},
};

pub const MANIFEST_FILE: &str = "requirements.txt";

/// Handles requirements.txt pins.
pub struct Requirements {}

impl Requirements {
    pub fn new() -> Self {
        Self {}
    }

    /// Read pinned dependencies from `<root>/requirements.txt`.
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

    /// Only `name==version` lines are considered. Other specifiers,
    /// comments and blank lines are skipped.
    pub fn parse_content(&self, content: &str) -> Vec<Dependency> {
        content
            .lines()
            .filter_map(pin)
            .map(|(name, version)| {
                Dependency::new(
                    name,
                    version,
                    Ecosystem::Pip,
                    DependencyKind::Production,
                )
            })
            .collect()
    }

    /// Pin `name` to `version` in `<root>/requirements.txt`.
    ///
    /// A missing file is not created.
    pub fn update(
        &self,
        root: &Path,
        name: &str,
        version: &str,
    ) -> Result<bool> {
        let path = root.join(MANIFEST_FILE);
        if !path.exists() {
            warn!("{} not found, nothing to update", path.display());
            return Ok(false);
        }

        let content = fs::read_to_string(&path)?;
        let updated = update_content(&content, name, version);

        if updated == content {
            info!("{name} already pinned to {version}");
            return Ok(false);
        }

        fs::write(&path, updated)?;
        info!("pinned {name}=={version} in {MANIFEST_FILE}");
        Ok(true)
    }
}

/// Split a `name==version` line into trimmed halves. Comments, blank lines
/// and other specifiers yield `None`.
fn pin(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (name, version) = line.split_once("==")?;
    Some((name.trim(), version.trim()))
}

/// Replace every line pinning `name`, or append one pin when none exists.
/// Lines are matched with the same rule the parser uses. All other lines
/// are kept verbatim.
pub fn update_content(content: &str, name: &str, version: &str) -> String {
    let pinned = format!("{name}=={version}");
    let mut found = false;
    let mut updated =
        String::with_capacity(content.len() + pinned.len() + 1);

    for line in content.split_inclusive('\n') {
        if pin(line).is_some_and(|(pinned_name, _)| pinned_name == name) {
            found = true;
            updated.push_str(&pinned);
            updated.push_str(line_ending(line));
        } else {
            updated.push_str(line);
        }
    }

    if !found {
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push_str(&pinned);
        updated.push('\n');
    }

    updated
}

fn line_ending(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}
