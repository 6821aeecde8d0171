use log::*;
use quick_xml::{Reader, events::Event};
use regex::Regex;
use std::{fs, path::Path, sync::LazyLock};

use crate::{
    ecosystem::Ecosystem,
    error::{DepsaurusError, Result},
    manifest::{Dependency, DependencyKind, split_coordinates},
};

pub const MANIFEST_FILE: &str = "pom.xml";

/// Tolerant scan used when the pom is not well-formed XML.
static DEPENDENCY_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<dependency>.*?<groupId>(?<group>.*?)</groupId>.*?<artifactId>(?<artifact>.*?)</artifactId>.*?<version>(?<version>.*?)</version>.*?</dependency>",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Group,
    Artifact,
    Version,
}

#[derive(Debug, Default)]
struct PartialDependency {
    group: Option<String>,
    artifact: Option<String>,
    version: Option<String>,
}

impl PartialDependency {
    fn set(&mut self, field: Field, text: String) {
        let slot = match field {
            Field::Group => &mut self.group,
            Field::Artifact => &mut self.artifact,
            Field::Version => &mut self.version,
        };
        slot.get_or_insert_with(String::new).push_str(&text);
    }

    fn finish(self) -> Option<Dependency> {
        let group = self.group?.trim().to_string();
        let artifact = self.artifact?.trim().to_string();
        let version = self.version?.trim().to_string();
        Some(Dependency::new(
            format!("{group}:{artifact}"),
            version,
            Ecosystem::Maven,
            DependencyKind::Production,
        ))
    }
}

/// Handles pom.xml dependency blocks.
pub struct MavenPom {}

impl MavenPom {
    pub fn new() -> Self {
        Self {}
    }

    /// Read dependencies from `<root>/pom.xml`.
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

    /// Extract every `<dependency>` declaring groupId, artifactId and
    /// version. Property placeholders such as `${spring.version}` are kept
    /// literally.
    pub fn parse_content(&self, content: &str) -> Vec<Dependency> {
        match parse_xml(content) {
            Ok(dependencies) => dependencies,
            Err(err) => {
                debug!(
                    "{MANIFEST_FILE} is not well-formed ({err}), scanning blocks"
                );
                scan_blocks(content)
            }
        }
    }

    /// Replace the version of the `group:artifact` dependency block.
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
        let Some(updated) = update_content(&content, name, version)? else {
            info!("no <dependency> block for {name} in {MANIFEST_FILE}");
            return Ok(false);
        };

        if updated == content {
            return Ok(false);
        }

        fs::write(&path, updated)?;
        info!("updated {name} to {version} in {MANIFEST_FILE}");
        Ok(true)
    }
}

fn parse_xml(content: &str) -> Result<Vec<Dependency>> {
    let mut reader = Reader::from_str(content);
    let mut dependencies = vec![];
    let mut depth = 0usize;
    let mut dependency_depth: Option<usize> = None;
    let mut current = PartialDependency::default();
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                depth += 1;
                let name = e.local_name();
                match (name.as_ref(), dependency_depth) {
                    (b"dependency", None) => {
                        dependency_depth = Some(depth);
                        current = PartialDependency::default();
                    }
                    (b"groupId", Some(d)) if depth == d + 1 => {
                        field = Some(Field::Group)
                    }
                    (b"artifactId", Some(d)) if depth == d + 1 => {
                        field = Some(Field::Artifact)
                    }
                    (b"version", Some(d)) if depth == d + 1 => {
                        field = Some(Field::Version)
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => {
                if e.local_name().as_ref() == b"dependency"
                    && dependency_depth == Some(depth)
                {
                    dependency_depth = None;
                    if let Some(dep) = std::mem::take(&mut current).finish() {
                        dependencies.push(dep);
                    }
                }
                field = None;
                depth = depth.saturating_sub(1);
            }
            Event::Text(ref text) => {
                if let Some(f) = field {
                    current.set(f, String::from_utf8_lossy(text).into_owned());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(DepsaurusError::ManifestError(format!(
            "unbalanced elements in {MANIFEST_FILE}"
        )));
    }

    Ok(dependencies)
}

fn scan_blocks(content: &str) -> Vec<Dependency> {
    DEPENDENCY_BLOCK_REGEX
        .captures_iter(content)
        .map(|caps| {
            Dependency::new(
                format!("{}:{}", caps["group"].trim(), caps["artifact"].trim()),
                caps["version"].trim(),
                Ecosystem::Maven,
                DependencyKind::Production,
            )
        })
        .collect()
}

/// Rewrite the `<version>` of the matching dependency block, keeping all
/// surrounding formatting. Returns `None` when no block matches.
pub fn update_content(
    content: &str,
    name: &str,
    version: &str,
) -> Result<Option<String>> {
    let Some((group, artifact)) = split_coordinates(name) else {
        return Err(DepsaurusError::InvalidArgs(format!(
            "maven dependency must be group:artifact, got {name}"
        )));
    };

    let pattern = Regex::new(&format!(
        r"(?s)(<dependency>\s*<groupId>\s*{}\s*</groupId>\s*<artifactId>\s*{}\s*</artifactId>(?:\s*<[A-Za-z]+>[^<]*</[A-Za-z]+>)*?\s*<version>)\s*[^<]*?\s*(</version>)",
        regex::escape(group),
        regex::escape(artifact),
    ))?;

    if !pattern.is_match(content) {
        return Ok(None);
    }

    let updated = pattern
        .replace_all(content, |caps: &regex::Captures| {
            format!("{}{}{}", &caps[1], version, &caps[2])
        })
        .into_owned();

    Ok(Some(updated))
}
