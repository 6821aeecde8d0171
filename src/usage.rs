//! Locating source code that uses a dependency.
use log::*;
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};
use strum::Display;
use walkdir::{DirEntry, WalkDir};

use crate::{
    ecosystem::Ecosystem,
    error::Result,
    usage::{
        jar::root_packages,
        patterns::{
            UsagePattern, package_pattern, patterns_for, python_module_name,
        },
        python_refs::PythonReferenceFinder,
    },
};

pub mod jar;
pub mod patterns;
pub mod python_refs;

/// Directories never searched for usages.
pub const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "target",
    "build",
    "dist",
    "out",
    ".gradle",
    ".idea",
    ".venv",
    "venv",
    "__pycache__",
    ".mvn",
    ".tox",
    ".next",
    "coverage",
];

/// How a usage hit references the dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum UsageKind {
    Import,
    QualifiedReference,
    DirectReference,
    /// Mention of a Java package shipped in the dependency's jar
    PackageReference,
}

/// One location referencing a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageHit {
    /// Relative to the repository root
    pub file: PathBuf,
    /// 1-based
    pub line: usize,
    /// The full line, trimmed
    pub context: String,
    pub token: String,
    pub kind: UsageKind,
}

pub struct UsageLocator {
    root: PathBuf,
    ecosystem: Ecosystem,
    packages: Vec<String>,
}

impl UsageLocator {
    pub fn new(root: &Path, ecosystem: Ecosystem) -> Self {
        Self {
            root: root.to_path_buf(),
            ecosystem,
            packages: vec![],
        }
    }

    /// Also match mentions of these Java packages. Ignored outside JVM
    /// ecosystems.
    pub fn with_packages(mut self, packages: &[String]) -> Self {
        if self.ecosystem.is_jvm() {
            self.packages = root_packages(packages);
        }
        self
    }

    /// Every usage hit of `name`, grouped by file in walk order and sorted
    /// by line within a file.
    pub fn find_usage(&self, name: &str) -> Result<Vec<UsageHit>> {
        let mut patterns = patterns_for(self.ecosystem, name)?;
        patterns.extend(package_pattern(&self.packages)?);
        if patterns.is_empty() {
            return Ok(vec![]);
        }

        let mut python = match self.ecosystem {
            Ecosystem::Pip => Some(PythonReferenceFinder::new()?),
            _ => None,
        };
        let module = python_module_name(name);

        let mut hits = vec![];

        for path in self.source_files() {
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    debug!("skipping {}: {err}", path.display());
                    continue;
                }
            };

            let relative = path
                .strip_prefix(&self.root)
                .unwrap_or(&path)
                .to_path_buf();

            let mut file_hits =
                match_patterns(&patterns, &content, &relative);

            if let Some(finder) = python.as_mut() {
                match finder.find(&content, &module) {
                    Ok(references) => {
                        file_hits.extend(references.into_iter().map(|r| {
                            UsageHit {
                                file: relative.clone(),
                                line: r.line,
                                context: line_text(&content, r.line)
                                    .trim()
                                    .to_string(),
                                token: module.clone(),
                                kind: UsageKind::DirectReference,
                            }
                        }))
                    }
                    Err(err) => {
                        debug!(
                            "no syntax tree for {}: {err}",
                            relative.display()
                        )
                    }
                }
            }

            file_hits.sort_by_key(|hit| hit.line);
            hits.extend(file_hits);
        }

        info!("found {} usages of {name}", hits.len());
        Ok(hits)
    }

    /// Distinct files containing at least one usage of `name`.
    pub fn find_usage_files(&self, name: &str) -> Result<BTreeSet<PathBuf>> {
        Ok(self
            .find_usage(name)?
            .into_iter()
            .map(|hit| hit.file)
            .collect())
    }

    /// Source files for the ecosystem, sorted by name within each directory.
    fn source_files(&self) -> Vec<PathBuf> {
        let extensions = self.ecosystem.source_extensions();

        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_skipped_dir(entry))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| extensions.contains(&ext))
            })
            .map(|entry| entry.into_path())
            .collect()
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

fn match_patterns(
    patterns: &[UsagePattern],
    content: &str,
    relative: &Path,
) -> Vec<UsageHit> {
    let mut hits = vec![];

    for pattern in patterns {
        for caps in pattern.regex.captures_iter(content) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let token = caps.name("token").unwrap_or(whole);
            let (line, text) = line_at(content, whole.start());

            hits.push(UsageHit {
                file: relative.to_path_buf(),
                line,
                context: text.trim().to_string(),
                token: token.as_str().to_string(),
                kind: pattern.kind,
            });
        }
    }

    hits
}

/// 1-based line number and full text of the line containing `offset`.
pub fn line_at(content: &str, offset: usize) -> (usize, &str) {
    let line = content[..offset].matches('\n').count() + 1;
    let start = content[..offset].rfind('\n').map_or(0, |i| i + 1);
    let end = content[offset..]
        .find('\n')
        .map_or(content.len(), |i| offset + i);
    (line, &content[start..end])
}

fn line_text(content: &str, line: usize) -> &str {
    content.lines().nth(line.saturating_sub(1)).unwrap_or_default()
}
