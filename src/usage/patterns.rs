//! Usage patterns built from a dependency name.
use regex::Regex;

use crate::{
    ecosystem::Ecosystem,
    error::Result,
    manifest::split_coordinates,
    usage::UsageKind,
};

/// A compiled pattern. The `token` capture group, when present, is the
/// matched reference; otherwise the whole match is.
#[derive(Debug, Clone)]
pub struct UsagePattern {
    pub regex: Regex,
    pub kind: UsageKind,
}

impl UsagePattern {
    fn new(pattern: &str, kind: UsageKind) -> Result<Self> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            kind,
        })
    }
}

/// Python import name for a distribution name: lowercased, `-` and `.`
/// become `_`.
pub fn python_module_name(name: &str) -> String {
    name.to_lowercase().replace(['-', '.'], "_")
}

/// `spring-boot-starter` -> `springBootStarter`
pub fn to_camel_case(name: &str) -> String {
    let mut words = split_words(name);
    let Some(first) = words.next() else {
        return String::new();
    };
    std::iter::once(first.to_lowercase())
        .chain(words.map(capitalize))
        .collect()
}

/// `spring-boot-starter` -> `SpringBootStarter`
pub fn to_pascal_case(name: &str) -> String {
    split_words(name).map(capitalize).collect()
}

fn split_words(name: &str) -> impl Iterator<Item = &str> {
    name.split(['-', '_', '.']).filter(|w| !w.is_empty())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Identifiers an artifact id may appear as in JVM source: the literal id
/// plus its camelCase and PascalCase forms, without duplicates.
pub fn artifact_candidates(artifact: &str) -> Vec<String> {
    let mut candidates = vec![artifact.to_string()];
    for candidate in [to_camel_case(artifact), to_pascal_case(artifact)] {
        if !candidate.is_empty() && !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Every pattern used to locate `name` in sources of `ecosystem`.
pub fn patterns_for(
    ecosystem: Ecosystem,
    name: &str,
) -> Result<Vec<UsagePattern>> {
    match ecosystem {
        Ecosystem::Npm => npm_patterns(name),
        Ecosystem::Pip => pip_patterns(name),
        Ecosystem::Maven | Ecosystem::Gradle => jvm_patterns(name),
        Ecosystem::Unknown => Ok(vec![]),
    }
}

fn npm_patterns(name: &str) -> Result<Vec<UsagePattern>> {
    // the package itself or any subpath of it
    let module = format!(r#"(?<token>{}(?:/[^'"]*)?)"#, regex::escape(name));

    [
        format!(r#"import\s+[^;'"]*?\s*from\s+['"]{module}['"]"#),
        format!(r#"import\s+['"]{module}['"]"#),
        format!(r#"require\(\s*['"]{module}['"]\s*\)"#),
        format!(r#"import\(\s*['"]{module}['"]\s*\)"#),
    ]
    .iter()
    .map(|p| UsagePattern::new(p, UsageKind::Import))
    .collect()
}

fn pip_patterns(name: &str) -> Result<Vec<UsagePattern>> {
    let module = regex::escape(&python_module_name(name));

    [
        format!(r"(?m)^[ \t]*import\s+(?<token>{module}(?:\.\w+)*)\b"),
        format!(r"(?m)^[ \t]*from\s+(?<token>{module}(?:\.\w+)*)\s+import\b"),
    ]
    .iter()
    .map(|p| UsagePattern::new(p, UsageKind::Import))
    .collect()
}

fn jvm_patterns(name: &str) -> Result<Vec<UsagePattern>> {
    let (group, artifact) = split_coordinates(name).unwrap_or(("", name));
    let mut patterns = vec![];

    if !group.is_empty() {
        patterns.push(UsagePattern::new(
            &format!(
                r"(?m)^[ \t]*import\s+(?:static\s+)?(?<token>{}(?:\.[\w*]+)*)",
                regex::escape(group)
            ),
            UsageKind::Import,
        )?);
    }

    for candidate in artifact_candidates(artifact) {
        patterns.push(UsagePattern::new(
            &format!(r"\b(?<token>{})\b", regex::escape(&candidate)),
            UsageKind::QualifiedReference,
        )?);
    }

    Ok(patterns)
}

/// One pattern matching any of `packages` as a whole dotted name, or
/// `None` when the list is empty. Longer names are tried first.
pub fn package_pattern(packages: &[String]) -> Result<Option<UsagePattern>> {
    if packages.is_empty() {
        return Ok(None);
    }

    let mut ordered = packages.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|package| std::cmp::Reverse(package.len()));
    let alternatives = ordered
        .iter()
        .map(|package| regex::escape(package))
        .collect::<Vec<_>>()
        .join("|");

    UsagePattern::new(
        &format!(r"\b(?<token>(?:{alternatives}))\b"),
        UsageKind::PackageReference,
    )
    .map(Some)
}
