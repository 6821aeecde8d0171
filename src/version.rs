//! Update classification between a declared and a published version.
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use strum::Display;

use crate::ecosystem::Ecosystem;

/// Leading release segment of a PEP 440-like version. Optional `v` prefix
/// and `N!` epoch are accepted and dropped.
static PEP440_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[vV]?(?:\d+!)?(?<release>\d+(?:\.\d+)*)").unwrap()
});

/// Leading dot-separated digits of a Maven/Gradle style version.
static NUMERIC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<major>\d+)(?:\.(?<minor>\d+))?(?:\.(?<patch>\d+))?")
        .unwrap()
});

/// Size of the change between a declared version and the latest one.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UpdateClassification {
    None,
    Patch,
    Minor,
    Major,
    #[default]
    Unknown,
}

/// Normalized (major, minor, patch) triple used for comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionTriple {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl VersionTriple {
    fn from_parts(parts: &[u64]) -> Self {
        Self {
            major: parts.first().copied().unwrap_or(0),
            minor: parts.get(1).copied().unwrap_or(0),
            patch: parts.get(2).copied().unwrap_or(0),
        }
    }
}

/// Parse a version with the grammar of the given ecosystem.
pub fn parse_version(ecosystem: Ecosystem, raw: &str) -> Option<VersionTriple> {
    let raw = raw.trim();
    match ecosystem {
        Ecosystem::Npm => parse_semver(raw),
        Ecosystem::Pip => parse_pep440(raw),
        Ecosystem::Maven | Ecosystem::Gradle | Ecosystem::Unknown => {
            parse_numeric(raw)
        }
    }
}

fn parse_semver(raw: &str) -> Option<VersionTriple> {
    semver::Version::parse(raw).ok().map(|v| VersionTriple {
        major: v.major,
        minor: v.minor,
        patch: v.patch,
    })
}

fn parse_pep440(raw: &str) -> Option<VersionTriple> {
    let caps = PEP440_REGEX.captures(raw)?;
    let parts = caps["release"]
        .split('.')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<Vec<u64>>>()?;
    Some(VersionTriple::from_parts(&parts))
}

fn parse_numeric(raw: &str) -> Option<VersionTriple> {
    let caps = NUMERIC_REGEX.captures(raw)?;
    let part = |name: &str| -> Option<u64> {
        match caps.name(name) {
            Some(m) => m.as_str().parse::<u64>().ok(),
            None => Some(0),
        }
    };
    Some(VersionTriple {
        major: part("major")?,
        minor: part("minor")?,
        patch: part("patch")?,
    })
}

/// Classify the update from `current` to `latest`.
///
/// Unparseable versions classify as [`UpdateClassification::Unknown`], which
/// is never fatal downstream.
pub fn classify(
    ecosystem: Ecosystem,
    current: &str,
    latest: &str,
) -> UpdateClassification {
    if current == latest {
        return UpdateClassification::None;
    }

    let (Some(current), Some(latest)) = (
        parse_version(ecosystem, current),
        parse_version(ecosystem, latest),
    ) else {
        return UpdateClassification::Unknown;
    };

    if current == latest {
        UpdateClassification::None
    } else if latest.major > current.major {
        UpdateClassification::Major
    } else if latest.minor > current.minor {
        UpdateClassification::Minor
    } else {
        UpdateClassification::Patch
    }
}
