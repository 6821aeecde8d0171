//! Impact summaries and breaking-change reports for a selected upgrade.
use log::*;
use std::{
    collections::{BTreeSet, HashSet},
    fs,
    path::{Path, PathBuf},
};

use crate::{
    candidate::UpgradeCandidate,
    ecosystem::Ecosystem,
    manifest::manifest_path,
    registry::VersionSource,
    repo::{Repository, UpgradeCommit},
    usage::UsageHit,
    version::{UpdateClassification, classify},
};

/// Default cap on snippets collected for one dependency.
pub const DEFAULT_MAX_SNIPPETS: usize = 10;
/// Lines of context shown before a hit.
pub const LINES_BEFORE: usize = 5;
/// Lines of context shown after a hit.
pub const LINES_AFTER: usize = 15;
/// Earlier upgrade commits included in a report.
pub const MAX_UPGRADE_COMMITS: usize = 5;

/// A window of source around a usage hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSnippet {
    /// Relative to the repository root
    pub file: PathBuf,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactSummary {
    pub dependency: String,
    pub hits: Vec<UsageHit>,
    pub snippets: Vec<CodeSnippet>,
    pub affected_files: BTreeSet<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakingChangeReport {
    pub dependency: String,
    pub current_version: String,
    pub target_version: String,
    /// Size of the jump, used as a risk label
    pub risk: UpdateClassification,
    pub snippets: Vec<CodeSnippet>,
    /// Newest first
    pub upgrade_commits: Vec<UpgradeCommit>,
    /// Published npm versions strictly between current and target
    pub intermediate_versions: Vec<String>,
}

impl BreakingChangeReport {
    /// Major releases crossed by the upgrade, described one per line. Empty
    /// unless the jump is a major one.
    pub fn breaking_changes(&self) -> Vec<String> {
        if self.risk != UpdateClassification::Major {
            return vec![];
        }

        let mut majors = self
            .intermediate_versions
            .iter()
            .filter_map(|v| semver::Version::parse(v).ok())
            .filter(|v| v.minor == 0 && v.patch == 0 && v.pre.is_empty())
            .map(|v| v.to_string())
            .collect::<Vec<String>>();

        if !majors.contains(&self.target_version) {
            majors.push(self.target_version.clone());
        }

        majors
            .into_iter()
            .map(|v| format!("{} {v} is a major release", self.dependency))
            .collect()
    }
}

/// One snippet for the first hit of each file, in hit order, stopping at
/// `max`. Each file is read once; unreadable files are skipped.
pub fn extract_snippets(
    root: &Path,
    hits: &[UsageHit],
    max: usize,
) -> Vec<CodeSnippet> {
    let mut seen = HashSet::new();
    let mut snippets = vec![];

    for hit in hits {
        if snippets.len() >= max {
            break;
        }
        if !seen.insert(hit.file.clone()) {
            continue;
        }

        let content = match fs::read_to_string(root.join(&hit.file)) {
            Ok(content) => content,
            Err(err) => {
                debug!("no snippet for {}: {err}", hit.file.display());
                continue;
            }
        };

        let lines = content.lines().collect::<Vec<&str>>();
        if lines.is_empty() {
            continue;
        }

        let start_line = hit.line.saturating_sub(LINES_BEFORE).max(1);
        let end_line = (hit.line + LINES_AFTER).min(lines.len());
        if start_line > end_line {
            continue;
        }

        snippets.push(CodeSnippet {
            file: hit.file.clone(),
            start_line,
            end_line,
            text: lines[start_line - 1..end_line].join("\n"),
        });
    }

    snippets
}

pub fn affected_files(hits: &[UsageHit]) -> BTreeSet<PathBuf> {
    hits.iter().map(|hit| hit.file.clone()).collect()
}

pub fn summarize(
    root: &Path,
    name: &str,
    hits: Vec<UsageHit>,
    max: usize,
) -> ImpactSummary {
    let snippets = extract_snippets(root, &hits, max);
    let affected_files = affected_files(&hits);

    ImpactSummary {
        dependency: name.to_string(),
        hits,
        snippets,
        affected_files,
    }
}

/// Versions in `published` strictly between `current` and `target` in
/// semver order. Any unparseable bound yields an empty list.
pub fn intermediate_versions(
    published: &[String],
    current: &str,
    target: &str,
) -> Vec<String> {
    let (Ok(current), Ok(target)) =
        (semver::Version::parse(current), semver::Version::parse(target))
    else {
        return vec![];
    };

    let mut between = published
        .iter()
        .filter_map(|v| semver::Version::parse(v).ok())
        .filter(|v| *v > current && *v < target)
        .collect::<Vec<semver::Version>>();
    between.sort();
    between.into_iter().map(|v| v.to_string()).collect()
}

/// Collect everything known about the risk of upgrading `candidate`.
pub async fn breaking_change_report(
    root: &Path,
    candidate: &UpgradeCandidate,
    snippets: Vec<CodeSnippet>,
    versions: &dyn VersionSource,
) -> BreakingChangeReport {
    let upgrade_commits = prior_upgrades(root, candidate);

    let intermediate_versions = if candidate.ecosystem == Ecosystem::Npm {
        let published =
            versions.npm_versions(&candidate.name).await.into_value();
        intermediate_versions(
            &published,
            &candidate.current_version,
            &candidate.latest_version,
        )
    } else {
        vec![]
    };

    BreakingChangeReport {
        dependency: candidate.name.clone(),
        current_version: candidate.current_version.clone(),
        target_version: candidate.latest_version.clone(),
        risk: classify(
            candidate.ecosystem,
            &candidate.current_version,
            &candidate.latest_version,
        ),
        snippets,
        upgrade_commits,
        intermediate_versions,
    }
}

fn prior_upgrades(
    root: &Path,
    candidate: &UpgradeCandidate,
) -> Vec<UpgradeCommit> {
    let Some(manifest) = manifest_path(root, candidate.ecosystem) else {
        return vec![];
    };

    let commits = Repository::open(root).and_then(|repo| {
        repo.upgrade_commits(&manifest, &candidate.name, MAX_UPGRADE_COMMITS)
    });

    match commits {
        Ok(commits) => commits,
        Err(err) => {
            debug!("no upgrade history for {}: {err}", candidate.name);
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        registry::MockVersionSource,
        result::Outcome,
        test_helpers::{commit_file, create_test_candidate, init_test_repo},
        usage::UsageKind,
    };
    use tempfile::TempDir;

    fn hit(file: &str, line: usize) -> UsageHit {
        UsageHit {
            file: PathBuf::from(file),
            line,
            context: String::new(),
            token: "x".into(),
            kind: UsageKind::Import,
        }
    }

    fn numbered_lines(count: usize) -> String {
        (1..=count).map(|i| format!("line {i}\n")).collect()
    }

    #[test]
    fn snippet_window_is_clamped() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.js"), numbered_lines(40)).unwrap();
        fs::write(temp_dir.path().join("b.js"), numbered_lines(8)).unwrap();

        let hits = vec![hit("a.js", 20), hit("b.js", 2)];
        let snippets =
            extract_snippets(temp_dir.path(), &hits, DEFAULT_MAX_SNIPPETS);

        assert_eq!(snippets.len(), 2);
        assert_eq!((snippets[0].start_line, snippets[0].end_line), (15, 35));
        assert!(snippets[0].text.starts_with("line 15\n"));
        assert!(snippets[0].text.ends_with("line 35"));
        assert_eq!((snippets[1].start_line, snippets[1].end_line), (1, 8));
    }

    #[test]
    fn one_snippet_per_file_up_to_max() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["a.py", "b.py", "c.py"] {
            fs::write(temp_dir.path().join(name), numbered_lines(3)).unwrap();
        }

        let hits = vec![
            hit("a.py", 1),
            hit("a.py", 3),
            hit("b.py", 2),
            hit("c.py", 1),
        ];
        let snippets = extract_snippets(temp_dir.path(), &hits, 2);
        let files = snippets.iter().map(|s| s.file.clone()).collect::<Vec<_>>();
        assert_eq!(files, vec![PathBuf::from("a.py"), PathBuf::from("b.py")]);
        assert_eq!(snippets[0].start_line, 1);
    }

    #[test]
    fn missing_files_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let snippets =
            extract_snippets(temp_dir.path(), &[hit("gone.js", 1)], 10);
        assert!(snippets.is_empty());
    }

    #[test]
    fn summary_collects_distinct_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.js"), numbered_lines(3)).unwrap();
        let hits = vec![hit("b.js", 1), hit("a.js", 1), hit("b.js", 2)];

        let summary = summarize(
            temp_dir.path(),
            "left-pad",
            hits,
            DEFAULT_MAX_SNIPPETS,
        );
        assert_eq!(summary.dependency, "left-pad");
        assert_eq!(summary.hits.len(), 3);
        assert_eq!(
            summary.affected_files.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("a.js"), PathBuf::from("b.js")]
        );
        assert_eq!(summary.snippets.len(), 1);
    }

    #[test]
    fn intermediate_versions_are_strictly_between() {
        let published =
            ["1.0.0", "1.3.0", "1.1.0", "1.2.0-beta.1", "2.0.0", "junk"]
                .map(String::from);
        assert_eq!(
            intermediate_versions(&published, "1.0.0", "2.0.0"),
            vec!["1.1.0", "1.2.0-beta.1", "1.3.0"]
        );
        assert!(
            intermediate_versions(&published, "latest", "2.0.0").is_empty()
        );
    }

    #[test]
    fn breaking_changes_list_crossed_majors() {
        let report = BreakingChangeReport {
            dependency: "react".into(),
            current_version: "16.14.0".into(),
            target_version: "18.2.0".into(),
            risk: UpdateClassification::Major,
            snippets: vec![],
            upgrade_commits: vec![],
            intermediate_versions: vec![
                "17.0.0".into(),
                "17.0.2".into(),
                "18.0.0".into(),
            ],
        };
        assert_eq!(
            report.breaking_changes(),
            vec![
                "react 17.0.0 is a major release",
                "react 18.0.0 is a major release",
                "react 18.2.0 is a major release",
            ]
        );

        let minor = BreakingChangeReport {
            risk: UpdateClassification::Minor,
            ..report
        };
        assert!(minor.breaking_changes().is_empty());
    }

    #[tokio::test]
    async fn report_for_npm_candidate() {
        let temp_dir = TempDir::new().unwrap();
        let git = init_test_repo(temp_dir.path());
        commit_file(
            &git,
            "package.json",
            r#"{"dependencies":{"left-pad":"1.0.0"}}"#,
            "add left-pad",
        );
        commit_file(
            &git,
            "package.json",
            r#"{"dependencies":{"left-pad":"1.1.0"}}"#,
            "bump left-pad",
        );

        let mut versions = MockVersionSource::new();
        versions
            .expect_npm_versions()
            .times(1)
            .returning(|_| {
                Outcome::Success(vec![
                    "1.1.0".into(),
                    "1.2.0".into(),
                    "1.3.0".into(),
                ])
            });

        let candidate = create_test_candidate(
            "left-pad",
            "1.1.0",
            "1.3.0",
            Ecosystem::Npm,
        );
        let report = breaking_change_report(
            temp_dir.path(),
            &candidate,
            vec![],
            &versions,
        )
        .await;

        assert_eq!(report.risk, UpdateClassification::Minor);
        assert_eq!(report.intermediate_versions, vec!["1.2.0"]);
        assert_eq!(report.upgrade_commits.len(), 2);
        assert_eq!(report.upgrade_commits[0].summary, "bump left-pad");
    }

    #[tokio::test]
    async fn report_without_repository_or_registry() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("requirements.txt"), "flask==2.0.1\n")
            .unwrap();

        let mut versions = MockVersionSource::new();
        versions.expect_npm_versions().never();

        let candidate =
            create_test_candidate("flask", "2.0.1", "3.0.0", Ecosystem::Pip);
        let report = breaking_change_report(
            temp_dir.path(),
            &candidate,
            vec![],
            &versions,
        )
        .await;

        assert_eq!(report.risk, UpdateClassification::Major);
        assert!(report.upgrade_commits.is_empty());
        assert!(report.intermediate_versions.is_empty());
    }
}
