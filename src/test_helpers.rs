//! Common test helper functions shared across test modules.
//!
//! Fixtures for git repositories, dependencies and candidates so individual
//! test modules stay focused on behavior.
use git2::{Oid, RepositoryInitOptions, Signature};
use std::{fs, path::Path};

use crate::{
    audit::{Severity, Vulnerability},
    candidate::UpgradeCandidate,
    config::AppConfig,
    ecosystem::Ecosystem,
    manifest::{Dependency, DependencyKind},
    version::classify,
};

/// Initialize a repository on `main` with a configured committer and no
/// commits.
pub fn init_test_repo(path: &Path) -> git2::Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = git2::Repository::init_opts(path, &opts).unwrap();
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Depsaurus Test").unwrap();
    config.set_str("user.email", "test@depsaurus.dev").unwrap();
    repo
}

/// Write `content` to `relative` and commit it on HEAD.
pub fn commit_file(
    repo: &git2::Repository,
    relative: &str,
    content: &str,
    message: &str,
) -> Oid {
    let workdir = repo.workdir().unwrap();
    let path = workdir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(relative)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let signature =
        Signature::now("Depsaurus Test", "test@depsaurus.dev").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents = parent.iter().collect::<Vec<_>>();

    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap()
}

/// Dependency already enriched with a latest version and classification.
pub fn create_test_dependency(
    name: &str,
    current: &str,
    latest: &str,
    ecosystem: Ecosystem,
) -> Dependency {
    let mut dep =
        Dependency::new(name, current, ecosystem, DependencyKind::Production);
    dep.latest_version = latest.into();
    dep.update_type = classify(ecosystem, current, latest);
    dep
}

/// Candidate without vulnerabilities.
pub fn create_test_candidate(
    name: &str,
    current: &str,
    latest: &str,
    ecosystem: Ecosystem,
) -> UpgradeCandidate {
    let dep = create_test_dependency(name, current, latest, ecosystem);
    UpgradeCandidate::from_dependency(&dep, Severity::Medium)
}

/// Candidate carrying one high severity advisory.
pub fn create_vulnerable_candidate(
    name: &str,
    current: &str,
    latest: &str,
    ecosystem: Ecosystem,
) -> UpgradeCandidate {
    let mut dep = create_test_dependency(name, current, latest, ecosystem);
    dep.vulnerabilities.push(Vulnerability {
        severity: Severity::High,
        description: format!("Prototype Pollution in {name}"),
        fixed_in: Some(latest.into()),
    });
    UpgradeCandidate::from_dependency(&dep, Severity::Medium)
}

/// AppConfig rooted at `path` with defaults everywhere else.
pub fn create_test_app_config(path: &Path) -> AppConfig {
    AppConfig::builder().repo_path(path).build().unwrap()
}
