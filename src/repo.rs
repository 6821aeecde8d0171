//! Git repository operations for upgrade branches.
//!
//! This module wraps `git2::Repository` with the handful of operations the
//! upgrade workflow needs:
//!
//! - Branch creation and switching
//! - Dirty checks, staging and committing
//! - Pushing to `origin` with token credentials
//! - Reading the history of earlier upgrades of a dependency
//!
//! # Usage
//!
//! ```rust,ignore
//! let repo = Repository::open(Path::new("./my-app"))?;
//! repo.create_branch("upgrade-left-pad-to-1.3.0")?;
//! repo.switch_branch("upgrade-left-pad-to-1.3.0")?;
//! // update manifests...
//! repo.add_all()?;
//! repo.commit("Upgrade left-pad from 1.2.3 to 1.3.0")?;
//! repo.push_branch("upgrade-left-pad-to-1.3.0", &token)?;
//! ```
use chrono::{DateTime, Utc};
use color_eyre::eyre::eyre;
use git2::{DiffOptions, RemoteCallbacks, Sort, StatusOptions};
use log::*;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;

use crate::result::Result;

/// Remote pushed to and inspected for the pull request target.
pub const DEFAULT_REMOTE: &str = "origin";

/// Username sent alongside a token when no `user.name` is configured.
const TOKEN_USERNAME: &str = "x-access-token";

/// A past commit that touched the manifest and mentions the dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeCommit {
    /// Abbreviated commit id
    pub short_hash: String,
    /// First line of the commit message
    pub summary: String,
    pub author: String,
    /// ISO-8601 commit time in UTC
    pub timestamp: String,
}

/// Branch name for an upgrade: `upgrade-<name>-to-<version>` with `@`
/// removed and `/` and `:` replaced by `-`.
///
/// # Example
/// ```ignore
/// assert_eq!(
///     upgrade_branch_name("@types/node", "20.0.0"),
///     "upgrade-types-node-to-20.0.0"
/// );
/// ```
pub fn upgrade_branch_name(name: &str, version: &str) -> String {
    let sanitized = name.replace('@', "").replace(['/', ':'], "-");
    format!("upgrade-{sanitized}-to-{version}")
}

/// Credentials callback answering every prompt with `user` and the token
/// as password. The token is never logged.
fn token_callbacks<'r>(user: String, token: String) -> RemoteCallbacks<'r> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username, _allowed| {
        git2::Cred::userpass_plaintext(&user, &token)
    });
    callbacks
}

/// High-level interface over a local working copy.
pub struct Repository {
    repo: git2::Repository,
}

impl Repository {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when `path` is not inside a git working copy.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = git2::Repository::open(path)?;
        Ok(Self { repo })
    }

    /// Short name of the checked out branch.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.repo.head()?;
        head.shorthand()
            .map(String::from)
            .ok_or_else(|| eyre!("HEAD is not a named branch"))
    }

    pub fn branch_exists(&self, branch: &str) -> bool {
        self.repo
            .find_branch(branch, git2::BranchType::Local)
            .is_ok()
    }

    /// Create a branch from the current HEAD.
    ///
    /// An existing branch with the same name is reused untouched, so a
    /// re-run continues on top of earlier work.
    pub fn create_branch(&self, branch: &str) -> Result<()> {
        if self.branch_exists(branch) {
            info!("reusing existing branch: {branch}");
            return Ok(());
        }

        info!("creating upgrade branch {branch}");
        let head = self.repo.head()?;
        let commit = head.peel_to_commit()?;
        self.repo.branch(branch, &commit, false)?;
        Ok(())
    }

    /// Check out `branch` and point HEAD at it.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch does not exist or uncommitted changes
    /// conflict with the checkout.
    pub fn switch_branch(&self, branch: &str) -> Result<()> {
        info!("checking out {branch}");
        let ref_name = format!("refs/heads/{branch}");
        let target = self.repo.revparse_single(&ref_name)?;
        self.repo.checkout_tree(&target, None)?;
        self.repo.set_head(&ref_name)?;
        Ok(())
    }

    /// True when tracked files are modified or untracked files exist.
    /// Ignored files do not count.
    pub fn is_dirty(&self) -> Result<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(!statuses.is_empty())
    }

    /// Stage every change in the working directory, like `git add .`.
    pub fn add_all(&self) -> Result<()> {
        debug!("staging manifest and generated test changes");
        let mut index = self.repo.index()?;
        index.add_all(["."], git2::IndexAddOption::DEFAULT, None)?;
        index.update_all(["."], None)?;
        index.write()?;
        Ok(())
    }

    /// Commit the index on top of HEAD.
    ///
    /// Author and committer come from `user.name` and `user.email` in the
    /// git configuration.
    pub fn commit(&self, msg: &str) -> Result<()> {
        debug!("committing: {msg}");
        let config = self.repo.config()?.snapshot()?;
        let user = config.get_str("user.name")?;
        let email = config.get_str("user.email")?;
        debug!("committer {user} <{email}>");
        let mut index = self.repo.index()?;
        let oid = index.write_tree()?;
        let tree = self.repo.find_tree(oid)?;
        let parent = self.repo.head()?.peel_to_commit()?;
        let committer = git2::Signature::now(user, email)?;
        self.repo.commit(
            Some("HEAD"),
            &committer,
            &committer,
            msg,
            &tree,
            &[&parent],
        )?;
        Ok(())
    }

    /// Force-push a local branch to `origin`.
    pub fn push_branch(
        &self,
        branch: &str,
        token: &SecretString,
    ) -> Result<()> {
        info!("pushing {branch} to {DEFAULT_REMOTE}");
        let config = self.repo.config()?.snapshot()?;
        let user = config
            .get_string("user.name")
            .unwrap_or_else(|_| TOKEN_USERNAME.to_string());
        let token = token.expose_secret().to_string();
        let callbacks = token_callbacks(user, token);
        let mut options = git2::PushOptions::default();
        options.remote_callbacks(callbacks);

        let mut remote = self.repo.find_remote(DEFAULT_REMOTE)?;

        // leading + forces the update
        let refspec = format!("+refs/heads/{branch}");
        remote.push(&[refspec], Some(&mut options))?;

        Ok(())
    }

    /// URL of the named remote.
    pub fn remote_url(&self, name: &str) -> Result<String> {
        let remote = self.repo.find_remote(name)?;
        remote
            .url()
            .map(String::from)
            .ok_or_else(|| eyre!("remote {name} has no valid UTF-8 url"))
    }

    /// Most recent commits, newest first, that changed `manifest` and whose
    /// message mentions `name`.
    pub fn upgrade_commits(
        &self,
        manifest: &Path,
        name: &str,
        limit: usize,
    ) -> Result<Vec<UpgradeCommit>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

        let mut commits = vec![];

        for oid in revwalk {
            if commits.len() >= limit {
                break;
            }

            let commit = self.repo.find_commit(oid?)?;
            let message = commit.message().unwrap_or_default();
            if !message.contains(name) {
                continue;
            }

            if !self.touches_path(&commit, manifest)? {
                continue;
            }

            let timestamp =
                DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default();

            let id = commit.id().to_string();
            commits.push(UpgradeCommit {
                short_hash: id.chars().take(7).collect(),
                summary: commit.summary().unwrap_or_default().to_string(),
                author: commit.author().name().unwrap_or_default().to_string(),
                timestamp,
            });
        }

        debug!("found {} earlier upgrades of {name}", commits.len());
        Ok(commits)
    }

    fn touches_path(&self, commit: &git2::Commit, path: &Path) -> Result<bool> {
        let tree = commit.tree()?;
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree()?),
            Err(_) => None,
        };

        let mut opts = DiffOptions::new();
        opts.pathspec(path);
        let diff = self.repo.diff_tree_to_tree(
            parent_tree.as_ref(),
            Some(&tree),
            Some(&mut opts),
        )?;

        Ok(diff.deltas().len() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{commit_file, init_test_repo};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn builds_upgrade_branch_names() {
        assert_eq!(
            upgrade_branch_name("left-pad", "1.3.0"),
            "upgrade-left-pad-to-1.3.0"
        );
        assert_eq!(
            upgrade_branch_name("@types/node", "20.0.0"),
            "upgrade-types-node-to-20.0.0"
        );
        assert_eq!(
            upgrade_branch_name("com.google.guava:guava", "33.0.0-jre"),
            "upgrade-com.google.guava-guava-to-33.0.0-jre"
        );
    }

    #[test]
    fn creates_and_reuses_branches() {
        let temp_dir = TempDir::new().unwrap();
        let git = init_test_repo(temp_dir.path());
        commit_file(&git, "requirements.txt", "flask==2.0.1\n", "initial");

        let repo = Repository::open(temp_dir.path()).unwrap();
        assert_eq!(repo.current_branch().unwrap(), "main");

        repo.create_branch("upgrade-flask-to-3.0.0").unwrap();
        repo.switch_branch("upgrade-flask-to-3.0.0").unwrap();
        assert_eq!(repo.current_branch().unwrap(), "upgrade-flask-to-3.0.0");

        repo.create_branch("upgrade-flask-to-3.0.0").unwrap();
        assert!(repo.branch_exists("upgrade-flask-to-3.0.0"));
    }

    #[test]
    fn stages_and_commits_changes() {
        let temp_dir = TempDir::new().unwrap();
        let git = init_test_repo(temp_dir.path());
        commit_file(&git, "requirements.txt", "flask==2.0.1\n", "initial");

        let repo = Repository::open(temp_dir.path()).unwrap();
        assert!(!repo.is_dirty().unwrap());

        fs::write(temp_dir.path().join("requirements.txt"), "flask==3.0.0\n")
            .unwrap();
        fs::write(temp_dir.path().join("test_flask.py"), "def test(): pass\n")
            .unwrap();
        assert!(repo.is_dirty().unwrap());

        repo.add_all().unwrap();
        repo.commit("Upgrade flask from 2.0.1 to 3.0.0").unwrap();
        assert!(!repo.is_dirty().unwrap());

        let head = git.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.summary(), Some("Upgrade flask from 2.0.1 to 3.0.0"));
    }

    #[test]
    fn finds_prior_upgrade_commits() {
        let temp_dir = TempDir::new().unwrap();
        let git = init_test_repo(temp_dir.path());
        commit_file(&git, "requirements.txt", "flask==1.0.0\n", "add flask");
        commit_file(&git, "app.py", "import flask\n", "use flask in app");
        commit_file(
            &git,
            "requirements.txt",
            "flask==2.0.1\n",
            "bump flask to 2.0.1",
        );
        commit_file(
            &git,
            "requirements.txt",
            "flask==2.0.1\nrequests==2.0\n",
            "add requests",
        );

        let repo = Repository::open(temp_dir.path()).unwrap();
        let commits = repo
            .upgrade_commits(Path::new("requirements.txt"), "flask", 5)
            .unwrap();

        let summaries =
            commits.iter().map(|c| c.summary.as_str()).collect::<Vec<_>>();
        assert_eq!(summaries, vec!["bump flask to 2.0.1", "add flask"]);
        assert_eq!(commits[0].short_hash.len(), 7);
        assert_eq!(commits[0].author, "Depsaurus Test");
        assert!(commits[0].timestamp.contains('T'));

        let limited = repo
            .upgrade_commits(Path::new("requirements.txt"), "flask", 1)
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn reads_remote_url() {
        let temp_dir = TempDir::new().unwrap();
        let git = init_test_repo(temp_dir.path());
        git.remote(DEFAULT_REMOTE, "https://github.com/acme/app.git").unwrap();

        let repo = Repository::open(temp_dir.path()).unwrap();
        assert_eq!(
            repo.remote_url(DEFAULT_REMOTE).unwrap(),
            "https://github.com/acme/app.git"
        );
        assert!(repo.remote_url("upstream").is_err());
    }

    #[test]
    fn open_fails_outside_a_repository() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Repository::open(temp_dir.path()).is_err());
    }
}
