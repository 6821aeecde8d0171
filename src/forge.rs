//! Pull request creation on the hosting forge.
use async_trait::async_trait;
use git_url_parse::{GitUrl, Scheme};

use crate::error::{DepsaurusError, Result};

pub mod github;

pub const GITHUB_HOST: &str = "github.com";

/// Owner and repository name of a GitHub remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepo {
    pub owner: String,
    pub repo: String,
}

impl std::fmt::Display for RemoteRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Parse `https://github.com/<owner>/<repo>[.git]` or
/// `git@github.com:<owner>/<repo>[.git]`.
pub fn parse_github_remote(url: &str) -> Result<RemoteRepo> {
    let invalid = || DepsaurusError::InvalidRemoteUrl(url.to_string());

    let parsed = GitUrl::parse(url).map_err(|_| invalid())?;

    if !matches!(parsed.scheme, Scheme::Https | Scheme::Ssh) {
        return Err(invalid());
    }

    if parsed.host.as_deref() != Some(GITHUB_HOST) {
        return Err(invalid());
    }

    let owner = parsed.owner.filter(|o| !o.is_empty()).ok_or_else(invalid)?;
    if parsed.name.is_empty() || parsed.fullname.matches('/').count() != 1 {
        return Err(invalid());
    }

    Ok(RemoteRepo {
        owner,
        repo: parsed.name,
    })
}

/// Pull request to open for an upgrade branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePrRequest {
    pub title: String,
    pub body: String,
    pub head_branch: String,
    pub base_branch: String,
}

/// An opened pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub url: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestCreator {
    async fn create_pr(&self, req: CreatePrRequest) -> Result<PullRequest>;
}
