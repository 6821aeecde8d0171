//! GitHub pull requests through octocrab.
use async_trait::async_trait;
use log::*;
use octocrab::Octocrab;
use secrecy::{ExposeSecret, SecretString};

use crate::{
    error::Result,
    forge::{CreatePrRequest, PullRequest, PullRequestCreator, RemoteRepo},
};

pub struct Github {
    remote: RemoteRepo,
    instance: Octocrab,
}

impl Github {
    /// Create a GitHub client authenticated with a personal access token.
    pub fn new(remote: RemoteRepo, token: &SecretString) -> Result<Self> {
        let instance = Octocrab::builder()
            .personal_token(token.expose_secret().to_string())
            .build()?;

        Ok(Self { remote, instance })
    }
}

#[async_trait]
impl PullRequestCreator for Github {
    async fn create_pr(&self, req: CreatePrRequest) -> Result<PullRequest> {
        info!(
            "opening pull request on {}: {} -> {}",
            self.remote, req.head_branch, req.base_branch
        );

        let pr = self
            .instance
            .pulls(&self.remote.owner, &self.remote.repo)
            .create(req.title, req.head_branch, req.base_branch)
            .body(req.body)
            .send()
            .await?;

        Ok(PullRequest {
            number: pr.number,
            url: pr.html_url.map(|u| u.to_string()).unwrap_or_default(),
        })
    }
}
