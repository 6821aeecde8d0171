//! End-to-end upgrade workflow.
//!
//! scan -> rank -> select -> usage and impact -> advice -> (dry run stops
//! here) -> branch -> manifest update -> tests -> commit -> run tests ->
//! push -> pull request. Any failing step ends the run with an unsuccessful
//! [`WorkflowResult`]; nothing is retried.
use log::*;
use std::path::Path;

use crate::{
    advisor::{ChangedApi, ProjectInfo, UpgradeAdvisor, create_advisor},
    audit::{NpmAudit, VulnerabilitySource},
    candidate::{UpgradeCandidate, rank, select_by_name, select_highest},
    config::AppConfig,
    error::{DepsaurusError, Result},
    forge::{
        CreatePrRequest, PullRequestCreator, github::Github,
        parse_github_remote,
    },
    impact::{breaking_change_report, summarize},
    manifest::ManifestHandler,
    registry::{RegistryClient, VersionSource},
    repo::{DEFAULT_REMOTE, Repository, upgrade_branch_name},
    scanner::DependencyScanner,
    testgen::TestGenerator,
    usage::{
        UsageLocator,
        jar::{MavenJarPackages, PackageSource},
    },
};

/// Everything surfaced to the user about one run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowResult {
    pub success: bool,
    pub message: String,
    pub dependency: Option<UpgradeCandidate>,
    pub branch_name: Option<String>,
    pub pr_number: Option<u64>,
    pub pr_url: Option<String>,
}

impl WorkflowResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            dependency: None,
            branch_name: None,
            pr_number: None,
            pr_url: None,
        }
    }
}

/// A failed step, already worded for the user.
type Step<T> = std::result::Result<T, String>;

/// External services the workflow talks to.
pub struct Collaborators {
    pub versions: Box<dyn VersionSource>,
    pub vulnerabilities: Box<dyn VulnerabilitySource>,
    pub advisor: Box<dyn UpgradeAdvisor>,
    /// Java packages of JVM dependencies, used to widen the usage scan
    pub packages: Box<dyn PackageSource>,
    /// Resolved from the `origin` remote when not provided
    pub forge: Option<Box<dyn PullRequestCreator>>,
}

impl Collaborators {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            versions: Box::new(RegistryClient::new(config)?),
            vulnerabilities: Box::new(NpmAudit::new(config.process_timeout)),
            advisor: create_advisor(config)?,
            packages: Box::new(MavenJarPackages::new(config.process_timeout)),
            forge: None,
        })
    }
}

pub struct UpgradeWorkflow<'a> {
    config: &'a AppConfig,
    scanner: DependencyScanner,
    advisor: Box<dyn UpgradeAdvisor>,
    packages: Box<dyn PackageSource>,
    forge: Option<Box<dyn PullRequestCreator>>,
}

impl<'a> UpgradeWorkflow<'a> {
    pub fn new(config: &'a AppConfig, collaborators: Collaborators) -> Self {
        let scanner = DependencyScanner::new(
            &config.repo_path,
            collaborators.versions,
            collaborators.vulnerabilities,
        );

        Self {
            config,
            scanner,
            advisor: collaborators.advisor,
            packages: collaborators.packages,
            forge: collaborators.forge,
        }
    }

    pub async fn run(&self) -> WorkflowResult {
        match self.execute().await {
            Ok(result) => result,
            Err(message) => {
                error!("{message}");
                WorkflowResult::failure(message)
            }
        }
    }

    async fn execute(&self) -> Step<WorkflowResult> {
        let root = self.config.repo_path.as_path();

        info!("scanning repository for dependencies");
        let report = self.scanner.scan().await;
        if report.degraded_lookups > 0 {
            warn!(
                "{} lookups failed and fell back to defaults",
                report.degraded_lookups
            );
        }
        if report.failed_lookups > 0 {
            error!(
                "{} lookups could not be attempted, see errors above",
                report.failed_lookups
            );
        }

        let candidates = rank(&report.dependencies, self.config.min_severity);
        if candidates.is_empty() {
            return Err("No upgrade candidates found".into());
        }
        info!("found {} upgrade candidates", candidates.len());

        let candidate = match &self.config.dependency {
            Some(name) => select_by_name(&candidates, name),
            None => select_highest(&candidates)
                .ok_or_else(|| DepsaurusError::not_found("any dependency")),
        }
        .map_err(|e| e.to_string())?
        .clone();

        info!(
            "selected {} (current: {}, target: {}, priority: {})",
            candidate.name,
            candidate.current_version,
            candidate.latest_version,
            candidate.priority
        );

        info!("analyzing code impact");
        let packages = if candidate.ecosystem.is_jvm() {
            self.packages
                .packages(&candidate.name, &candidate.current_version)
                .await
                .into_value()
        } else {
            vec![]
        };
        let hits = UsageLocator::new(root, candidate.ecosystem)
            .with_packages(&packages)
            .find_usage(&candidate.name)
            .map_err(|e| format!("Failed to locate usages: {e}"))?;
        let impact =
            summarize(root, &candidate.name, hits, self.config.max_snippets);
        info!(
            "{} usages across {} files",
            impact.hits.len(),
            impact.affected_files.len()
        );

        let breaking = breaking_change_report(
            root,
            &candidate,
            impact.snippets.clone(),
            self.scanner.versions(),
        )
        .await;
        debug!(
            "{} earlier upgrades, {} intermediate versions",
            breaking.upgrade_commits.len(),
            breaking.intermediate_versions.len()
        );

        let project = ProjectInfo {
            name: project_name(root),
            project_type: report.ecosystem,
        };

        info!("requesting upgrade strategy");
        let strategy = self
            .advisor
            .analyze_upgrade_strategy(&project, &candidate, &impact.snippets)
            .await
            .map_err(|e| format!("Failed to get upgrade strategy: {e}"))?;
        info!("upgrade strategy:\n{strategy}");

        info!("predicting code changes");
        let code_changes = self
            .advisor
            .predict_code_changes(&candidate, &impact.snippets)
            .await
            .map_err(|e| format!("Failed to predict code changes: {e}"))?;
        info!("predicted code changes:\n{code_changes}");

        let branch_name =
            upgrade_branch_name(&candidate.name, &candidate.latest_version);

        if self.config.dry_run {
            return Ok(WorkflowResult {
                success: true,
                message: format!(
                    "Dry run: would {} on branch {branch_name}",
                    lowercase_first(&candidate.title())
                ),
                dependency: Some(candidate),
                branch_name: Some(branch_name),
                pr_number: None,
                pr_url: None,
            });
        }

        let repo = Repository::open(root)
            .map_err(|e| format!("Failed to open repository: {e}"))?;

        repo.create_branch(&branch_name)
            .and_then(|_| repo.switch_branch(&branch_name))
            .map_err(|e| format!("Failed to create branch: {e}"))?;
        info!("on branch {branch_name}");

        let updated = ManifestHandler::new(candidate.ecosystem)
            .update(
                root,
                &candidate.name,
                &candidate.latest_version,
                self.config.process_timeout,
            )
            .await
            .map_err(|e| format!("Failed to update dependency: {e}"))?;
        if !updated {
            return Err("Failed to update dependency".into());
        }
        info!("updated {} to {}", candidate.name, candidate.latest_version);

        info!("generating tests");
        let changed_apis = impact
            .hits
            .iter()
            .map(|hit| ChangedApi {
                name: hit.token.clone(),
                context: hit.context.clone(),
            })
            .collect::<Vec<ChangedApi>>();
        let suggested_tests = self
            .advisor
            .generate_test_cases(&candidate.name, &changed_apis)
            .await
            .map_err(|e| format!("Failed to generate test cases: {e}"))?;
        info!("suggested test cases:\n{suggested_tests}");

        let generator = TestGenerator::new(root);
        let suite = generator
            .generate(
                &candidate.name,
                &impact.hits,
                &breaking.breaking_changes(),
            )
            .map_err(|e| format!("Failed to write test files: {e}"))?;
        let test_file = generator
            .write(&suite)
            .map_err(|e| format!("Failed to write test files: {e}"))?;

        commit_changes(&repo, &candidate.title())
            .map_err(|e| format!("Failed to commit changes: {e}"))?;

        let test_files = suite.files_to_run(test_file);
        info!(
            "running the generated test and {} existing test files",
            suite.existing_tests.len()
        );
        let test_report = generator
            .run(&test_files, self.config.process_timeout)
            .await;
        if test_report.success {
            info!("tests passed");
        } else {
            warn!("tests failed, continuing with the pull request");
        }

        let token = self
            .config
            .secrets
            .github_token
            .as_ref()
            .ok_or("Failed to push branch: GITHUB_TOKEN is not set")?;

        let github;
        let forge: &dyn PullRequestCreator = match &self.forge {
            Some(forge) => forge.as_ref(),
            None => {
                github = github_for(&repo, token)
                    .map_err(|e| format!("Failed to create PR: {e}"))?;
                &github
            }
        };

        repo.push_branch(&branch_name, token)
            .map_err(|e| format!("Failed to push branch: {e}"))?;
        info!("pushed {branch_name}");

        let body = self
            .advisor
            .create_pr_description(&candidate, &code_changes, &test_report)
            .await
            .map_err(|e| format!("Failed to create PR description: {e}"))?;

        let pr = forge
            .create_pr(CreatePrRequest {
                title: candidate.title(),
                body,
                head_branch: branch_name.clone(),
                base_branch: self.config.base_branch.clone(),
            })
            .await
            .map_err(|e| format!("Failed to create PR: {e}"))?;
        info!("created pull request #{}: {}", pr.number, pr.url);

        Ok(WorkflowResult {
            success: true,
            message: format!("Created PR: {}", pr.url),
            dependency: Some(candidate),
            branch_name: Some(branch_name),
            pr_number: Some(pr.number),
            pr_url: Some(pr.url),
        })
    }
}

/// Stage and commit everything; a clean tree is left alone.
fn commit_changes(
    repo: &Repository,
    message: &str,
) -> crate::result::Result<()> {
    if !repo.is_dirty()? {
        info!("working tree is clean, nothing to commit");
        return Ok(());
    }
    repo.add_all()?;
    repo.commit(message)?;
    info!("committed: {message}");
    Ok(())
}

fn github_for(
    repo: &Repository,
    token: &secrecy::SecretString,
) -> crate::result::Result<Github> {
    let url = repo.remote_url(DEFAULT_REMOTE)?;
    let remote = parse_github_remote(&url)?;
    Ok(Github::new(remote, token)?)
}

fn project_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| root.display().to_string())
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
