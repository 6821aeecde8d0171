//! CLI argument parsing.
use clap::Parser;
use secrecy::SecretString;
use std::path::PathBuf;

use crate::{
    advisor::Model,
    audit::Severity,
    config::{AppConfig, FileConfig, Secrets},
    error::Result,
};

/// Find outdated or vulnerable dependencies, analyze their usage and open
/// an upgrade pull request.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long)]
    /// Path to the repository to upgrade.
    pub repo: PathBuf,

    #[arg(long)]
    /// Upgrade this dependency instead of the highest priority candidate.
    pub dependency: Option<String>,

    #[arg(long, value_enum, default_value_t = Severity::Medium)]
    /// Minimum vulnerability severity that makes an upgrade high priority.
    pub min_severity: Severity,

    #[arg(long, value_enum, default_value_t = Model::Claude)]
    /// Language model used for upgrade advice.
    pub model: Model,

    #[arg(long, default_value_t = false)]
    /// Analyze and print the plan without touching the repository.
    pub dry_run: bool,

    #[arg(long)]
    /// Maximum number of code snippets sent to the model (default 10).
    pub max_snippets: Option<usize>,

    #[arg(long)]
    /// Branch pull requests are opened against (default main).
    pub base_branch: Option<String>,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    /// GitHub token used to push and open the pull request.
    pub github_token: Option<String>,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    /// Anthropic API key, required with --model claude.
    pub anthropic_api_key: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    /// OpenAI API key, required with --model openai.
    pub openai_api_key: Option<String>,

    #[arg(long, default_value_t = false)]
    /// Enable debug logging.
    pub debug: bool,
}

fn secret(value: &Option<String>) -> Option<SecretString> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| SecretString::from(v.to_string()))
}

impl Args {
    /// Overlay these arguments on the file config.
    pub fn app_config(&self, file: &FileConfig) -> Result<AppConfig> {
        let mut builder = AppConfig::builder();
        builder
            .file_config(file)
            .repo_path(self.repo.clone())
            .dependency(self.dependency.clone())
            .min_severity(self.min_severity)
            .model(self.model)
            .dry_run(self.dry_run)
            .secrets(Secrets {
                github_token: secret(&self.github_token),
                anthropic_api_key: secret(&self.anthropic_api_key),
                openai_api_key: secret(&self.openai_api_key),
            });

        if let Some(max_snippets) = self.max_snippets {
            builder.max_snippets(max_snippets);
        }

        if let Some(base_branch) = &self.base_branch {
            builder.base_branch(base_branch.clone());
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DepsaurusError;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(
            std::iter::once("depsaurus").chain(args.iter().copied()),
        )
        .unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&["--repo", "."]);
        assert_eq!(args.repo, PathBuf::from("."));
        assert_eq!(args.min_severity, Severity::Medium);
        assert_eq!(args.model, Model::Claude);
        assert!(!args.dry_run);
        assert!(args.dependency.is_none());
        assert!(args.max_snippets.is_none());
    }

    #[test]
    fn repo_is_required() {
        assert!(Args::try_parse_from(["depsaurus"]).is_err());
    }

    #[test]
    fn parses_choices() {
        let args = parse(&[
            "--repo",
            "/tmp",
            "--dependency",
            "left-pad",
            "--min-severity",
            "critical",
            "--model",
            "openai",
            "--dry-run",
        ]);
        assert_eq!(args.dependency.as_deref(), Some("left-pad"));
        assert_eq!(args.min_severity, Severity::Critical);
        assert_eq!(args.model, Model::Openai);
        assert!(args.dry_run);

        let bad = Args::try_parse_from([
            "depsaurus",
            "--repo",
            ".",
            "--min-severity",
            "unknown",
        ]);
        assert!(bad.is_err());
    }

    #[test]
    fn cli_values_win_over_file_config() {
        let temp_dir = TempDir::new().unwrap();
        let repo = temp_dir.path().to_str().unwrap();
        let file = FileConfig {
            base_branch: "develop".into(),
            max_snippets: 3,
            ..FileConfig::default()
        };

        let args = parse(&[
            "--repo",
            repo,
            "--max-snippets",
            "7",
            "--github-token",
            "ghp_x",
        ]);
        let config = args.app_config(&file).unwrap();
        assert_eq!(config.max_snippets, 7);
        assert_eq!(config.base_branch, "develop");
        assert_eq!(
            config.secrets.github_token.unwrap().expose_secret(),
            "ghp_x"
        );

        let args = parse(&["--repo", repo, "--base-branch", "trunk"]);
        let config = args.app_config(&file).unwrap();
        assert_eq!(config.base_branch, "trunk");
        assert_eq!(config.max_snippets, 3);
    }

    #[test]
    fn rejects_missing_repository() {
        let args = parse(&["--repo", "/no/such/checkout"]);
        let result = args.app_config(&FileConfig::default());
        assert!(matches!(result, Err(DepsaurusError::InvalidArgs(_))));
    }
}
