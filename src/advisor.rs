//! Language-model advice for an upgrade: strategy, code changes, tests and
//! the pull request description.
use async_trait::async_trait;
use clap::ValueEnum;
use log::*;
use secrecy::SecretString;
use serde::Serialize;
use strum::Display;

use crate::{
    candidate::UpgradeCandidate,
    config::AppConfig,
    ecosystem::Ecosystem,
    error::{DepsaurusError, Result},
    impact::CodeSnippet,
    testgen::TestRunReport,
};

pub mod anthropic;
pub mod openai;
pub mod prompts;

pub const SYSTEM_PROMPT: &str = "You are an AI assistant specialized in automated software dependency upgrades. \
Your task is to help developers identify, implement, and validate dependency updates \
while minimizing security risks and developer intervention.

You analyze dependency networks, predict code impacts, automate test creation, \
and help create pull requests to maintain modern, secure, and compliant software systems.

Be precise, technical, and focus on providing actionable insights.";

pub const MAX_TOKENS: u32 = 4000;
pub const TEMPERATURE: f64 = 0.7;

/// Language model provider.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
pub enum Model {
    #[default]
    Claude,
    Openai,
}

/// What the advisor is told about the project being upgraded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    pub name: String,
    pub project_type: Ecosystem,
}

/// A usage of the dependency whose API may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedApi {
    pub name: String,
    pub context: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpgradeAdvisor {
    async fn analyze_upgrade_strategy(
        &self,
        project: &ProjectInfo,
        candidate: &UpgradeCandidate,
        snippets: &[CodeSnippet],
    ) -> Result<String>;

    async fn predict_code_changes(
        &self,
        candidate: &UpgradeCandidate,
        snippets: &[CodeSnippet],
    ) -> Result<String>;

    async fn generate_test_cases(
        &self,
        name: &str,
        changed_apis: &[ChangedApi],
    ) -> Result<String>;

    async fn create_pr_description(
        &self,
        candidate: &UpgradeCandidate,
        code_changes: &str,
        test_report: &TestRunReport,
    ) -> Result<String>;
}

/// A single-turn chat completion: system prompt plus one user message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Advisor that renders the prompts and sends each one to a chat model.
pub struct PromptAdvisor<C: ChatCompletion> {
    chat: C,
}

impl<C: ChatCompletion> PromptAdvisor<C> {
    pub fn new(chat: C) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl<C: ChatCompletion> UpgradeAdvisor for PromptAdvisor<C> {
    async fn analyze_upgrade_strategy(
        &self,
        project: &ProjectInfo,
        candidate: &UpgradeCandidate,
        snippets: &[CodeSnippet],
    ) -> Result<String> {
        let prompt = prompts::upgrade_strategy(project, candidate, snippets)?;
        self.chat.complete(&prompt).await
    }

    async fn predict_code_changes(
        &self,
        candidate: &UpgradeCandidate,
        snippets: &[CodeSnippet],
    ) -> Result<String> {
        let prompt = prompts::code_changes(candidate, snippets)?;
        self.chat.complete(&prompt).await
    }

    async fn generate_test_cases(
        &self,
        name: &str,
        changed_apis: &[ChangedApi],
    ) -> Result<String> {
        let prompt = prompts::test_cases(name, changed_apis)?;
        self.chat.complete(&prompt).await
    }

    async fn create_pr_description(
        &self,
        candidate: &UpgradeCandidate,
        code_changes: &str,
        test_report: &TestRunReport,
    ) -> Result<String> {
        let prompt =
            prompts::pr_description(candidate, code_changes, test_report)?;
        self.chat.complete(&prompt).await
    }
}

fn require_key(key: &Option<SecretString>, env: &str) -> Result<SecretString> {
    key.clone().ok_or_else(|| {
        DepsaurusError::invalid_config(format!(
            "{env} is required for the selected model"
        ))
    })
}

/// Build the advisor for the configured model. Fails when its API key is
/// missing.
pub fn create_advisor(config: &AppConfig) -> Result<Box<dyn UpgradeAdvisor>> {
    info!("using {} advisor", config.model);

    match config.model {
        Model::Claude => {
            let key = require_key(
                &config.secrets.anthropic_api_key,
                "ANTHROPIC_API_KEY",
            )?;
            let chat = anthropic::Anthropic::new(key, config.http_timeout)?;
            Ok(Box::new(PromptAdvisor::new(chat)))
        }
        Model::Openai => {
            let key =
                require_key(&config.secrets.openai_api_key, "OPENAI_API_KEY")?;
            let chat = openai::OpenAi::new(key, config.http_timeout)?;
            Ok(Box::new(PromptAdvisor::new(chat)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Secrets,
        test_helpers::{create_test_app_config, create_vulnerable_candidate},
        testgen::TestFramework,
    };
    use tempfile::TempDir;

    #[test]
    fn missing_key_is_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_app_config(temp_dir.path());

        config.model = Model::Claude;
        let err = create_advisor(&config).err().unwrap();
        assert!(matches!(err, DepsaurusError::InvalidConfig(_)));
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));

        config.model = Model::Openai;
        config.secrets = Secrets {
            anthropic_api_key: Some(SecretString::from("sk-ant".to_string())),
            ..Secrets::default()
        };
        let err = create_advisor(&config).err().unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn builds_advisor_with_key() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_app_config(temp_dir.path());
        config.secrets.openai_api_key =
            Some(SecretString::from("sk-test".to_string()));
        config.model = Model::Openai;
        assert!(create_advisor(&config).is_ok());
    }

    #[test]
    fn model_names() {
        assert_eq!(Model::default(), Model::Claude);
        assert_eq!(Model::Openai.to_string(), "openai");
        assert_eq!(Model::from_str("claude", true).unwrap(), Model::Claude);
    }

    #[tokio::test]
    async fn each_operation_sends_one_prompt() {
        let candidate = create_vulnerable_candidate(
            "lodash",
            "4.17.15",
            "4.17.21",
            Ecosystem::Npm,
        );

        let mut chat = MockChatCompletion::new();
        chat.expect_complete()
            .withf(|p| p.contains("lodash from version 4.17.15 to 4.17.21"))
            .times(1)
            .returning(|_| Ok("replace _.pluck with _.map".into()));
        chat.expect_complete()
            .withf(|p| p.contains("Prototype Pollution in lodash"))
            .times(1)
            .returning(|_| Ok("## Upgrade lodash".into()));

        let advisor = PromptAdvisor::new(chat);
        let changes =
            advisor.predict_code_changes(&candidate, &[]).await.unwrap();
        assert_eq!(changes, "replace _.pluck with _.map");

        let report = TestRunReport {
            framework: TestFramework::Jest,
            success: true,
            output: "ok".into(),
            error: None,
        };
        let description = advisor
            .create_pr_description(&candidate, &changes, &report)
            .await
            .unwrap();
        assert_eq!(description, "## Upgrade lodash");
    }

    #[tokio::test]
    async fn provider_errors_propagate() {
        let mut chat = MockChatCompletion::new();
        chat.expect_complete()
            .returning(|_| Err(DepsaurusError::RateLimitExceeded));

        let advisor = PromptAdvisor::new(chat);
        let result = advisor.generate_test_cases("flask", &[]).await;
        assert!(matches!(result, Err(DepsaurusError::RateLimitExceeded)));
    }
}
