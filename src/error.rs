//! Error taxonomy for scanning, upgrading and publishing dependency changes.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by depsaurus library code.
#[derive(Error, Debug)]
pub enum DepsaurusError {
    #[error("invalid command line: {0}")]
    InvalidArgs(String),

    #[error("bad depsaurus configuration: {0}")]
    InvalidConfig(String),

    #[error("Dependency {0} not found or doesn't need upgrade")]
    NotFound(String),

    #[error("pull request step failed: {0}")]
    ForgeError(String),

    #[error("origin is not a GitHub repository: {0}")]
    InvalidRemoteUrl(String),

    #[error("unreadable remote url: {0}")]
    GitUrlError(#[from] git_url_parse::GitUrlParseError),

    #[error("git: {0}")]
    GitError(#[from] git2::Error),

    #[error("network request failed: {0}")]
    NetworkError(String),

    #[error("credentials rejected: {0}")]
    AuthenticationError(String),

    #[error("API rate limit exceeded")]
    RateLimitExceeded,

    #[error("Command `{command}` failed: {message}")]
    ProcessError { command: String, message: String },

    #[error("Command `{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("not a semantic version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("rendering template: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("reading depsaurus.toml: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("json: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("pom.xml: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("usage pattern: {0}")]
    RegexError(#[from] regex::Error),

    #[error("registry url: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("reading jar: {0}")]
    JarError(#[from] zip::result::ZipError),

    #[error("Malformed manifest: {0}")]
    ManifestError(String),

    #[error("Python source parse error: {0}")]
    SyntaxTreeError(String),

    #[error(transparent)]
    Other(#[from] color_eyre::Report),
}

pub type Result<T> = std::result::Result<T, DepsaurusError>;

impl DepsaurusError {
    pub fn forge(msg: impl Into<String>) -> Self {
        Self::ForgeError(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// No upgradable dependency called `name`.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    pub fn process(
        command: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ProcessError {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Whether retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_)
                | Self::RateLimitExceeded
                | Self::Timeout { .. }
        )
    }
}

impl From<std::io::Error> for DepsaurusError {
    fn from(err: std::io::Error) -> Self {
        Self::Other(color_eyre::Report::from(err))
    }
}

/// Registry, audit and model provider HTTP failures.
impl From<reqwest::Error> for DepsaurusError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                Self::AuthenticationError(err.to_string())
            }
            Some(StatusCode::TOO_MANY_REQUESTS) => Self::RateLimitExceeded,
            _ => Self::NetworkError(err.to_string()),
        }
    }
}

impl From<reqwest::header::InvalidHeaderValue> for DepsaurusError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::AuthenticationError(format!(
            "api key is not a valid header: {err}"
        ))
    }
}

impl From<octocrab::Error> for DepsaurusError {
    fn from(err: octocrab::Error) -> Self {
        if let octocrab::Error::GitHub { source, .. } = &err
            && source.message.contains("rate limit")
        {
            return Self::RateLimitExceeded;
        }
        Self::ForgeError(format!("GitHub API error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_step() {
        let err = DepsaurusError::not_found("left-pad");
        assert_eq!(
            err.to_string(),
            "Dependency left-pad not found or doesn't need upgrade"
        );

        let err = DepsaurusError::Timeout {
            command: "npm audit --json".into(),
            seconds: 5,
        };
        assert_eq!(
            err.to_string(),
            "Command `npm audit --json` timed out after 5s"
        );

        assert_eq!(
            DepsaurusError::RateLimitExceeded.to_string(),
            "API rate limit exceeded"
        );

        let err =
            DepsaurusError::invalid_config("max_files must be positive");
        assert_eq!(
            err.to_string(),
            "bad depsaurus configuration: max_files must be positive"
        );
    }

    #[test]
    fn only_network_style_failures_are_transient() {
        assert!(DepsaurusError::RateLimitExceeded.is_transient());
        assert!(
            DepsaurusError::Timeout {
                command: "pytest".into(),
                seconds: 1
            }
            .is_transient()
        );
        assert!(!DepsaurusError::forge("no base branch").is_transient());
        assert!(
            !DepsaurusError::process("npm install", "exit status 1")
                .is_transient()
        );
    }

    #[test]
    fn converts_library_errors() {
        let err: DepsaurusError =
            semver::Version::parse("1.x").unwrap_err().into();
        assert!(matches!(err, DepsaurusError::InvalidVersion(_)));

        let err: DepsaurusError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, DepsaurusError::Other(_)));

        let err: DepsaurusError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, DepsaurusError::JsonParseError(_)));
    }
}
