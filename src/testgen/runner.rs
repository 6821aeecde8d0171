//! Running the project's test suite after an upgrade.
use log::*;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{process::run_command, testgen::TestFramework};

/// Outcome of one test run. Failing to start the runner is reported here
/// rather than as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRunReport {
    pub framework: TestFramework,
    pub success: bool,
    pub output: String,
    /// stderr of a failed run, or why the runner could not finish
    pub error: Option<String>,
}

/// Program and arguments that run the tests of `framework`.
pub fn test_command(
    root: &Path,
    framework: TestFramework,
    files: &[PathBuf],
) -> (String, Vec<String>) {
    let paths = files
        .iter()
        .map(|f| f.to_string_lossy().into_owned())
        .collect::<Vec<String>>();

    match framework {
        TestFramework::Jest | TestFramework::Mocha => {
            let mut args = vec!["test".to_string()];
            if !paths.is_empty() {
                args.push("--".into());
                args.extend(paths);
            }
            ("npm".into(), args)
        }
        TestFramework::Pytest | TestFramework::Generic => {
            let mut args = vec!["-v".to_string()];
            args.extend(paths);
            ("pytest".into(), args)
        }
        TestFramework::Junit => {
            let classes = files
                .iter()
                .filter(|f| f.extension().is_some_and(|ext| ext == "java"))
                .filter_map(|f| f.file_stem())
                .map(|stem| stem.to_string_lossy().into_owned())
                .collect::<Vec<String>>()
                .join(",");

            if root.join("pom.xml").exists() {
                let mut args = vec!["test".to_string()];
                if !classes.is_empty() {
                    args.push(format!("-Dtest={classes}"));
                }
                ("mvn".into(), args)
            } else {
                let mut args = vec!["test".to_string()];
                if !classes.is_empty() {
                    args.push("--tests".into());
                    args.push(classes);
                }
                ("./gradlew".into(), args)
            }
        }
    }
}

pub async fn run_tests(
    root: &Path,
    framework: TestFramework,
    files: &[PathBuf],
    limit: Duration,
) -> TestRunReport {
    let (program, args) = test_command(root, framework, files);
    let args = args.iter().map(String::as_str).collect::<Vec<&str>>();

    info!("running {framework} tests");

    match run_command(&program, &args, root, limit).await {
        Ok(output) => {
            if !output.success {
                warn!(
                    "{framework} tests failed with exit code {:?}",
                    output.code
                );
            }
            TestRunReport {
                framework,
                success: output.success,
                output: output.stdout,
                error: (!output.success).then_some(output.stderr),
            }
        }
        Err(err) => {
            warn!("could not run {framework} tests: {err}");
            TestRunReport {
                framework,
                success: false,
                output: String::new(),
                error: Some(err.to_string()),
            }
        }
    }
}
