//! Regression test generation for an upgraded dependency.
//!
//! The generator detects the project's test framework, collects existing
//! tests that mention the dependency, renders a new test file from the
//! usages found in the code base and runs the suite afterwards.
use log::*;
use regex::Regex;
use serde_json::Value;
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};
use strum::Display;

use crate::{error::Result, usage::UsageHit};

pub mod discovery;
pub mod runner;
pub mod templates;

pub use discovery::ExistingTest;
pub use runner::TestRunReport;

/// Conventional test directories searched for existing tests.
pub const TEST_DIRS: &[&str] =
    &["test", "tests", "src/test", "__tests__", "spec"];

/// `.method(` calls in a usage line.
static METHOD_CALL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.([a-zA-Z0-9_]+)\(").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TestFramework {
    Jest,
    Mocha,
    Pytest,
    Junit,
    Generic,
}

impl TestFramework {
    /// Directories a generated test file may go into, preferred first.
    pub fn output_dirs(&self) -> &'static [&'static str] {
        match self {
            TestFramework::Jest | TestFramework::Mocha => {
                &["__tests__", "test", "tests"]
            }
            TestFramework::Pytest | TestFramework::Generic => {
                &["tests", "test"]
            }
            TestFramework::Junit => &["src/test/java", "test"],
        }
    }
}

/// Detect the test framework from the project's manifests.
///
/// jest or mocha among package.json dependencies, pytest mentioned in
/// requirements.txt, junit mentioned in pom.xml, generic otherwise.
pub fn detect_framework(root: &Path) -> TestFramework {
    if let Some(framework) = npm_framework(root) {
        return framework;
    }

    if let Ok(content) = fs::read_to_string(root.join("requirements.txt"))
        && content.contains("pytest")
    {
        return TestFramework::Pytest;
    }

    if let Ok(content) = fs::read_to_string(root.join("pom.xml"))
        && content.to_lowercase().contains("junit")
    {
        return TestFramework::Junit;
    }

    TestFramework::Generic
}

fn npm_framework(root: &Path) -> Option<TestFramework> {
    let content = fs::read_to_string(root.join("package.json")).ok()?;
    let doc: Value = match serde_json::from_str(&content) {
        Ok(doc) => doc,
        Err(err) => {
            debug!("package.json is not valid JSON: {err}");
            return None;
        }
    };

    let declares = |package: &str| {
        ["dependencies", "devDependencies"]
            .iter()
            .any(|section| doc[section].get(package).is_some())
    };

    if declares("jest") {
        Some(TestFramework::Jest)
    } else if declares("mocha") {
        Some(TestFramework::Mocha)
    } else {
        None
    }
}

/// Distinct method names called in usage contexts, in first-seen order.
pub fn called_methods(hits: &[UsageHit]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    hits.iter()
        .filter_map(|hit| METHOD_CALL_REGEX.captures(&hit.context))
        .map(|caps| caps[1].to_string())
        .filter(|method| seen.insert(method.clone()))
        .collect()
}

/// A rendered test file waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTest {
    pub file_name: String,
    pub content: String,
}

/// Everything produced for one dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSuite {
    pub framework: TestFramework,
    /// Tests already in the repository that mention the dependency
    pub existing_tests: Vec<ExistingTest>,
    pub generated: GeneratedTest,
}

impl TestSuite {
    /// The written generated file followed by every existing test file
    /// that mentions the dependency.
    pub fn files_to_run(&self, generated: PathBuf) -> Vec<PathBuf> {
        let existing = self
            .existing_tests
            .iter()
            .map(|test| test.file.clone())
            .filter(|file| *file != generated)
            .collect::<Vec<_>>();
        std::iter::once(generated).chain(existing).collect()
    }
}

pub struct TestGenerator {
    root: PathBuf,
    framework: TestFramework,
}

impl TestGenerator {
    pub fn new(root: &Path) -> Self {
        let framework = detect_framework(root);
        info!("detected {framework} test framework");
        Self {
            root: root.to_path_buf(),
            framework,
        }
    }

    /// Render a test file for `name` from its usages and breaking changes.
    pub fn generate(
        &self,
        name: &str,
        hits: &[UsageHit],
        breaking_changes: &[String],
    ) -> Result<TestSuite> {
        let existing_tests =
            discovery::find_existing_tests(&self.root, self.framework, name);
        info!("{} existing test files mention {name}", existing_tests.len());

        let methods = called_methods(hits);
        let generated = templates::render(
            self.framework,
            name,
            &methods,
            breaking_changes,
        )?;

        Ok(TestSuite {
            framework: self.framework,
            existing_tests,
            generated,
        })
    }

    /// Write the generated file into the first existing conventional test
    /// directory, creating the preferred one when none exists. Returns the
    /// written path relative to the repository root.
    pub fn write(&self, suite: &TestSuite) -> Result<PathBuf> {
        let dirs = suite.framework.output_dirs();

        let dir = dirs
            .iter()
            .find(|dir| self.root.join(dir).is_dir())
            .unwrap_or(&dirs[0]);

        fs::create_dir_all(self.root.join(dir))?;

        let relative = Path::new(dir).join(&suite.generated.file_name);
        fs::write(self.root.join(&relative), &suite.generated.content)?;
        info!("wrote generated tests to {}", relative.display());

        Ok(relative)
    }

    /// Run the project's tests, limited to `files` when given.
    pub async fn run(
        &self,
        files: &[PathBuf],
        limit: Duration,
    ) -> TestRunReport {
        runner::run_tests(&self.root, self.framework, files, limit).await
    }
}
