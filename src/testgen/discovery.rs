//! Existing tests that already exercise a dependency.
use log::*;
use regex::Regex;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};
use walkdir::WalkDir;

use crate::testgen::{TEST_DIRS, TestFramework};

static DESCRIBE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"describe\(['"]([^'"]+)['"]"#).unwrap());
static IT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\b(?:it|test)\(['"]([^'"]+)['"]"#).unwrap());
static PYTEST_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"def\s+(test_[a-zA-Z0-9_]+)\s*\(").unwrap());
static JUNIT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@Test\s+(?:public\s+)?void\s+([a-zA-Z0-9_]+)\s*\(").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingTest {
    /// Relative to the repository root
    pub file: PathBuf,
    pub test_cases: Vec<String>,
}

/// Test files under the conventional directories whose content mentions
/// `name` (lowercased, `-` as `_`) and that define at least one test case.
pub fn find_existing_tests(
    root: &Path,
    framework: TestFramework,
    name: &str,
) -> Vec<ExistingTest> {
    let needle = name.to_lowercase().replace('-', "_");
    let mut found = vec![];

    for dir in TEST_DIRS {
        let test_dir = root.join(dir);
        if !test_dir.is_dir() {
            continue;
        }

        for entry in WalkDir::new(&test_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let file_name = entry.file_name().to_string_lossy();
            if !is_test_file(&file_name, framework) {
                continue;
            }

            let content = match fs::read_to_string(entry.path()) {
                Ok(content) => content,
                Err(err) => {
                    debug!("skipping {}: {err}", entry.path().display());
                    continue;
                }
            };

            if !content.to_lowercase().contains(&needle) {
                continue;
            }

            let test_cases = extract_test_cases(&content, framework);
            if test_cases.is_empty() {
                continue;
            }

            let file = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();

            found.push(ExistingTest { file, test_cases });
        }
    }

    found
}

pub fn is_test_file(file_name: &str, framework: TestFramework) -> bool {
    match framework {
        TestFramework::Jest => [".test.js", ".test.ts", ".spec.js", ".spec.ts"]
            .iter()
            .any(|suffix| file_name.ends_with(suffix)),
        TestFramework::Mocha => [".test.js", ".spec.js"]
            .iter()
            .any(|suffix| file_name.ends_with(suffix)),
        TestFramework::Pytest => {
            file_name.starts_with("test_") && file_name.ends_with(".py")
        }
        TestFramework::Junit => file_name.ends_with("Test.java"),
        TestFramework::Generic => {
            let lower = file_name.to_lowercase();
            lower.contains("test") || lower.contains("spec")
        }
    }
}

/// Names of the test cases defined in `content`.
///
/// Jest and Mocha cases are reported as `<describe> - <case>` under the
/// first describe block of the file.
pub fn extract_test_cases(
    content: &str,
    framework: TestFramework,
) -> Vec<String> {
    match framework {
        TestFramework::Jest | TestFramework::Mocha => {
            let cases = IT_REGEX
                .captures_iter(content)
                .map(|caps| caps[1].to_string());

            match DESCRIBE_REGEX.captures(content) {
                Some(describe) => {
                    let suite = describe[1].to_string();
                    cases.map(|case| format!("{suite} - {case}")).collect()
                }
                None => cases.collect(),
            }
        }
        TestFramework::Pytest => PYTEST_REGEX
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .collect(),
        TestFramework::Junit => JUNIT_REGEX
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .collect(),
        TestFramework::Generic => vec![],
    }
}
