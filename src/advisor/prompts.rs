//! Prompt templates sent to the advisor.
use serde::Serialize;
use tera::{Context, Tera};

use crate::{
    advisor::{ChangedApi, ProjectInfo},
    candidate::UpgradeCandidate,
    error::Result,
    impact::CodeSnippet,
    testgen::TestRunReport,
};

/// Longest test output quoted in a pull request prompt.
const MAX_TEST_OUTPUT: usize = 4000;

const STRATEGY_TEMPLATE: &str = r#"Please analyze the following project and its dependencies to suggest an upgrade strategy:

Project Information:
- name: {{ project.name }}
- type: {{ project.project_type }}

Dependencies:
- {{ dep.name }}: {{ dep.current_version }} -> {{ dep.latest_version }} ({{ dep.update_type }} update, {{ dep.priority }} priority)
{%- for vuln in dep.vulnerabilities %}
  - {{ vuln }}
{%- endfor %}
{% if snippets %}
Code Samples:
{% for snippet in snippets %}
{{ snippet.location }}
```
{{ snippet.text }}
```
{% endfor %}
{%- endif %}
For each dependency, please provide:
1. Risk assessment (High/Medium/Low)
2. Recommended version to upgrade to
3. Potential breaking changes to be aware of
4. Suggested testing approach
5. Implementation strategy

Prioritize security-critical updates and minimize breaking changes.
"#;

const CODE_CHANGES_TEMPLATE: &str = r#"Please predict the necessary code changes to upgrade {{ dep.name }} from version {{ dep.current_version }} to {{ dep.latest_version }}.

Here are examples of how the dependency is currently used in the codebase:
{% if snippets %}{% for snippet in snippets %}
{{ snippet.location }}
```
{{ snippet.text }}
```
{% endfor %}{% else %}
(no usages were found)
{% endif %}
Please provide:
1. Specific code modifications needed
2. Any API changes between versions
3. Deprecated methods or classes to be aware of
4. Suggested replacement patterns
"#;

const TEST_CASES_TEMPLATE: &str = r#"Please write test cases that validate an upgrade of {{ name }}.

The following usages of the dependency may be affected by API changes:
{% if changed_apis %}{% for api in changed_apis %}
- `{{ api.name }}`: {{ api.context }}
{%- endfor %}{% else %}
- (no usages were found; test that the dependency still loads)
{%- endif %}

For each test, explain what behavior it protects. Prefer small, focused
tests that fail loudly when the upgraded API behaves differently.
"#;

const PR_DESCRIPTION_TEMPLATE: &str = r#"Please write a pull request description for the following dependency update.

Update: {{ dep.name }} {{ dep.current_version }} -> {{ dep.latest_version }} ({{ dep.update_type }} update)
{% if dep.vulnerabilities %}
Security fixes:
{% for vuln in dep.vulnerabilities -%}
- {{ vuln }}
{% endfor %}
{%- endif %}
Predicted code changes:
{{ code_changes }}

Test results ({{ tests.framework }}): {% if tests.success %}passed{% else %}failed{% endif %}
{%- if tests.output %}
```
{{ tests.output }}
```
{%- endif %}
{%- if tests.error %}
Errors:
```
{{ tests.error }}
```
{%- endif %}

Write the description in Markdown with a short summary, the reason for the
update, any code changes a reviewer should look at, and the test status.
"#;

#[derive(Debug, Serialize)]
struct DependencyView {
    name: String,
    current_version: String,
    latest_version: String,
    update_type: String,
    priority: String,
    vulnerabilities: Vec<String>,
}

impl From<&UpgradeCandidate> for DependencyView {
    fn from(candidate: &UpgradeCandidate) -> Self {
        Self {
            name: candidate.name.clone(),
            current_version: candidate.current_version.clone(),
            latest_version: candidate.latest_version.clone(),
            update_type: candidate.update_type.to_string(),
            priority: candidate.priority.to_string(),
            vulnerabilities: candidate
                .vulnerabilities
                .iter()
                .map(|v| match &v.fixed_in {
                    Some(fixed) => format!(
                        "{} severity: {} (fixed in {fixed})",
                        v.severity, v.description
                    ),
                    None => {
                        format!("{} severity: {}", v.severity, v.description)
                    }
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SnippetView<'a> {
    location: String,
    text: &'a str,
}

fn snippet_views(snippets: &[CodeSnippet]) -> Vec<SnippetView<'_>> {
    snippets
        .iter()
        .map(|s| SnippetView {
            location: format!(
                "{}:{}-{}",
                s.file.display(),
                s.start_line,
                s.end_line
            ),
            text: &s.text,
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct TestReportView<'a> {
    framework: String,
    success: bool,
    output: &'a str,
    error: Option<&'a str>,
}

/// Keep the tail of long output; failures are reported last.
fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

pub fn upgrade_strategy(
    project: &ProjectInfo,
    candidate: &UpgradeCandidate,
    snippets: &[CodeSnippet],
) -> Result<String> {
    let mut context = Context::new();
    context.insert("project", project);
    context.insert("dep", &DependencyView::from(candidate));
    context.insert("snippets", &snippet_views(snippets));
    Ok(Tera::one_off(STRATEGY_TEMPLATE, &context, false)?)
}

pub fn code_changes(
    candidate: &UpgradeCandidate,
    snippets: &[CodeSnippet],
) -> Result<String> {
    let mut context = Context::new();
    context.insert("dep", &DependencyView::from(candidate));
    context.insert("snippets", &snippet_views(snippets));
    Ok(Tera::one_off(CODE_CHANGES_TEMPLATE, &context, false)?)
}

pub fn test_cases(name: &str, changed_apis: &[ChangedApi]) -> Result<String> {
    let mut context = Context::new();
    context.insert("name", name);
    context.insert("changed_apis", changed_apis);
    Ok(Tera::one_off(TEST_CASES_TEMPLATE, &context, false)?)
}

pub fn pr_description(
    candidate: &UpgradeCandidate,
    code_changes: &str,
    test_report: &TestRunReport,
) -> Result<String> {
    let mut context = Context::new();
    context.insert("dep", &DependencyView::from(candidate));
    context.insert("code_changes", code_changes);
    context.insert(
        "tests",
        &TestReportView {
            framework: test_report.framework.to_string(),
            success: test_report.success,
            output: tail(&test_report.output, MAX_TEST_OUTPUT),
            error: test_report
                .error
                .as_deref()
                .map(|e| tail(e, MAX_TEST_OUTPUT)),
        },
    );
    Ok(Tera::one_off(PR_DESCRIPTION_TEMPLATE, &context, false)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ecosystem::Ecosystem,
        test_helpers::{create_test_candidate, create_vulnerable_candidate},
        testgen::TestFramework,
    };
    use std::path::PathBuf;

    fn snippet() -> CodeSnippet {
        CodeSnippet {
            file: PathBuf::from("src/api.js"),
            start_line: 3,
            end_line: 9,
            text: "const res = await axios.get(url);".into(),
        }
    }

    #[test]
    fn strategy_prompt_lists_dependency_and_samples() {
        let project = ProjectInfo {
            name: "shop".into(),
            project_type: Ecosystem::Npm,
        };
        let candidate = create_vulnerable_candidate(
            "axios",
            "0.21.0",
            "1.6.0",
            Ecosystem::Npm,
        );

        let prompt =
            upgrade_strategy(&project, &candidate, &[snippet()]).unwrap();
        assert!(prompt.contains("- type: npm"));
        assert!(prompt.contains(
            "- axios: 0.21.0 -> 1.6.0 (major update, high priority)"
        ));
        assert!(prompt.contains(
            "high severity: Prototype Pollution in axios (fixed in 1.6.0)"
        ));
        assert!(prompt.contains("Code Samples:"));
        assert!(prompt.contains("src/api.js:3-9"));
        assert!(prompt.contains("1. Risk assessment (High/Medium/Low)"));
    }

    #[test]
    fn strategy_prompt_without_samples() {
        let project = ProjectInfo {
            name: "svc".into(),
            project_type: Ecosystem::Pip,
        };
        let candidate =
            create_test_candidate("flask", "2.0.1", "2.0.3", Ecosystem::Pip);
        let prompt = upgrade_strategy(&project, &candidate, &[]).unwrap();
        assert!(!prompt.contains("Code Samples:"));
        assert!(prompt.contains("(patch update, medium priority)"));
    }

    #[test]
    fn code_changes_prompt() {
        let candidate =
            create_test_candidate("axios", "0.21.0", "1.6.0", Ecosystem::Npm);
        let prompt = code_changes(&candidate, &[snippet()]).unwrap();
        assert!(prompt.contains("upgrade axios from version 0.21.0 to 1.6.0"));
        assert!(prompt.contains("const res = await axios.get(url);"));
        assert!(!prompt.contains("no usages were found"));

        let prompt = code_changes(&candidate, &[]).unwrap();
        assert!(prompt.contains("(no usages were found)"));
    }

    #[test]
    fn test_cases_prompt() {
        let apis = vec![ChangedApi {
            name: "axios".into(),
            context: "axios.get(url)".into(),
        }];
        let prompt = test_cases("axios", &apis).unwrap();
        assert!(prompt.contains("- `axios`: axios.get(url)"));
    }

    #[test]
    fn pr_prompt_reports_failed_tests() {
        let candidate = create_vulnerable_candidate(
            "axios",
            "0.21.0",
            "1.6.0",
            Ecosystem::Npm,
        );
        let report = TestRunReport {
            framework: TestFramework::Jest,
            success: false,
            output: String::new(),
            error: Some("1 failing".into()),
        };

        let prompt =
            pr_description(&candidate, "use axios.request", &report).unwrap();
        assert!(
            prompt.contains("Update: axios 0.21.0 -> 1.6.0 (major update)")
        );
        assert!(prompt.contains("Security fixes:"));
        assert!(prompt.contains("use axios.request"));
        assert!(prompt.contains("Test results (jest): failed"));
        assert!(prompt.contains("1 failing"));
    }

    #[test]
    fn long_output_keeps_the_tail() {
        let output = format!("{}END", "x".repeat(10));
        assert_eq!(tail(&output, 3), "END");
        assert_eq!(tail("short", 10), "short");
    }
}
