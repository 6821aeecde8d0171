//! Tera templates for generated upgrade tests.
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tera::{Context, Tera};

use crate::{
    error::Result,
    manifest::split_coordinates,
    testgen::{GeneratedTest, TestFramework},
    usage::patterns::python_module_name,
};

static WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9]+").unwrap());

const JEST_TEMPLATE: &str = r#"import {{ binding }} from '{{ dependency }}';

describe('{{ dependency }} upgrade validation', () => {
  test('should import the dependency correctly', () => {
    expect({{ binding }}).toBeDefined();
  });
{% for method in methods %}
  test('{{ method.name }} function should be available', () => {
    expect({{ binding }}.{{ method.name }}).toBeDefined();
  });
{% endfor %}
{%- for change in breaking_changes %}
  test('should handle breaking change: {{ change }}', () => {
    // Add assertions for the new behavior
  });
{% endfor -%}
});
"#;

const MOCHA_TEMPLATE: &str = r#"const assert = require('assert');
const {{ binding }} = require('{{ dependency }}');

describe('{{ dependency }} upgrade validation', () => {
  it('should import the dependency correctly', () => {
    assert.ok({{ binding }});
  });
{% for method in methods %}
  it('{{ method.name }} function should be available', () => {
    assert.ok({{ binding }}.{{ method.name }});
  });
{% endfor %}
{%- for change in breaking_changes %}
  it('should handle breaking change: {{ change }}', () => {
    // Add assertions for the new behavior
  });
{% endfor -%}
});
"#;

const PYTEST_TEMPLATE: &str = r#"import pytest
import {{ module }}


def test_{{ module }}_import():
    """The dependency can be imported."""
    assert {{ module }} is not None
{% for method in methods %}

def {{ method.test_name }}():
    """{{ method.name }} is still available."""
    assert hasattr({{ module }}, "{{ method.name }}")
{% endfor %}
{%- for change in breaking_changes %}

def test_{{ module }}_breaking_change_{{ loop.index0 }}():
    """Breaking change handled: {{ change }}"""
    pass
{% endfor -%}
"#;

const JUNIT_TEMPLATE: &str = r#"import org.junit.Test;
import static org.junit.Assert.*;

public class {{ class_name }} {

    @Test
    public void testDependencyAvailability() {
        // Add assertions for the upgraded dependency
    }
{% for method in methods %}
    @Test
    public void {{ method.test_name }}() {
        // {{ method.name }} should keep working after the upgrade
    }
{% endfor %}
{%- for change in breaking_changes %}
    @Test
    public void testBreakingChange{{ loop.index0 }}() {
        // Breaking change handled: {{ change }}
    }
{% endfor -%}
}
"#;

/// A called method and the test that covers it.
#[derive(Debug, Clone, Serialize)]
struct MethodCase {
    name: String,
    test_name: String,
}

/// Render the test file for `framework`. Generic projects get pytest.
pub fn render(
    framework: TestFramework,
    name: &str,
    methods: &[String],
    breaking_changes: &[String],
) -> Result<GeneratedTest> {
    let mut context = Context::new();
    context.insert("dependency", name);
    context.insert(
        "breaking_changes",
        &breaking_changes
            .iter()
            .map(|c| sanitize(c))
            .collect::<Vec<String>>(),
    );

    let (template, file_name, cases) = match framework {
        TestFramework::Jest | TestFramework::Mocha => {
            let binding = js_binding(name);
            context.insert("binding", &binding);
            let template = if framework == TestFramework::Jest {
                JEST_TEMPLATE
            } else {
                MOCHA_TEMPLATE
            };
            let cases = method_cases(methods, |m| m.to_string());
            (template, format!("{binding}.test.js"), cases)
        }
        TestFramework::Pytest | TestFramework::Generic => {
            let module = python_module_name(name);
            context.insert("module", &module);
            let cases = method_cases(methods, |m| {
                format!("test_{module}_{m}_availability")
            });
            (PYTEST_TEMPLATE, format!("test_{module}.py"), cases)
        }
        TestFramework::Junit => {
            let class_name = format!("{}UpgradeTest", java_class_name(name));
            context.insert("class_name", &class_name);
            let cases = method_cases(methods, |m| {
                format!("test{}Method", capitalize(m))
            });
            (JUNIT_TEMPLATE, format!("{class_name}.java"), cases)
        }
    };

    context.insert("methods", &cases);
    let content = Tera::one_off(template, &context, false)?;

    Ok(GeneratedTest { file_name, content })
}

fn method_cases(
    methods: &[String],
    test_name: impl Fn(&str) -> String,
) -> Vec<MethodCase> {
    methods
        .iter()
        .map(|m| MethodCase {
            name: m.clone(),
            test_name: test_name(m),
        })
        .collect()
}

/// `@babel/core` -> `babelcore`
fn js_binding(name: &str) -> String {
    let binding = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
        .collect::<String>();

    match binding.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("_{binding}"),
        Some(_) => binding,
        None => "dependency".into(),
    }
}

/// `org.apache.commons:commons-lang3` -> `CommonsLang3`
fn java_class_name(name: &str) -> String {
    let artifact = split_coordinates(name).map(|(_, a)| a).unwrap_or(name);
    WORD_REGEX
        .find_iter(artifact)
        .map(|word| capitalize(word.as_str()))
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Keep descriptions safe inside single-line string literals and comments.
fn sanitize(description: &str) -> String {
    description
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | '\\' | '`'))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn methods(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn jest_file_has_one_test_per_method_and_change() {
        let generated = render(
            TestFramework::Jest,
            "@scope/left-pad",
            &methods(&["pad", "padStart"]),
            &["left-pad 2.0.0 is a major release".into()],
        )
        .unwrap();

        assert_eq!(generated.file_name, "scopeleftpad.test.js");
        let content = generated.content;
        assert!(
            content.starts_with("import scopeleftpad from '@scope/left-pad';")
        );
        assert!(content.contains("expect(scopeleftpad.pad).toBeDefined();"));
        assert!(
            content.contains("expect(scopeleftpad.padStart).toBeDefined();")
        );
        assert!(content.contains(
            "test('should handle breaking change: left-pad 2.0.0 is a major release'"
        ));
        assert_eq!(content.matches("test('").count(), 4);
        assert!(content.trim_end().ends_with("});"));
    }

    #[test]
    fn mocha_file_uses_require_and_assert() {
        let generated =
            render(TestFramework::Mocha, "chalk", &methods(&["red"]), &[])
                .unwrap();
        assert_eq!(generated.file_name, "chalk.test.js");
        assert!(generated.content.contains("const chalk = require('chalk');"));
        assert!(generated.content.contains("assert.ok(chalk.red);"));
        assert_eq!(generated.content.matches("it('").count(), 2);
    }

    #[test]
    fn pytest_file_uses_module_name() {
        let generated = render(
            TestFramework::Pytest,
            "Flask-Login",
            &methods(&["login_user"]),
            &["a".into(), "b".into()],
        )
        .unwrap();

        assert_eq!(generated.file_name, "test_flask_login.py");
        let content = generated.content;
        assert!(content.contains("import flask_login\n"));
        assert!(content.contains("def test_flask_login_import():"));
        assert!(
            content.contains("def test_flask_login_login_user_availability():")
        );
        assert!(
            content.contains("assert hasattr(flask_login, \"login_user\")")
        );
        assert!(content.contains("def test_flask_login_breaking_change_0():"));
        assert!(content.contains("def test_flask_login_breaking_change_1():"));
    }

    #[test]
    fn generic_projects_get_pytest() {
        let generated =
            render(TestFramework::Generic, "requests", &[], &[]).unwrap();
        assert_eq!(generated.file_name, "test_requests.py");
        assert!(generated.content.contains("import pytest"));
    }

    #[test]
    fn junit_class_comes_from_artifact_id() {
        let generated = render(
            TestFramework::Junit,
            "org.apache.commons:commons-lang3",
            &methods(&["isBlank"]),
            &[],
        )
        .unwrap();

        assert_eq!(generated.file_name, "CommonsLang3UpgradeTest.java");
        assert!(
            generated
                .content
                .contains("public class CommonsLang3UpgradeTest {")
        );
        assert!(generated.content.contains("public void testIsBlankMethod()"));
        assert!(generated.content.trim_end().ends_with('}'));
    }

    #[test]
    fn descriptions_are_sanitized() {
        assert_eq!(sanitize("it's \"new\"\nbehavior"), "its new behavior");
        assert_eq!(js_binding("3d-utils"), "_3dutils");
    }
}
