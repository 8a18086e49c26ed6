// ABOUTME: Fixed instruction templates for each analysis task
// ABOUTME: Single-pass rendering so snippet text is never treated as template syntax

use crate::contracts::TaskKind;
use crate::task::TaskInput;

/// One fixed instruction template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub task: TaskKind,
    pub name: &'static str,
    pub text: &'static str,
}

pub const DOCUMENTATION_PROMPT: &str = "\
You are a senior software engineer whose primary job is to write documentation.

You will generate documentation for the given code. Make sure to explain the code in detail.

Language: {{language}}
Code: {{code}}";

pub const REFACTORING_PROMPT: &str = "\
You are a code refactoring expert. Analyze the following code and provide refactoring \
suggestions to improve its readability, efficiency, and adherence to best practices.

Language: {{language}}
Code:
```{{language}}
{{code}}
```

Refactoring Suggestions:";

pub const COMPLEXITY_PROMPT: &str = "\
You are an expert software engineer specializing in code analysis.

You will analyze the given code and determine its algorithmic complexity (Big O notation).
Explain the complexity in a concise and clear manner.

Language: {{language}}
Code: {{code}}";

pub const UNIT_TESTS_PROMPT: &str = "\
You are a software engineer who specializes in writing unit tests.

You will generate unit tests for the given code.
Use a common testing framework for the language (e.g., Jest for JavaScript, PyTest for Python, or Google Test for C++).
Include tests for edge cases, normal inputs, and invalid inputs.
The output should be only the code for the unit tests.

Language: {{language}}
Code:
```{{language}}
{{code}}
```

Unit Tests:";

// Indexed by `TaskKind as usize`
static TEMPLATES: [PromptTemplate; 4] = [
    PromptTemplate {
        task: TaskKind::Documentation,
        name: "documentation_prompt",
        text: DOCUMENTATION_PROMPT,
    },
    PromptTemplate {
        task: TaskKind::Refactoring,
        name: "refactoring_prompt",
        text: REFACTORING_PROMPT,
    },
    PromptTemplate {
        task: TaskKind::Complexity,
        name: "complexity_prompt",
        text: COMPLEXITY_PROMPT,
    },
    PromptTemplate {
        task: TaskKind::UnitTests,
        name: "unit_tests_prompt",
        text: UNIT_TESTS_PROMPT,
    },
];

pub struct PromptBuilder;

impl PromptBuilder {
    pub fn template(task: TaskKind) -> &'static PromptTemplate {
        &TEMPLATES[task.index()]
    }

    /// Render the task's template with `language` and `code` substituted verbatim.
    /// Pure: identical input always yields identical output.
    pub fn render(task: TaskKind, input: &TaskInput) -> String {
        interpolate(
            Self::template(task).text,
            &[
                ("language", input.language.as_str()),
                ("code", input.code.as_str()),
            ],
        )
    }
}

/// Replace `{{name}}` placeholders in one pass over `template`.
/// Substituted values are never rescanned; unknown placeholders stay as written.
fn interpolate(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra * 2);
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = after[..end].trim();
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}
