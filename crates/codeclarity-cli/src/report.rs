// ABOUTME: Markdown export of a completed analysis
// ABOUTME: Pure formatter over the aggregated result, one numbered section per task

use codeclarity_core::Language;
use codeclarity_flows::AnalysisResult;
use std::fmt::Write;

pub const REPORT_TITLE: &str = "CodeClarity AI Analysis Report";
pub const DEFAULT_REPORT_FILE: &str = "code-analysis-report.md";

/// Render the analysed snippet followed by the four task sections
pub fn render_markdown(result: &AnalysisResult, language: Language, code: &str) -> String {
    let fence = fence_for(code).max(fence_for(&result.unit_tests));
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "# {}\n", REPORT_TITLE);
    let _ = writeln!(out, "**Language:** {}\n", language);

    let _ = writeln!(out, "## Analysed Code\n");
    push_fenced(&mut out, &fence, language.fence_tag(), code);

    let _ = writeln!(out, "## 1. Documentation\n");
    let _ = writeln!(out, "{}\n", result.documentation.trim_end());

    let _ = writeln!(out, "## 2. Refactoring Suggestions\n");
    if result.refactorings.is_empty() {
        let _ = writeln!(out, "_No refactoring suggestions._\n");
    } else {
        for (i, suggestion) in result.refactorings.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, suggestion.trim());
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## 3. Complexity Analysis\n");
    let _ = writeln!(out, "{}\n", result.complexity.trim_end());

    let _ = writeln!(out, "## 4. Unit Tests\n");
    push_fenced(&mut out, &fence, language.fence_tag(), &result.unit_tests);

    out
}

fn push_fenced(out: &mut String, fence: &str, tag: &str, body: &str) {
    let _ = writeln!(out, "{}{}", fence, tag);
    let _ = writeln!(out, "{}", body.trim_end());
    let _ = writeln!(out, "{}\n", fence);
}

/// A backtick fence longer than any run inside `text`
fn fence_for(text: &str) -> String {
    let longest = text
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}
