// ABOUTME: Source languages accepted by the analysis flows
// ABOUTME: Display labels match the labels embedded into prompts

use crate::error::CodeClarityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const JAVASCRIPT_SAMPLE: &str = r#"// A simple "Hello, World!" function in JavaScript
function greet(name) {
  console.log(`Hello, ${name}!`);
}

greet('World');"#;

const PYTHON_SAMPLE: &str = r#"# A simple "Hello, World!" function in Python
def greet(name):
    print(f"Hello, {name}!")

greet('World')"#;

const CPP_SAMPLE: &str = r#"// A simple "Hello, World!" program in C++
#include <iostream>
#include <string>

void greet(const std::string& name) {
    std::cout << "Hello, " << name << "!" << std::endl;
}

int main() {
    greet("World");
    return 0;
}"#;

/// Programming language of a submitted snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "C++")]
    Cpp,
    #[serde(rename = "Python")]
    Python,
    #[serde(rename = "JavaScript")]
    JavaScript,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Cpp => "C++",
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
        }
    }

    /// Tag used for fenced code blocks in Markdown output
    pub fn fence_tag(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::Python => "python",
            Language::JavaScript => "javascript",
        }
    }

    /// Small greeting program, handy for trying the analyses without a file
    pub fn sample_snippet(&self) -> &'static str {
        match self {
            Language::Cpp => CPP_SAMPLE,
            Language::Python => PYTHON_SAMPLE,
            Language::JavaScript => JAVASCRIPT_SAMPLE,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = CodeClarityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "c++" | "cpp" | "cxx" => Ok(Language::Cpp),
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" => Ok(Language::JavaScript),
            _ => Err(CodeClarityError::UnsupportedLanguage(s.to_string())),
        }
    }
}
