mod report;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use codeclarity_ai::{GenerationConfig, LLMProviderFactory};
use codeclarity_core::{CodeClarityConfig, ConfigManager, Language, LoggingConfig};
use codeclarity_flows::{
    AnalysisError, AnalysisResult, ContractRegistry, Orchestrator, PromptBuilder, TaskInput,
    TaskKind,
};
use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, Subscriber};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

#[derive(Parser)]
#[command(name = "codeclarity")]
#[command(about = "CodeClarity - documentation, refactoring, complexity and unit tests for code snippets", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./.codeclarity.toml or ~/.codeclarity/config.toml)
    #[arg(long, global = true, env = "CODECLARITY_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all four analyses on a snippet
    Analyze {
        /// Snippet language (C++, Python, JavaScript)
        #[arg(short, long)]
        language: Language,

        /// Read the snippet from a file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Analyse the built-in sample program for the language
        #[arg(long, conflicts_with = "file")]
        example: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        output: OutputFormat,

        /// Also write a Markdown report (default: code-analysis-report.md)
        #[arg(long, num_args = 0..=1, default_missing_value = report::DEFAULT_REPORT_FILE)]
        report: Option<PathBuf>,
    },

    /// Print the rendered prompt for one task without calling a model
    Prompt {
        /// Task (documentation, refactoring, complexity, unit-tests)
        #[arg(short, long)]
        task: TaskKind,

        /// Snippet language (C++, Python, JavaScript)
        #[arg(short, long)]
        language: Language,

        /// Read the snippet from a file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Use the built-in sample program for the language
        #[arg(long, conflicts_with = "file")]
        example: bool,
    },

    /// List analysis tasks with their accepted languages and output fields
    Tasks,

    /// List supported model providers
    Providers {
        /// Build the configured provider and check that it is reachable
        #[arg(long)]
        check: bool,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

impl Commands {
    fn needs_config(&self) -> bool {
        match self {
            Commands::Analyze { .. } => true,
            Commands::Providers { check } => *check,
            _ => false,
        }
    }
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a default config file
    Init {
        /// Destination (defaults to ./.codeclarity.toml)
        #[arg(short, long, default_value = ".codeclarity.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.command.needs_config() {
        Some(load_config(cli.config.as_deref(), cli.verbose)?)
    } else {
        None
    };
    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    tracing::subscriber::set_global_default(build_subscriber(&logging, cli.verbose)).ok();

    match (&cli.command, config) {
        (Commands::Tasks, _) => {
            print_tasks();
            Ok(())
        }
        (Commands::Providers { check: true }, Some(config)) => check_provider(&config).await,
        (Commands::Providers { .. }, _) => {
            print_providers();
            Ok(())
        }
        (Commands::Config(ConfigCommands::Init { path }), _) => init_config(path),
        (
            Commands::Prompt {
                task,
                language,
                file,
                example,
            },
            _,
        ) => {
            let code = snippet_for(*language, file.as_deref(), *example)?;
            print_prompt(*task, *language, &code);
            Ok(())
        }
        (
            Commands::Analyze {
                language,
                file,
                example,
                output,
                report,
            },
            config,
        ) => {
            let config = config.context("Analysis requires a loaded configuration")?;
            let code = snippet_for(*language, file.as_deref(), *example)?;
            run_analysis(&config, *language, &code, *output, report.as_deref()).await
        }
    }
}

/// Load configuration, logging through a provisional subscriber until the
/// configured logging section is known
fn load_config(path: Option<&Path>, verbose: bool) -> Result<CodeClarityConfig> {
    let bootstrap = build_subscriber(&LoggingConfig::default(), verbose);

    let manager = tracing::subscriber::with_default(bootstrap, || match path {
        Some(path) => ConfigManager::load_from(path),
        None => ConfigManager::load(),
    })
    .context("Failed to load configuration")?;

    Ok(manager.config().clone())
}

fn build_subscriber(logging: &LoggingConfig, verbose: bool) -> Box<dyn Subscriber + Send + Sync> {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);

    // json output is not wired up; compact is the closest single-line form
    match logging.format.as_str() {
        "pretty" => Box::new(
            registry.with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr)),
        ),
        _ => Box::new(
            registry.with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr)),
        ),
    }
}

async fn run_analysis(
    config: &CodeClarityConfig,
    language: Language,
    code: &str,
    output: OutputFormat,
    report_path: Option<&Path>,
) -> Result<()> {
    let provider = LLMProviderFactory::create_from_config(&config.llm)
        .context("Failed to create LLM provider")?;
    info!(
        provider = provider.provider_name(),
        model = provider.model_name(),
        "using model provider"
    );

    let generation = GenerationConfig {
        temperature: config.llm.temperature,
        max_tokens: Some(config.llm.max_tokens),
        ..Default::default()
    };
    let orchestrator = Orchestrator::with_generation_config(provider, generation);

    let result = match orchestrator.analyze(code, language).await {
        Ok(result) => result,
        Err(e) => {
            print_failure(&e);
            std::process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Markdown => print!("{}", report::render_markdown(&result, language, code)),
        OutputFormat::Pretty => print_pretty(&result),
    }

    if let Some(path) = report_path {
        let markdown = report::render_markdown(&result, language, code);
        std::fs::write(path, markdown)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        eprintln!("{} {}", "Report written:".green(), path.display());
    }

    Ok(())
}

fn snippet_for(language: Language, file: Option<&Path>, example: bool) -> Result<String> {
    if example {
        return Ok(language.sample_snippet().to_string());
    }
    read_snippet(file)
}

fn read_snippet(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut code = String::new();
            std::io::stdin()
                .read_to_string(&mut code)
                .context("Failed to read snippet from stdin")?;
            debug!(chars = code.len(), "read snippet from stdin");
            Ok(code)
        }
    }
}

fn print_failure(err: &AnalysisError) {
    eprintln!("{} {}", "Analysis failed:".red().bold(), err);
    eprintln!(
        "  {} {}  {} {}",
        "task:".dimmed(),
        err.task(),
        "kind:".dimmed(),
        err.kind().as_str()
    );
}

fn print_pretty(result: &AnalysisResult) {
    println!("{}", "Documentation".cyan().bold());
    println!("{}\n", result.documentation);

    println!("{}", "Refactoring Suggestions".cyan().bold());
    if result.refactorings.is_empty() {
        println!("{}", "(none)".dimmed());
    }
    for (i, suggestion) in result.refactorings.iter().enumerate() {
        println!("{} {}", format!("{}.", i + 1).yellow(), suggestion);
    }
    println!();

    println!("{}", "Complexity Analysis".cyan().bold());
    println!("{}\n", result.complexity);

    println!("{}", "Unit Tests".cyan().bold());
    println!("{}", result.unit_tests.green());
}

fn print_prompt(task: TaskKind, language: Language, code: &str) {
    let contract = ContractRegistry::contract(task);
    let label = contract
        .language_label(language)
        .unwrap_or_else(|| language.as_str());

    println!("{}", PromptBuilder::render(task, &TaskInput::new(code, label)));
}

fn print_tasks() {
    for contract in ContractRegistry::all() {
        println!("{}", contract.task.label().cyan().bold());
        println!("  {} {}", "languages:".dimmed(), contract.languages().join(", "));
        println!(
            "  {} {} {{ {} }}",
            "output:".dimmed(),
            contract.output.name,
            contract.output.field_names().join(", ")
        );
        println!("  {} {}", "schema:".dimmed(), contract.schema_name);
    }
}

fn print_providers() {
    for provider in LLMProviderFactory::supported_providers() {
        println!("{}", provider.green());
    }
}

async fn check_provider(config: &CodeClarityConfig) -> Result<()> {
    let provider = LLMProviderFactory::create_from_config(&config.llm)
        .context("Failed to create LLM provider")?;
    let characteristics = provider.characteristics();

    println!(
        "{} {} ({})",
        "provider:".dimmed(),
        provider.provider_name().cyan().bold(),
        provider.model_name()
    );
    println!(
        "  {} {}",
        "context window:".dimmed(),
        characteristics.max_tokens
    );
    println!(
        "  {} {}",
        "json schema:".dimmed(),
        if characteristics.supports_json_schema {
            "enforced"
        } else {
            "instruction only"
        }
    );

    if LLMProviderFactory::check_availability(&provider).await {
        println!("  {} {}", "status:".dimmed(), "reachable".green());
        Ok(())
    } else {
        println!("  {} {}", "status:".dimmed(), "unreachable".red());
        anyhow::bail!("{} is not reachable", provider.provider_name())
    }
}

fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }

    ConfigManager::create_default_config(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{} {}", "Created config:".green(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from([
            "codeclarity",
            "analyze",
            "--language",
            "js",
            "--output",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Analyze {
                language, output, ..
            } => {
                assert_eq!(language, Language::JavaScript);
                assert!(matches!(output, OutputFormat::Json));
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_report_flag_defaults_file_name() {
        let cli = Cli::try_parse_from(["codeclarity", "analyze", "-l", "py", "--report"]).unwrap();
        match cli.command {
            Commands::Analyze { report, .. } => {
                assert_eq!(report, Some(PathBuf::from(report::DEFAULT_REPORT_FILE)));
            }
            _ => panic!("expected analyze"),
        }

        let cli = Cli::try_parse_from(["codeclarity", "analyze", "-l", "py", "--report", "out.md"])
            .unwrap();
        match cli.command {
            Commands::Analyze { report, .. } => assert_eq!(report, Some(PathBuf::from("out.md"))),
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_example_snippet_replaces_input() {
        let cli = Cli::try_parse_from(["codeclarity", "analyze", "-l", "c++", "--example"]).unwrap();
        match cli.command {
            Commands::Analyze {
                language, example, ..
            } => {
                assert!(example);
                let code = snippet_for(language, None, example).unwrap();
                assert!(code.contains("#include <iostream>"));
            }
            _ => panic!("expected analyze"),
        }

        assert!(Cli::try_parse_from([
            "codeclarity",
            "analyze",
            "-l",
            "py",
            "--example",
            "--file",
            "x.py"
        ])
        .is_err());
    }

    #[test]
    fn test_only_model_commands_load_config() {
        let needs = |args: &[&str]| Cli::try_parse_from(args).unwrap().command.needs_config();

        assert!(needs(&["codeclarity", "analyze", "-l", "js"]));
        assert!(needs(&["codeclarity", "providers", "--check"]));
        assert!(!needs(&["codeclarity", "providers"]));
        assert!(!needs(&["codeclarity", "tasks"]));
        assert!(!needs(&["codeclarity", "config", "init"]));
    }

    #[test]
    fn test_verbose_enables_debug_for_every_command() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let logging = LoggingConfig::default();

        let quiet = tracing::subscriber::with_default(build_subscriber(&logging, false), || {
            (
                tracing::enabled!(tracing::Level::WARN),
                tracing::enabled!(tracing::Level::DEBUG),
            )
        });
        assert_eq!(quiet, (true, false));

        let verbose = tracing::subscriber::with_default(build_subscriber(&logging, true), || {
            tracing::enabled!(tracing::Level::DEBUG)
        });
        assert!(verbose);
    }

    #[test]
    fn test_cli_rejects_unknown_language() {
        assert!(Cli::try_parse_from(["codeclarity", "analyze", "-l", "rust"]).is_err());
    }

    #[test]
    fn test_cli_parses_prompt_task() {
        let cli =
            Cli::try_parse_from(["codeclarity", "prompt", "-t", "unit-tests", "-l", "c++"]).unwrap();
        match cli.command {
            Commands::Prompt { task, language, .. } => {
                assert_eq!(task, TaskKind::UnitTests);
                assert_eq!(language, Language::Cpp);
            }
            _ => panic!("expected prompt"),
        }
    }

    #[test]
    fn test_init_config_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init_config(&path).unwrap();
        assert!(path.exists());
        assert!(ConfigManager::read_toml_file(&path).is_ok());

        assert!(init_config(&path).is_err());
    }
}
