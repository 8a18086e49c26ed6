use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for CodeClarity
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CodeClarityConfig {
    /// Model-invocation service configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Provider: "openai", "lmstudio", "ollama", "openai-compatible", "anthropic"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model identifier
    /// For OpenAI: model name (e.g., "gpt-4o-mini")
    /// For Anthropic: model name (e.g., "claude-3-5-sonnet-20241022")
    /// For LM Studio / Ollama: local model name
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL for "openai-compatible" endpoints (e.g., "http://localhost:8000/v1")
    #[serde(default)]
    pub base_url: Option<String>,

    /// LM Studio URL
    #[serde(default = "default_lmstudio_url")]
    pub lmstudio_url: String,

    /// Ollama URL
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// OpenAI API key
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Anthropic API key
    #[serde(default)]
    pub anthropic_api_key: Option<String>,

    /// Temperature for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per task
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries performed by the provider on transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Whether the endpoint enforces `response_format: json_schema`.
    /// When false, OpenAI-compatible requests fall back to JSON mode with the
    /// schema sent as a system instruction.
    #[serde(default = "default_json_schema")]
    pub json_schema: bool,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            base_url: None,
            lmstudio_url: default_lmstudio_url(),
            ollama_url: default_ollama_url(),
            openai_api_key: None,
            anthropic_api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            json_schema: default_json_schema(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

pub const SUPPORTED_PROVIDERS: &[&str] = &[
    "openai",
    "lmstudio",
    "ollama",
    "openai-compatible",
    "anthropic",
];

// Default value functions
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_lmstudio_url() -> String {
    "http://localhost:1234".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> usize {
    4096
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    3
}
fn default_json_schema() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with layered sources
pub struct ConfigManager {
    config: CodeClarityConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.codeclarity.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("Loading CodeClarity configuration...");

        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        Self::finish(config, config_path)
    }

    /// Load configuration from an explicit file, still honouring environment overrides
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        Self::load_dotenv();

        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    fn finish(
        config: CodeClarityConfig,
        config_path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!("Config file: {}", path.display()),
            None => info!("Config file: NONE (using defaults)"),
        }
        info!("LLM provider: {}", config.llm.provider);
        info!("LLM model: {:?}", config.llm.model);

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                info!("Loaded .env file from current directory");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".codeclarity.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .codeclarity.env: {}", e);
                } else {
                    info!("Loaded .codeclarity.env from home directory");
                }
            }
        }
    }

    /// Find and load config file
    /// Search order:
    /// 1. ./.codeclarity.toml (current directory)
    /// 2. ~/.codeclarity/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(CodeClarityConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".codeclarity.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".codeclarity").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("No config file found, using defaults");
        Ok((CodeClarityConfig::default(), None))
    }

    /// Read TOML config file
    pub fn read_toml_file(path: &Path) -> Result<CodeClarityConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(config: CodeClarityConfig) -> CodeClarityConfig {
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_overrides<F>(mut config: CodeClarityConfig, lookup: F) -> CodeClarityConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) =
            lookup("CODECLARITY_LLM_PROVIDER").or_else(|| lookup("LLM_PROVIDER"))
        {
            config.llm.provider = provider;
        }
        if let Some(model) = lookup("CODECLARITY_MODEL") {
            config.llm.model = Some(model);
        }
        if let Some(url) = lookup("CODECLARITY_BASE_URL") {
            config.llm.base_url = Some(url);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            config.llm.openai_api_key = Some(key);
        }
        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            config.llm.anthropic_api_key = Some(key);
        }
        if let Some(temp) = lookup("CODECLARITY_TEMPERATURE") {
            match temp.parse() {
                Ok(t) => config.llm.temperature = t,
                Err(_) => warn!("Ignoring non-numeric CODECLARITY_TEMPERATURE: {}", temp),
            }
        }
        if let Some(max) = lookup("CODECLARITY_MAX_TOKENS") {
            if let Ok(tokens) = max.parse() {
                config.llm.max_tokens = tokens;
            }
        }
        if let Some(timeout) = lookup("CODECLARITY_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                config.llm.timeout_secs = secs;
            }
        }
        if let Some(retries) = lookup("CODECLARITY_MAX_RETRIES") {
            if let Ok(n) = retries.parse() {
                config.llm.max_retries = n;
            }
        }

        if let Some(flag) = lookup("CODECLARITY_JSON_SCHEMA") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.llm.json_schema = true,
                "0" | "false" | "no" | "off" => config.llm.json_schema = false,
                _ => warn!("Ignoring unrecognised CODECLARITY_JSON_SCHEMA: {}", flag),
            }
        }

        // Logging
        if let Some(level) = lookup("RUST_LOG") {
            config.logging.level = level;
        }

        config
    }

    /// Validate configuration
    pub fn validate_config(config: &CodeClarityConfig) -> Result<(), ConfigError> {
        let provider = config.llm.provider.to_lowercase();
        if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid LLM provider: {}. Must be one of: {}",
                config.llm.provider,
                SUPPORTED_PROVIDERS.join(", ")
            )));
        }

        if !(0.0..=2.0).contains(&config.llm.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid temperature: {}. Must be between 0.0 and 2.0",
                config.llm.temperature
            )));
        }

        // RUST_LOG may carry a full filter directive; only bare levels are checked
        let level = config.logging.level.as_str();
        if !level.contains('=') && !level.contains(',') {
            match level {
                "trace" | "debug" | "info" | "warn" | "error" => {}
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        other
                    )))
                }
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &CodeClarityConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = CodeClarityConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            }
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = CodeClarityConfig::default();
        assert!(ConfigManager::validate_config(&config).is_ok());
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.max_retries, 3);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("LLM_PROVIDER", "ollama"),
            ("CODECLARITY_MODEL", "qwen2.5-coder:7b"),
            ("CODECLARITY_TEMPERATURE", "0.7"),
            ("CODECLARITY_MAX_RETRIES", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = ConfigManager::apply_overrides(CodeClarityConfig::default(), |k| {
            vars.get(k).map(|v| v.to_string())
        });

        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.model.as_deref(), Some("qwen2.5-coder:7b"));
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.llm.max_retries, 3);
    }

    #[test]
    fn test_json_schema_flag_override() {
        let off = ConfigManager::apply_overrides(CodeClarityConfig::default(), |k| {
            (k == "CODECLARITY_JSON_SCHEMA").then(|| "false".to_string())
        });
        assert!(!off.llm.json_schema);

        let garbled = ConfigManager::apply_overrides(CodeClarityConfig::default(), |k| {
            (k == "CODECLARITY_JSON_SCHEMA").then(|| "maybe".to_string())
        });
        assert!(garbled.llm.json_schema);
    }

    #[test]
    fn test_specific_provider_variable_wins() {
        let config = ConfigManager::apply_overrides(CodeClarityConfig::default(), |k| match k {
            "CODECLARITY_LLM_PROVIDER" => Some("anthropic".to_string()),
            "LLM_PROVIDER" => Some("ollama".to_string()),
            _ => None,
        });
        assert_eq!(config.llm.provider, "anthropic");
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let mut config = CodeClarityConfig::default();
        config.llm.provider = "genkit".to_string();
        let err = ConfigManager::validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("genkit"));
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let mut config = CodeClarityConfig::default();
        config.llm.temperature = 3.5;
        assert!(ConfigManager::validate_config(&config).is_err());
    }

    #[test]
    fn test_filter_directive_passes_level_check() {
        let mut config = CodeClarityConfig::default();
        config.logging.level = "codeclarity_flows=debug,warn".to_string();
        assert!(ConfigManager::validate_config(&config).is_ok());

        config.logging.level = "loud".to_string();
        assert!(ConfigManager::validate_config(&config).is_err());
    }
}
