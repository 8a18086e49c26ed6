use crate::llm_provider::*;
use crate::openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
use anyhow::{anyhow, Result};
use codeclarity_core::LLMConfig;
use std::sync::Arc;

#[cfg(feature = "anthropic")]
use crate::anthropic_provider::{AnthropicConfig, AnthropicProvider};

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    pub fn create_from_config(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let provider_name = config.provider.to_lowercase();
        tracing::debug!("Creating LLM provider: {}", provider_name);

        match provider_name.as_str() {
            "openai" => Self::create_openai_provider(config),
            "lmstudio" => Self::create_local_provider(config, LocalEndpoint::LmStudio),
            "ollama" => Self::create_local_provider(config, LocalEndpoint::Ollama),
            "openai-compatible" => Self::create_openai_compatible_provider(config),
            #[cfg(feature = "anthropic")]
            "anthropic" => Self::create_anthropic_provider(config),
            _ => Err(anyhow!(
                "Unsupported LLM provider: {}. Available providers: {}",
                provider_name,
                Self::supported_providers().join(", ")
            )),
        }
    }

    /// Create a provider for the hosted OpenAI API
    fn create_openai_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let api_key = config.openai_api_key.clone().ok_or_else(|| {
            anyhow!(
                "OpenAI API key not found. Set 'openai_api_key' in config \
                 or OPENAI_API_KEY environment variable"
            )
        })?;

        let openai_config = OpenAICompatibleConfig {
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            supports_json_schema: config.json_schema,
            ..OpenAICompatibleConfig::openai(api_key, config.model.clone())
        };

        Ok(Arc::new(OpenAICompatibleProvider::new(openai_config)?))
    }

    /// Create a provider using a local server's OpenAI-compatible endpoint
    fn create_local_provider(
        config: &LLMConfig,
        endpoint: LocalEndpoint,
    ) -> Result<Arc<dyn LLMProvider>> {
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| endpoint.default_model().to_string());

        let (preset, url) = match endpoint {
            LocalEndpoint::LmStudio => (OpenAICompatibleConfig::lm_studio(model), &config.lmstudio_url),
            LocalEndpoint::Ollama => (OpenAICompatibleConfig::ollama(model), &config.ollama_url),
        };

        let compat_config = OpenAICompatibleConfig {
            base_url: format!("{}/v1", url.trim_end_matches('/')),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            supports_json_schema: config.json_schema,
            ..preset
        };

        Ok(Arc::new(OpenAICompatibleProvider::new(compat_config)?))
    }

    /// Create an OpenAI-compatible provider for a custom endpoint
    fn create_openai_compatible_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let base_url = config.base_url.clone().ok_or_else(|| {
            anyhow!("OpenAI-compatible base URL not found. Set 'base_url' in config")
        })?;

        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("Model name is required for OpenAI-compatible provider"))?;

        let compat_config = OpenAICompatibleConfig {
            api_key: config.openai_api_key.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            supports_json_schema: config.json_schema,
            ..OpenAICompatibleConfig::custom(base_url, model, "openai-compatible".to_string())
        };

        Ok(Arc::new(OpenAICompatibleProvider::new(compat_config)?))
    }

    /// Create an Anthropic Claude provider
    #[cfg(feature = "anthropic")]
    fn create_anthropic_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let api_key = config.anthropic_api_key.clone().ok_or_else(|| {
            anyhow!(
                "Anthropic API key not found. Set 'anthropic_api_key' in config \
                 or ANTHROPIC_API_KEY environment variable"
            )
        })?;

        let defaults = AnthropicConfig::default();
        let anthropic_config = AnthropicConfig {
            api_key,
            model: config.model.clone().unwrap_or(defaults.model),
            context_window: defaults.context_window,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        };

        Ok(Arc::new(AnthropicProvider::new(anthropic_config)?))
    }

    /// Check if an LLM provider is reachable
    pub async fn check_availability(provider: &Arc<dyn LLMProvider>) -> bool {
        provider.is_available().await
    }

    /// Get a list of supported providers (based on enabled features)
    pub fn supported_providers() -> Vec<&'static str> {
        let mut providers = vec!["openai", "lmstudio", "ollama", "openai-compatible"];

        #[cfg(feature = "anthropic")]
        providers.push("anthropic");

        providers
    }
}

#[derive(Clone, Copy)]
enum LocalEndpoint {
    LmStudio,
    Ollama,
}

impl LocalEndpoint {
    fn default_model(self) -> &'static str {
        match self {
            LocalEndpoint::LmStudio => "local-model",
            LocalEndpoint::Ollama => "qwen2.5-coder:7b",
        }
    }
}
