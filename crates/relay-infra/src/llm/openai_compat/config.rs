//! Configuration for the OpenAI-compatible provider.

use std::time::Duration;

use secrecy::SecretString;

use relay_types::config::LlmConfig;

/// Configuration for an OpenAI-compatible chat completions endpoint.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "openai").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    /// Bearer token. `None` makes every request fail with an authentication error.
    pub api_key: Option<SecretString>,
    /// Default model when a request leaves it empty.
    pub model: String,
    /// Connect timeout for each request.
    pub connect_timeout: Duration,
}

/// OpenAI default configuration.
///
/// Base URL: `https://api.openai.com/v1`
pub fn openai_defaults(api_key: Option<SecretString>, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: "https://api.openai.com/v1".into(),
        api_key,
        model: model.into(),
        connect_timeout: Duration::from_secs(30),
    }
}

impl OpenAiCompatConfig {
    /// Build from the `[llm]` config section.
    pub fn from_llm_config(config: &LlmConfig, api_key: Option<SecretString>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            connect_timeout: Duration::from_secs(config.timeout_secs),
            ..openai_defaults(api_key, &config.model)
        }
    }
}
