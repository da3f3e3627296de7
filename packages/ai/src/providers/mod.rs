//! LLM provider abstraction and implementations.
//!
//! Supports Anthropic Claude and `OpenAI` via a common trait.

pub mod anthropic;
pub mod openai;

use serde::{Deserialize, Serialize};

use crate::AiError;

/// Upper bound on generated tokens for a briefing assessment.
pub const MAX_TOKENS: u32 = 1024;

/// Sampling temperature for briefing text.
pub const TEMPERATURE: f32 = 0.2;

/// A text message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role: "user" or "assistant".
    pub role: String,
    /// Message text.
    pub content: String,
}

impl Message {
    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Sends a text-only chat completion request and returns the reply.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the reply has no text.
    async fn complete(&self, system_prompt: &str, messages: &[Message]) -> Result<String, AiError>;
}

/// Provider selection, usually read from the environment.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    /// Explicit provider name (`AI_PROVIDER`).
    pub provider: Option<String>,
    /// `ANTHROPIC_API_KEY`.
    pub anthropic_api_key: Option<String>,
    /// `OPENAI_API_KEY`.
    pub openai_api_key: Option<String>,
    /// Model override (`AI_MODEL`).
    pub model: Option<String>,
    /// `OpenAI`-compatible base URL override (`AI_BASE_URL`).
    pub base_url: Option<String>,
}

impl ProviderSettings {
    /// Reads `AI_PROVIDER`, `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`,
    /// `AI_MODEL`, and `AI_BASE_URL`. Blank values count as unset.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            provider: var("AI_PROVIDER"),
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            openai_api_key: var("OPENAI_API_KEY"),
            model: var("AI_MODEL"),
            base_url: var("AI_BASE_URL"),
        }
    }

    /// Resolves which provider to use.
    ///
    /// An explicit `provider` wins. Otherwise the first available key in
    /// the order Anthropic, `OpenAI` decides. Returns `None` when nothing
    /// is configured.
    #[must_use]
    pub fn detect_provider(&self) -> Option<String> {
        if let Some(provider) = &self.provider {
            return Some(provider.to_lowercase());
        }
        if self.anthropic_api_key.is_some() {
            log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
            return Some("anthropic".to_string());
        }
        if self.openai_api_key.is_some() || self.base_url.is_some() {
            log::info!("Auto-detected AI provider: OpenAI (OPENAI_API_KEY or AI_BASE_URL found)");
            return Some("openai".to_string());
        }
        None
    }
}

/// Creates an LLM provider from explicit settings.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no provider is configured, the
/// requested provider is unknown, or its API key is missing.
pub fn create_provider(settings: &ProviderSettings) -> Result<Box<dyn LlmProvider>, AiError> {
    let provider = settings.detect_provider().ok_or_else(|| AiError::Config {
        message: "No AI credentials detected. Set ANTHROPIC_API_KEY or OPENAI_API_KEY, \
                  or set AI_PROVIDER explicitly."
            .to_string(),
    })?;

    match provider.as_str() {
        "anthropic" | "claude" => {
            let api_key = settings
                .anthropic_api_key
                .clone()
                .ok_or_else(|| AiError::Config {
                    message: "ANTHROPIC_API_KEY environment variable not set".to_string(),
                })?;
            let model = settings
                .model
                .clone()
                .unwrap_or_else(|| anthropic::DEFAULT_MODEL.to_string());
            Ok(Box::new(anthropic::AnthropicProvider::new(api_key, model)))
        }
        "openai" | "gpt" => {
            let local = settings.base_url.is_some();
            let api_key = match (settings.openai_api_key.clone(), local) {
                (Some(key), _) => key,
                // Self-hosted servers usually ignore the bearer token.
                (None, true) => String::new(),
                (None, false) => {
                    return Err(AiError::Config {
                        message: "OPENAI_API_KEY environment variable not set".to_string(),
                    });
                }
            };
            let model = settings
                .model
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_MODEL.to_string());
            let mut provider = openai::OpenAiProvider::new(api_key, model);
            if let Some(base_url) = &settings.base_url {
                provider = provider.with_base_url(base_url);
            }
            Ok(Box::new(provider))
        }
        other => Err(AiError::Config {
            message: format!("Unknown AI provider: {other}. Use 'anthropic' or 'openai'."),
        }),
    }
}

/// Creates an LLM provider based on environment variables.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, AiError> {
    create_provider(&ProviderSettings::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_provider_wins() {
        let settings = ProviderSettings {
            provider: Some("OpenAI".to_string()),
            anthropic_api_key: Some("a".to_string()),
            openai_api_key: Some("o".to_string()),
            ..ProviderSettings::default()
        };
        assert_eq!(settings.detect_provider().as_deref(), Some("openai"));
        assert_eq!(create_provider(&settings).unwrap().name(), "openai");
    }

    #[test]
    fn anthropic_key_is_detected_first() {
        let settings = ProviderSettings {
            anthropic_api_key: Some("a".to_string()),
            openai_api_key: Some("o".to_string()),
            ..ProviderSettings::default()
        };
        assert_eq!(create_provider(&settings).unwrap().name(), "anthropic");
    }

    #[test]
    fn nothing_configured_is_a_config_error() {
        assert!(matches!(
            create_provider(&ProviderSettings::default()),
            Err(AiError::Config { .. })
        ));
    }

    #[test]
    fn explicit_provider_without_key_is_a_config_error() {
        let settings = ProviderSettings {
            provider: Some("anthropic".to_string()),
            ..ProviderSettings::default()
        };
        assert!(matches!(create_provider(&settings), Err(AiError::Config { .. })));
    }

    #[test]
    fn base_url_allows_keyless_openai() {
        let settings = ProviderSettings {
            base_url: Some("http://localhost:11434/v1".to_string()),
            ..ProviderSettings::default()
        };
        assert_eq!(create_provider(&settings).unwrap().name(), "openai");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let settings = ProviderSettings {
            provider: Some("bedrock".to_string()),
            ..ProviderSettings::default()
        };
        assert!(matches!(create_provider(&settings), Err(AiError::Config { .. })));
    }
}
