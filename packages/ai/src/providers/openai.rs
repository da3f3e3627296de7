//! `OpenAI` GPT provider implementation.
//!
//! Also works against `OpenAI`-compatible servers (Ollama, vLLM, LM
//! Studio) through [`OpenAiProvider::with_base_url`].

use serde::{Deserialize, Serialize};

use super::{LlmProvider, MAX_TOKENS, Message, TEMPERATURE};
use crate::AiError;

/// Model used when `AI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// `OpenAI` API provider.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI` provider.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Points the provider at another `OpenAI`-compatible server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

fn build_messages<'a>(system_prompt: &'a str, messages: &'a [Message]) -> Vec<OpenAiMessage<'a>> {
    std::iter::once(OpenAiMessage {
        role: "system",
        content: system_prompt,
    })
    .chain(messages.iter().map(|m| OpenAiMessage {
        role: &m.role,
        content: &m.content,
    }))
    .collect()
}

fn parse_response(body: &str) -> Result<String, AiError> {
    let response: OpenAiResponse = serde_json::from_str(body)?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiError::Provider {
            message: "No choices in OpenAI response".to_string(),
        })?;

    if choice.finish_reason.as_deref() == Some("length") {
        log::warn!("OpenAI reply truncated at {MAX_TOKENS} tokens");
    }

    choice
        .message
        .content
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AiError::Provider {
            message: "OpenAI response contained no text".to_string(),
        })
}

fn parse_error(status: reqwest::StatusCode, body: &str) -> AiError {
    let message = serde_json::from_str::<OpenAiError>(body)
        .map_or_else(|_| format!("HTTP {status}: {body}"), |err| err.error.message);
    AiError::Provider { message }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, system_prompt: &str, messages: &[Message]) -> Result<String, AiError> {
        let request = OpenAiRequest {
            model: &self.model,
            messages: build_messages(system_prompt, messages),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let mut builder = self
            .client
            .post(self.completions_url())
            .header("Content-Type", "application/json")
            .json(&request);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }
        let resp = builder.send().await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(parse_error(status, &body));
        }

        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_leads_the_messages() {
        let messages = [Message::user("Summarize")];
        let built = build_messages("You are LEEA.", &messages);
        assert_eq!(built.len(), 2);
        assert_eq!(built[0].role, "system");
        assert_eq!(built[1].content, "Summarize");
    }

    #[test]
    fn parses_first_choice() {
        let body = r#"{
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "All clear." }, "finish_reason": "stop" }
            ]
        }"#;
        assert_eq!(parse_response(body).unwrap(), "All clear.");
    }

    #[test]
    fn missing_choices_or_text_is_an_error() {
        assert!(parse_response(r#"{ "choices": [] }"#).is_err());
        let body = r#"{ "choices": [ { "message": { "content": null }, "finish_reason": "stop" } ] }"#;
        assert!(matches!(parse_response(body), Err(AiError::Provider { .. })));
    }

    #[test]
    fn error_body_message_is_surfaced() {
        let body = r#"{ "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" } }"#;
        let err = parse_error(reqwest::StatusCode::UNAUTHORIZED, body);
        assert_eq!(err.to_string(), "Provider error: Incorrect API key provided");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = OpenAiProvider::new(String::new(), DEFAULT_MODEL.to_string())
            .with_base_url("http://localhost:11434/v1/");
        assert_eq!(
            provider.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
    }
}
