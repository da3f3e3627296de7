//! Anthropic Claude provider implementation.

use serde::{Deserialize, Serialize};

use super::{LlmProvider, MAX_TOKENS, Message, TEMPERATURE};
use crate::AiError;

/// Model used when `AI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic Claude API provider.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

/// Anthropic API request body.
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: &'a [Message],
}

/// Anthropic API response body.
#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Anthropic API error response.
#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

/// Joins the text blocks of a successful response body.
fn parse_response(body: &str) -> Result<String, AiError> {
    let response: AnthropicResponse = serde_json::from_str(body)?;
    let text = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicContentBlock::Text { text } => Some(text),
            AnthropicContentBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    if text.trim().is_empty() {
        return Err(AiError::Provider {
            message: "Anthropic response contained no text".to_string(),
        });
    }
    Ok(text)
}

fn parse_error(status: reqwest::StatusCode, body: &str) -> AiError {
    let message = serde_json::from_str::<AnthropicError>(body)
        .map_or_else(|_| format!("HTTP {status}: {body}"), |err| err.error.message);
    AiError::Provider { message }
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, system_prompt: &str, messages: &[Message]) -> Result<String, AiError> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system: system_prompt,
            messages,
        };

        let resp = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

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
    fn joins_text_blocks() {
        let body = r#"{
            "id": "msg_1",
            "content": [
                { "type": "text", "text": "Exposure is limited." },
                { "type": "tool_use", "id": "t1", "name": "x", "input": {} },
                { "type": "text", "text": "Monitor aftershocks." }
            ],
            "stop_reason": "end_turn"
        }"#;
        assert_eq!(
            parse_response(body).unwrap(),
            "Exposure is limited.\nMonitor aftershocks."
        );
    }

    #[test]
    fn empty_reply_is_an_error() {
        let body = r#"{ "content": [] }"#;
        assert!(matches!(parse_response(body), Err(AiError::Provider { .. })));
    }

    #[test]
    fn error_body_message_is_surfaced() {
        let body = r#"{ "type": "error", "error": { "type": "overloaded_error", "message": "Overloaded" } }"#;
        let err = parse_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, body);
        assert_eq!(err.to_string(), "Provider error: Overloaded");
        let err = parse_error(reqwest::StatusCode::BAD_GATEWAY, "<html>");
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn request_serializes_messages() {
        let messages = [Message::user("Summarize")];
        let request = AnthropicRequest {
            model: DEFAULT_MODEL,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system: "You are LEEA.",
            messages: &messages,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["system"], "You are LEEA.");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Summarize");
    }
}
