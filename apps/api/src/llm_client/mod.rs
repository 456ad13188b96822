//! LLM Client — the single point of entry for all model calls in Scribo.
//!
//! ARCHITECTURAL RULE: no other module may call the OpenRouter API directly.
//! All LLM interactions MUST go through this module.
//!
//! Each order owns one [`Conversation`]: the full message history is resent
//! on every call so later prompts ("now write chapter 2") can lean on what
//! the model already produced. The conversation lives and dies with the
//! order's generation task — there is no global history map to leak.
//!
//! Transport and API failures are typed [`LlmError`] values. An error string
//! must never flow into a document as if it were generated prose.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Per-order LLM context: the model to use and the growing message history.
///
/// Created by the order's generation task and dropped when it finishes, so
/// history cleanup happens on every exit path.
#[derive(Debug, Clone)]
pub struct Conversation {
    model: String,
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::new("system", prompts::SYSTEM_INSTRUCTIONS)],
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Number of user/assistant messages recorded so far (system prompt excluded).
    pub fn turns(&self) -> usize {
        self.messages.len().saturating_sub(1)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// The single LLM client shared by all orders. Cheap to clone; holds only
/// the HTTP connection pool and the API key.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Sends `prompt` as the next user turn of `conversation` and returns the
    /// assistant's reply, recording both in the history.
    ///
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn ask(
        &self,
        conversation: &mut Conversation,
        prompt: &str,
    ) -> Result<String, LlmError> {
        conversation.messages.push(ChatMessage::new("user", prompt));

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let request_body = ChatRequest {
                model: &conversation.model,
                max_tokens: MAX_TOKENS,
                messages: &conversation.messages,
            };

            let response = self
                .client
                .post(OPENROUTER_API_URL)
                .bearer_auth(&self.api_key)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                // Try to parse error message
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let chat_response: ChatResponse = response.json().await?;

            if let Some(usage) = &chat_response.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            let reply = chat_response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .filter(|text| !text.trim().is_empty())
                .ok_or(LlmError::EmptyContent)?;

            conversation
                .messages
                .push(ChatMessage::new("assistant", &reply));
            return Ok(reply);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_starts_with_system_prompt() {
        let convo = Conversation::new("google/gemini-2.5-flash-lite");
        assert_eq!(convo.turns(), 0);
        assert_eq!(convo.messages[0].role, "system");
        assert_eq!(convo.model(), "google/gemini-2.5-flash-lite");
    }

    #[test]
    fn test_chat_response_deserializes() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "\\section{Introduction}"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 640}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("\\section{Introduction}")
        );
        assert_eq!(response.usage.as_ref().unwrap().completion_tokens, 640);
    }

    #[test]
    fn test_api_error_body_deserializes() {
        let json = r#"{"error": {"message": "invalid model", "code": 400}}"#;
        let err: ApiError = serde_json::from_str(json).unwrap();
        assert_eq!(err.error.message, "invalid model");
    }

    #[test]
    fn test_chat_request_serializes_full_history() {
        let mut convo = Conversation::new("test-model");
        convo.messages.push(ChatMessage::new("user", "write a plan"));
        convo
            .messages
            .push(ChatMessage::new("assistant", "1. Introduction"));

        let request = ChatRequest {
            model: &convo.model,
            max_tokens: MAX_TOKENS,
            messages: &convo.messages,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "test-model");
        assert_eq!(value["messages"].as_array().unwrap().len(), 3);
    }
}
