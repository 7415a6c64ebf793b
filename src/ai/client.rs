//! LLM (`OpenAI`) API client module
//!
//! Sends the summary prompt through the Responses API and returns the raw text
//! of the model's answer.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content, MessageRole};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::errors::SlackError;

const RESPONSES_URL: &str = "https://api.openai.com/v1/responses";
/// Used for models missing from [`context_window`]; matches `gpt-4o-mini`.
const DEFAULT_CONTEXT_TOKENS: usize = 128_000;
const MAX_OUTPUT_TOKENS: usize = 16_000;
const TOKEN_BUFFER: usize = 250;
const MIN_OUTPUT_TOKENS: usize = 500;

static OPENAI_HTTP_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(300))
        .build()
        .unwrap_or_default()
});

#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4 + 1
}

/// Context window, in tokens, of the named model family.
#[must_use]
pub fn context_window(model: &str) -> usize {
    let model = model.to_ascii_lowercase();
    if model.starts_with("gpt-4.1") {
        1_047_576
    } else if model.starts_with("gpt-5") {
        400_000
    } else if model.starts_with("o1") || model.starts_with("o3") || model.starts_with("o4") {
        200_000
    } else if model.starts_with("gpt-3.5") {
        16_385
    } else if model.starts_with("gpt-4-") || model == "gpt-4" {
        8_192
    } else {
        DEFAULT_CONTEXT_TOKENS
    }
}

/// Sends a chat-style prompt and returns the model's text answer.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: Vec<ChatCompletionMessage>) -> Result<String, SlackError>;
}

/// LLM API client for generating summaries
pub struct LlmClient {
    api_key: String,
    org_id: Option<String>,
    model_name: String,
}

impl LlmClient {
    #[must_use]
    pub fn new(api_key: String, org_id: Option<String>, model_name: String) -> Self {
        Self {
            api_key,
            org_id,
            model_name,
        }
    }

    /// Output budget left after the prompt, or `None` when the prompt does not fit
    /// the model's context window.
    fn output_budget(&self, prompt: &[ChatCompletionMessage]) -> Option<usize> {
        let estimated_input_tokens = prompt
            .iter()
            .map(|msg| estimate_tokens(&format!("{:?}", msg.content)))
            .sum::<usize>();
        let context_tokens = context_window(&self.model_name);
        info!(
            model = %self.model_name,
            context_tokens,
            "Estimated input tokens: {}", estimated_input_tokens
        );

        let max_output_tokens = context_tokens
            .saturating_sub(estimated_input_tokens)
            .saturating_sub(TOKEN_BUFFER)
            .min(MAX_OUTPUT_TOKENS);
        (max_output_tokens >= MIN_OUTPUT_TOKENS).then_some(max_output_tokens)
    }
}

#[async_trait]
impl CompletionClient for LlmClient {
    /// # Errors
    ///
    /// Returns an error if the prompt exceeds the context window, the HTTP request
    /// fails, or the response carries no output text.
    async fn complete(&self, prompt: Vec<ChatCompletionMessage>) -> Result<String, SlackError> {
        #[cfg(feature = "debug-logs")]
        info!("Using ChatGPT prompt:\n{:?}", prompt);

        #[cfg(not(feature = "debug-logs"))]
        info!(
            "Generating summary with {} messages in prompt",
            prompt.len()
        );

        let Some(max_output_tokens) = self.output_budget(&prompt) else {
            return Err(SlackError::OpenAIError(
                "thread is too long to summarize in one request".to_string(),
            ));
        };

        let request_body = json!({
            "model": self.model_name,
            "input": build_responses_input_from_prompt(&prompt),
            "max_output_tokens": max_output_tokens,
            "text": { "format": { "type": "json_object" } }
        });

        let mut request = OPENAI_HTTP_CLIENT
            .post(RESPONSES_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body);
        if let Some(org) = &self.org_id {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SlackError::HttpError(format!("OpenAI API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|e| {
                format!("Failed to read error response body (status {status}): {e}")
            });
            return Err(SlackError::OpenAIError(format!(
                "OpenAI API error (status {status}): {error_text}"
            )));
        }

        let response_json: Value = response.json().await.map_err(|e| {
            SlackError::OpenAIError(format!("Failed to parse OpenAI response: {e}"))
        })?;

        let text = extract_output_text(&response_json)
            .ok_or_else(|| SlackError::OpenAIError("No text in response".to_string()))?;
        debug!(chars = text.len(), "Received completion");
        Ok(text)
    }
}

/// Pull the answer text out of a Responses API payload.
///
/// Prefers the top-level `output_text` convenience field and otherwise joins every
/// `output_text` content part.
#[must_use]
pub fn extract_output_text(response: &Value) -> Option<String> {
    if let Some(text) = response.get("output_text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    let collected: Vec<String> = response
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|part| {
            part.get("text")
                .and_then(Value::as_str)
                .or_else(|| {
                    part.get("text")
                        .and_then(|t| t.get("value"))
                        .and_then(Value::as_str)
                })
                .map(str::to_string)
        })
        .collect();

    (!collected.is_empty()).then(|| collected.join("\n"))
}

/// Build Responses API input payload from a chat-style prompt.
/// - Filters out assistant messages (Responses treats assistant content as output)
/// - Emits typed `input_text` parts; image parts are not used by this prompt
pub(crate) fn build_responses_input_from_prompt(prompt: &[ChatCompletionMessage]) -> Vec<Value> {
    prompt
        .iter()
        .filter(|m| !matches!(m.role, MessageRole::assistant))
        .filter_map(|m| {
            let role_str = match m.role {
                MessageRole::system => "system",
                MessageRole::user | MessageRole::function | MessageRole::tool => "user",
                MessageRole::assistant => "assistant",
            };

            let Content::Text(t) = &m.content else {
                return None;
            };

            Some(json!({
                "role": role_str,
                "content": [{ "type": "input_text", "text": t }]
            }))
        })
        .collect()
}
