//! Chat-completion client for the hosted LLM API.
//!
//! The analysis pipeline talks to the model through [`CompletionBackend`];
//! [`LlmClient`] is the production implementation for any OpenAI-compatible
//! `/chat/completions` endpoint.

#[cfg(test)]
pub mod mock;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{LlmError, ServiceError, ServiceResult};

/// One single-turn completion: a system prompt plus a user prompt
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Pipeline stage name, used for logs and error messages
    pub stage: &'static str,
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Trait for text-generation backends.
pub trait CompletionBackend: Send + Sync {
    /// Generate a completion, returning the assistant message content.
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<String, LlmError>>;
}

/// OpenAI-compatible API client
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new client
    pub fn new(config: LlmConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                ServiceError::Llm(LlmError::Connection {
                    url: config.base_url.clone(),
                    source: e,
                })
            })?;

        Ok(Self { client, config })
    }

    async fn chat(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let body = ChatCompletionRequest {
            model: &request.model,
            messages: vec![
                ChatMessage::system(&request.system),
                ChatMessage::user(&request.prompt),
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut builder = self.client.post(&url).json(&body);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder.send().await.map_err(|e| LlmError::Connection {
            url: url.clone(),
            source: e,
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                stage: request.stage.to_string(),
                status,
                message,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse { source: e })?;

        if let Some(usage) = &completion.usage {
            debug!(
                stage = request.stage,
                model = %request.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion received"
            );
        }

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::NoChoices {
                stage: request.stage.to_string(),
            })?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

impl CompletionBackend for LlmClient {
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<String, LlmError>> {
        Box::pin(self.chat(request))
    }
}

// Internal API types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatMessage<'a> {
    fn system(content: &'a str) -> Self {
        Self {
            role: "system",
            content,
        }
    }

    fn user(content: &'a str) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}
