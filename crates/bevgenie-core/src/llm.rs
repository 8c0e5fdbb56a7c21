//! Language-model capability and its OpenRouter (OpenAI-compatible) implementation.
//!
//! The pipeline only sees the [`LanguageModel`] and [`Embedder`] traits; tests swap
//! in scripted fakes.

use crate::config::LlmConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dimension of embedding vectors used for knowledge similarity.
pub const EMBEDDING_DIMENSIONS: usize = 1536;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatTurn>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Conversational completion over a system prompt and chat turns.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Single-shot completion used for structured JSON output.
    async fn complete_json(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        self.complete(CompletionRequest {
            system: system.to_string(),
            messages: vec![ChatTurn::user(user)],
            max_tokens,
            temperature: 0.7,
        })
        .await
    }
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Fixed-length ([`EMBEDDING_DIMENSIONS`]) vector for `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenRouter client: chat replies, page JSON, and embeddings.
pub struct OpenRouterClient {
    api_base: String,
    api_key: String,
    chat_model: String,
    page_model: String,
    embedding_model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenRouterClient {
    pub fn new(config: &LlmConfig) -> Self {
        let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
            chat_model: config.chat_model.clone(),
            page_model: config.page_model.clone(),
            embedding_model: config.embedding_model.clone(),
            timeout,
            client,
        }
    }

    fn authorized(&self, path: &str) -> Result<reqwest::RequestBuilder, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        Ok(self
            .client
            .post(format!("{}{}", self.api_base, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", "https://bevgenie.ai")
            .header("X-Title", "BevGenie"))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, LlmError> {
        let res = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))?
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout)
                } else {
                    LlmError::Transport(e)
                }
            })?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }
        Ok(res)
    }

    async fn chat(&self, model: &str, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            content: &request.system,
        });
        messages.extend(request.messages.iter().map(|m| ChatMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));
        let body = ChatRequest {
            model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let res = self.send(self.authorized("/chat/completions")?.json(&body)).await?;
        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }
}

#[async_trait]
impl LanguageModel for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        tracing::debug!(target: "bevgenie::llm", model = %self.chat_model, turns = request.messages.len(), "chat completion");
        self.chat(&self.chat_model, &request).await
    }

    async fn complete_json(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        tracing::debug!(target: "bevgenie::llm", model = %self.page_model, "structured completion");
        let request = CompletionRequest {
            system: system.to_string(),
            messages: vec![ChatTurn::user(user)],
            max_tokens,
            temperature: 0.7,
        };
        self.chat(&self.page_model, &request).await
    }
}

#[async_trait]
impl Embedder for OpenRouterClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let res = self.send(self.authorized("/embeddings")?.json(&body)).await?;
        let parsed: EmbeddingResponse = res
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::Parse("no embedding returned".to_string()))?;
        if embedding.len() != EMBEDDING_DIMENSIONS {
            return Err(LlmError::Parse(format!(
                "expected {} dimensions, got {}",
                EMBEDDING_DIMENSIONS,
                embedding.len()
            )));
        }
        Ok(embedding)
    }
}
