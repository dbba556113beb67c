// file: src/ai/client.rs
// description: OpenAI-compatible chat completion and embedding client
// reference: https://platform.openai.com/docs/api-reference

use crate::config::AiConfig;
use crate::error::{PipelineError, Result};
use crate::utils::Validator;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Clone)]
pub struct AiClient {
    client: Client,
    api_base: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
}

impl AiClient {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PipelineError::Environment("ai.api_key".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PipelineError::Ai(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let response = self
            .client
            .post(self.endpoint(path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| PipelineError::Ai(format!("Failed to send request to {}: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::Ai(format!(
                "Request to {} failed with status {}: {}",
                path, status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PipelineError::Ai(format!("Failed to parse {} response: {}", path, e)))
    }

    /// Sends one system + user exchange in JSON mode and decodes the reply into `T`.
    pub async fn chat_json<T: DeserializeOwned>(&self, system: &str, user: &str) -> Result<T> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!(
            "Requesting chat completion from {} for {} chars",
            self.chat_model,
            user.len()
        );

        let response: ChatResponse = self.post("chat/completions", &request).await?;
        let content = first_message_content(response)?;
        parse_json_reply(&content)
    }

    /// Embeds `texts` in one request, returning vectors in input order.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            input: texts,
            model: &self.embedding_model,
        };

        debug!("Requesting {} embeddings from {}", texts.len(), self.embedding_model);

        let response: EmbeddingResponse = self.post("embeddings", &request).await?;
        order_embeddings(response, texts.len())
    }
}

fn first_message_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| PipelineError::Ai("Chat completion returned no content".to_string()))
}

const REPLY_PREVIEW_CHARS: usize = 120;

/// Models occasionally wrap JSON-mode replies in a markdown fence.
fn parse_json_reply<T: DeserializeOwned>(content: &str) -> Result<T> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim()).map_err(|e| {
        PipelineError::Ai(format!(
            "Model reply is not valid JSON: {} (reply: {:?})",
            e,
            Validator::truncate_text(body.trim(), REPLY_PREVIEW_CHARS)
        ))
    })
}

fn order_embeddings(response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut data = response.data;
    if data.len() != expected {
        return Err(PipelineError::Ai(format!(
            "Expected {} embeddings, received {}",
            expected,
            data.len()
        )));
    }
    data.sort_by_key(|item| item.index);
    Ok(data.into_iter().map(|item| item.embedding).collect())
}
