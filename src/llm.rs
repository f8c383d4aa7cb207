use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ModelSettings;

/// A text-in, text-out language model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Completes `prompt`, stopping before any of the `stop` sequences.
    async fn complete(&self, prompt: &str, stop: &[&str]) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
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

/// Client for Groq's OpenAI-compatible chat completions endpoint.
pub struct GroqClient {
    base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
    client: reqwest::Client,
}

impl GroqClient {
    pub fn with_config(settings: &ModelSettings, api_key: String, client: reqwest::Client) -> Self {
        GroqClient {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.name.clone(),
            temperature: settings.temperature,
            api_key,
            client,
        }
    }

    pub fn get_model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    async fn complete(&self, prompt: &str, stop: &[&str]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            stop: stop.to_vec(),
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "sending chat completion");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Groq API error: {} {}", status, body.trim()));
        }

        let response: ChatResponse = response.json().await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Groq API returned no choices"))?
            .message
            .content
            .unwrap_or_default();

        tracing::debug!(response_chars = content.len(), "chat completion finished");
        Ok(content)
    }
}
