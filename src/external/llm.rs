use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ExternalError;
use crate::config::LlmConfig;

const SYSTEM_PROMPT: &str =
    "You are a technical interviewer generating questions and providing feedback.";

/// Single-turn text completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ExternalError>;
}

/// Client for OpenRouter's OpenAI-compatible chat completions endpoint.
pub struct OpenRouterClient {
    api_key: Option<String>,
    api_url: String,
    client: Client,
    model: String,
    referer: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenRouterClient {
    pub fn new(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            client,
            model: config.model.clone(),
            referer: config.referer.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> Result<String, ExternalError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ExternalError::NotConfigured("OPENROUTER_API_KEY"))?;

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.7,
        };

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.referer)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExternalError::from_reqwest("completion API", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ExternalError::Upstream {
                service: "completion API",
                message: format!("status {status}: {body}"),
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ExternalError::from_reqwest("completion API", e))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ExternalError::Upstream {
                service: "completion API",
                message: "response contained no message content".to_string(),
            })
    }
}
