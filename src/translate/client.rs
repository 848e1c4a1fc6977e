// AiTranslator — completion calls against an OpenAI- or Anthropic-style
// HTTP API.
//
// Provider, key, model, and an optional custom base URL come from
// configuration; nothing is resolved at call time. A missing provider or
// key is a configuration error raised by the constructor, before any
// network traffic.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AiSdk, Config};

use super::parser::parse_response;
use super::prompt::{build_prompt, SYSTEM_PROMPT};
use super::traits::{Translation, Translator};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AiTranslator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    sdk: AiSdk,
}

impl AiTranslator {
    /// Build a translator from configuration. Fails with a configuration
    /// error when no provider or key is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.require_translator()?;

        let base_url = config
            .ai_base_url
            .clone()
            .unwrap_or_else(|| match config.ai_sdk {
                AiSdk::OpenAi => OPENAI_API_URL.to_string(),
                AiSdk::Anthropic => ANTHROPIC_API_URL.to_string(),
            });

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: config.ai_api_key.clone(),
            model: config.ai_model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            sdk: config.ai_sdk,
        })
    }

    /// Issue one completion call and return the raw text response.
    async fn complete(&self, prompt: &str) -> Result<String> {
        match self.sdk {
            AiSdk::OpenAi => self.complete_openai(prompt).await,
            AiSdk::Anthropic => self.complete_anthropic(prompt).await,
        }
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %self.model, "OpenAI-style completion request");

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Completion request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Completion API returned {status}: {body}"));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to deserialize completion response")?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("Completion response contained no choices"))
    }

    async fn complete_anthropic(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);

        debug!(model = %self.model, "Anthropic-style completion request");

        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("Completion request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Completion API returned {status}: {body}"));
        }

        let messages: MessagesResponse = response
            .json()
            .await
            .context("Failed to deserialize completion response")?;

        messages
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| anyhow!("Completion response contained no text block"))
    }
}

#[async_trait]
impl Translator for AiTranslator {
    async fn translate(&self, text: &str, quoted_text: Option<&str>) -> Result<Translation> {
        let prompt = build_prompt(text, quoted_text);
        let raw = self.complete(&prompt).await?;
        Ok(parse_response(&raw))
    }
}

// -- Serde types for the two provider shapes --

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}
