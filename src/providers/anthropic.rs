use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::language_utils::Language;
use crate::providers::{check_status, http_client, llm, request_error, TranslationBackend};

/// Anthropic Messages API backend
#[derive(Debug)]
pub struct Anthropic {
    client: Client,
    api_key: String,
    /// Base URL; `/v1/messages` is appended
    endpoint: String,
    model: String,
    /// Free text describing the material, appended to every system prompt
    context: String,
    temperature: f32,
    batch_size: usize,
}

/// Largest reply accepted for one batch
const MAX_REPLY_TOKENS: u32 = 4096;

/// Messages API request body
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// One conversation turn
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Messages API reply
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
}

/// Reply block; only `text` blocks carry translations
#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

impl Anthropic {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        context: impl Into<String>,
        temperature: f32,
        batch_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            client: http_client(timeout),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            context: context.into(),
            temperature,
            batch_size: batch_size.max(1),
        }
    }

    /// Build the request for one batch
    pub fn build_request(&self, texts: &[String], source: Language, target: Language) -> Result<MessagesRequest, ProviderError> {
        Ok(MessagesRequest {
            model: self.model.clone(),
            system: llm::system_prompt(source, target, &self.context),
            messages: vec![ChatTurn {
                role: "user".to_string(),
                content: llm::user_prompt(texts)?,
            }],
            temperature: self.temperature,
            max_tokens: MAX_REPLY_TOKENS,
        })
    }

    /// Concatenated text blocks of a reply
    pub fn reply_text(response: &MessagesResponse) -> String {
        response
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect()
    }

    fn messages_url(&self) -> String {
        let base = if self.endpoint.is_empty() {
            "https://api.anthropic.com"
        } else {
            self.endpoint.trim_end_matches('/')
        };
        format!("{}/v1/messages", base)
    }
}

#[async_trait]
impl TranslationBackend for Anthropic {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source: Language,
        target: Language,
    ) -> Result<Vec<String>, ProviderError> {
        let request = self.build_request(texts, source, target)?;
        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error("Anthropic", e))?;
        let response = check_status("Anthropic", response).await?;

        let reply: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("anthropic reply: {}", e)))?;

        llm::parse_response(&Self::reply_text(&reply), texts.len())
    }
}
