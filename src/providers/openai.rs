use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::language_utils::Language;
use crate::providers::{check_status, http_client, llm, request_error, TranslationBackend};

/// Client for OpenAI-compatible chat completion APIs (OpenAI, OpenRouter)
#[derive(Debug)]
pub struct OpenAiCompatible {
    /// HTTP client for API requests
    client: Client,
    api_key: String,
    /// Base URL up to and including the API version, e.g. `https://api.openai.com/v1`
    endpoint: String,
    model: String,
    /// Free text describing the material, appended to every system prompt
    context: String,
    temperature: f32,
    batch_size: usize,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    pub temperature: f32,
}

/// Chat message
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
}

/// One completion choice
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,
}

impl OpenAiCompatible {
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
    pub fn build_request(&self, texts: &[String], source: Language, target: Language) -> Result<OpenAIRequest, ProviderError> {
        Ok(OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: llm::system_prompt(source, target, &self.context),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: llm::user_prompt(texts)?,
                },
            ],
            temperature: self.temperature,
        })
    }

    /// Text of the first choice
    pub fn extract_text(response: &OpenAIResponse) -> String {
        response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TranslationBackend for OpenAiCompatible {
    fn name(&self) -> &str {
        "openai"
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
        let api_url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error("OpenAI", e))?;
        let response = check_status("OpenAI", response).await?;

        let parsed: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse OpenAI API response: {}", e)))?;

        llm::parse_response(&Self::extract_text(&parsed), texts.len())
    }
}
