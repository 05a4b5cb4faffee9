use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::errors::ProviderError;
use crate::language_utils::Language;
use crate::providers::{check_status, http_client, request_error, TranslationBackend};

const CLOUD_URL: &str = "https://translation.googleapis.com/language/translate/v2";

/// Google Translate client
///
/// Without an API key the quota-limited public endpoint is used, one text per
/// request. With a key, the Cloud Translation v2 API takes whole batches.
#[derive(Debug)]
pub struct GoogleTranslate {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

/// Cloud v2 request body
#[derive(Debug, Serialize)]
struct CloudRequest<'a> {
    q: &'a [String],
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct CloudResponse {
    data: CloudData,
}

#[derive(Debug, Deserialize)]
struct CloudData {
    translations: Vec<CloudTranslation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloudTranslation {
    translated_text: String,
}

impl GoogleTranslate {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            endpoint: endpoint.into(),
            api_key,
        }
    }

    // Google spells regional subtags in upper case
    fn google_code(language: Language) -> &'static str {
        match language {
            Language::Chinese => "zh-CN",
            other => other.code(),
        }
    }

    /// Build the public endpoint URL for one text
    pub fn free_url(&self, text: &str, source: Language, target: Language) -> Result<Url, ProviderError> {
        let base = format!("{}/translate_a/single", self.endpoint.trim_end_matches('/'));
        Url::parse_with_params(
            &base,
            &[
                ("client", "gtx"),
                ("sl", Self::google_code(source)),
                ("tl", Self::google_code(target)),
                ("dt", "t"),
                ("q", text),
            ],
        )
        .map_err(|e| ProviderError::RequestFailed(format!("Invalid Google endpoint {}: {}", base, e)))
    }

    /// Concatenate the translated segments of a public endpoint reply
    pub fn parse_free_response(value: &Value) -> Result<String, ProviderError> {
        let segments = value
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::ParseError("Google reply has no segment list".to_string()))?;

        Ok(segments
            .iter()
            .filter_map(|segment| segment.get(0).and_then(Value::as_str))
            .collect())
    }

    async fn translate_free(&self, text: &str, source: Language, target: Language) -> Result<String, ProviderError> {
        let url = self.free_url(text, source, target)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error("Google", e))?;
        let response = check_status("Google", response).await?;

        let value: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Google response: {}", e)))?;
        Self::parse_free_response(&value)
    }

    async fn translate_cloud(
        &self,
        api_key: &str,
        texts: &[String],
        source: Language,
        target: Language,
    ) -> Result<Vec<String>, ProviderError> {
        let url = Url::parse_with_params(CLOUD_URL, &[("key", api_key)])
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let body = CloudRequest {
            q: texts,
            source: Self::google_code(source),
            target: Self::google_code(target),
            format: "text",
        };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error("Google Cloud", e))?;
        let response = check_status("Google Cloud", response).await?;

        let parsed: CloudResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Google Cloud response: {}", e)))?;

        Ok(parsed
            .data
            .translations
            .into_iter()
            .map(|t| t.translated_text)
            .collect())
    }
}

#[async_trait]
impl TranslationBackend for GoogleTranslate {
    fn name(&self) -> &str {
        "google"
    }

    fn max_batch_size(&self) -> usize {
        if self.api_key.is_some() { 50 } else { 1 }
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source: Language,
        target: Language,
    ) -> Result<Vec<String>, ProviderError> {
        let translated = match &self.api_key {
            Some(key) => self.translate_cloud(key, texts, source, target).await?,
            None => {
                let mut out = Vec::with_capacity(texts.len());
                for text in texts {
                    out.push(self.translate_free(text, source, target).await?);
                }
                out
            }
        };

        if translated.len() != texts.len() {
            return Err(ProviderError::LengthMismatch {
                expected: texts.len(),
                actual: translated.len(),
            });
        }
        debug!("Google translated {} text(s)", translated.len());
        Ok(translated)
    }
}
