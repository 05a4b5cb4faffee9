/*!
 * Translation backends.
 *
 * Every backend satisfies the same batch contract: the output has the same
 * length and order as the input. The backend is picked once from the
 * configuration by `create_backend` and injected into the engine.
 *
 * - `google`: Google Translate (free endpoint, or Cloud API with a key)
 * - `openai`: OpenAI-compatible chat completions (OpenAI, OpenRouter)
 * - `anthropic`: Anthropic Messages API
 * - `mock`: deterministic offline backend
 */

use std::fmt::Debug;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::error;
use reqwest::{Client, Response, StatusCode};

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;
use crate::language_utils::Language;

pub mod anthropic;
pub mod google;
pub mod llm;
pub mod mock;
pub mod openai;

/// Common trait for all translation backends
///
/// Implementations are interchangeable behind `Box<dyn TranslationBackend>`.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Most texts a single `translate_batch` call accepts
    fn max_batch_size(&self) -> usize;

    /// Translate `texts` from `source` to `target`
    ///
    /// # Returns
    /// * One translation per input text, in input order
    async fn translate_batch(
        &self,
        texts: &[String],
        source: Language,
        target: Language,
    ) -> Result<Vec<String>, ProviderError>;
}

/// Build the configured backend
pub fn create_backend(config: &TranslationConfig) -> Result<Box<dyn TranslationBackend>> {
    let timeout = Duration::from_secs(config.get_timeout_secs());
    let backend: Box<dyn TranslationBackend> = match config.provider {
        TranslationProvider::Google => {
            let api_key = Some(config.get_api_key()).filter(|k| !k.is_empty());
            Box::new(google::GoogleTranslate::new(config.get_endpoint(), api_key, timeout))
        }
        TranslationProvider::OpenAI => {
            let api_key = config.get_api_key();
            if api_key.is_empty() {
                return Err(anyhow!("OpenAI provider requires an API key"));
            }
            Box::new(openai::OpenAiCompatible::new(
                api_key,
                config.get_endpoint(),
                config.get_model(),
                config.common.context.clone(),
                config.common.temperature,
                config.common.llm_batch_size,
                timeout,
            ))
        }
        TranslationProvider::Anthropic => {
            let api_key = config.get_api_key();
            if api_key.is_empty() {
                return Err(anyhow!("Anthropic provider requires an API key"));
            }
            Box::new(anthropic::Anthropic::new(
                api_key,
                config.get_endpoint(),
                config.get_model(),
                config.common.context.clone(),
                config.common.temperature,
                config.common.llm_batch_size,
                timeout,
            ))
        }
        TranslationProvider::Mock => Box::new(mock::MockProvider::working()),
    };
    Ok(backend)
}

/// HTTP client shared by the remote backends
pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// Map a transport failure to a provider error
pub(crate) fn request_error(backend: &str, e: reqwest::Error) -> ProviderError {
    if e.is_timeout() || e.is_connect() {
        ProviderError::ConnectionError(format!("{}: {}", backend, e))
    } else {
        ProviderError::RequestFailed(format!("{}: {}", backend, e))
    }
}

/// Turn a non-success HTTP status into the matching provider error
pub(crate) async fn check_status(backend: &str, response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    error!("{} API error ({}): {}", backend, status, message);

    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        },
    })
}
