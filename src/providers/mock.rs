/*!
 * Mock translation backend.
 *
 * Used by the test suite and for offline dry runs. Behaviors:
 * - `MockProvider::working()` - Always succeeds, tagging each text with the target code
 * - `MockProvider::varying()` - Succeeds, but the output differs on every call
 * - `MockProvider::fail_times(n)` - Fails the first `n` calls, then works
 * - `MockProvider::intermittent(n)` - Fails every `n`th call
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::wrong_length()` - Drops the last text of every batch
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::language_utils::Language;
use crate::providers::TranslationBackend;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Succeeds, appending the call number so repeated calls disagree
    Varying,
    /// Fails the first N calls
    FailTimes { failures: usize },
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns one translation too few
    WrongLength,
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every batch received, in call order
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    /// Custom per-text response generator (optional)
    custom_response: Option<fn(&str, Language) -> String>,
    batch_size: usize,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            batches: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
            batch_size: 20,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock whose answers change between calls
    pub fn varying() -> Self {
        Self::new(MockBehavior::Varying)
    }

    /// Create a mock that fails its first `failures` calls
    pub fn fail_times(failures: usize) -> Self {
        Self::new(MockBehavior::FailTimes { failures })
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that answers with too few texts
    pub fn wrong_length() -> Self {
        Self::new(MockBehavior::WrongLength)
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&str, Language) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Limit the texts accepted per call
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Number of `translate_batch` calls so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Batches received so far
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().clone()
    }

    /// Default translation: the text tagged with the target code
    pub fn tag(text: &str, target: Language) -> String {
        format!("[{}] {}", target.code(), text)
    }

    fn translate_one(&self, text: &str, target: Language) -> String {
        match self.custom_response {
            Some(generator) => generator(text, target),
            None => Self::tag(text, target),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            batches: Arc::clone(&self.batches),
            custom_response: self.custom_response,
            batch_size: self.batch_size,
        }
    }
}

#[async_trait]
impl TranslationBackend for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        _source: Language,
        target: Language,
    ) -> Result<Vec<String>, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().push(texts.to_vec());

        let working = || texts.iter().map(|t| self.translate_one(t, target)).collect::<Vec<_>>();

        match self.behavior {
            MockBehavior::Working => Ok(working()),

            MockBehavior::Varying => Ok(texts
                .iter()
                .map(|t| format!("{} #{}", self.translate_one(t, target), count + 1))
                .collect()),

            MockBehavior::FailTimes { failures } => {
                if count < failures {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(working())
                }
            }

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(working())
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::WrongLength => {
                let mut out = working();
                out.pop();
                Ok(out)
            }
        }
    }
}
