/*!
 * Translation engine.
 *
 * Wraps one backend with the retry policy and request pacing. Output always
 * has the length and order of the input; blank texts are returned as-is
 * without reaching the backend.
 */

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::app_config::TranslationCommonConfig;
use crate::errors::TranslationError;
use crate::language_utils::Language;
use crate::providers::TranslationBackend;
use crate::translation::retry::{RetryPolicy, Sleeper, TokioSleeper};

/// Pause inserted after every `interval` submitted texts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    pub interval: usize,
    pub delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            interval: 10,
            delay: Duration::from_millis(1000),
        }
    }
}

/// A text left untranslated after all attempts
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationFailure {
    /// Position in the submitted batch
    pub index: usize,
    pub text: String,
    pub reason: String,
}

/// Queue of keyed texts for one language pair
#[derive(Debug, Clone)]
pub struct TranslationJob<K> {
    pub entries: VecDeque<(K, String)>,
    pub source: Language,
    pub target: Language,
}

impl<K> TranslationJob<K> {
    pub fn new(source: Language, target: Language) -> Self {
        Self {
            entries: VecDeque::new(),
            source,
            target,
        }
    }

    pub fn push(&mut self, key: K, text: impl Into<String>) {
        self.entries.push_back((key, text.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of a job: every key with its output text, originals for failures
#[derive(Debug, Clone)]
pub struct JobOutcome<K> {
    pub translated: Vec<(K, String)>,
    pub failures: Vec<(K, TranslationFailure)>,
}

pub struct TranslationEngine {
    backend: Box<dyn TranslationBackend>,
    policy: RetryPolicy,
    pacing: Pacing,
    sleeper: Arc<dyn Sleeper>,
    /// Texts submitted since construction, for pacing
    submitted: AtomicUsize,
    /// Backend calls made, retries included
    calls: AtomicUsize,
}

impl std::fmt::Debug for TranslationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationEngine")
            .field("backend", &self.backend)
            .field("policy", &self.policy)
            .field("pacing", &self.pacing)
            .finish()
    }
}

impl TranslationEngine {
    pub fn new(backend: Box<dyn TranslationBackend>, policy: RetryPolicy, pacing: Pacing) -> Self {
        Self {
            backend,
            policy,
            pacing,
            sleeper: Arc::new(TokioSleeper),
            submitted: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Engine configured from the common translation settings
    pub fn from_config(backend: Box<dyn TranslationBackend>, common: &TranslationCommonConfig) -> Self {
        Self::new(
            backend,
            RetryPolicy::from_config(common),
            Pacing {
                interval: common.pacing_interval.max(1),
                delay: Duration::from_millis(common.pacing_delay_ms),
            },
        )
    }

    /// Replace the clock used for backoff and pacing
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Backend invocations so far, retries included
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Translate every text or fail on the first exhausted chunk
    pub async fn translate_batch(
        &self,
        texts: &[String],
        source: Language,
        target: Language,
    ) -> Result<Vec<String>, TranslationError> {
        let mut output = texts.to_vec();
        for chunk in self.chunks(texts) {
            let translated = self.translate_chunk(texts, &chunk, source, target).await?;
            for (index, text) in chunk.into_iter().zip(translated) {
                output[index] = text;
            }
        }
        Ok(output)
    }

    /// Translate every text; failed chunks keep their originals and are reported
    pub async fn translate_batch_lenient(
        &self,
        texts: &[String],
        source: Language,
        target: Language,
    ) -> (Vec<String>, Vec<TranslationFailure>) {
        let mut output = texts.to_vec();
        let mut failures = Vec::new();

        for chunk in self.chunks(texts) {
            match self.translate_chunk(texts, &chunk, source, target).await {
                Ok(translated) => {
                    for (index, text) in chunk.into_iter().zip(translated) {
                        output[index] = text;
                    }
                }
                Err(e) => {
                    warn!("Keeping {} text(s) untranslated: {}", chunk.len(), e);
                    failures.extend(chunk.into_iter().map(|index| TranslationFailure {
                        index,
                        text: texts[index].clone(),
                        reason: e.to_string(),
                    }));
                }
            }
        }

        (output, failures)
    }

    /// Consume a job leniently, keeping keys attached
    pub async fn run_job<K>(&self, job: TranslationJob<K>) -> JobOutcome<K> {
        let (keys, texts): (Vec<K>, Vec<String>) = job.entries.into_iter().unzip();
        let (translated, failures) = self.translate_batch_lenient(&texts, job.source, job.target).await;

        let mut failed: Vec<Option<TranslationFailure>> = vec![None; keys.len()];
        for failure in failures {
            let index = failure.index;
            failed[index] = Some(failure);
        }

        let mut outcome = JobOutcome {
            translated: Vec::with_capacity(keys.len()),
            failures: Vec::new(),
        };
        for ((key, text), failure) in keys.into_iter().zip(translated).zip(failed) {
            match failure {
                Some(failure) => outcome.failures.push((key, failure)),
                None => outcome.translated.push((key, text)),
            }
        }
        outcome
    }

    // Indices of non-blank texts, grouped by the backend's batch limit
    fn chunks(&self, texts: &[String]) -> Vec<Vec<usize>> {
        let pending: Vec<usize> = texts
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.trim().is_empty())
            .map(|(i, _)| i)
            .collect();

        pending
            .chunks(self.backend.max_batch_size().max(1))
            .map(<[usize]>::to_vec)
            .collect()
    }

    async fn translate_chunk(
        &self,
        texts: &[String],
        chunk: &[usize],
        source: Language,
        target: Language,
    ) -> Result<Vec<String>, TranslationError> {
        let batch: Vec<String> = chunk.iter().map(|&i| texts[i].clone()).collect();
        debug!("Sending {} text(s) to {}", batch.len(), self.backend.name());

        let result = self
            .policy
            .run(self.sleeper.as_ref(), |_| {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let batch = &batch;
                async move {
                    let out = self.backend.translate_batch(batch, source, target).await?;
                    if out.len() != batch.len() {
                        return Err(crate::errors::ProviderError::LengthMismatch {
                            expected: batch.len(),
                            actual: out.len(),
                        });
                    }
                    Ok(out)
                }
            })
            .await;

        self.pace(chunk.len()).await;

        result.map_err(|exhausted| TranslationError::Failure {
            index: chunk[0],
            text: texts[chunk[0]].clone(),
            attempts: exhausted.attempts,
            source: exhausted.last_error,
        })
    }

    // Sleep once for each pacing boundary crossed by this chunk
    async fn pace(&self, count: usize) {
        let interval = self.pacing.interval.max(1);
        let before = self.submitted.fetch_add(count, Ordering::SeqCst);
        let crossed = (before + count) / interval - before / interval;
        if crossed > 0 && !self.pacing.delay.is_zero() {
            debug!("Pacing pause after {} texts", before + count);
            self.sleeper
                .sleep(self.pacing.delay.saturating_mul(crossed as u32))
                .await;
        }
    }
}
