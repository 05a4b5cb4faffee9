/*!
 * Tests for the translation engine's retry and pacing behavior
 */

use std::sync::Arc;
use std::time::Duration;

use w3translate::app_config::TranslationCommonConfig;
use w3translate::errors::TranslationError;
use w3translate::providers::mock::MockProvider;
use w3translate::translation::{Pacing, RecordingSleeper, RetryPolicy, TranslationEngine, TranslationJob};
use w3translate::Language;

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_engine_withTransientFailures_shouldBackOffExponentially() {
    let mock = MockProvider::fail_times(2);
    let sleeper = RecordingSleeper::new();
    let engine = TranslationEngine::new(
        Box::new(mock.clone()),
        RetryPolicy::default(),
        Pacing { interval: 10, delay: Duration::ZERO },
    )
    .with_sleeper(Arc::new(sleeper.clone()));

    let output = engine
        .translate_batch(&texts(&["力量"]), Language::Chinese, Language::Korean)
        .await
        .unwrap();

    assert_eq!(output, vec!["[ko] 力量"]);
    assert_eq!(mock.call_count(), 3);
    assert_eq!(
        sleeper.sleeps(),
        vec![Duration::from_millis(1000), Duration::from_millis(2000)]
    );
}

#[tokio::test]
async fn test_engine_fromConfig_shouldUseConfiguredBackoff() {
    let common = TranslationCommonConfig {
        retry_attempts: 4,
        retry_backoff_ms: 250,
        backoff_multiplier: 3,
        pacing_delay_ms: 0,
        ..TranslationCommonConfig::default()
    };
    let mock = MockProvider::failing();
    let sleeper = RecordingSleeper::new();
    let engine = TranslationEngine::from_config(Box::new(mock.clone()), &common)
        .with_sleeper(Arc::new(sleeper.clone()));

    let err = engine
        .translate_batch(&texts(&["x"]), Language::English, Language::Japanese)
        .await
        .unwrap_err();

    assert!(matches!(err, TranslationError::Failure { attempts: 4, .. }));
    assert_eq!(
        sleeper.sleeps(),
        vec![
            Duration::from_millis(250),
            Duration::from_millis(750),
            Duration::from_millis(2250)
        ]
    );
}

#[tokio::test]
async fn test_engine_pacing_shouldBeIndependentOfRetries() {
    let mock = MockProvider::working().with_batch_size(5);
    let sleeper = RecordingSleeper::new();
    let engine = TranslationEngine::new(
        Box::new(mock.clone()),
        RetryPolicy::default(),
        Pacing { interval: 10, delay: Duration::from_millis(700) },
    )
    .with_sleeper(Arc::new(sleeper.clone()));

    let mut job = TranslationJob::new(Language::English, Language::Portuguese);
    for i in 0..20 {
        job.push(i, format!("line {}", i));
    }
    let outcome = engine.run_job(job).await;

    assert_eq!(outcome.translated.len(), 20);
    assert_eq!(outcome.translated[19], (19, "[pt] line 19".to_string()));
    assert_eq!(mock.call_count(), 4);
    assert_eq!(
        sleeper.sleeps(),
        vec![Duration::from_millis(700), Duration::from_millis(700)]
    );
}

#[tokio::test]
async fn test_engine_withOnlyBlankTexts_shouldNotCallBackend() {
    let mock = MockProvider::failing();
    let engine = TranslationEngine::new(Box::new(mock.clone()), RetryPolicy::default(), Pacing::default())
        .with_sleeper(Arc::new(RecordingSleeper::new()));

    let output = engine
        .translate_batch(&texts(&["", " \n "]), Language::Chinese, Language::English)
        .await
        .unwrap();

    assert_eq!(output, texts(&["", " \n "]));
    assert_eq!(mock.call_count(), 0);
}
