/*!
 * Tests for configuration loading and translator construction
 */

use std::fs;
use std::path::PathBuf;

use w3translate::app_config::{Config, LogLevel, TranslationProvider};
use w3translate::pipeline::CampaignTranslator;
use w3translate::translation::IdentifierDictionary;
use w3translate::{Language, SyncMode};

use crate::common::create_temp_dir;

const CONF_JSON: &str = r#"{
    "source_language": "chinese",
    "target_language": "spanish",
    "mode": "synchronize",
    "translation": {
        "provider": "mock",
        "available_providers": [],
        "common": { "retry_attempts": 5, "pacing_delay_ms": 0 }
    },
    "archive": { "tool_path": "/opt/mpqcli/mpqcli", "timeout_secs": 120 },
    "identifiers": { "blacklist": ["确定"] },
    "log_level": "debug"
}"#;

#[test]
fn test_config_fromJson_shouldMergeWithDefaults() {
    let config: Config = serde_json::from_str(CONF_JSON).unwrap();

    assert_eq!(config.source_language, Language::Chinese);
    assert_eq!(config.target_language, Language::Spanish);
    assert_eq!(config.mode, SyncMode::Synchronize);
    assert_eq!(config.translation.provider, TranslationProvider::Mock);
    assert_eq!(config.translation.common.retry_attempts, 5);
    assert_eq!(config.translation.common.retry_backoff_ms, 1000);
    assert_eq!(config.translation.common.backoff_multiplier, 2);
    assert_eq!(config.archive.tool_path, PathBuf::from("/opt/mpqcli/mpqcli"));
    assert_eq!(config.archive.timeout_secs, 120);
    assert_eq!(config.identifiers.blacklist, vec!["确定".to_string()]);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_withZeroRetries_shouldFailValidation() {
    let mut config: Config = serde_json::from_str(CONF_JSON).unwrap();
    config.translation.common.retry_attempts = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_fromConfig_withDictionaryFile_shouldBuildTranslator() {
    let temp = create_temp_dir().unwrap();
    let dictionary = temp.path().join("identifiers.txt");
    fs::write(&dictionary, "# stats\n1. 攻击力 -> Daño de ataque\n2. 护甲 -> Armadura\n").unwrap();

    let mut config: Config = serde_json::from_str(CONF_JSON).unwrap();
    config.identifiers.dictionary_path = Some(dictionary.clone());

    let translator = CampaignTranslator::from_config(config).unwrap();
    assert_eq!(translator.engine().backend_name(), "mock");
    assert_eq!(translator.config().archive.timeout_secs, 120);

    let loaded = IdentifierDictionary::load(&dictionary).unwrap();
    assert_eq!(loaded.hint("护甲"), Some("Armadura"));
}

#[test]
fn test_fromConfig_withMissingDictionary_shouldFail() {
    let mut config: Config = serde_json::from_str(CONF_JSON).unwrap();
    config.identifiers.dictionary_path = Some(PathBuf::from("/nonexistent/identifiers.json"));

    assert!(CampaignTranslator::from_config(config).is_err());
}

#[test]
fn test_fromConfig_withKeylessAnthropic_shouldFail() {
    let mut config: Config = serde_json::from_str(CONF_JSON).unwrap();
    config.translation.provider = TranslationProvider::Anthropic;

    assert!(CampaignTranslator::from_config(config).is_err());
}

#[test]
fn test_identifierDictionary_fromJsonFile_shouldLoad() {
    let temp = create_temp_dir().unwrap();
    let path = temp.path().join("dict.json");
    fs::write(&path, r#"{"力量": "Fuerza", "敏捷": "Agilidad"}"#).unwrap();

    let dictionary = IdentifierDictionary::load(&path).unwrap();
    assert_eq!(dictionary.len(), 2);
    assert_eq!(dictionary.hint("力量"), Some("Fuerza"));
}
