use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language utilities for the fixed set of supported languages
///
/// Campaign text is translated between exactly these seven languages. Each
/// one carries the code sent to translation backends and an English display
/// name resolved through the ISO 639 tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Chinese,
    English,
    Russian,
    Korean,
    Spanish,
    Portuguese,
    Japanese,
}

impl Language {
    /// Every supported language, in menu order
    pub const ALL: [Language; 7] = [
        Language::Chinese,
        Language::English,
        Language::Russian,
        Language::Korean,
        Language::Spanish,
        Language::Portuguese,
        Language::Japanese,
    ];

    /// Code understood by the translation backends
    pub fn code(&self) -> &'static str {
        match self {
            Self::Chinese => "zh-cn",
            Self::English => "en",
            Self::Russian => "ru",
            Self::Korean => "ko",
            Self::Spanish => "es",
            Self::Portuguese => "pt",
            Self::Japanese => "ja",
        }
    }

    /// ISO 639-1 code (no regional subtag)
    pub fn iso_639_1(&self) -> &'static str {
        match self {
            Self::Chinese => "zh",
            other => other.code(),
        }
    }

    /// English name, used in LLM prompts and logs
    pub fn name(&self) -> String {
        isolang::Language::from_639_1(self.iso_639_1())
            .map(|lang| lang.to_name().to_string())
            .unwrap_or_else(|| self.lowercase_name().to_string())
    }

    fn lowercase_name(&self) -> &'static str {
        match self {
            Self::Chinese => "chinese",
            Self::English => "english",
            Self::Russian => "russian",
            Self::Korean => "korean",
            Self::Spanish => "spanish",
            Self::Portuguese => "portuguese",
            Self::Japanese => "japanese",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lowercase_name())
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    /// Accepts the lowercase name, the backend code or the ISO 639-1/639-3 code
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();

        if let Some(lang) = Self::ALL.iter().find(|l| {
            l.lowercase_name() == normalized || l.code() == normalized || l.iso_639_1() == normalized
        }) {
            return Ok(*lang);
        }

        // Three-letter codes, e.g. "zho", "eng", "rus"
        if normalized.len() == 3 {
            if let Some(iso) = isolang::Language::from_639_3(&normalized) {
                if let Some(part1) = iso.to_639_1() {
                    if let Some(lang) = Self::ALL.iter().find(|l| l.iso_639_1() == part1) {
                        return Ok(*lang);
                    }
                }
            }
        }

        Err(anyhow!("Unsupported language: {}", s))
    }
}

/// Get the English display name for a language string
pub fn get_language_name(code: &str) -> Result<String> {
    Ok(code.parse::<Language>()?.name())
}
