use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

/// Curated stat names used by most Chinese RPG maps
const DEFAULT_IDENTIFIERS: [(&str, &str); 14] = [
    ("全属性", "All Stats"),
    ("力量", "STR"),
    ("敏捷", "AGI"),
    ("智力", "INT"),
    ("生命值", "HP"),
    ("魔法值", "MP"),
    ("生命回复", "HP Regen"),
    ("魔法回复", "MP Regen"),
    ("护甲", "Armor"),
    ("法术抗性", "Magic Resist"),
    ("攻击力", "Attack Damage"),
    ("法强", "Spell Power"),
    ("攻击速度", "Attack Speed"),
    ("攻击间隔", "Attack Interval"),
];

static NUMBERED_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+\.\s*)?(.+?)\s*->\s*(.+)$").unwrap());

/// Source term to canonical meaning hints, plus literals never treated as identifiers
#[derive(Debug, Clone, Default)]
pub struct IdentifierDictionary {
    hints: BTreeMap<String, String>,
    blacklist: BTreeSet<String>,
}

impl IdentifierDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in stat-name dictionary
    pub fn builtin() -> Self {
        Self {
            hints: DEFAULT_IDENTIFIERS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            blacklist: BTreeSet::new(),
        }
    }

    /// Parse a JSON object `{ "source": "hint", ... }`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let hints: BTreeMap<String, String> =
            serde_json::from_str(json).context("Identifier dictionary must be a JSON object of strings")?;
        Ok(Self {
            hints: hints
                .into_iter()
                .filter(|(k, v)| !k.trim().is_empty() && !v.trim().is_empty())
                .collect(),
            blacklist: BTreeSet::new(),
        })
    }

    /// Parse the editable numbered format: `1. 攻击力 -> Attack Damage`, `#` comments
    pub fn from_numbered_text(text: &str) -> Self {
        let mut hints = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match NUMBERED_LINE.captures(line) {
                Some(caps) => {
                    hints.insert(caps[1].trim().to_string(), caps[2].trim().to_string());
                }
                None => debug!("Skipping dictionary line without '->': {}", line),
            }
        }
        Self {
            hints,
            blacklist: BTreeSet::new(),
        }
    }

    /// Load a dictionary file; `.json` files and JSON objects are parsed as JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read identifier dictionary: {:?}", path))?;
        let content = content.trim_start_matches('\u{feff}');

        let is_json = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
            || content.trim_start().starts_with('{');

        let dictionary = if is_json {
            Self::from_json_str(content)?
        } else {
            Self::from_numbered_text(content)
        };

        if dictionary.is_empty() {
            warn!("Identifier dictionary {:?} has no entries", path);
        }
        Ok(dictionary)
    }

    /// Export in the numbered format, one line per entry
    pub fn to_numbered_text(&self) -> String {
        let mut out = String::from("# Format: Keep the number, translate the text after '->'\n\n");
        for (index, (source, hint)) in self.hints.iter().enumerate() {
            out.push_str(&format!("{}. {} -> {}\n", index + 1, source, hint));
        }
        out
    }

    pub fn with_blacklist<I, S>(mut self, blacklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist.extend(blacklist.into_iter().map(Into::into));
        self
    }

    pub fn insert(&mut self, source: impl Into<String>, hint: impl Into<String>) {
        self.hints.insert(source.into(), hint.into());
    }

    pub fn hint(&self, source: &str) -> Option<&str> {
        self.hints.get(source).map(String::as_str)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.hints.contains_key(source)
    }

    pub fn is_blacklisted(&self, literal: &str) -> bool {
        self.blacklist.contains(literal)
    }

    /// Keys ordered longest first, so longer terms win over their substrings
    pub fn keys_longest_first(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.hints.keys().map(String::as_str).collect();
        keys.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        keys
    }

    pub fn len(&self) -> usize {
        self.hints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}

/// Run-scoped memo of resolved identifiers. Entries are write-once.
#[derive(Debug, Clone, Default)]
pub struct IdentifierMapping {
    resolved: BTreeMap<String, String>,
}

impl IdentifierMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a resolution; refused (returns false) when `source` is already resolved
    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>) -> bool {
        let source = source.into();
        if self.resolved.contains_key(&source) {
            debug!("Identifier {:?} already resolved, keeping first value", source);
            return false;
        }
        self.resolved.insert(source, target.into());
        true
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.resolved.get(source).map(String::as_str)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.resolved.contains_key(source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.resolved.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Alternation matching any resolved identifier, longest first.
    ///
    /// Matches still need [`is_whole_match`] before they count.
    pub fn matcher(&self) -> Option<Regex> {
        if self.resolved.is_empty() {
            return None;
        }
        let mut keys: Vec<&str> = self.resolved.keys().map(String::as_str).collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let pattern = keys
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        match Regex::new(&pattern) {
            Ok(matcher) => Some(matcher),
            Err(e) => {
                warn!("Failed to build identifier pattern: {}", e);
                None
            }
        }
    }

    /// Replace every resolved identifier in `text`, longest match first
    pub fn substitute(&self, text: &str) -> (String, usize) {
        let Some(matcher) = self.matcher() else {
            return (text.to_string(), 0);
        };
        let mut count = 0;
        let replaced = matcher.replace_all(text, |caps: &regex::Captures| {
            let Some(found) = caps.get(0).filter(|m| is_whole_match(text, m.start(), m.end())) else {
                return caps[0].to_string();
            };
            count += 1;
            self.get(found.as_str()).unwrap_or(found.as_str()).to_string()
        });
        (replaced.into_owned(), count)
    }
}

/// Whether `text[start..end]` stands on its own.
///
/// An edge that is an ASCII letter or digit must not touch another one, so
/// `Gold` is not found inside `Golden`. CJK edges match anywhere.
pub fn is_whole_match(text: &str, start: usize, end: usize) -> bool {
    let found = &text[start..end];
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';

    let open_ok = match found.chars().next() {
        Some(first) if is_word(first) => !text[..start].chars().next_back().is_some_and(is_word),
        _ => true,
    };
    let close_ok = match found.chars().next_back() {
        Some(last) if is_word(last) => !text[end..].chars().next().is_some_and(is_word),
        _ => true,
    };
    open_ok && close_ok
}

/// Whether `text` holds `key` as a whole identifier
pub fn contains_identifier(text: &str, key: &str) -> bool {
    !key.is_empty()
        && text
            .match_indices(key)
            .any(|(start, found)| is_whole_match(text, start, start + found.len()))
}
