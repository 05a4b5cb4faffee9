/*!
 * Identifier synchronization.
 *
 * Some strings appear both in a string table and in the map script, where the
 * script compares, hashes or stores them. Such identifiers must translate to
 * the same text everywhere, or the script logic breaks. The synchronizer
 * finds them, resolves each one once per run through the run-scoped
 * [`IdentifierMapping`], and translates the remaining entries with the
 * identifiers shielded behind `{{n}}` placeholders.
 */

use std::collections::{BTreeSet, HashMap};

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::app_config::SyncMode;
use crate::language_utils::Language;
use crate::string_table::StringTable;
use crate::translation::engine::{TranslationEngine, TranslationJob};
use crate::translation::identifiers::{IdentifierDictionary, IdentifierMapping, contains_identifier, is_whole_match};
use crate::translation::script_scan::{
    self, ScriptKind, ScriptSource, escape_for, is_numeric_only, is_opaque_key, is_path_like,
};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{(\d+)\}\}").unwrap());
// Color codes `|cAARRGGBB`, `|r` and line breaks `|n`
static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\|[cC][0-9A-Fa-f]{8}|\|[rRnN]").unwrap());

/// Dependency literals shorter than this are too ambiguous to look for inside entries
const MIN_EMBEDDED_CHARS: usize = 2;

/// An entry left untranslated
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFailure {
    pub id: u32,
    pub text: String,
    pub reason: String,
}

/// What happened to one string table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Identifiers found in this table and its script
    pub identifiers: usize,
    /// Identifiers resolved for the first time in this run
    pub newly_resolved: usize,
    /// Identifiers the backend could not translate, stored untranslated
    pub unresolved_identifiers: Vec<String>,
    /// Entries that are, or contain, an identifier
    pub synchronized_entries: usize,
    /// Entries translated on their own
    pub independent_entries: usize,
    /// Blank, numeric and opaque entries left as they are
    pub passed_through: usize,
    pub failures: Vec<EntryFailure>,
    /// Shielded entries whose placeholders came back damaged
    pub placeholder_fallbacks: usize,
    /// Script literals rewritten to their translation
    pub script_replacements: usize,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.unresolved_identifiers.is_empty()
    }
}

pub struct IdentifierSynchronizer<'a> {
    engine: &'a TranslationEngine,
    dictionary: &'a IdentifierDictionary,
    mode: SyncMode,
    source: Language,
    target: Language,
}

impl<'a> IdentifierSynchronizer<'a> {
    pub fn new(
        engine: &'a TranslationEngine,
        dictionary: &'a IdentifierDictionary,
        mode: SyncMode,
        source: Language,
        target: Language,
    ) -> Self {
        Self {
            engine,
            dictionary,
            mode,
            source,
            target,
        }
    }

    pub fn source(&self) -> Language {
        self.source
    }

    /// Translate a table in place, keeping identifiers consistent with `mapping`.
    ///
    /// The script, when given, is only read here; see [`rewrite_script`].
    pub async fn synchronize(
        &self,
        table: &mut StringTable,
        script: Option<&ScriptSource>,
        mapping: &mut IdentifierMapping,
    ) -> SyncReport {
        let scripts: Vec<&ScriptSource> = script.into_iter().collect();
        self.synchronize_with_scripts(table, &scripts, mapping).await
    }

    /// Like [`synchronize`](Self::synchronize), checking the table against several scripts.
    ///
    /// The campaign table goes through here with every map script, since its
    /// strings can be looked up from any chapter.
    pub async fn synchronize_with_scripts(
        &self,
        table: &mut StringTable,
        scripts: &[&ScriptSource],
        mapping: &mut IdentifierMapping,
    ) -> SyncReport {
        let mut report = SyncReport::default();

        let identifiers = self.collect_identifiers_from(table, scripts);
        report.identifiers = identifiers.len();
        let (resolved, unresolved) = self.resolve(&identifiers, mapping).await;
        report.newly_resolved = resolved;
        report.unresolved_identifiers = unresolved;

        self.translate_entries(table, mapping, &mut report).await;

        info!(
            "Table done: {} identifier(s), {} synchronized, {} independent, {} passed through, {} failed",
            report.identifiers,
            report.synchronized_entries,
            report.independent_entries,
            report.passed_through,
            report.failures.len()
        );
        report
    }

    /// Strings that must translate identically in the table and the script
    pub fn collect_identifiers(&self, table: &StringTable, script: Option<&ScriptSource>) -> BTreeSet<String> {
        let scripts: Vec<&ScriptSource> = script.into_iter().collect();
        self.collect_identifiers_from(table, &scripts)
    }

    pub fn collect_identifiers_from(&self, table: &StringTable, scripts: &[&ScriptSource]) -> BTreeSet<String> {
        let entry_texts: Vec<&str> = table.iter().map(|e| e.text().trim()).collect();
        let exact_entries: BTreeSet<&str> = entry_texts.iter().copied().collect();
        let mut identifiers = BTreeSet::new();

        for script in scripts {
            for literal in script_scan::scan_literals(&script.text, script.kind) {
                let value = literal.value.trim();
                if exact_entries.contains(value) || self.dictionary.contains(value) {
                    identifiers.insert(value.to_string());
                }
            }

            for literal in script_scan::scan_dependencies(&script.text, script.kind).into_keys() {
                let value = literal.trim();
                if value.chars().count() >= MIN_EMBEDDED_CHARS
                    && entry_texts.iter().any(|text| contains_identifier(text, value))
                {
                    identifiers.insert(value.to_string());
                }
            }
        }

        for key in self.dictionary.keys_longest_first() {
            if entry_texts.iter().any(|text| contains_identifier(text, key)) {
                identifiers.insert(key.to_string());
            }
        }

        identifiers.retain(|value| self.is_eligible(value));
        debug!("Collected {} identifier(s)", identifiers.len());
        identifiers
    }

    /// Resolve identifiers missing from `mapping` with one lenient batch.
    ///
    /// Returns how many were added and which ones the backend failed on; those
    /// are stored with their dictionary hint or untranslated, so every later
    /// occurrence still agrees.
    pub async fn resolve(
        &self,
        identifiers: &BTreeSet<String>,
        mapping: &mut IdentifierMapping,
    ) -> (usize, Vec<String>) {
        let mut added = 0;
        let mut pending = Vec::new();

        let fresh: Vec<String> = identifiers.iter().filter(|i| !mapping.contains(i)).cloned().collect();
        for identifier in fresh {
            match (self.mode, self.dictionary.hint(&identifier)) {
                (SyncMode::Preserve, Some(hint)) => {
                    mapping.insert(identifier, hint);
                    added += 1;
                }
                _ => pending.push(identifier),
            }
        }

        if pending.is_empty() {
            return (added, Vec::new());
        }

        info!("Resolving {} new identifier(s) with {}", pending.len(), self.engine.backend_name());
        let (translated, failures) = self
            .engine
            .translate_batch_lenient(&pending, self.source, self.target)
            .await;
        let failed: BTreeSet<usize> = failures.iter().map(|f| f.index).collect();

        let mut unresolved = Vec::new();
        for (index, (identifier, output)) in pending.into_iter().zip(translated).enumerate() {
            let hint = self.dictionary.hint(&identifier);
            let value = if failed.contains(&index) {
                warn!("Identifier {:?} stays untranslated after backend failure", identifier);
                unresolved.push(identifier.clone());
                hint.map(str::to_string).unwrap_or_else(|| identifier.clone())
            } else {
                let output = output.trim().to_string();
                if let Some(hint) = hint.filter(|h| *h != output) {
                    warn!(
                        "Backend translated {:?} as {:?}, dictionary suggests {:?}; using backend output",
                        identifier, output, hint
                    );
                }
                output
            };
            if mapping.insert(identifier, value) {
                added += 1;
            }
        }

        (added, unresolved)
    }

    async fn translate_entries(&self, table: &mut StringTable, mapping: &IdentifierMapping, report: &mut SyncReport) {
        let matcher = mapping.matcher();
        let mut updates: Vec<(u32, String)> = Vec::new();
        let mut restores: HashMap<u32, Vec<String>> = HashMap::new();
        let mut job = TranslationJob::new(self.source, self.target);

        for entry in table.iter() {
            let text = entry.text();
            let trimmed = text.trim();

            if trimmed.is_empty() || is_opaque_key(trimmed) || is_numeric_only(trimmed) {
                report.passed_through += 1;
                continue;
            }

            if let Some(target) = mapping.get(trimmed) {
                updates.push((entry.id(), rewrap(text, target)));
                report.synchronized_entries += 1;
                continue;
            }

            let shielded = shield(text, matcher.as_ref(), mapping);
            if shielded.identifiers > 0 {
                report.synchronized_entries += 1;
            } else {
                report.independent_entries += 1;
            }

            if shielded.restore.is_empty() {
                job.push(entry.id(), text);
            } else if has_translatable_text(&shielded.masked) {
                job.push(entry.id(), shielded.masked);
                restores.insert(entry.id(), shielded.restore);
            } else {
                let restored = unshield(&shielded.masked, &shielded.restore);
                updates.push((entry.id(), restored.unwrap_or_else(|| text.to_string())));
            }
        }

        if !job.is_empty() {
            let outcome = self.engine.run_job(job).await;
            for (id, output) in outcome.translated {
                let output = match restores.get(&id) {
                    Some(restore) => match unshield(&output, restore) {
                        Some(restored) => restored,
                        None => {
                            debug!("Placeholders damaged in entry {}, substituting directly", id);
                            report.placeholder_fallbacks += 1;
                            let original = table.get(id).unwrap_or_default();
                            mapping.substitute(original).0
                        }
                    },
                    None => output,
                };
                updates.push((id, output));
            }
            for (id, failure) in outcome.failures {
                report.failures.push(EntryFailure {
                    id,
                    text: table.get(id).map(str::to_string).unwrap_or(failure.text),
                    reason: failure.reason,
                });
            }
        }

        for (id, text) in updates {
            if let Err(e) = table.set_text(id, text) {
                warn!("Keeping original text of entry {}: {}", id, e);
                report.failures.push(EntryFailure {
                    id,
                    text: table.get(id).unwrap_or_default().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    fn is_eligible(&self, value: &str) -> bool {
        !value.is_empty()
            && value.chars().any(char::is_alphabetic)
            && !is_opaque_key(value)
            && !is_path_like(value)
            && !is_numeric_only(value)
            && !self.dictionary.is_blacklisted(value)
    }
}

/// Replace script literals that are resolved identifiers with their translation
pub fn rewrite_script(source: &str, kind: ScriptKind, mapping: &IdentifierMapping) -> (String, usize) {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    let mut replaced = 0;

    for literal in script_scan::scan_literals(source, kind) {
        let value = literal.value.trim();
        let Some(target) = mapping.get(value) else {
            continue;
        };
        if target == value {
            continue;
        }
        out.push_str(&source[cursor..literal.start]);
        out.push_str(&escape_for(&rewrap(&literal.value, target), literal.quote));
        cursor = literal.end;
        replaced += 1;
    }

    out.push_str(&source[cursor..]);
    (out, replaced)
}

/// Replace resolved identifiers anywhere in a plain text file
pub fn apply_to_text(text: &str, mapping: &IdentifierMapping) -> (String, usize) {
    mapping.substitute(text)
}

// Put `target` in place of the trimmed part of `original`
fn rewrap(original: &str, target: &str) -> String {
    let start = original.len() - original.trim_start().len();
    let end = original.trim_end().len().max(start);
    format!("{}{}{}", &original[..start], target, &original[end..])
}

// An entry with markup and identifiers swapped for `{{n}}`; `restore[n]` goes back in
struct Shielded {
    masked: String,
    restore: Vec<String>,
    identifiers: usize,
}

// Markup goes first so a color code glued to a word does not hide its boundary
fn shield(text: &str, matcher: Option<&Regex>, mapping: &IdentifierMapping) -> Shielded {
    let mut restore: Vec<String> = Vec::new();
    let mut identifiers = 0;

    let masked = MARKUP.replace_all(text, |caps: &regex::Captures| placeholder(slot(&mut restore, &caps[0])));
    let masked = match matcher {
        Some(matcher) => matcher
            .replace_all(&masked, |caps: &regex::Captures| {
                let Some(found) = caps.get(0).filter(|m| is_whole_match(&masked, m.start(), m.end())) else {
                    return caps[0].to_string();
                };
                identifiers += 1;
                let target = mapping.get(found.as_str()).unwrap_or(found.as_str());
                placeholder(slot(&mut restore, target))
            })
            .into_owned(),
        None => masked.into_owned(),
    };

    Shielded {
        masked,
        restore,
        identifiers,
    }
}

fn slot(restore: &mut Vec<String>, value: &str) -> usize {
    match restore.iter().position(|r| r == value) {
        Some(index) => index,
        None => {
            restore.push(value.to_string());
            restore.len() - 1
        }
    }
}

fn placeholder(index: usize) -> String {
    format!("{{{{{}}}}}", index)
}

// `None` when a placeholder is missing from the backend output
fn unshield(translated: &str, restore: &[String]) -> Option<String> {
    if !(0..restore.len()).all(|i| translated.contains(&placeholder(i))) {
        return None;
    }
    let restored = PLACEHOLDER.replace_all(translated, |caps: &regex::Captures| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|i| restore.get(i))
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    });
    Some(restored.into_owned())
}

fn has_translatable_text(masked: &str) -> bool {
    PLACEHOLDER.replace_all(masked, "").chars().any(char::is_alphabetic)
}
