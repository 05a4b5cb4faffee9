/*!
 * Script literal scanning.
 *
 * Finds string literals in `war3map.j` (JASS) or `war3map.lua` sources,
 * skipping comments and rawcode literals, and classifies the literals the
 * script uses as lookup keys (comparisons, hashes, hashtable keys...).
 */

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

/// Script dialect, which decides the comment syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Jass,
    Lua,
}

impl ScriptKind {
    pub fn from_path(path: &Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("lua") => Self::Lua,
            _ => Self::Jass,
        }
    }
}

/// A decoded map script
#[derive(Debug, Clone)]
pub struct ScriptSource {
    pub kind: ScriptKind,
    pub text: String,
}

impl ScriptSource {
    pub fn new(kind: ScriptKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Delimiter of a string literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Double,
    /// Lua `'...'`
    Single,
    /// Lua `[[...]]` or `[==[...]==]`, no escapes
    LongBracket,
}

/// One string literal of a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLiteral {
    /// Byte offset of the first character after the opening delimiter
    pub start: usize,
    /// Byte offset of the closing delimiter
    pub end: usize,
    /// Unescaped value
    pub value: String,
    pub quote: Quote,
}

/// How a script uses a literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Usage {
    StringComparison,
    StringHash,
    LoadStrParam,
    SaveStrValue,
    HashtableKey,
    VariableAssign,
    UiCall,
    ConcatPart,
    SubStringMatch,
}

// Literal body as it appears between delimiters; the Lua forms never match in JASS
// because `scan_literals` does not report them there
const LIT: &str = r#"(?:"((?:[^"\\\n]|\\.)*)"|'((?:[^'\\\n]|\\.)*)'|\[\[((?s:.*?))\]\])"#;

static DEPENDENCY_PATTERNS: Lazy<Vec<(Regex, Usage)>> = Lazy::new(|| {
    let p = |s: &str| Regex::new(&s.replace("LIT", LIT)).unwrap();
    vec![
        (p(r"(?:LoadStr|GetStr)\s*\([^)]+\)\s*==\s*LIT"), Usage::StringComparison),
        (p(r"(?i)\bif\s+[^\n]*==\s*LIT"), Usage::StringComparison),
        (p(r"(?i)StringHash\s*\(\s*LIT\s*\)"), Usage::StringHash),
        (p(r"LoadStr\s*\([^)]+\s*,\s*LIT\s*\)"), Usage::LoadStrParam),
        (p(r"SaveStr\s*\([^,]+,\s*[^,]+,\s*[^,]+,\s*LIT\s*\)"), Usage::SaveStrValue),
        (p(r"(?i)Save\w+\s*\([^,]+,\s*[^,]+,\s*LIT\s*,"), Usage::HashtableKey),
        (p(r"(?i)\bset\s+\w+(?:\[[^\]]*\])?\s*=\s*LIT"), Usage::VariableAssign),
        (p(r"(?:DisplayTextToPlayer|DisplayTimedTextToPlayer|BJDebugMsg|DialogSetMessage)\s*\([^\n]*?LIT"), Usage::UiCall),
        (p(r#""[^"\n]*"\s*(?:\+|\.\.)\s*LIT"#), Usage::ConcatPart),
        (p(r"(?i)SubString\s*\([^,]+,\s*\d+,\s*\d+\)\s*==\s*LIT"), Usage::SubStringMatch),
    ]
});

static PATH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^[A-Za-z]:[\\/]",
        r"^[\\/][\\/]",
        r"(?i)ReplaceableTextures[\\/]",
        r"(?i)Sounds?[\\/]",
        r"(?i)Models?[\\/]",
        r"(?i)Textures?[\\/]",
        r"(?i)\.(blp|mdl|mdx|tga|mp3|wav|w3m|w3x|slk|txt|ai|j)$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TRIGSTR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^TRIGSTR_\d+$").unwrap());
static FOURCC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{4}$").unwrap());
static CODE_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:udg_|gg_|Trig_)\w*$|^[A-Za-z_][A-Za-z0-9]*_[A-Za-z0-9_]+$").unwrap());

/// List the string literals of a script, in source order
pub fn scan_literals(source: &str, kind: ScriptKind) -> Vec<ScriptLiteral> {
    let bytes = source.as_bytes();
    let mut literals = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if kind == ScriptKind::Jass && bytes.get(i + 1) == Some(&b'/') => {
                i = skip_line(bytes, i);
            }
            b'/' if kind == ScriptKind::Jass && bytes.get(i + 1) == Some(&b'*') => {
                i = find(bytes, i + 2, b"*/").map_or(bytes.len(), |end| end + 2);
            }
            b'-' if kind == ScriptKind::Lua && bytes.get(i + 1) == Some(&b'-') => {
                i = match long_bracket_level(bytes, i + 2) {
                    Some(level) => {
                        let close = format!("]{}]", "=".repeat(level));
                        find(bytes, i + level + 4, close.as_bytes()).map_or(bytes.len(), |end| end + close.len())
                    }
                    None => skip_line(bytes, i),
                };
            }
            b'[' if kind == ScriptKind::Lua => match long_bracket_level(bytes, i) {
                Some(level) => {
                    let start = i + level + 2;
                    let close = format!("]{}]", "=".repeat(level));
                    match find(bytes, start, close.as_bytes()) {
                        Some(end) => {
                            literals.push(ScriptLiteral {
                                start,
                                end,
                                value: source[start..end].to_string(),
                                quote: Quote::LongBracket,
                            });
                            i = end + close.len();
                        }
                        None => i = bytes.len(),
                    }
                }
                None => i += 1,
            },
            b'\'' if kind == ScriptKind::Jass => {
                // rawcode such as 'h001'
                let (end, _) = skip_quoted(bytes, i + 1, b'\'');
                i = end + 1;
            }
            quote @ (b'"' | b'\'') => {
                let start = i + 1;
                let (end, terminated) = skip_quoted(bytes, start, quote);
                if terminated {
                    literals.push(ScriptLiteral {
                        start,
                        end,
                        value: unescape(&source[start..end]),
                        quote: if quote == b'"' { Quote::Double } else { Quote::Single },
                    });
                }
                i = end + 1;
            }
            _ => i += 1,
        }
    }

    literals
}

/// Literals used as lookup keys, with every usage found
pub fn scan_dependencies(source: &str, kind: ScriptKind) -> BTreeMap<String, BTreeSet<Usage>> {
    // Only captures that start a real literal count; this drops matches inside comments
    let literal_starts: HashSet<usize> = scan_literals(source, kind).iter().map(|l| l.start).collect();
    let mut dependencies: BTreeMap<String, BTreeSet<Usage>> = BTreeMap::new();

    for (pattern, usage) in DEPENDENCY_PATTERNS.iter() {
        for caps in pattern.captures_iter(source) {
            let Some((index, group)) = caps.iter().enumerate().skip(1).find_map(|(i, g)| g.map(|g| (i, g))) else {
                continue;
            };
            if !literal_starts.contains(&group.start()) {
                continue;
            }
            // the third alternative is a long bracket string, which has no escapes
            let value = if index == 3 { group.as_str().to_string() } else { unescape(group.as_str()) };
            if value.trim().is_empty() || is_path_like(&value) || is_opaque_key(&value) {
                continue;
            }
            dependencies.entry(value).or_default().insert(*usage);
        }
    }

    dependencies
}

/// Whether a literal names a file rather than text
pub fn is_path_like(value: &str) -> bool {
    if value.len() < 3 {
        return false;
    }
    PATH_PATTERNS.iter().any(|p| p.is_match(value))
}

/// Digits with optional punctuation, e.g. `100`, `+15%`, `3.5`
pub fn is_numeric_only(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || "+-.,:%/()xX*".contains(c))
}

/// Keys whose meaning is their exact spelling: `TRIGSTR_012`, rawcodes such as
/// `h001`, and code identifiers such as `udg_Hero`
pub fn is_opaque_key(value: &str) -> bool {
    let trimmed = value.trim();
    TRIGSTR.is_match(trimmed)
        || (FOURCC.is_match(trimmed) && trimmed.chars().any(|c| c.is_ascii_digit()))
        || CODE_IDENTIFIER.is_match(trimmed)
}

/// Decode JASS and Lua escapes; unknown escapes are kept verbatim
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Encode a value for use between double quotes
pub fn escape(value: &str) -> String {
    escape_for(value, Quote::Double)
}

/// Encode a value for use inside the given delimiter
pub fn escape_for(value: &str, quote: Quote) -> String {
    if quote == Quote::LongBracket {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' if quote == Quote::Double => out.push_str("\\\""),
            '\'' if quote == Quote::Single => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

// `[[` is level 0, `[==[` is level 2
fn long_bracket_level(bytes: &[u8], at: usize) -> Option<usize> {
    let equals = bytes.get(at + 1..)?.iter().take_while(|&&b| b == b'=').count();
    (bytes.get(at + 1 + equals) == Some(&b'[')).then_some(equals)
}

fn skip_line(bytes: &[u8], from: usize) -> usize {
    find(bytes, from, b"\n").unwrap_or(bytes.len())
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

// Returns the index of the closing quote (or end of line/input) and whether it was found
fn skip_quoted(bytes: &[u8], from: usize, quote: u8) -> (usize, bool) {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' if quote == b'\'' => return (i, false),
            c if c == quote => return (i, true),
            _ => i += 1,
        }
    }
    (bytes.len(), false)
}
