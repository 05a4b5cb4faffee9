/*!
 * String table (`.wts`) codec.
 *
 * A table is a sequence of blocks:
 *
 * ```text
 * STRING 12
 * // optional comment
 * {
 * text, possibly
 * over several lines
 * }
 * ```
 *
 * Parsed entries remember their exact surrounding layout (blank lines,
 * comments, line endings), so an untranslated table serializes back to the
 * same bytes. Entries added later use the canonical layout.
 */

pub mod encoding;

use std::collections::HashSet;

use encoding_rs::Encoding;

use crate::errors::FormatError;
use crate::language_utils::Language;

/// Raw text around an entry's body, as read from the file
#[derive(Debug, Clone, PartialEq, Eq)]
struct BlockLayout {
    /// Everything from the end of the previous block up to and including the `{` line
    prefix: String,
    /// Line ending after the last body line; `None` when the body was empty
    body_eol: Option<String>,
    /// The `}` line including its line ending
    close: String,
}

/// One block of a string table
#[derive(Debug, Clone)]
pub struct StringEntry {
    id: u32,
    text: String,
    layout: Option<BlockLayout>,
}

impl StringEntry {
    /// New entry using the canonical layout on serialization
    pub fn new(id: u32, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            layout: None,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Ordered, id-unique collection of string entries tagged with its source encoding
#[derive(Debug, Clone)]
pub struct StringTable {
    entries: Vec<StringEntry>,
    encoding: &'static Encoding,
    bom: bool,
    eol: &'static str,
    trailer: String,
}

impl Default for StringTable {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            encoding: encoding_rs::UTF_8,
            bom: false,
            eol: "\n",
            trailer: String::new(),
        }
    }
}

enum ParseState {
    Between,
    ExpectOpen { id: u32, line: usize },
    Body { id: u32, line: usize, lines: Vec<String> },
}

fn split_eol(raw: &str) -> (&str, &str) {
    if let Some(content) = raw.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = raw.strip_suffix('\n') {
        (content, "\n")
    } else {
        (raw, "")
    }
}

fn is_comment_or_blank(content: &str) -> bool {
    let trimmed = content.trim();
    trimmed.is_empty() || trimmed.starts_with("//")
}

fn parse_header(content: &str, line: usize) -> Result<Option<u32>, FormatError> {
    let trimmed = content.trim_start();
    let Some(rest) = trimmed.strip_prefix("STRING") else {
        return Ok(None);
    };
    // "STRINGS" or similar is not a header keyword
    if rest.chars().next().is_some_and(|c| !c.is_whitespace()) {
        return Ok(None);
    }

    rest.split_whitespace()
        .next()
        .and_then(|token| token.parse::<u32>().ok())
        .map(Some)
        .ok_or(FormatError::MissingId { line })
}

/// Whether a body line would be read back as a delimiter
fn is_delimiter_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed == "{" || trimmed.starts_with('}')
}

impl StringTable {
    /// Parse raw table bytes, detecting their encoding
    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        Self::parse_decoded(encoding::decode(bytes))
    }

    /// Parse raw table bytes written in `language`, trying its codepages first
    pub fn parse_for(bytes: &[u8], language: Language) -> Result<Self, FormatError> {
        Self::parse_decoded(encoding::decode_for(bytes, Some(language)))
    }

    fn parse_decoded(decoded: encoding::Decoded) -> Result<Self, FormatError> {
        let mut table = Self::parse_str(&decoded.text)?;
        table.encoding = decoded.encoding;
        table.bom = decoded.bom;
        Ok(table)
    }

    /// Parse already decoded text; the table is tagged UTF-8
    pub fn parse_str(text: &str) -> Result<Self, FormatError> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        let mut prefix = String::new();
        let mut state = ParseState::Between;
        let mut eol: Option<&'static str> = None;

        for (index, raw) in text.split_inclusive('\n').enumerate() {
            let line_no = index + 1;
            let (content, line_eol) = split_eol(raw);
            if eol.is_none() && !line_eol.is_empty() {
                eol = Some(if line_eol == "\r\n" { "\r\n" } else { "\n" });
            }

            state = match state {
                ParseState::Between => {
                    if is_comment_or_blank(content) {
                        prefix.push_str(raw);
                        ParseState::Between
                    } else if let Some(id) = parse_header(content, line_no)? {
                        if !seen.insert(id) {
                            return Err(FormatError::DuplicateId { id });
                        }
                        prefix.push_str(raw);
                        ParseState::ExpectOpen { id, line: line_no }
                    } else {
                        return Err(FormatError::UnexpectedLine { line: line_no });
                    }
                }
                ParseState::ExpectOpen { id, line } => {
                    if content.trim() == "{" {
                        prefix.push_str(raw);
                        ParseState::Body { id, line: line_no, lines: Vec::new() }
                    } else if is_comment_or_blank(content) {
                        prefix.push_str(raw);
                        ParseState::ExpectOpen { id, line }
                    } else {
                        return Err(FormatError::UnbalancedBraces {
                            line: line_no,
                            reason: format!("STRING {} is not followed by an opening brace", id),
                        });
                    }
                }
                ParseState::Body { id, line, mut lines } => {
                    let trimmed = content.trim();
                    if trimmed == "}" {
                        let body_eol = lines.last().map(|last| split_eol(last).1.to_string());
                        let mut body: String = lines.concat();
                        if let Some(eol) = &body_eol {
                            body.truncate(body.len() - eol.len());
                        }
                        entries.push(StringEntry {
                            id,
                            text: body,
                            layout: Some(BlockLayout {
                                prefix: std::mem::take(&mut prefix),
                                body_eol,
                                close: raw.to_string(),
                            }),
                        });
                        ParseState::Between
                    } else if trimmed.starts_with('}') {
                        return Err(FormatError::StrayDelimiter { line: line_no });
                    } else if trimmed == "{" {
                        return Err(FormatError::UnbalancedBraces {
                            line: line_no,
                            reason: format!("nested opening brace inside STRING {}", id),
                        });
                    } else {
                        lines.push(raw.to_string());
                        ParseState::Body { id, line, lines }
                    }
                }
            };
        }

        match state {
            ParseState::Between => {}
            ParseState::ExpectOpen { id, line } => {
                return Err(FormatError::UnbalancedBraces {
                    line,
                    reason: format!("STRING {} has no body", id),
                });
            }
            ParseState::Body { id, line, .. } => {
                return Err(FormatError::UnbalancedBraces {
                    line,
                    reason: format!("STRING {} is never closed", id),
                });
            }
        }

        Ok(Self {
            entries,
            encoding: encoding_rs::UTF_8,
            bom: false,
            eol: eol.unwrap_or("\n"),
            trailer: prefix,
        })
    }

    /// Serialize back to bytes in the detected encoding
    pub fn serialize(&self) -> Vec<u8> {
        encoding::encode(&self.to_text(), self.encoding, self.bom)
    }

    /// The table as text, before encoding
    pub fn to_text(&self) -> String {
        let eol = self.eol;
        let mut out = String::new();

        for (index, entry) in self.entries.iter().enumerate() {
            match &entry.layout {
                Some(layout) => {
                    out.push_str(&layout.prefix);
                    out.push_str(&entry.text);
                    match &layout.body_eol {
                        Some(body_eol) => out.push_str(body_eol),
                        None if !entry.text.is_empty() => out.push_str(eol),
                        None => {}
                    }
                    out.push_str(&layout.close);
                }
                None => {
                    if index > 0 {
                        if !out.ends_with('\n') {
                            out.push_str(eol);
                        }
                        out.push_str(eol);
                    }
                    out.push_str(&format!("STRING {}{eol}{{{eol}", entry.id));
                    if !entry.text.is_empty() {
                        out.push_str(&entry.text);
                        out.push_str(eol);
                    }
                    out.push_str(&format!("}}{eol}"));
                }
            }
        }

        out.push_str(&self.trailer);
        out
    }

    /// Replace the text of an existing entry
    pub fn set_text(&mut self, id: u32, text: impl Into<String>) -> Result<(), FormatError> {
        let text = text.into();
        if text.split('\n').any(is_delimiter_line) {
            return Err(FormatError::DelimiterInText { id });
        }

        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(FormatError::UnknownId { id })?;
        entry.text = text;
        Ok(())
    }

    /// Append a new entry
    pub fn push(&mut self, entry: StringEntry) -> Result<(), FormatError> {
        if self.get(entry.id).is_some() {
            return Err(FormatError::DuplicateId { id: entry.id });
        }
        if entry.text.split('\n').any(is_delimiter_line) {
            return Err(FormatError::DelimiterInText { id: entry.id });
        }
        self.entries.push(StringEntry { layout: None, ..entry });
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.text.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &StringEntry> {
        self.entries.iter()
    }

    /// Ids in table order
    pub fn ids(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// `(id, text)` pairs in table order
    pub fn pairs(&self) -> Vec<(u32, String)> {
        self.entries.iter().map(|e| (e.id, e.text.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }
}
