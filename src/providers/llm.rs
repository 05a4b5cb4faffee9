/*!
 * Prompt and response handling shared by the LLM backends.
 *
 * Texts are sent as a JSON array and the model is asked for a JSON array of
 * the same length back. Models do not always comply, so the parser also
 * accepts fenced code blocks, an object wrapping the array, and an object
 * keyed by index.
 */

use serde_json::Value;

use crate::errors::ProviderError;
use crate::language_utils::Language;

/// System prompt for one batch
pub fn system_prompt(source: Language, target: Language, context: &str) -> String {
    let mut prompt = format!(
        "You are a professional translator for Warcraft III maps.\n\
         Translate the following text from {} to {}.\n\
         Maintain all Warcraft III color codes (e.g., |cFFFF0000...|r) and formatting exactly.\n\
         Keep placeholders such as {{{{0}}}} unchanged.\n\
         Do not translate technical terms like 'u00A', 'h001' if they appear to be raw IDs.\n\
         Return ONLY a JSON array of strings, matching the order of the input.",
        source.name(),
        target.name()
    );
    if !context.is_empty() {
        prompt.push_str("\nContext: ");
        prompt.push_str(context);
    }
    prompt
}

/// User message: the texts as a JSON array
pub fn user_prompt(texts: &[String]) -> Result<String, ProviderError> {
    serde_json::to_string(texts).map_err(|e| ProviderError::ParseError(e.to_string()))
}

/// Extract exactly `expected` translations from a model reply
pub fn parse_response(content: &str, expected: usize) -> Result<Vec<String>, ProviderError> {
    let json = strip_fences(content);
    let value: Value = serde_json::from_str(json)
        .or_else(|_| outermost_array(json).map_or_else(
            || Err(ProviderError::ParseError(preview(content))),
            |inner| serde_json::from_str(inner).map_err(|_| ProviderError::ParseError(preview(content))),
        ))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            if let Some(items) = map.values().find_map(|v| match v {
                Value::Array(items) if items.len() == expected => Some(items.clone()),
                _ => None,
            }) {
                items
            } else {
                (0..expected)
                    .map(|i| map.get(&i.to_string()).cloned())
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| {
                        ProviderError::ParseError(format!("Unexpected JSON structure: {}", preview(content)))
                    })?
            }
        }
        _ => {
            return Err(ProviderError::ParseError(format!(
                "Unexpected JSON structure: {}",
                preview(content)
            )));
        }
    };

    if items.len() != expected {
        return Err(ProviderError::LengthMismatch {
            expected,
            actual: items.len(),
        });
    }

    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

fn strip_fences(content: &str) -> &str {
    let content = content.trim();
    let body = if let Some((_, rest)) = content.split_once("```json") {
        rest
    } else if let Some((_, rest)) = content.split_once("```") {
        rest
    } else {
        return content;
    };
    body.split("```").next().unwrap_or(body).trim()
}

fn outermost_array(content: &str) -> Option<&str> {
    let start = content.find('[')?;
    let end = content.rfind(']')?;
    (end > start).then(|| &content[start..=end])
}

fn preview(content: &str) -> String {
    content.chars().take(100).collect()
}
