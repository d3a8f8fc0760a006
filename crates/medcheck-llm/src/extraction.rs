//! Drug-name extraction from LLM output.
//!
//! Models answer in whatever shape they like: a JSON array, a JSON object,
//! a bulleted list, or one comma-separated line. [`parse_drug_names`] accepts
//! all of them and never fails; output it cannot read yields no names.

use std::collections::HashSet;

use medcheck_core::models::{DrugName, PatientContext};
use medcheck_core::resolver::normalize_key;
use medcheck_core::{EntityExtractor, StageError};
use serde_json::Value;
use thiserror::Error;

use crate::generator::TextGenerator;
use crate::prompts::{build_extraction_prompt, EXTRACTION_SYSTEM_PROMPT};

/// Longest token still treated as a name.
pub const MAX_NAME_LEN: usize = 80;

/// More words than this reads as a sentence, not a drug name.
const MAX_NAME_WORDS: usize = 4;

/// Object keys that may carry the name list.
const NAME_KEYS: &[&str] = &["drugs", "drug_names", "medications", "names"];

const PLACEHOLDERS: &[&str] = &[
    "none",
    "n/a",
    "na",
    "nil",
    "null",
    "unknown",
    "no drugs",
    "no medications",
    "none mentioned",
];

/// Extraction errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Parse model output into distinct drug names, first-seen order.
pub fn parse_drug_names(raw: &str) -> Vec<DrugName> {
    let text = strip_code_fences(raw);
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let tokens = match parse_json_names(text) {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::debug!(error = %e, "No JSON name list in response, trying plain text");
            parse_quoted_list(text)
                .or_else(|| parse_bullets(text))
                .or_else(|| parse_single_line(text))
                .unwrap_or_default()
        }
    };

    clean_names(tokens)
}

/// Remove markdown code fence lines, keeping their content.
fn strip_code_fences(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Find a JSON array or name-carrying object in the response.
pub fn parse_json_names(text: &str) -> ExtractionResult<Vec<String>> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return names_from_value(&value);
    }

    // The model may wrap JSON in prose; try the outermost bracketed slice.
    let mut last_err = None;
    for (open, close) in [('[', ']'), ('{', '}')] {
        let (Some(start), Some(end)) = (text.find(open), text.rfind(close)) else {
            continue;
        };
        if start >= end {
            continue;
        }
        match serde_json::from_str::<Value>(&text[start..=end]) {
            Ok(value) => return names_from_value(&value),
            Err(e) => last_err = Some(e),
        }
    }

    Err(match last_err {
        Some(e) => ExtractionError::JsonParse(e),
        None => ExtractionError::InvalidFormat("No JSON array or object found in response".into()),
    })
}

fn names_from_value(value: &Value) -> ExtractionResult<Vec<String>> {
    match value {
        Value::Array(items) => Ok(items.iter().filter_map(name_from_item).collect()),
        Value::Object(map) => match NAME_KEYS.iter().find_map(|key| map.get(*key)) {
            Some(Value::Array(items)) => Ok(items.iter().filter_map(name_from_item).collect()),
            // `{"drugs": "Warfarin, Aspirin"}`
            Some(Value::String(list)) => Ok(list.split([',', ';']).map(str::to_string).collect()),
            _ => Err(ExtractionError::InvalidFormat(format!(
                "JSON object has no name list under any of the keys {}",
                NAME_KEYS.join(", ")
            ))),
        },
        other => Err(ExtractionError::InvalidFormat(format!(
            "Expected JSON array or object, got {other}"
        ))),
    }
}

/// Strings, or `{"name": ...}` / `{"drug_name": ...}` entries.
fn name_from_item(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("drug_name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// `['Warfarin', 'Aspirin']` style lists, which are not valid JSON.
///
/// The whole response must be the list and every item must be quoted.
fn parse_quoted_list(text: &str) -> Option<Vec<String>> {
    let inner = text.strip_prefix('[')?.strip_suffix(']')?;
    let items: Vec<&str> = inner
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect();
    if items.is_empty() || !items.iter().all(|item| is_quoted(item)) {
        return None;
    }
    Some(items.into_iter().map(str::to_string).collect())
}

fn is_quoted(item: &str) -> bool {
    item.len() >= 2
        && ['\'', '"']
            .iter()
            .any(|&q| item.starts_with(q) && item.ends_with(q))
}

/// Lines that start with `-`, `*`, `•`, `1.` or `1)`. Unmarked lines are ignored.
fn parse_bullets(text: &str) -> Option<Vec<String>> {
    let items: Vec<String> = text
        .lines()
        .filter_map(|line| strip_bullet(line.trim()))
        .map(str::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}

fn strip_bullet(line: &str) -> Option<&str> {
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest);
        }
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix(". ")
        .or_else(|| rest.strip_prefix(") "))
}

/// One line of comma or semicolon separated names, optionally behind a
/// short label such as `Medications:`.
///
/// Any segment that reads like a sentence rejects the whole line.
fn parse_single_line(text: &str) -> Option<Vec<String>> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let line = lines.next()?;
    if lines.next().is_some() {
        return None;
    }

    let line = match line.split_once(':') {
        // A labelled list may close with a full stop.
        Some((label, rest)) if label.split_whitespace().count() <= 2 => {
            let rest = rest.trim();
            rest.strip_suffix('.').unwrap_or(rest)
        }
        _ => line,
    };

    let segments: Vec<&str> = line.split([',', ';']).map(str::trim).collect();
    if segments.iter().any(|s| is_sentence_fragment(s)) {
        return None;
    }
    if segments.len() == 1 && segments[0].split_whitespace().count() > 3 {
        return None;
    }
    Some(segments.into_iter().map(str::to_string).collect())
}

fn is_sentence_fragment(segment: &str) -> bool {
    segment.split_whitespace().count() > MAX_NAME_WORDS || segment.ends_with(['.', '!', '?'])
}

/// Drop `(...)` and `[...]` asides such as doses: `Aspirin [81 mg]` -> `Aspirin`.
fn strip_asides(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut depth = 0usize;
    for c in token.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn clean_token(token: &str) -> Option<String> {
    let token = strip_asides(token);
    let cleaned = token
        .trim()
        .trim_matches(|c: char| {
            matches!(
                c,
                '"' | '\'' | '`' | '.' | ',' | ';' | ':' | '*' | '{' | '}' | '[' | ']' | ')'
            )
        })
        .trim();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.is_empty() || cleaned.len() > MAX_NAME_LEN {
        return None;
    }
    if cleaned.split(' ').count() > MAX_NAME_WORDS {
        return None;
    }
    if PLACEHOLDERS.contains(&cleaned.to_lowercase().as_str()) {
        return None;
    }
    Some(cleaned)
}

/// Clean tokens and drop case-insensitive duplicates, keeping first spelling.
fn clean_names(tokens: Vec<String>) -> Vec<DrugName> {
    let mut seen = HashSet::new();
    tokens
        .iter()
        .filter_map(|t| clean_token(t))
        .filter(|name| seen.insert(normalize_key(name)))
        .map(DrugName::from)
        .collect()
}

/// Entity extractor backed by a text generator.
pub struct LlmExtractor<G> {
    generator: G,
}

impl<G: TextGenerator> LlmExtractor<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }
}

impl<G: TextGenerator> EntityExtractor for LlmExtractor<G> {
    fn extract(&self, context: &PatientContext, question: &str) -> Result<Vec<DrugName>, StageError> {
        let prompt = build_extraction_prompt(context, question);
        tracing::debug!(prompt_len = prompt.len(), "Requesting drug name extraction");

        let raw = self.generator.generate(EXTRACTION_SYSTEM_PROMPT, &prompt)?;
        let names = parse_drug_names(&raw);
        if names.is_empty() && !raw.trim().is_empty() {
            tracing::warn!(response_len = raw.len(), "Extraction response held no usable names");
        }
        Ok(names)
    }
}
