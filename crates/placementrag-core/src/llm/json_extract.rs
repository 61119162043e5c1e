//! Tolerant JSON extraction from LLM completions
//!
//! Models wrap JSON in prose, markdown fences or leave trailing commas.
//! Each strategy handles one of those shapes; [`extract_json_object`] tries
//! them in order and returns `None` when all of them fail.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

lazy_static! {
    static ref TRAILING_COMMA: Regex = Regex::new(r",(\s*[}\]])").unwrap();
}

/// One way of recovering a JSON object from free text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonStrategy {
    /// The whole response is JSON
    Direct,
    /// JSON inside a ```json (or bare ```) fence
    FencedBlock,
    /// First balanced `{...}` span in the text
    BraceMatch,
    /// Balanced span with trailing commas removed
    TrailingCommaRepair,
}

impl JsonStrategy {
    /// Order in which strategies are attempted
    pub const CHAIN: [JsonStrategy; 4] = [
        JsonStrategy::Direct,
        JsonStrategy::FencedBlock,
        JsonStrategy::BraceMatch,
        JsonStrategy::TrailingCommaRepair,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            JsonStrategy::Direct => "direct",
            JsonStrategy::FencedBlock => "fenced_block",
            JsonStrategy::BraceMatch => "brace_match",
            JsonStrategy::TrailingCommaRepair => "trailing_comma_repair",
        }
    }

    /// Apply this strategy alone
    pub fn extract(&self, text: &str) -> Option<Map<String, Value>> {
        match self {
            JsonStrategy::Direct => parse_object(text),
            JsonStrategy::FencedBlock => fenced_block(text).and_then(parse_object),
            JsonStrategy::BraceMatch => text
                .match_indices('{')
                .filter_map(|(start, _)| balanced_object(text, start))
                .find_map(parse_object),
            JsonStrategy::TrailingCommaRepair => {
                let source = fenced_block(text).unwrap_or(text);
                let candidate = source
                    .find('{')
                    .and_then(|start| balanced_object(source, start))
                    .or_else(|| {
                        let start = source.find('{')?;
                        let end = source.rfind('}')?;
                        (start < end).then(|| &source[start..=end])
                    })?;
                parse_object(&TRAILING_COMMA.replace_all(candidate, "$1"))
            }
        }
    }
}

/// Run the strategy chain and return the first JSON object recovered
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    for strategy in JsonStrategy::CHAIN {
        if let Some(object) = strategy.extract(text) {
            tracing::debug!("Extracted JSON with strategy {}", strategy.name());
            return Some(object);
        }
    }
    tracing::debug!("No JSON object found in response: {}", text);
    None
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn fenced_block(text: &str) -> Option<&str> {
    let rest = match text.find("```json") {
        Some(pos) => &text[pos + "```json".len()..],
        None => &text[text.find("```")? + 3..],
    };
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// Slice from `start` (a `{`) to its matching `}`, honouring string literals
fn balanced_object(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
