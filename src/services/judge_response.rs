//! Helpers shared by the judged evaluators for reading judge output.

use once_cell::sync::Lazy;
use regex::Regex;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[a-zA-Z]*\s*\n?(.*?)\n?\s*```").expect("valid code fence regex")
});

/// Extract the JSON payload from a judge response.
///
/// Markdown code fences are stripped. Otherwise the outermost array or object
/// is cut out of any surrounding prose. Returns the trimmed input when nothing
/// JSON-like is found, so the caller's parse fails and fails closed.
pub fn extract_json(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(captures) = CODE_FENCE.captures(trimmed) {
        if let Some(body) = captures.get(1) {
            return body.as_str().trim().to_string();
        }
    }

    if (trimmed.starts_with('[') && trimmed.ends_with(']'))
        || (trimmed.starts_with('{') && trimmed.ends_with('}'))
    {
        return trimmed.to_string();
    }

    let open = trimmed.find(['[', '{']);
    if let Some(start) = open {
        let close = if trimmed[start..].starts_with('[') { ']' } else { '}' };
        if let Some(end) = trimmed.rfind(close) {
            if end > start {
                return trimmed[start..=end].to_string();
            }
        }
    }

    trimmed.to_string()
}

/// Lowercase and collapse whitespace, for tolerant name matching.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
