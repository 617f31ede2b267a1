//! Pulls structured values out of free-form completion text.

use regex::Regex;
use std::sync::LazyLock;

/// "confidence" followed, within the same sentence, by a percentage.
static CONFIDENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)confidence[^.%\d]{0,60}?(\d{1,3}(?:\.\d+)?)\s*%").unwrap()
});

/// Reads a stated confidence such as "Estimated Confidence: 85%" as 0.85.
pub fn parse_confidence(text: &str) -> Option<f64> {
    let caps = CONFIDENCE_RE.captures(text)?;
    let percent: f64 = caps.get(1)?.as_str().parse().ok()?;
    if (0.0..=100.0).contains(&percent) {
        Some(percent / 100.0)
    } else {
        None
    }
}

/// Parses a list reply. A JSON array of strings (possibly wrapped in prose
/// or a code fence) is preferred; otherwise the text is split on commas.
pub fn parse_string_list(text: &str) -> Vec<String> {
    if let Some(items) = json_array(text) {
        return items;
    }

    text.split(',')
        .map(|item| {
            item.trim()
                .trim_matches(|c| c == '[' || c == ']' || c == '"' || c == '\'' || c == '`')
                .trim()
                .to_string()
        })
        .filter(|item| !item.is_empty())
        .collect()
}

fn json_array(text: &str) -> Option<Vec<String>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if start >= end {
        return None;
    }
    let values: Vec<serde_json::Value> = serde_json::from_str(&text[start..=end]).ok()?;
    Some(
        values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s.trim().to_string()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
    )
}
