use serde_json::Value as Json;
use tracing::debug;

use super::PropertyValue;

/// Which rule produced a decoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// Bracketed list decoded as a JSON array after quote normalization.
    JsonList,
    /// Bracketed list that failed JSON decoding, split on commas.
    CommaList,
    /// Plain scalar with one layer of quotes stripped.
    Scalar,
}

/// Decode a trimmed raw value.
pub fn decode_value(raw: &str) -> PropertyValue {
    decode_value_with_strategy(raw).0
}

/// Decode a trimmed raw value and report which strategy produced it.
///
/// Bracketed lists try the strategies in order: strict JSON first, then the
/// comma split. The comma split does not honor quoting, so an item such as
/// `"a, b"` comes back as two items.
pub fn decode_value_with_strategy(raw: &str) -> (PropertyValue, DecodeStrategy) {
    let raw = raw.trim();
    if !is_bracketed(raw) {
        return (
            PropertyValue::Scalar(strip_quotes(raw).to_string()),
            DecodeStrategy::Scalar,
        );
    }

    if let Some(items) = decode_json_list(raw) {
        return (PropertyValue::List(items), DecodeStrategy::JsonList);
    }

    debug!(value = raw, "bracketed value is not a JSON array, splitting on commas");
    (
        PropertyValue::List(decode_comma_list(raw)),
        DecodeStrategy::CommaList,
    )
}

fn is_bracketed(raw: &str) -> bool {
    raw.len() >= 2 && raw.starts_with('[') && raw.ends_with(']')
}

fn decode_json_list(raw: &str) -> Option<Vec<String>> {
    let normalized = raw.replace('\'', "\"");
    match serde_json::from_str::<Json>(&normalized).ok()? {
        Json::Array(items) => Some(
            items
                .into_iter()
                .map(|item| match item {
                    Json::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        ),
        _ => None,
    }
}

fn decode_comma_list(raw: &str) -> Vec<String> {
    raw[1..raw.len() - 1]
        .split(',')
        .map(|item| strip_quotes(item.trim()).to_string())
        .collect()
}

/// Strip one leading and one trailing quote character, independently.
fn strip_quotes(s: &str) -> &str {
    let s = s.strip_prefix(['"', '\'']).unwrap_or(s);
    s.strip_suffix(['"', '\'']).unwrap_or(s)
}
