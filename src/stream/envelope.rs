//! Response envelope adapters.
//!
//! Each extractor knows one provider envelope shape. They are tried in order
//! and the first non-empty string wins.

use serde_json::Value;

pub type Extractor = fn(&Value) -> Option<&str>;

/// Ordered from strictest to most permissive.
pub const EXTRACTORS: [(&str, Extractor); 5] = [
    ("choice_delta", choice_delta),
    ("content", top_level_content),
    ("result_choice_delta", result_choice_delta),
    ("text", top_level_text),
    ("message_content", message_content),
];

fn choice_delta(value: &Value) -> Option<&str> {
    value.pointer("/choices/0/delta/content")?.as_str()
}

fn top_level_content(value: &Value) -> Option<&str> {
    value.get("content")?.as_str()
}

fn result_choice_delta(value: &Value) -> Option<&str> {
    value.pointer("/result/choices/0/delta/content")?.as_str()
}

fn top_level_text(value: &Value) -> Option<&str> {
    value.get("text")?.as_str()
}

fn message_content(value: &Value) -> Option<&str> {
    value
        .pointer("/choices/0/message/content")
        .or_else(|| value.pointer("/message/content"))?
        .as_str()
}

/// Text carried by `value`, if any envelope matches.
pub fn extract_delta(value: &Value) -> Option<&str> {
    EXTRACTORS
        .iter()
        .find_map(|(_, extract)| extract(value).filter(|text| !text.is_empty()))
}
