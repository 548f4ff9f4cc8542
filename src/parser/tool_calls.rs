//! Fenced tool-call block extraction.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::ToolInvocation;

/// A well-formed tool-call block.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolBlock {
    pub calls: Vec<ToolInvocation>,
    /// Byte range of the block, fences included.
    pub span: Range<usize>,
}

fn fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n?(.*?)```").expect("valid fence regex")
    })
}

/// First fenced block holding an object with a `toolCalls` array.
pub fn find_tool_block(text: &str) -> Option<ToolBlock> {
    fence().captures_iter(text).find_map(|caps| {
        let whole = caps.get(0)?;
        let calls = parse_calls(caps.get(1)?.as_str())?;
        Some(ToolBlock {
            calls,
            span: whole.range(),
        })
    })
}

/// Whether a closed fence mentions `toolCalls` but none of them parsed.
pub fn has_malformed_block(text: &str) -> bool {
    fence().captures_iter(text).any(|caps| {
        caps.get(1).is_some_and(|body| {
            body.as_str().contains("toolCalls") && parse_calls(body.as_str()).is_none()
        })
    })
}

fn parse_calls(body: &str) -> Option<Vec<ToolInvocation>> {
    let value: serde_json::Value = serde_json::from_str(body.trim()).ok()?;
    let entries = value.get("toolCalls")?.as_array()?;
    let calls = entries
        .iter()
        .filter_map(|entry| {
            let mut call: ToolInvocation = serde_json::from_value(entry.clone()).ok()?;
            if call.name.trim().is_empty() {
                return None;
            }
            if call.arguments.is_null() {
                call.arguments = serde_json::json!({});
            }
            Some(call)
        })
        .collect();
    Some(calls)
}
