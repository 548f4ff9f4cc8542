//! Interpretation of accumulated model text.
//!
//! [`ResponseParser::parse`] splits a model turn into user-facing text, an
//! optional reasoning segment and optional tool invocations. It is pure and
//! safe to call on partial text while a response is still streaming.

pub mod reasoning;
pub mod tool_calls;

use std::sync::OnceLock;

use regex::Regex;

use crate::types::ModelTurnResult;

pub use reasoning::{default_matchers, ReasoningMatch, ReasoningMatcher};
pub use tool_calls::{find_tool_block, has_malformed_block, ToolBlock};

pub struct ResponseParser {
    matchers: Vec<Box<dyn ReasoningMatcher>>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new(default_matchers())
    }
}

impl std::fmt::Debug for ResponseParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.matchers.iter().map(|m| m.name()).collect();
        f.debug_struct("ResponseParser")
            .field("matchers", &names)
            .finish()
    }
}

impl ResponseParser {
    pub fn new(matchers: Vec<Box<dyn ReasoningMatcher>>) -> Self {
        Self { matchers }
    }

    pub fn parse(&self, full_text: &str) -> ModelTurnResult {
        let (working, thinking) = self.extract_reasoning(full_text);

        let (display, tool_calls, error) = match find_tool_block(&working) {
            Some(block) => {
                let mut stripped = String::with_capacity(working.len());
                stripped.push_str(&working[..block.span.start]);
                stripped.push_str(&working[block.span.end..]);
                let calls = (!block.calls.is_empty()).then_some(block.calls);
                (stripped, calls, None)
            }
            None => {
                let error = has_malformed_block(&working)
                    .then(|| "tool call block is not valid JSON; treated as text".to_string());
                (working, None, error)
            }
        };

        ModelTurnResult {
            text: collapse_newlines(&display).trim().to_string(),
            thinking,
            tool_calls,
            error,
        }
    }

    fn extract_reasoning(&self, text: &str) -> (String, Option<String>) {
        let Some(found) = self.matchers.iter().find_map(|m| m.try_match(text)) else {
            return (text.to_string(), None);
        };

        let mut remainder = String::with_capacity(text.len());
        remainder.push_str(&text[..found.span.start]);
        remainder.push_str(&text[found.span.end..]);
        if remainder.trim().is_empty() {
            remainder = text[found.span.end..].to_string();
        }

        let thinking = (!found.reasoning.is_empty()).then_some(found.reasoning);
        (remainder, thinking)
    }
}

/// Parse with the default matcher set.
pub fn parse(full_text: &str) -> ModelTurnResult {
    static PARSER: OnceLock<ResponseParser> = OnceLock::new();
    PARSER.get_or_init(ResponseParser::default).parse(full_text)
}

fn collapse_newlines(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?:[ \t]*\r?\n){3,}").expect("valid newline regex"));
    re.replace_all(text, "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolInvocation;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn plain_text_passes_through() {
        let result = parse("Your balance is 120 yuan.");
        assert_eq!(result.text, "Your balance is 120 yuan.");
        assert!(result.thinking.is_none());
        assert!(result.tool_calls.is_none());
        assert!(result.error.is_none());
    }

    #[test]
    fn reasoning_and_tool_calls_are_both_extracted() {
        let text = "<think>The user spent 50 on lunch.</think>\n好的，我来记录。\n```json\n{\"toolCalls\":[{\"name\":\"create_flow\",\"arguments\":{\"money\":50,\"name\":\"午餐\"}}]}\n```";
        let result = parse(text);
        assert_eq!(result.thinking.as_deref(), Some("The user spent 50 on lunch."));
        assert_eq!(result.text, "好的，我来记录。");
        assert_eq!(
            result.tool_calls,
            Some(vec![ToolInvocation::new(
                "create_flow",
                json!({"money": 50, "name": "午餐"})
            )])
        );
    }

    #[test]
    fn first_matcher_wins() {
        let text = "<think>tagged</think>\nThinking: labelled\n\nanswer";
        let result = parse(text);
        assert_eq!(result.thinking.as_deref(), Some("tagged"));
        assert_eq!(result.text, "Thinking: labelled\n\nanswer");
    }

    #[test]
    fn unterminated_reasoning_while_streaming() {
        let result = parse("<think>still weighing the");
        assert_eq!(result.thinking.as_deref(), Some("still weighing the"));
        assert_eq!(result.text, "");
    }

    #[test]
    fn malformed_tool_block_is_plain_text() {
        let text = "```json\n{\"toolCalls\": [oops]}\n```";
        let result = parse(text);
        assert!(result.tool_calls.is_none());
        assert_eq!(result.text, text);
        assert!(result.error.is_some());
    }

    #[test]
    fn collapses_runs_of_newlines() {
        let result = parse("a\n\n\n\nb\n \n\n\nc");
        assert_eq!(result.text, "a\n\nb\n\nc");
    }

    #[test]
    fn parse_is_idempotent_on_fixed_input() {
        let inputs = [
            "",
            "Let me analyze this.\n\nSpent 30 on taxi.",
            "【思考】看看账本【/思考】本月支出 300 元",
            "```json\n{\"toolCalls\":[{\"name\":\"list_books\"}]}\n```",
        ];
        for input in inputs {
            assert_eq!(parse(input), parse(input), "{input:?}");
        }
    }

    #[test]
    fn never_panics_on_growing_prefixes() {
        let full = "<thinking>分析：金额50</thinking>\n记录午餐。\n\n\n```json\n{\"toolCalls\":[{\"name\":\"create_flow\",\"args\":{\"money\":50}}]}\n```\n完成";
        let mut prefix = String::new();
        for ch in full.chars() {
            prefix.push(ch);
            let _ = parse(&prefix);
        }
        let result = parse(full);
        assert_eq!(result.thinking.as_deref(), Some("分析：金额50"));
        assert_eq!(result.tool_calls.map(|c| c.len()), Some(1));
        assert_eq!(result.text, "记录午餐。\n\n完成");
    }
}
