//! Reasoning segment matchers.
//!
//! Each matcher recognises one way models mark their reasoning. Matchers are
//! evaluated in order and the first match wins.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

/// A reasoning segment found in model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningMatch {
    /// Reasoning text with markers removed.
    pub reasoning: String,
    /// Byte range of the whole marked span, markers included.
    pub span: Range<usize>,
}

pub trait ReasoningMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_match(&self, text: &str) -> Option<ReasoningMatch>;
}

/// Text between an opening and closing marker.
///
/// An opening marker with no closing marker yet means reasoning is still
/// streaming: everything after the marker is reasoning.
#[derive(Debug, Clone)]
pub struct DelimitedMatcher {
    name: &'static str,
    open: &'static str,
    close: &'static str,
}

impl DelimitedMatcher {
    pub const fn new(name: &'static str, open: &'static str, close: &'static str) -> Self {
        Self { name, open, close }
    }
}

impl ReasoningMatcher for DelimitedMatcher {
    fn name(&self) -> &'static str {
        self.name
    }

    fn try_match(&self, text: &str) -> Option<ReasoningMatch> {
        let start = text.find(self.open)?;
        let body_start = start + self.open.len();
        let (body_end, end) = match text[body_start..].find(self.close) {
            Some(offset) => (body_start + offset, body_start + offset + self.close.len()),
            None => (text.len(), text.len()),
        };
        Some(ReasoningMatch {
            reasoning: text[body_start..body_end].trim().to_string(),
            span: start..end,
        })
    }
}

fn blank_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t]*\r?\n").expect("valid blank line regex"))
}

fn paragraph_end(text: &str, from: usize) -> usize {
    blank_line()
        .find(&text[from..])
        .map_or(text.len(), |m| from + m.start())
}

/// A labelled section such as `Thinking:` running to the first blank line.
#[derive(Debug, Clone, Default)]
pub struct LabelledSectionMatcher;

impl ReasoningMatcher for LabelledSectionMatcher {
    fn name(&self) -> &'static str {
        "labelled_section"
    }

    fn try_match(&self, text: &str) -> Option<ReasoningMatch> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let label = RE.get_or_init(|| {
            Regex::new(r"(?mi)^[ \t]*(?:thinking|reasoning|思考过程|分析)[ \t]*[:：]")
                .expect("valid label regex")
        });
        let found = label.find(text)?;
        let end = paragraph_end(text, found.end());
        let reasoning = text[found.end()..end].trim();
        if reasoning.is_empty() {
            return None;
        }
        Some(ReasoningMatch {
            reasoning: reasoning.to_string(),
            span: found.start()..end,
        })
    }
}

/// A first paragraph opening with analytical phrasing such as "Let me think".
#[derive(Debug, Clone, Default)]
pub struct LeadingPhraseMatcher;

impl ReasoningMatcher for LeadingPhraseMatcher {
    fn name(&self) -> &'static str {
        "leading_phrase"
    }

    fn try_match(&self, text: &str) -> Option<ReasoningMatch> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let phrase = RE.get_or_init(|| {
            Regex::new(r"(?i)^\s*(?:let me think|let me analy[sz]e|让我分析|我来分析|首先，我需要)")
                .expect("valid leading phrase regex")
        });
        let found = phrase.find(text)?;
        let start = text.len() - text.trim_start().len();
        let end = paragraph_end(text, found.end());
        Some(ReasoningMatch {
            reasoning: text[start..end].trim().to_string(),
            span: start..end,
        })
    }
}

/// The built-in matchers in evaluation order.
pub fn default_matchers() -> Vec<Box<dyn ReasoningMatcher>> {
    vec![
        Box::new(DelimitedMatcher::new("think_tag", "<think>", "</think>")),
        Box::new(DelimitedMatcher::new("thinking_tag", "<thinking>", "</thinking>")),
        Box::new(DelimitedMatcher::new("bracket", "[思考]", "[/思考]")),
        Box::new(DelimitedMatcher::new("fullwidth_bracket", "【思考】", "【/思考】")),
        Box::new(DelimitedMatcher::new("thinking_bracket", "[thinking]", "[/thinking]")),
        Box::new(LabelledSectionMatcher),
        Box::new(LeadingPhraseMatcher),
    ]
}
