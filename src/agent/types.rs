//! Call request, result and per-call state types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::Display;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::stream::DeltaSink;
use crate::tools::{BookContext, ContextResolver, ToolProgressSink};
use crate::types::ToolOutcome;

/// How a call ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChatStatus {
    /// The model answered without further tool calls.
    Completed,
    /// At least one tool failed; the loop stopped after that batch.
    ToolFailed,
    /// The iteration budget ran out with tool calls still pending.
    MaxIterations,
    Canceled,
    /// The model could not be reached or its response could not be read.
    Failed,
}

/// Structured result of [`crate::agent::ChatAgent::send_message`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatOutcome {
    pub call_id: Uuid,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(default)]
    pub tool_outcomes: Vec<ToolOutcome>,
    pub status: ChatStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Text the agent appended after the model's reply (a tool summary or
    /// the step-limit notice). Not part of the streamed deltas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub iterations: u32,
}

impl ChatOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self.status, ChatStatus::Failed | ChatStatus::Canceled)
    }
}

/// One user message and the hooks for the call it starts.
#[derive(Clone)]
pub struct ChatRequest {
    pub text: String,
    pub context: Arc<dyn ContextResolver>,
    pub delta_sink: Option<DeltaSink>,
    pub progress_sink: Option<ToolProgressSink>,
    pub cancel: CancellationToken,
}

impl ChatRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: Arc::new(None::<BookContext>),
            delta_sink: None,
            progress_sink: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_context(mut self, resolver: impl ContextResolver + 'static) -> Self {
        self.context = Arc::new(resolver);
        self
    }

    pub fn with_book(self, book: BookContext) -> Self {
        self.with_context(book)
    }

    pub fn with_delta_sink(mut self, sink: DeltaSink) -> Self {
        self.delta_sink = Some(sink);
        self
    }

    pub fn with_progress_sink(mut self, sink: ToolProgressSink) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl std::fmt::Debug for ChatRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRequest")
            .field("text", &self.text)
            .field("context", &self.context.resolve())
            .field("delta_sink", &self.delta_sink.as_ref().map(|_| ".."))
            .field("progress_sink", &self.progress_sink.as_ref().map(|_| ".."))
            .field("canceled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Mutable state of one call, discarded when it returns.
#[derive(Debug)]
pub struct IterationState {
    pub call_id: Uuid,
    pub iteration: u32,
    /// User-facing text accumulated across iterations.
    pub text: String,
    /// Raw model output of every iteration.
    pub raw: String,
    pub thinking: Vec<String>,
    pub tool_outcomes: Vec<ToolOutcome>,
    pub notice: Option<String>,
    cancel: CancellationToken,
}

impl IterationState {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            call_id: Uuid::new_v4(),
            iteration: 0,
            text: String::new(),
            raw: String::new(),
            thinking: Vec::new(),
            tool_outcomes: Vec::new(),
            notice: None,
            cancel,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Append a block of user-facing text, separated by a blank line.
    pub fn append_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push_str("\n\n");
        }
        self.text.push_str(text);
    }

    pub fn append_raw(&mut self, raw: &str) {
        if !self.raw.is_empty() {
            self.raw.push('\n');
        }
        self.raw.push_str(raw);
    }

    pub fn thinking(&self) -> Option<String> {
        (!self.thinking.is_empty()).then(|| self.thinking.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_blocks_are_joined_with_blank_line() {
        let mut state = IterationState::new(CancellationToken::new());
        state.append_text("first");
        state.append_text("  ");
        state.append_text("second\n");
        assert_eq!(state.text, "first\n\nsecond");
    }

    #[test]
    fn state_sees_cancellation() {
        let token = CancellationToken::new();
        let state = IterationState::new(token.clone());
        assert!(!state.is_canceled());
        token.cancel();
        assert!(state.is_canceled());
    }

    #[test]
    fn request_defaults_to_no_book() {
        let request = ChatRequest::new("hi");
        assert!(request.context.resolve().is_none());
        let request = request.with_book(BookContext::new("b"));
        assert_eq!(request.context.resolve().map(|b| b.book_id), Some("b".into()));
    }
}
