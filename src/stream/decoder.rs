//! Incremental decoding of model responses into text deltas.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::envelope::extract_delta;
use super::frames::FrameReader;
use crate::error::{AbacusError, Result};
use crate::transport::ResponseBody;

/// Receives `(delta, is_complete)`.
pub type DeltaSink = Arc<dyn Fn(&str, bool) + Send + Sync>;

/// Classification of one body line.
#[derive(Debug, PartialEq)]
enum Frame {
    Data(serde_json::Value),
    Done,
    Skip,
}

fn classify(line: &str) -> Frame {
    let line = line.trim();
    if line.is_empty() {
        return Frame::Skip;
    }
    let payload = match line.strip_prefix("data:") {
        Some(rest) => rest.trim_start(),
        None => line,
    };
    if payload == "[DONE]" {
        return Frame::Done;
    }
    if !payload.starts_with('{') {
        return Frame::Skip;
    }
    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(value) if value.is_object() => Frame::Data(value),
        _ => Frame::Skip,
    }
}

/// Turns a response body into deltas for a [`DeltaSink`].
///
/// The sink sees every non-empty delta as it is decoded, then `("", true)`
/// exactly once. After cancellation the sink is never called again.
#[derive(Clone, Default)]
pub struct StreamDecoder {
    sink: Option<DeltaSink>,
    cancel: CancellationToken,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: DeltaSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn emit(&self, delta: &str, complete: bool) {
        if self.cancel.is_cancelled() {
            return;
        }
        if let Some(sink) = &self.sink {
            sink(delta, complete);
        }
    }

    /// Decode `body` to completion and return the accumulated text.
    pub async fn decode(&self, body: ResponseBody) -> Result<String> {
        let mut reader = FrameReader::new(body);
        let mut accumulated = String::new();
        let mut frames = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(AbacusError::Canceled),
                line = reader.next_line() => line,
            };
            let Some(line) = next else { break };
            let line = line?;

            match classify(&line) {
                Frame::Done => break,
                Frame::Skip => {
                    tracing::trace!(line = %preview(&line), len = line.len(), "skipping non-data line");
                }
                Frame::Data(value) => {
                    frames += 1;
                    match extract_delta(&value) {
                        Some(delta) => {
                            if self.cancel.is_cancelled() {
                                return Err(AbacusError::Canceled);
                            }
                            accumulated.push_str(delta);
                            self.emit(delta, false);
                        }
                        None => tracing::debug!(frame = frames, "frame carried no text delta"),
                    }
                }
            }
        }

        if accumulated.is_empty() {
            if let Some(text) = whole_body_text(&reader.raw_body()) {
                accumulated.push_str(&text);
                self.emit(&text, false);
            }
        }

        if self.cancel.is_cancelled() {
            return Err(AbacusError::Canceled);
        }
        self.emit("", true);
        Ok(accumulated)
    }
}

/// Longest logged prefix of a skipped line, in bytes.
const LOG_PREVIEW_BYTES: usize = 120;

/// `line` cut to [`LOG_PREVIEW_BYTES`] on a char boundary.
fn preview(line: &str) -> &str {
    if line.len() <= LOG_PREVIEW_BYTES {
        return line;
    }
    let mut end = LOG_PREVIEW_BYTES;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

/// Extract text from a body that is one complete (possibly multi-line) JSON document.
fn whole_body_text(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    extract_delta(&value).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_lines() {
        assert_eq!(classify("data: [DONE]"), Frame::Done);
        assert_eq!(classify("[DONE]"), Frame::Done);
        assert_eq!(classify(""), Frame::Skip);
        assert_eq!(classify(": keep-alive"), Frame::Skip);
        assert_eq!(classify("event: message"), Frame::Skip);
        assert_eq!(classify("data: {not json"), Frame::Skip);
        assert_eq!(classify("data: {\"text\":\"a\"}"), Frame::Data(json!({"text": "a"})));
        assert_eq!(classify("data:{\"text\":\"a\"}"), Frame::Data(json!({"text": "a"})));
        assert_eq!(classify("{\"text\":\"b\"}"), Frame::Data(json!({"text": "b"})));
    }

    #[test]
    fn whole_body_fallback_reads_pretty_json() {
        let raw = "{\n  \"choices\": [\n    {\"message\": {\"content\": \"hello\"}}\n  ]\n}\n";
        assert_eq!(whole_body_text(raw).as_deref(), Some("hello"));
        assert_eq!(whole_body_text("not json"), None);
    }

    #[test]
    fn log_preview_is_bounded_and_char_safe() {
        assert_eq!(preview("short"), "short");
        let long = "记".repeat(100);
        let cut = preview(&long);
        assert!(cut.len() <= LOG_PREVIEW_BYTES);
        assert!(cut.chars().all(|c| c == '记'));
        assert_eq!(cut.len(), 40 * '记'.len_utf8());
    }
}
