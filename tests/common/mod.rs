//! Shared test helpers: scripted transport, recording tool executor, delta log.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use abacus::config::AgentConfig;
use abacus::error::{AbacusError, Result};
use abacus::stream::DeltaSink;
use abacus::tools::{ToolContext, ToolError, ToolExecutor};
use abacus::transport::{HttpResponse, HttpTransport, RetryPolicy};

/// SSE body carrying one chat-completions delta per item, then `[DONE]`.
pub fn sse_body(deltas: &[&str]) -> String {
    let mut body = String::new();
    for delta in deltas {
        let frame = json!({"choices": [{"delta": {"content": delta}}]});
        body.push_str(&format!("data: {frame}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

/// Fenced tool-call block as a model would write it.
pub fn tool_block(calls: Value) -> String {
    format!("```json\n{}\n```", json!({ "toolCalls": calls }))
}

#[derive(Debug, Clone)]
pub enum Reply {
    /// Streamed body, delivered one frame line per chunk.
    Stream(String),
    /// Fully buffered body.
    Buffered(u16, String),
    /// Transport-level failure.
    Disconnect,
}

impl Reply {
    pub fn stream(deltas: &[&str]) -> Self {
        Self::Stream(sse_body(deltas))
    }

    pub fn text(text: &str) -> Self {
        Self::stream(&[text])
    }

    pub fn status(status: u16) -> Self {
        Self::Buffered(status, format!("{{\"error\":\"status {status}\"}}"))
    }
}

/// [`HttpTransport`] replaying scripted replies and recording request bodies.
///
/// Once the script is exhausted the `repeat` reply, if any, is served forever.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    repeat: Option<Reply>,
    requests: Mutex<Vec<Value>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    pub fn repeating(reply: Reply) -> Self {
        Self {
            repeat: Some(reply),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, _endpoint: &str, _headers: &HeaderMap, body: &Value) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(body.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.repeat.clone())
            .unwrap_or_else(|| Reply::status(500));

        match reply {
            Reply::Stream(body) => {
                let chunks: Vec<Result<Bytes>> = body
                    .split_inclusive('\n')
                    .map(|line| Ok(Bytes::from(line.to_string())))
                    .collect();
                Ok(HttpResponse::streaming(200, futures::stream::iter(chunks).boxed()))
            }
            Reply::Buffered(status, body) => Ok(HttpResponse::buffered(status, body)),
            Reply::Disconnect => Err(AbacusError::Stream("connection reset".into())),
        }
    }
}

/// Records `(delta, is_complete)` pairs.
#[derive(Clone, Default)]
pub struct DeltaLog(Arc<Mutex<Vec<(String, bool)>>>);

impl DeltaLog {
    pub fn sink(&self) -> DeltaSink {
        let log = Arc::clone(&self.0);
        Arc::new(move |delta: &str, complete: bool| {
            log.lock().unwrap().push((delta.to_string(), complete));
        })
    }

    pub fn entries(&self) -> Vec<(String, bool)> {
        self.0.lock().unwrap().clone()
    }

    pub fn completions(&self) -> usize {
        self.entries().iter().filter(|(_, done)| *done).count()
    }

    pub fn text(&self) -> String {
        self.entries()
            .iter()
            .filter(|(_, done)| !done)
            .map(|(delta, _)| delta.as_str())
            .collect()
    }
}

/// Tool executor that records every call and fails the names it is told to.
#[derive(Default)]
pub struct RecordingExecutor {
    failing: Vec<String>,
    cancel_on_call: Option<CancellationToken>,
    calls: Mutex<Vec<(String, Value, Option<String>)>>,
}

impl RecordingExecutor {
    pub fn failing(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Cancels `token` from inside every call, as a user pressing stop would.
    pub fn cancelling(token: CancellationToken) -> Self {
        Self {
            cancel_on_call: Some(token),
            ..Default::default()
        }
    }

    /// `(name, arguments, book_id)` of every call, in order.
    pub fn calls(&self) -> Vec<(String, Value, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for RecordingExecutor {
    async fn call_tool(&self, name: &str, arguments: &Value, ctx: &ToolContext) -> std::result::Result<Value, ToolError> {
        self.calls.lock().unwrap().push((
            name.to_string(),
            arguments.clone(),
            ctx.book_id().map(str::to_string),
        ));
        if let Some(token) = &self.cancel_on_call {
            token.cancel();
        }
        if self.failing.iter().any(|n| n == name) {
            return Err(ToolError::failed(format!("{name} rejected the request")));
        }
        Ok(json!({"ok": true, "tool": name}))
    }

    fn catalog(&self) -> String {
        "- create_flow: Record an income or expense\n".to_string()
    }
}

pub fn test_config() -> AgentConfig {
    AgentConfig::default()
        .with_api_key("test-key")
        .with_retry(RetryPolicy::none())
}
