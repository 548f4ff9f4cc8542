//! The chat agent: model calls, tool batches and the iteration loop.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::prompts;
use super::types::{ChatOutcome, ChatRequest, ChatStatus, IterationState};
use crate::config::AgentConfig;
use crate::error::{AbacusError, Result};
use crate::history::{Checkpoint, HistoryStore};
use crate::parser::ResponseParser;
use crate::provider::http::DEFAULT_REQUEST_TIMEOUT;
use crate::provider::ProviderAdapter;
use crate::stream::{DeltaSink, StreamDecoder};
use crate::tools::{ToolDispatcher, ToolExecutor};
use crate::transport::{HttpTransport, ReqwestTransport, RetryingTransport};
use crate::types::{ChatMessage, Turn};

/// Drives a tool-using conversation with a model.
///
/// Each [`send_message`](Self::send_message) call loops: request a model
/// turn, parse it, run any requested tools and feed their results back,
/// until the model stops calling tools, a tool fails, or the iteration
/// budget is spent.
pub struct ChatAgent<T: HttpTransport = ReqwestTransport> {
    config: AgentConfig,
    adapter: ProviderAdapter,
    transport: RetryingTransport<T>,
    dispatcher: ToolDispatcher,
    parser: ResponseParser,
    history: HistoryStore,
}

impl ChatAgent<ReqwestTransport> {
    /// Agent over a reqwest client honouring `request_timeout_secs`.
    ///
    /// The process-wide client is reused when the timeout is the default one.
    pub fn from_config(config: AgentConfig, executor: Arc<dyn ToolExecutor>) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let transport = if timeout == DEFAULT_REQUEST_TIMEOUT {
            ReqwestTransport::shared()?
        } else {
            ReqwestTransport::with_timeout(timeout)?
        };
        Self::new(config, transport, executor)
    }
}

impl<T: HttpTransport> ChatAgent<T> {
    pub fn new(config: AgentConfig, transport: T, executor: Arc<dyn ToolExecutor>) -> Result<Self> {
        let adapter = config.adapter()?;
        Ok(Self {
            transport: RetryingTransport::new(transport, config.retry.clone()),
            dispatcher: ToolDispatcher::new(executor),
            parser: ResponseParser::default(),
            history: HistoryStore::new(config.history_capacity),
            adapter,
            config,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn history_snapshot(&self) -> Vec<Turn> {
        self.history.turns()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Run one user message to completion.
    ///
    /// Only a configuration problem is returned as `Err`; every other
    /// failure is reported through [`ChatOutcome::status`].
    pub async fn send_message(&mut self, request: ChatRequest) -> Result<ChatOutcome> {
        self.config.validate()?;

        let checkpoint = self.history.checkpoint();
        self.history.push(Turn::user(request.text.as_str()));

        let mut state = IterationState::new(request.cancel.clone());
        let book = request.context.resolve();
        let system = prompts::system_prompt(&self.dispatcher.executor().catalog(), book.as_ref());
        let forward = forwarding_sink(request.delta_sink.clone(), request.cancel.clone());

        loop {
            if state.is_canceled() {
                return Ok(self.cancel(checkpoint, state));
            }
            state.iteration += 1;
            tracing::debug!(call_id = %state.call_id, iteration = state.iteration, "requesting model turn");

            let raw = match self.call_model(&system, forward.clone(), &request.cancel).await {
                Ok(raw) => raw,
                Err(AbacusError::Canceled) => return Ok(self.cancel(checkpoint, state)),
                Err(err) => return Ok(self.fail(checkpoint, state, err, &request)),
            };

            if state.is_canceled() {
                return Ok(self.cancel(checkpoint, state));
            }
            state.append_raw(&raw);
            let turn = self.parser.parse(&raw);
            if let Some(error) = &turn.error {
                tracing::warn!(call_id = %state.call_id, iteration = state.iteration, error = %error, "model turn was not fully understood");
            }
            let has_tool_calls = turn.has_tool_calls();
            if let Some(thinking) = turn.thinking {
                state.thinking.push(thinking);
            }
            state.append_text(&turn.text);

            if !has_tool_calls {
                return Ok(self.finalize(state, ChatStatus::Completed, &request));
            }
            let calls = turn.tool_calls.unwrap_or_default();

            let outcomes = self
                .dispatcher
                .execute(
                    &calls,
                    request.context.as_ref(),
                    request.progress_sink.as_ref(),
                    &request.cancel,
                )
                .await;
            if state.is_canceled() {
                return Ok(self.cancel(checkpoint, state));
            }
            state.tool_outcomes.extend(outcomes.iter().cloned());

            if outcomes.iter().any(|o| !o.success) {
                let summary = prompts::tool_summary(&outcomes);
                state.append_text(&summary);
                state.notice = Some(summary);
                return Ok(self.finalize(state, ChatStatus::ToolFailed, &request));
            }
            if state.iteration >= self.config.max_iterations {
                state.text = prompts::max_iterations_message(&state.text, self.config.max_iterations);
                state.notice = Some(prompts::max_iterations_notice(self.config.max_iterations));
                return Ok(self.finalize(state, ChatStatus::MaxIterations, &request));
            }

            self.history
                .push(Turn::user(prompts::tool_results_message(&outcomes)));
        }
    }

    async fn call_model(
        &self,
        system: &str,
        sink: Option<DeltaSink>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let mut messages = vec![ChatMessage::system(system)];
        messages.extend(
            self.history
                .recent(self.config.recent_window)
                .iter()
                .map(ChatMessage::from),
        );
        let request = self.adapter.build_request(&messages, &self.config.settings)?;

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AbacusError::Canceled),
            response = self.transport.execute_request(&request) => response?,
        };

        let mut decoder = StreamDecoder::new().with_cancellation(cancel.clone());
        if let Some(sink) = sink {
            decoder = decoder.with_sink(sink);
        }
        decoder.decode(response.body).await
    }

    fn finalize(&mut self, state: IterationState, status: ChatStatus, request: &ChatRequest) -> ChatOutcome {
        self.history.push(Turn::assistant(state.text.as_str()));
        if let Some(sink) = &request.delta_sink {
            sink("", true);
        }
        tracing::info!(
            call_id = %state.call_id,
            status = %status,
            iterations = state.iteration,
            tools = state.tool_outcomes.len(),
            "chat call finished"
        );
        ChatOutcome {
            call_id: state.call_id,
            thinking: state.thinking(),
            text: state.text,
            tool_outcomes: state.tool_outcomes,
            status,
            error: None,
            notice: state.notice,
            iterations: state.iteration,
        }
    }

    fn fail(
        &mut self,
        checkpoint: Checkpoint,
        state: IterationState,
        err: AbacusError,
        request: &ChatRequest,
    ) -> ChatOutcome {
        self.history.rollback(checkpoint);
        if let Some(sink) = &request.delta_sink {
            sink("", true);
        }
        tracing::error!(
            call_id = %state.call_id,
            iterations = state.iteration,
            status = ?err.status(),
            error = %err,
            "chat call failed"
        );
        ChatOutcome {
            call_id: state.call_id,
            text: prompts::failure_message(&err),
            thinking: state.thinking(),
            tool_outcomes: state.tool_outcomes,
            status: ChatStatus::Failed,
            error: Some(err.to_string()),
            notice: None,
            iterations: state.iteration,
        }
    }

    fn cancel(&mut self, checkpoint: Checkpoint, state: IterationState) -> ChatOutcome {
        let removed = self.history.rollback(checkpoint);
        tracing::info!(call_id = %state.call_id, iterations = state.iteration, removed, "chat call canceled");
        ChatOutcome {
            call_id: state.call_id,
            thinking: state.thinking(),
            text: state.text,
            tool_outcomes: state.tool_outcomes,
            status: ChatStatus::Canceled,
            error: None,
            notice: None,
            iterations: state.iteration,
        }
    }
}

/// Forward in-progress deltas to the caller; completion is signalled by the
/// agent once per call, and nothing passes after cancellation.
fn forwarding_sink(sink: Option<DeltaSink>, cancel: CancellationToken) -> Option<DeltaSink> {
    let sink = sink?;
    let forward: DeltaSink = Arc::new(move |delta: &str, complete: bool| {
        if !complete && !cancel.is_cancelled() {
            sink(delta, false);
        }
    });
    Some(forward)
}
