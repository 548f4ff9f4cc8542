//! Sequential execution of a batch of tool invocations.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::context::{ContextResolver, ToolContext};
use super::executor::ToolExecutor;
use crate::types::{ToolInvocation, ToolOutcome};

/// Appended to failure messages when no book was active.
pub const MISSING_CONTEXT_HINT: &str = "(no active book selected; this is the likely cause)";

/// Progress of a tool batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolProgress {
    Started {
        index: usize,
        total: usize,
        name: String,
    },
    Succeeded {
        index: usize,
        name: String,
        result: serde_json::Value,
    },
    Failed {
        index: usize,
        name: String,
        error: String,
    },
}

pub type ToolProgressSink = Arc<dyn Fn(ToolProgress) + Send + Sync>;

/// Runs tool invocations one at a time, in order.
///
/// A failing tool never stops the rest of the batch; cancellation does, and
/// no further tool is started once the token is set.
#[derive(Clone)]
pub struct ToolDispatcher {
    executor: Arc<dyn ToolExecutor>,
}

impl ToolDispatcher {
    pub fn new(executor: Arc<dyn ToolExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<dyn ToolExecutor> {
        &self.executor
    }

    pub async fn execute(
        &self,
        calls: &[ToolInvocation],
        resolver: &dyn ContextResolver,
        progress: Option<&ToolProgressSink>,
        cancel: &CancellationToken,
    ) -> Vec<ToolOutcome> {
        let ctx = ToolContext::new(resolver.resolve());
        if ctx.book.is_none() {
            tracing::warn!(tools = calls.len(), "running tools without an active book");
        }
        let report = |event: ToolProgress| {
            if let Some(sink) = progress {
                sink(event);
            }
        };

        let total = calls.len();
        let mut outcomes = Vec::with_capacity(total);
        for (index, call) in calls.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(ran = index, skipped = total - index, "tool batch canceled");
                break;
            }
            report(ToolProgress::Started {
                index,
                total,
                name: call.name.clone(),
            });
            tracing::debug!(tool = %call.name, index, total, "calling tool");

            match self.executor.call_tool(&call.name, &call.arguments, &ctx).await {
                Ok(result) => {
                    report(ToolProgress::Succeeded {
                        index,
                        name: call.name.clone(),
                        result: result.clone(),
                    });
                    outcomes.push(ToolOutcome::succeeded(&call.name, result));
                }
                Err(err) => {
                    let mut error = err.to_string();
                    if ctx.book.is_none() {
                        error.push(' ');
                        error.push_str(MISSING_CONTEXT_HINT);
                    }
                    tracing::warn!(tool = %call.name, index, error = %error, "tool failed");
                    report(ToolProgress::Failed {
                        index,
                        name: call.name.clone(),
                        error: error.clone(),
                    });
                    outcomes.push(ToolOutcome::failed(&call.name, error));
                }
            }
        }
        outcomes
    }
}
