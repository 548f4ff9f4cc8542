//! The external tool execution seam.

use async_trait::async_trait;
use thiserror::Error;

use super::context::ToolContext;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    NotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Executes named tools on behalf of the model.
///
/// Implementations report failure through `Err` with a descriptive message.
/// Calls are never retried by the caller.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn call_tool(
        &self,
        name: &str,
        arguments: &serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ToolError>;

    /// Catalog text describing the available tools, for the system prompt.
    fn catalog(&self) -> String {
        String::new()
    }
}
