//! Convenience re-exports for common use.

pub use crate::agent::{ChatAgent, ChatOutcome, ChatRequest, ChatStatus};
pub use crate::config::AgentConfig;
pub use crate::error::{AbacusError, Result};
pub use crate::provider::ProviderKind;
pub use crate::stream::DeltaSink;
pub use crate::tools::{
    AgentTool, BookContext, ContextResolver, Tool, ToolError, ToolExecutor, ToolParameters,
    ToolProgress, ToolProgressSink, ToolRegistry,
};
pub use crate::types::{ModelSettings, Role, ToolInvocation, ToolOutcome, Turn};
