//! Tool execution: collaborator seam, registry and batch dispatcher.

pub mod context;
pub mod dispatcher;
pub mod executor;
pub mod schema;
pub mod tool;

pub use context::{BookContext, ContextResolver, ToolContext};
pub use dispatcher::{ToolDispatcher, ToolProgress, ToolProgressSink, MISSING_CONTEXT_HINT};
pub use executor::{ToolError, ToolExecutor};
pub use schema::{ParameterBuilder, ToolParameters};
pub use tool::{AgentTool, Tool, ToolRegistry};
