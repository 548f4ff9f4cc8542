//! Agent loop controller.

pub mod chat;
pub mod prompts;
pub mod types;

pub use chat::ChatAgent;
pub use types::{ChatOutcome, ChatRequest, ChatStatus, IterationState};
