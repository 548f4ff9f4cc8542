//! Generation settings and per-call model results.

use bon::Builder;
use serde::{Deserialize, Serialize};

use super::tool::ToolInvocation;

/// Settings sent with every model request.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    #[builder(default = 2000)]
    pub max_tokens: u32,
    #[builder(default = 0.7)]
    pub temperature: f64,
    /// Ask the provider for an event stream instead of a single JSON body.
    #[builder(default = true)]
    pub stream: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Interpretation of one model call.
///
/// Produced once per call and consumed immediately by the agent loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelTurnResult {
    pub text: String,
    pub thinking: Option<String>,
    pub tool_calls: Option<Vec<ToolInvocation>>,
    pub error: Option<String>,
}

impl ModelTurnResult {
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}
